//! End-to-end tests of the reqwest transports against a local HTTP server

use chrono::{TimeZone, Utc};
use paypal_gateway::{
    Credentials, DateRange, Error, GatewayConfig, Mode, NotificationPayload,
    NotificationStatus, NotificationVerifier, TransactionReconciler,
};
use rust_decimal_macros::dec;
use wiremock::matchers::{body_string, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::new(
        Mode::Sandbox,
        Credentials {
            username: "api_user".to_string(),
            password: "api_pass".to_string(),
            signature: "api_sig".to_string(),
        },
    );
    config.nvp_endpoint = Some(format!("{}/nvp", server.uri()));
    config.ipn_endpoint = Some(format!("{}/cgi-bin/webscr", server.uri()));
    config.timeout_seconds = 5;
    config
}

fn may_2023() -> DateRange {
    DateRange::between(
        Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 5, 31, 0, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_query_transactions_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nvp"))
        .and(body_string_contains("METHOD=TransactionSearch"))
        .and(body_string_contains("USER=api_user"))
        .and(body_string_contains("SIGNATURE=api_sig"))
        .and(body_string_contains("STARTDATE=2023-05-01T00%3A00%3A00Z"))
        .and(body_string_contains("ENDDATE=2023-05-31T00%3A00%3A00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "ACK=Success&L_TYPE0=Payment&L_TRANSACTIONID0=T1&L_TYPE1=Refund&L_TRANSACTIONID1=T2",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nvp"))
        .and(body_string_contains("METHOD=GetTransactionDetails"))
        .and(body_string_contains("TRANSACTIONID=T1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "ACK=Success&INVNUM=INV-1&PAYMENTSTATUS=Completed&AMT=10.00&FEEAMT=0.59\
             &ORDERTIME=2023-05-01T10%3A00%3A00Z&EMAIL=buyer%40example.com",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nvp"))
        .and(body_string_contains("TRANSACTIONID=T2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ACK=Success"))
        .expect(0)
        .mount(&server)
        .await;

    let reconciler = TransactionReconciler::from_config(&config(&server)).unwrap();
    let page = reconciler.query_transactions(may_2023()).await.unwrap();

    assert_eq!(page.results_in_this_page, 1);
    let detail = &page.transactions[0];
    assert_eq!(detail.payment_id, "INV-1");
    assert_eq!(detail.status, "completed");
    assert_eq!(detail.net_amount, dec!(9.41));
    assert_eq!(detail.buyer_email, "buyer@example.com");
    assert_eq!(detail.date, Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap());
}

#[tokio::test]
async fn test_failed_search_skips_detail_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("METHOD=TransactionSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "ACK=Failure&L_ERRORCODE0=10002&L_SHORTMESSAGE0=Security%20error",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("METHOD=GetTransactionDetails"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ACK=Success"))
        .expect(0)
        .mount(&server)
        .await;

    let reconciler = TransactionReconciler::from_config(&config(&server)).unwrap();
    match reconciler.query_transactions(may_2023()).await {
        Err(Error::Gateway { ack, response, .. }) => {
            assert_eq!(ack, "Failure");
            assert!(response.contains("L_ERRORCODE0=10002"));
        }
        other => panic!("expected gateway error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_nvp_http_error_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nvp"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let reconciler = TransactionReconciler::from_config(&config(&server)).unwrap();
    assert!(matches!(
        reconciler.get_details("T1").await,
        Err(Error::Transport(_))
    ));
}

fn ipn_payload() -> NotificationPayload {
    [
        ("txn_id", "61E67681CH3238416"),
        ("invoice", "INV-1001"),
        ("payment_status", "Completed"),
        ("mc_gross", "100.00"),
        ("mc_fee", "5.00"),
        ("settle_amount", "95.00"),
        ("payer_email", "ada@example.com"),
    ]
    .into_iter()
    .collect()
}

#[tokio::test]
async fn test_ipn_is_reposted_with_validate_command_first() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/webscr"))
        .and(body_string(
            "cmd=_notify-validate&txn_id=61E67681CH3238416&invoice=INV-1001\
             &payment_status=Completed&mc_gross=100.00&mc_fee=5.00\
             &settle_amount=95.00&payer_email=ada%40example.com",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("VERIFIED"))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = NotificationVerifier::from_config(&config(&server)).unwrap();
    let record = verifier.verify(&ipn_payload()).await.unwrap();

    assert_eq!(record.status, NotificationStatus::Completed);
    assert_eq!(record.net_amount, dec!(90.00));
    assert_eq!(record.payer.email, "ada@example.com");
}

#[tokio::test]
async fn test_ipn_invalid_and_ambiguous_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("INVALID"))
        .mount(&server)
        .await;

    let verifier = NotificationVerifier::from_config(&config(&server)).unwrap();
    assert!(matches!(
        verifier.verify(&ipn_payload()).await,
        Err(Error::Verification(_))
    ));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("MAYBE"))
        .mount(&server)
        .await;

    let verifier = NotificationVerifier::from_config(&config(&server)).unwrap();
    assert!(matches!(
        verifier.verify(&ipn_payload()).await,
        Err(Error::Protocol(_))
    ));
}

#[tokio::test]
async fn test_ipn_http_error_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("VERIFIED"))
        .mount(&server)
        .await;

    let verifier = NotificationVerifier::from_config(&config(&server)).unwrap();
    assert!(matches!(
        verifier.verify(&ipn_payload()).await,
        Err(Error::Transport(_))
    ));
}

#[tokio::test]
async fn test_slow_endpoints_hit_client_timeout() {
    let server = MockServer::start().await;
    let slow = ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3));

    Mock::given(method("POST"))
        .and(path("/nvp"))
        .respond_with(slow.clone().set_body_string("ACK=Success&INVNUM=INV-1&AMT=1.00"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/webscr"))
        .respond_with(slow.set_body_string("VERIFIED"))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.timeout_seconds = 1;

    let reconciler = TransactionReconciler::from_config(&config).unwrap();
    assert!(matches!(
        reconciler.get_details("T1").await,
        Err(Error::Transport(_))
    ));

    let verifier = NotificationVerifier::from_config(&config).unwrap();
    assert!(matches!(
        verifier.verify(&ipn_payload()).await,
        Err(Error::Transport(_))
    ));
}
