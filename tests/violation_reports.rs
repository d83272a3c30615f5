//! Violation report ingestion endpoint.

use reqwest::StatusCode;

mod common;

const WELL_FORMED: &str = r#"{"csp-report": {
    "document-uri": "http://x",
    "violated-directive": "script-src",
    "blocked-uri": "http://evil"
}}"#;

#[tokio::test]
async fn well_formed_report_returns_204() {
    let (base, _shutdown) = common::spawn_gate(common::test_config()).await;
    let client = common::client();

    let res = client
        .post(format!("{base}/csp-report"))
        .header("content-type", "application/csp-report")
        .body(WELL_FORMED)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_reports_return_400() {
    let (base, _shutdown) = common::spawn_gate(common::test_config()).await;
    let client = common::client();
    let url = format!("{base}/csp-report");

    // Missing required fields.
    let res = client
        .post(&url)
        .body(r#"{"csp-report": {"blocked-uri": "http://evil"}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Not JSON at all.
    let res = client.post(&url).body("not json").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // JSON without the report envelope.
    let res = client
        .post(&url)
        .body(r#"{"something": "else"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_report_returns_400() {
    let mut config = common::test_config();
    config.reporting.max_body_bytes = 1024;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();

    let huge = format!(
        r#"{{"csp-report": {{"document-uri": "http://x", "violated-directive": "script-src", "blocked-uri": "{}"}}}}"#,
        "a".repeat(4096)
    );
    let res = client
        .post(format!("{base}/csp-report"))
        .body(huge)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_endpoint_bypasses_rate_limiting() {
    let mut config = common::test_config();
    config.rate_limit.default.max_requests = 1;
    config.rate_limit.api.max_requests = 1;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client
            .post(format!("{base}/csp-report"))
            .body(WELL_FORMED)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
async fn report_endpoint_rejects_get() {
    let (base, _shutdown) = common::spawn_gate(common::test_config()).await;
    let client = common::client();

    let res = client
        .get(format!("{base}/csp-report"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}
