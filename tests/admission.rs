//! Admission behavior: quotas, rollover, exemptions, scope precedence.

use std::time::Duration;

use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn quota_allows_then_denies_with_retry_hint() {
    let mut config = common::test_config();
    config.rate_limit.api.window_ms = 60_000;
    config.rate_limit.api.max_requests = 3;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client
            .get(format!("{base}/api/widgets"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    let res = client
        .get(format!("{base}/api/widgets"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = res
        .headers()
        .get("retry-after")
        .expect("429 must carry Retry-After")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert!(retry_after <= 60);

    // Rejections are annotated by the security policy too.
    assert_eq!(
        res.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Too many requests");
    assert_eq!(body["retryAfter"], retry_after.to_string());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn window_rollover_grants_a_fresh_window() {
    let mut config = common::test_config();
    config.rate_limit.api.window_ms = 300;
    config.rate_limit.api.max_requests = 2;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();
    let url = format!("{base}/api/widgets");

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 429);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
}

#[tokio::test]
async fn exempt_paths_never_touch_a_counter() {
    let mut config = common::test_config();
    config.rate_limit.default.window_ms = 60_000;
    config.rate_limit.default.max_requests = 2;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();

    // Far past the default quota; exemption means no counting at all.
    for _ in 0..10 {
        let res = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // The default-scope bucket for this client is still untouched.
    assert_eq!(
        client.get(format!("{base}/")).send().await.unwrap().status(),
        200
    );
    assert_eq!(
        client.get(format!("{base}/")).send().await.unwrap().status(),
        200
    );
    assert_eq!(
        client.get(format!("{base}/")).send().await.unwrap().status(),
        429
    );
}

#[tokio::test]
async fn auth_sensitive_scope_gates_auth_routes() {
    let mut config = common::test_config();
    config.rate_limit.auth_sensitive.window_ms = 60_000;
    config.rate_limit.auth_sensitive.max_requests = 2;
    config.rate_limit.api.window_ms = 60_000;
    config.rate_limit.api.max_requests = 100;

    let (base, _shutdown) = common::spawn_gate(config).await;
    let client = common::client();

    assert_eq!(
        client
            .post(format!("{base}/api/auth/login"))
            .send()
            .await
            .unwrap()
            .status(),
        200
    );
    assert_eq!(
        client
            .post(format!("{base}/api/auth/login"))
            .send()
            .await
            .unwrap()
            .status(),
        200
    );
    // Third login attempt is stopped by the auth-sensitive policy even
    // though the api scope has plenty of headroom.
    assert_eq!(
        client
            .post(format!("{base}/api/auth/login"))
            .send()
            .await
            .unwrap()
            .status(),
        429
    );

    // Plain api routes are unaffected: separate scope, separate bucket.
    assert_eq!(
        client
            .get(format!("{base}/api/widgets"))
            .send()
            .await
            .unwrap()
            .status(),
        200
    );
}

#[tokio::test]
async fn misconfigured_gate_refuses_to_build() {
    let mut config = common::test_config();
    config.rate_limit.api.max_requests = 0;

    let result = admission_gate::GateServer::new(config, axum::Router::new());
    assert!(result.is_err());
}
