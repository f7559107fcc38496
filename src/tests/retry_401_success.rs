use crate::tests::test_support::{capture_logs, client_with_token, drain_logs};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn renews_token_once_after_401_then_replays() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/talent/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/talent/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server.uri(), "stale");

    let (lines, guard) = capture_logs();
    let profile: Value = client.get("/talent/me").await.expect("replay should succeed");
    drop(guard);

    assert_eq!(profile["name"], "Ada");
    assert_eq!(client.store().get().as_deref(), Some("fresh"));
    assert!(!client.is_refreshing().await);

    let logs = drain_logs(lines);
    assert!(
        logs.iter()
            .any(|line| line.contains("WARN") && line.contains("401")),
        "expected warning log mentioning 401, got: {:?}",
        logs
    );
    assert!(
        logs.iter().any(|line| line.contains("refresh.success")),
        "expected refresh.success event, got: {:?}",
        logs
    );
}

#[tokio::test]
async fn refresh_call_carries_no_bearer_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "renewed"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server.uri(), "stale");
    let apps: Vec<Value> = client.get("/applications").await.unwrap();
    assert!(apps.is_empty());

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/auth/refresh")
        .expect("refresh request recorded");
    assert!(refresh.headers.get("authorization").is_none());
}

#[tokio::test]
async fn second_401_after_renewal_is_session_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "renewed"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server.uri(), "stale");
    let err = client
        .get::<Value>("/opportunities")
        .await
        .expect_err("replayed 401 must not loop");
    assert!(err.is_session_expired());
}
