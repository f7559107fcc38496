mod common;

use std::sync::Arc;

use reqwest::cookie::Jar;
use serde_json::{Value, json};
use session_client::{ApiClient, Credentials, MemoryCredentialStore, MultipartPayload, RequestOptions};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{base_config, client_with_token, requests_to};

fn content_type(req: &wiremock::Request) -> Option<String> {
    req.headers
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn file_upload_uses_multipart_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/talent/resume"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"stored": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t");
    let upload = MultipartPayload::new()
        .text("label", "resume")
        .file_with_mime("file", "cv.pdf", b"%PDF-1.4 fake".to_vec(), "application/pdf")
        .unwrap();
    let resp: Value = client
        .request(RequestOptions::post("/talent/resume").multipart(upload))
        .await
        .unwrap();
    assert_eq!(resp["stored"], true);

    let sent = requests_to(&server, "/talent/resume").await;
    let ct = content_type(&sent[0]).expect("content type set by transport");
    assert!(ct.starts_with("multipart/form-data; boundary="), "got {ct}");
    assert!(!ct.contains("application/json"));
    let body = String::from_utf8_lossy(&sent[0].body);
    assert!(body.contains("filename=\"cv.pdf\""));
    assert!(body.contains("%PDF-1.4 fake"));
}

#[tokio::test]
async fn object_body_is_sent_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/opportunities"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t");
    let body = json!({"title": "Rust engineer", "remote": true});
    let created: Value = client.post("/opportunities", &body).await.unwrap();
    assert_eq!(created["id"], 9);

    let sent = requests_to(&server, "/opportunities").await;
    let parsed: Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(parsed, body);
}

#[tokio::test]
async fn multipart_upload_is_rebuilt_for_replay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/talent/avatar"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/talent/avatar"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .mount(&server)
        .await;

    let client = client_with_token(&server, "stale");
    let upload = MultipartPayload::new().file("avatar", "me.png", vec![0x89, b'P', b'N', b'G']);
    let resp: Value = client
        .request(RequestOptions::post("/talent/avatar").multipart(upload))
        .await
        .unwrap();
    assert_eq!(resp["ok"], true);

    let sent = requests_to(&server, "/talent/avatar").await;
    assert_eq!(sent.len(), 2);
    for req in &sent {
        assert!(content_type(req).unwrap().starts_with("multipart/form-data"));
        assert!(String::from_utf8_lossy(&req.body).contains("me.png"));
    }
}

#[tokio::test]
async fn query_and_custom_headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .and(query_param("status", "open"))
        .and(header("x-request-source", "dashboard"))
        .and(header("authorization", "Bearer t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t");
    let options = RequestOptions::get("/opportunities")
        .query("status", "open")
        .header(
            reqwest::header::HeaderName::from_static("x-request-source"),
            reqwest::header::HeaderValue::from_static("dashboard"),
        );
    let list: Vec<Value> = client.request(options).await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn missing_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = ApiClient::builder(base_config(&server)).build().unwrap();
    let _: Vec<Value> = client.get("/opportunities").await.unwrap();

    let sent = requests_to(&server, "/opportunities").await;
    assert!(sent[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn cookies_ride_only_on_credentialed_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/talent/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/talent/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let jar = Arc::new(Jar::default());
    let url: reqwest::Url = server.uri().parse().unwrap();
    jar.add_cookie_str("refresh_token=r1; Path=/", &url);

    let client = ApiClient::builder(base_config(&server))
        .store(MemoryCredentialStore::with_token("stale"))
        .cookie_jar(jar)
        .build()
        .unwrap();

    let _: Value = client.get("/talent/me").await.unwrap();
    for req in requests_to(&server, "/talent/me").await {
        assert!(req.headers.get("cookie").is_none());
    }

    let _: Value = client
        .request(RequestOptions::get("/session/ping").credentials(Credentials::Include))
        .await
        .unwrap();
    let ping = requests_to(&server, "/session/ping").await;
    assert_eq!(
        ping[0].headers.get("cookie").and_then(|h| h.to_str().ok()),
        Some("refresh_token=r1")
    );
}
