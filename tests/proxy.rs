mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use common::FakeUpstream;
use image_describer::config::ProxySettings;
use image_describer::proxy::{router, ProxyState, SYSTEM_PROMPT};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn proxy(provider_url: String, api_key: Option<&str>) -> Router {
    proxy_with(
        ProxySettings {
            provider_url,
            ..ProxySettings::default()
        },
        api_key,
    )
}

fn proxy_with(settings: ProxySettings, api_key: Option<&str>) -> Router {
    router(Arc::new(ProxyState::new(
        reqwest::Client::new(),
        settings,
        api_key.map(str::to_string),
    )))
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn messages() -> String {
    messages_with_image("aGVsbG8=")
}

fn messages_with_image(data: &str) -> String {
    json!([{
        "role": "user",
        "content": [
            {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": data}},
            {"type": "text", "text": "Describe the image. Limit the description to 20 words."}
        ]
    }])
    .to_string()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_cors(response: &Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn preflight_is_empty_with_cors_headers() {
    let app = proxy("http://127.0.0.1:9/".into(), Some("key"));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_cors(&response);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn missing_credential_is_a_500_with_a_message() {
    let app = proxy("http://127.0.0.1:9/".into(), None);

    let response = app.oneshot(post(messages())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Provider credential is not configured"})
    );
}

#[tokio::test]
async fn malformed_body_is_a_500() {
    let app = proxy("http://127.0.0.1:9/".into(), Some("key"));

    let response = app.oneshot(post("not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("not valid JSON"));
}

#[tokio::test]
async fn relays_the_first_text_block_as_a_json_string() {
    let provider = FakeUpstream::new(
        StatusCode::OK,
        json!({
            "content": [{"type": "text", "text": "A cat sitting on a windowsill."}],
            "stop_reason": "end_turn"
        })
        .to_string(),
    );
    let app = proxy(provider.start().await, Some("secret-key"));

    let response = app.oneshot(post(messages())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(json_body(response).await, json!("A cat sitting on a windowsill."));

    let seen = provider.last_request().unwrap();
    assert_eq!(seen.headers["x-api-key"], "secret-key");
    assert_eq!(seen.headers["anthropic-version"], "2023-06-01");
    assert_eq!(seen.body["system"], SYSTEM_PROMPT);
    assert_eq!(seen.body["max_tokens"], 300);
    assert_eq!(seen.body["model"], "claude-3-5-sonnet-20240620");
    assert_eq!(seen.body["messages"], serde_json::from_str::<Value>(&messages()).unwrap());
}

#[tokio::test]
async fn provider_failure_is_relayed_as_an_error_envelope() {
    let provider = FakeUpstream::new(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"type": "error", "error": {"type": "rate_limit_error", "message": "rate limited"}})
            .to_string(),
    );
    let app = proxy(provider.start().await, Some("secret-key"));

    let response = app.oneshot(post(messages())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn reply_without_text_is_an_error() {
    let provider = FakeUpstream::new(StatusCode::OK, json!({"content": []}).to_string());
    let app = proxy(provider.start().await, Some("secret-key"));

    let response = app.oneshot(post(messages())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn photo_sized_bodies_reach_the_provider() {
    let provider = FakeUpstream::new(StatusCode::OK, json!({"content": [{"type": "text", "text": "A beach."}]}).to_string());
    let app = proxy(provider.start().await, Some("secret-key"));
    // A ~1.8 MB photo is ~2.4 MB once Base64 encoded, above axum's 2 MB default.
    let image = "A".repeat(2_400_000);

    let response = app.oneshot(post(messages_with_image(&image))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(json_body(response).await, json!("A beach."));
    let seen = provider.last_request().unwrap();
    assert_eq!(seen.body["messages"][0]["content"][0]["source"]["data"].as_str().unwrap().len(), image.len());
}

#[tokio::test]
async fn oversized_body_is_a_500_envelope_with_cors() {
    let settings = ProxySettings {
        provider_url: "http://127.0.0.1:9/".into(),
        max_body_bytes: 1024,
        ..ProxySettings::default()
    };
    let app = proxy_with(settings, Some("secret-key"));

    let response = app
        .oneshot(post(messages_with_image(&"A".repeat(4096))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("could not be read"));
}
