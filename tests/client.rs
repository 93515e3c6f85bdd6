mod common;

use axum::http::StatusCode;
use common::{closed_port_url, FakeUpstream};
use image_describer::{DescribeError, DescriptionClient, ErrorKind};

#[tokio::test]
async fn success_returns_the_description_verbatim() {
    let proxy = FakeUpstream::new(StatusCode::OK, r#""A cat sitting on a windowsill.""#);
    let url = proxy.start().await;
    let client = DescriptionClient::new(reqwest::Client::new(), url);

    let description = client
        .describe("aGVsbG8=".into(), "image/jpeg", 17)
        .await
        .unwrap();

    assert_eq!(description, "A cat sitting on a windowsill.");
}

#[tokio::test]
async fn request_carries_image_and_word_limit() {
    let proxy = FakeUpstream::new(StatusCode::OK, r#""ok""#);
    let url = proxy.start().await;
    let client = DescriptionClient::new(reqwest::Client::new(), url);

    client
        .describe("aGVsbG8=".into(), "image/webp", 17)
        .await
        .unwrap();

    let seen = proxy.last_request().unwrap();
    assert_eq!(seen.headers["content-type"], "application/json");

    let message = &seen.body[0];
    assert_eq!(message["role"], "user");
    assert_eq!(message["content"][0]["type"], "image");
    assert_eq!(message["content"][0]["source"]["media_type"], "image/webp");
    assert_eq!(message["content"][0]["source"]["data"], "aGVsbG8=");
    let text = message["content"][1]["text"].as_str().unwrap();
    assert!(text.contains("Limit the description to 17 words."));
}

#[tokio::test]
async fn error_envelope_becomes_a_description_error() {
    let proxy = FakeUpstream::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"rate limited"}"#,
    );
    let url = proxy.start().await;
    let client = DescriptionClient::new(reqwest::Client::new(), url);

    let err = client
        .describe("aGVsbG8=".into(), "image/png", 10)
        .await
        .unwrap_err();

    assert_eq!(err, DescribeError::Description("rate limited".into()));
}

#[tokio::test]
async fn non_json_failure_falls_back_to_the_status() {
    let proxy = FakeUpstream::new(StatusCode::BAD_GATEWAY, "upstream exploded");
    let url = proxy.start().await;
    let client = DescriptionClient::new(reqwest::Client::new(), url);

    let err = client
        .describe("aGVsbG8=".into(), "image/png", 10)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Description);
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn unreachable_proxy_is_a_transport_error() {
    let client = DescriptionClient::new(reqwest::Client::new(), closed_port_url().await);

    let err = client
        .describe("aGVsbG8=".into(), "image/png", 10)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}
