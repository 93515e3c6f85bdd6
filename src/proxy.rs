//! The describe proxy: holds the provider credential, forwards the browser's
//! conversation to the vision model and relays the first text block back.
use crate::config::ProxySettings;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::instrument;

pub const SYSTEM_PROMPT: &str =
    "You are an image describer. When asked to describe an image, provide an accurate description.";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Open to any origin; attached to every response, errors included.
pub fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Provider credential is not configured")]
    MissingCredential,
    #[error("Request body could not be read: {0}")]
    UnreadableBody(#[from] BytesRejection),
    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Provider reply could not be parsed: {0}")]
    UnexpectedReply(serde_json::Error),
    #[error("Provider reply contained no text")]
    EmptyReply,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "describe relay failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            cors_headers(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct ProviderReply {
    content: Vec<ProviderBlock>,
}

#[derive(Deserialize)]
struct ProviderBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

pub struct ProxyState {
    http: reqwest::Client,
    settings: ProxySettings,
    api_key: Option<String>,
}

impl ProxyState {
    pub fn new(http: reqwest::Client, settings: ProxySettings, api_key: Option<String>) -> Self {
        Self {
            http,
            settings,
            api_key,
        }
    }
}

pub fn router(state: Arc<ProxyState>) -> Router {
    let body_limit = state.settings.max_body_bytes;
    Router::new()
        .route("/", post(relay).options(preflight))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

#[instrument(skip(state, body))]
async fn relay(
    State(state): State<Arc<ProxyState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProxyError> {
    let body = body?;
    tracing::debug!(bytes = body.len(), "describe request received");
    let api_key = state
        .api_key
        .as_deref()
        .ok_or(ProxyError::MissingCredential)?;
    let messages: serde_json::Value = serde_json::from_slice(&body)?;

    let payload = serde_json::json!({
        "model": state.settings.model,
        "max_tokens": state.settings.max_tokens,
        "system": SYSTEM_PROMPT,
        "messages": messages,
    });

    let response = state
        .http
        .post(&state.settings.provider_url)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProxyError::Provider {
            status: status.as_u16(),
            message: provider_error_message(&text),
        });
    }

    let reply: ProviderReply =
        serde_json::from_str(&text).map_err(ProxyError::UnexpectedReply)?;
    let description = reply
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or(ProxyError::EmptyReply)?;

    tracing::info!(chars = description.len(), "description relayed");

    Ok((cors_headers(), Json(description)).into_response())
}

/// Pulls `error.message` out of a provider error body, falling back to the
/// raw body.
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub async fn serve(settings: ProxySettings, api_key: Option<String>) -> anyhow::Result<()> {
    if api_key.is_none() {
        tracing::warn!("provider credential missing; every describe request will fail");
    }

    let addr = settings.get_address();
    let state = Arc::new(ProxyState::new(reqwest::Client::new(), settings, api_key));
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Describe proxy listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(crate::signal::shutdown_signal())
        .await?;

    Ok(())
}
