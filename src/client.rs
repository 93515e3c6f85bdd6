use crate::error::{DescribeError, Result};
use crate::messages::DescriptionRequest;
use serde::Deserialize;
use tracing::instrument;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: serde_json::Value,
}

/// Talks to the describe proxy. One POST per call, never retried.
#[derive(Clone)]
pub struct DescriptionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DescriptionClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, image_base64))]
    pub async fn describe(
        &self,
        image_base64: String,
        mime_type: &str,
        max_words: u32,
    ) -> Result<String> {
        let messages = DescriptionRequest {
            image_base64,
            mime_type: mime_type.to_string(),
            max_words,
        }
        .into_messages();

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&messages)
            .send()
            .await
            .map_err(|e| DescribeError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DescribeError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|envelope| error_text(envelope.error))
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(%status, %message, "proxy rejected describe request");
            return Err(DescribeError::Description(message));
        }

        serde_json::from_slice::<String>(&body).map_err(|e| {
            DescribeError::Description(format!("Unexpected response from proxy: {e}"))
        })
    }
}

fn error_text(error: serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message,
        other => other.to_string(),
    }
}
