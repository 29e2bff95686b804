//! HTTP client for the external automation webhook.
//!
//! The receiving workflow's expected input field name is not under our
//! control, so the payload carries the message under every conventional key
//! at once. The response side is equally defensive: the body is read as raw
//! text first and JSON is only an attempt, so a misconfigured workflow can
//! never make the client drop data or panic.

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::WebhookError;

/// Default endpoint: local n8n on its conventional port, fixed workflow path.
pub const DEFAULT_WEBHOOK_URL: &str =
    "http://localhost:5678/webhook/4c0e5d95-ca09-49b7-8e80-5f9cdd9415af/chat";

/// Request timer; on expiry the in-flight request is cancelled.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Placeholder reply when a success body carries no recognized field.
const NO_RESPONSE_PLACEHOLDER: &str = "No response from AI";

/// Reply fields probed in priority order on a success body.
const OUTPUT_FIELDS: [&str; 5] = ["output", "response", "message", "text", "raw"];

/// Result of a webhook call. Never an `Err`: every failure path lands here
/// with `output` empty and `error` set to a classified message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub output: String,
    pub error: Option<String>,
}

impl ChatResponse {
    fn failure(err: WebhookError) -> Self {
        Self {
            output: String::new(),
            error: Some(err.to_string()),
        }
    }
}

/// Client for the outbound webhook call.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookClient {
    /// Creates a client for the given endpoint with the standard 20 second
    /// request timer.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom request timer. Tests shorten this so
    /// timeout behavior is observable without waiting 20 seconds.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(60))
            .user_agent(format!("beebot/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create webhook HTTP client");

        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one user message and normalizes whatever comes back.
    pub async fn send(&self, message: &str) -> ChatResponse {
        // Duplicate the message under every key a workflow might read.
        let payload = json!({
            "chatInput": message,
            "input": message,
            "question": message,
            "prompt": message,
            "message": message,
        });

        tracing::debug!(url = %self.url, "sending webhook request");

        let result = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let classified = WebhookError::classify(&err);
                tracing::warn!(%err, "webhook request failed");
                return ChatResponse::failure(classified);
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                let classified = WebhookError::classify(&err);
                tracing::warn!(%err, "failed to read webhook response body");
                return ChatResponse::failure(classified);
            }
        };

        tracing::debug!(status = %status, bytes = text.len(), "webhook response received");

        // Never assume well-formed JSON; keep the raw text reachable.
        let data: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        if !status.is_success() {
            let message = extract_error(&data)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return ChatResponse::failure(WebhookError::Status(message));
        }

        let output = extract_output(&data)
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());

        ChatResponse {
            output,
            error: None,
        }
    }
}

/// First non-empty reply field, probed in priority order.
fn extract_output(data: &Value) -> Option<String> {
    OUTPUT_FIELDS
        .iter()
        .filter_map(|field| data.get(field).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Error description from a conventional `error` or `message` field.
fn extract_error(data: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|field| data.get(field).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
