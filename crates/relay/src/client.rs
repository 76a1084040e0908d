//! HTTP client for the relay endpoint.
//!
//! Wraps `reqwest` with the wire contract the endpoint expects: a JSON
//! payload with capitalized field names, a `text/plain` streamed reply for
//! interactive turns, and a plain text body for task calls.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use inlet_config::RelayConfig;
use inlet_core::{Message, RelayError};
use serde::Serialize;

/// The decoded-but-raw byte frames of one streamed response.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, RelayError>>;

/// The transport seam for one relay endpoint. The orchestrator only needs
/// these two calls, so tests can script a transport without a network.
#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Non-streamed task call. Returns the complete response text.
    async fn post_task(&self, payload: &ChatPayload) -> Result<String, RelayError>;

    /// Open a streamed interactive call and hand back its frame stream.
    async fn open_stream(&self, payload: &ChatPayload) -> Result<ChunkStream, RelayError>;
}

/// The outbound request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    #[serde(rename = "User")]
    pub user: String,

    #[serde(rename = "Messages")]
    pub messages: Vec<WireMessage>,

    #[serde(rename = "WebSearchActivated")]
    pub web_search_activated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    #[serde(rename = "Role")]
    pub role: String,

    #[serde(rename = "Content")]
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

impl ChatPayload {
    pub fn new(user: impl Into<String>, messages: &[Message], web_search_activated: bool) -> Self {
        Self {
            user: user.into(),
            messages: messages.iter().map(WireMessage::from).collect(),
            web_search_activated,
        }
    }
}

/// HTTP client bound to one relay endpoint configuration.
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
    task_endpoint: String,
    api_key: Option<String>,
    task_timeout: Duration,
    stream_timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_certificate)
            .build()
            .map_err(|e| RelayError::Network(format!("failed to build HTTP client: {e}")))?;

        let api_key = if config.requires_api_key {
            config.api_key.clone()
        } else {
            None
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            task_endpoint: config.task_endpoint.clone(),
            api_key,
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
        })
    }

    fn request(&self, url: &str, payload: &ChatPayload) -> Result<reqwest::RequestBuilder, RelayError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| RelayError::InvalidPayload(format!("failed to encode payload: {e}")))?;

        let mut builder = self
            .client
            .post(url)
            .header("Accept", "text/plain")
            .header("Content-Type", "application/json; charset=utf-8")
            .body(body);

        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        Ok(builder)
    }
}

#[async_trait]
impl ExchangeTransport for RelayClient {
    async fn post_task(&self, payload: &ChatPayload) -> Result<String, RelayError> {
        let response = self
            .request(&self.task_endpoint, payload)?
            .timeout(self.task_timeout)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| RelayError::Network(format!("failed to read task response: {e}")))
    }

    async fn open_stream(&self, payload: &ChatPayload) -> Result<ChunkStream, RelayError> {
        let response = self
            .request(&self.endpoint, payload)?
            .timeout(self.stream_timeout)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(Box::pin(response.bytes_stream().map(|item| match item {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(RelayError::StreamInterrupted(e.to_string())),
        })))
    }
}

fn classify_send_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::Timeout(e.to_string())
    } else {
        RelayError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inlet_core::Message;

    #[test]
    fn payload_serializes_with_wire_field_names() {
        let payload = ChatPayload::new(
            "user@example.com",
            &[Message::user("hi"), Message::assistant("hello")],
            true,
        );
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""User":"user@example.com""#));
        assert!(json.contains(r#""WebSearchActivated":true"#));
        assert!(json.contains(r#""Role":"user""#));
        assert!(json.contains(r#""Content":"hi""#));
        assert!(json.contains(r#""Role":"assistant""#));
    }

    #[test]
    fn client_builds_from_default_config() {
        let config = RelayConfig::default();
        assert!(RelayClient::new(&config).is_ok());
    }

    #[test]
    fn api_key_dropped_when_not_required() {
        let config = RelayConfig {
            api_key: Some("sk-test".into()),
            requires_api_key: false,
            ..RelayConfig::default()
        };
        let client = RelayClient::new(&config).unwrap();
        assert!(client.api_key.is_none());
    }

    #[test]
    fn api_key_kept_when_required() {
        let config = RelayConfig {
            api_key: Some("sk-test".into()),
            requires_api_key: true,
            ..RelayConfig::default()
        };
        let client = RelayClient::new(&config).unwrap();
        assert_eq!(client.api_key.as_deref(), Some("sk-test"));
    }
}
