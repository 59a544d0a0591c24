use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::ai::ChatBackend;
use crate::config::Config;
use crate::state::ChatMessage;

/// Content of the reply when the backend answered without a message
pub const NO_RESPONSE_MESSAGE: &str = "No response from backend";

/// Content of the reply when the backend could not be reached or answered garbage
pub const UNREACHABLE_MESSAGE: &str =
    "Error: Unable to reach backend. Please check if FastAPI is running.";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to backend failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("backend response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Transport(e) if e.is_timeout())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

/// Client for the assistant backend's `/chat` endpoint
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
}

impl BackendClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Build)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One round-trip to the backend. `Ok(None)` means the backend answered
    /// but the reply carried no usable `message`.
    pub async fn query(&self, query: &str) -> Result<Option<String>, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { query })
            .send()
            .await
            .map_err(BackendError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status));
        }

        let body = response.bytes().await.map_err(BackendError::Transport)?;
        let data: Value = serde_json::from_slice(&body).map_err(BackendError::Decode)?;

        Ok(data
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .map(str::to_string))
    }

    /// Turn a query into exactly one assistant message. Never fails.
    pub async fn send(&self, query: &str) -> ChatMessage {
        match self.query(query).await {
            Ok(Some(reply)) => ChatMessage::assistant(reply),
            Ok(None) => {
                tracing::debug!(endpoint = %self.endpoint, "Backend reply had no message field");
                ChatMessage::assistant(NO_RESPONSE_MESSAGE)
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timeout = e.is_timeout(),
                    "Error connecting to backend: {e}"
                );
                ChatMessage::assistant(UNREACHABLE_MESSAGE)
            }
        }
    }
}

impl ChatBackend for BackendClient {
    fn send(&self, query: &str) -> impl Future<Output = ChatMessage> + Send {
        BackendClient::send(self, query)
    }
}
