//! Chat-completion transport
//!
//! The wire call is behind a trait so the retry loop can be driven by scripted
//! transports in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use tracing::debug;

use super::DecomposeError;

/// One chat message of the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body: `{ "model", "messages", "stream": false }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Sends a single chat-completion request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `request` to `url` with a bearer credential and returns the body of a
    /// 2xx response. Network failures and other statuses are `DecomposeError::Transport`.
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<String, DecomposeError>;
}

/// reqwest-backed transport with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: ReqwestClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, DecomposeError> {
        let http = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<String, DecomposeError> {
        debug!(%url, model = %request.model, "send: called");
        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, "send: non-success status");
            return Err(DecomposeError::Transport(format!("HTTP {}: {}", status, text)));
        }

        Ok(response.text().await?)
    }
}
