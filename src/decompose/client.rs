//! Decomposition client
//!
//! Builds the chat request, retries transient failures with exponential backoff and
//! hands the reply text to the parser.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::parse::parse_reply;
use super::transport::{ChatMessage, ChatRequest, HttpTransport, Transport};
use super::DecomposeError;

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// System message sent with every request
pub const SYSTEM_INSTRUCTION: &str = "あなたは役立つアシスタントです。与えられたタスクをサブタスクのリストに分解し、必ず日本語で回答してください。回答は必ず数字で始まる箇条書きの形式で、余計な説明は不要です。";

/// User prompt; `{task_name}` is replaced with the task being decomposed
pub const PROMPT_TEMPLATE: &str = "与えられたタスクをサブタスクのリストに分解してください。
回答は数字で始まる箇条書きのみとし、余計な説明は書かないでください。

タスク：{task_name}

以下の形式で回答してください：
1. 最初のサブタスク
2. 二番目のサブタスク
3. 三番目のサブタスク
...
";

pub fn build_prompt(task_name: &str) -> String {
    PROMPT_TEMPLATE.replace("{task_name}", task_name)
}

/// Attempt budget and timing of the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Per-attempt HTTP timeout; the whole sequence is not bounded
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt` (0-based): base, 2*base, 4*base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Endpoint, model and credential of the chat-completion service
#[derive(Debug, Clone)]
pub struct DecomposerConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Pulls `choices[0].message.content` out of a response body
pub fn extract_reply(body: &str) -> Result<String, DecomposeError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| DecomposeError::ResponseShape(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| DecomposeError::ResponseShape("response has no choices".to_string()))
}

/// Turns one task name into a list of subtask names
#[derive(Clone)]
pub struct Decomposer {
    config: DecomposerConfig,
    transport: Arc<dyn Transport>,
}

impl Decomposer {
    pub fn new(config: DecomposerConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a decomposer that talks HTTP, honouring the per-attempt timeout
    pub fn with_http(config: DecomposerConfig) -> Result<Self, DecomposeError> {
        let transport = HttpTransport::new(config.retry.timeout)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    pub fn build_request(&self, task_name: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(build_prompt(task_name)),
            ],
            stream: false,
        }
    }

    /// Asks the service for subtasks of `task_name`.
    ///
    /// Fails fast without a credential. Transport and response-shape errors are retried
    /// up to the attempt budget, sleeping `base * 2^attempt` between attempts. The reply
    /// content itself is parsed once and never retried.
    pub async fn request_decomposition(
        &self,
        task_name: &str,
    ) -> Result<Vec<String>, DecomposeError> {
        let api_key = match self.config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(DecomposeError::MissingCredential),
        };

        let request = self.build_request(task_name);
        let policy = &self.config.retry;

        let mut last_error = None;
        for attempt in 0..policy.max_attempts {
            match self.attempt(api_key, &request).await {
                Ok(reply) => {
                    let subtasks = parse_reply(&reply);
                    info!(task = %task_name, attempt, count = subtasks.len(), "decomposition succeeded");
                    return Ok(subtasks);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(task = %task_name, attempt, error = %e, "decomposition attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt + 1 < policy.max_attempts {
                let backoff = policy.backoff(attempt);
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
        }

        Err(DecomposeError::Exhausted {
            attempts: policy.max_attempts,
            last: Box::new(last_error.unwrap_or_else(|| {
                DecomposeError::Transport("no attempt was made".to_string())
            })),
        })
    }

    async fn attempt(&self, api_key: &str, request: &ChatRequest) -> Result<String, DecomposeError> {
        let body = self
            .transport
            .send(&self.config.api_url, api_key, request)
            .await?;
        extract_reply(&body)
    }
}
