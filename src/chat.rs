use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

pub const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER_ID: &str = "123";
pub const GREETING_PROMPT: &str = "Hello, I want to start chatting!";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    RequestFailed(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// Client for the therapist chat endpoint.
pub struct ChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_CHAT_URL
        } else {
            base_url
        };

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Sends one prompt and returns the reply text verbatim.
    #[instrument(skip(self, prompt))]
    pub async fn send(&self, user_id: &str, prompt: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest { user_id, prompt })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "chat endpoint unreachable");
                ChatError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat endpoint returned an error");
            return Err(ChatError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::RequestFailed(format!("failed to parse response: {e}")))?;
        Ok(reply.response)
    }
}
