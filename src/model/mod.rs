pub mod prompt;

use std::time::Duration;

use log::{debug, error, info};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::web::models::Message;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Completion API response did not contain a message")]
    MalformedResponse,
}

impl CompletionError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(timeout)
        } else {
            CompletionError::Http(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CompletionError::Timeout(_))
    }
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct CompletionClient {
    config: CompletionConfig,
    client: Client,
    timeout: Duration,
}

impl CompletionClient {
    /// `client` is expected to carry `timeout` as its request timeout.
    pub fn new(config: CompletionConfig, client: Client, timeout: Duration) -> Self {
        info!(
            "Using completion API at {} with model {}",
            config.base_url, config.model
        );
        Self {
            config,
            client,
            timeout,
        }
    }

    pub fn max_tokens_for(&self, has_personality: bool) -> u32 {
        if has_personality {
            self.config.personality_max_tokens
        } else {
            self.config.max_tokens
        }
    }

    pub async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": max_tokens,
        });

        info!(
            "Sending {} messages to completion API with max_tokens: {}",
            messages.len(),
            max_tokens
        );
        debug!("Payload: {}", payload);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            let message = upstream_message(&body);
            error!("Completion API returned {}: {}", status, message);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let response_json: Value = serde_json::from_str(&body).map_err(|e| {
            debug!("Unparsable completion response ({}): {}", e, body);
            CompletionError::MalformedResponse
        })?;

        let content = response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or(CompletionError::MalformedResponse)?;

        info!("Response length: {} characters", content.len());
        Ok(content.to_string())
    }
}

/// OpenAI-style errors nest the text under `error.message`.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
