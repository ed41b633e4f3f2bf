// SPDX-License-Identifier: MIT

//! AI completion collaborator.
//!
//! Failures are categorized into a small fixed set (timeout, network, auth,
//! empty response, other API error) and always surfaced to the user as a
//! visible assistant-role message; the chat store never drops them silently.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::{ChatMessage, Role};

/// Categorized AI collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI request timed out")]
    Timeout,

    #[error("Could not reach the AI endpoint")]
    Network,

    #[error("AI endpoint rejected the request credentials")]
    Auth,

    #[error("AI endpoint returned an empty response")]
    EmptyResponse,

    #[error("AI endpoint error: {0}")]
    Api(String),
}

impl AiError {
    /// Message appended to the transcript when a completion fails.
    pub fn user_message(&self) -> String {
        match self {
            AiError::Timeout => {
                "Sorry, that request timed out. Please try again in a moment.".to_string()
            }
            AiError::Network => {
                "I couldn't reach the assistant service. Check your connection and try again."
                    .to_string()
            }
            AiError::Auth => {
                "The assistant service rejected this session. Try signing out and back in."
                    .to_string()
            }
            AiError::EmptyResponse => {
                "I didn't get a response that time. Please try asking again.".to_string()
            }
            AiError::Api(_) => {
                "Something went wrong talking to the assistant. Please try again.".to_string()
            }
        }
    }
}

/// The AI completion collaborator.
pub trait AiClient: Send + Sync {
    /// Complete the conversation, returning the assistant's reply text.
    fn complete(
        &self,
        history: &[ChatMessage],
    ) -> impl Future<Output = Result<String, AiError>> + Send;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

/// HTTP-backed [`AiClient`].
pub struct HttpAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAiClient {
    pub fn new(config: &Config) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(config.ai_timeout)
            .build()
            .map_err(|e| AiError::Api(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.ai_endpoint.clone(),
            api_key: config.ai_api_key.clone(),
        })
    }
}

impl AiClient for HttpAiClient {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, AiError> {
        let request = CompletionRequest {
            messages: history
                .iter()
                .map(|m| WireMessage {
                    role: match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: &m.content,
                })
                .collect(),
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout
            } else {
                AiError::Network
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AiError::Auth);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("status {status}: {body}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Api(format!("unreadable response: {e}")))?;

        if completion.text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(completion.text)
    }
}
