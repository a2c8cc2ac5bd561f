//! Language-model completion capability.
//!
//! One trait, one HTTP implementation against an OpenAI-compatible
//! `/chat/completions` endpoint. The system instruction is injected per
//! call and never stored in the conversation log.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ticketing::conversation::Turn;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion endpoint returned {0}")]
    Status(u16),

    #[error("completion response had no content")]
    EmptyResponse,
}

/// Token/temperature budget for one call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionBudget {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionBudget {
    /// Classifier verdicts: one word, deterministic.
    pub const CLASSIFIER: Self = Self {
        max_tokens: 5,
        temperature: 0.0,
    };
    /// Persona replies and ban-reason elaborations.
    pub const REPLY: Self = Self {
        max_tokens: 1000,
        temperature: 0.7,
    };
    /// Evidence paraphrases: short by construction.
    pub const SUMMARY: Self = Self {
        max_tokens: 200,
        temperature: 0.7,
    };
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a completion for a system instruction plus role-tagged
    /// history, within the given budget.
    async fn complete(
        &self,
        system: &str,
        history: &[Turn],
        budget: CompletionBudget,
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

/// OpenAI-compatible chat completion client.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        history: &[Turn],
        budget: CompletionBudget,
    ) -> Result<String, CompletionError> {
        let mut messages = vec![WireMessage {
            role: "system",
            content: system,
        }];
        messages.extend(history.iter().map(|t| WireMessage {
            role: t.role.as_str(),
            content: &t.content,
        }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": budget.max_tokens,
            "temperature": budget.temperature,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CompletionError::Status(resp.status().as_u16()));
        }

        let parsed: WireResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}
