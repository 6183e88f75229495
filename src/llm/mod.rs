//! Language-model completion
//!
//! The orchestrator only sees the [`CompletionClient`] trait. [`LlmClient`] is the
//! production adapter and speaks either the OpenAI chat-completions protocol (the
//! provider API itself or any API-compatible gateway) or Ollama's chat endpoint.

pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub use client::LlmClient;

use crate::models::Turn;

/// Wire protocol spoken by the completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    /// `POST {endpoint}/chat/completions` with bearer auth
    #[default]
    #[serde(alias = "gateway")]
    OpenAi,
    /// `POST {endpoint}/api/chat`
    Ollama,
}

/// Why a completion call produced no usable reply
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("quota or rate limit exceeded: {0}")]
    Quota(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("model returned an empty reply")]
    Empty,

    #[error("client configuration error: {0}")]
    Config(String),
}

/// Black-box text completion over an ordered list of role-tagged messages
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[Turn]) -> Result<String, CompletionError>;
}
