//! HTTP completion client for OpenAI-compatible and Ollama endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::CompletionClient;
use super::CompletionError;
use super::CompletionProvider;
use crate::config::LlmConfig;
use crate::models::Turn;

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn wire_messages(messages: &[Turn]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

/// Client for chat completions against a configured provider
#[derive(Clone)]
pub struct LlmClient {
    provider: CompletionProvider,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    gateway_referer: Option<String>,
    gateway_title: Option<String>,
    timeout_secs: u64,
    client: Client,
}

impl LlmClient {
    /// Create a new completion client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        Ok(Self {
            provider: config.provider,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            api_key: config.llm_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.temperature,
            gateway_referer: config.gateway_referer.clone(),
            gateway_title: config.gateway_title.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> CompletionProvider {
        self.provider
    }

    fn transport_error(&self, e: &reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout_secs)
        } else {
            CompletionError::Network(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CompletionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Completion endpoint returned {status}: {body}");

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::PAYMENT_REQUIRED {
            Err(CompletionError::Quota(body))
        } else {
            Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Chat completion using the OpenAI protocol
    async fn complete_openai(&self, messages: &[Turn]) -> Result<String, CompletionError> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<WireMessage<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            #[serde(default)]
            content: Option<String>,
        }

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} ({} messages)", url, messages.len());

        let request = ChatRequest {
            model: &self.model,
            messages: wire_messages(messages),
            temperature: self.temperature,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(referer) = &self.gateway_referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.gateway_title {
            builder = builder.header("X-Title", title);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let response = Self::check_status(response).await?;

        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::Malformed(format!("Failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Malformed("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        non_empty(content)
    }

    /// Chat completion using Ollama's native API
    async fn complete_ollama(&self, messages: &[Turn]) -> Result<String, CompletionError> {
        #[derive(Serialize)]
        struct OllamaOptions {
            temperature: f32,
        }

        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            messages: Vec<WireMessage<'a>>,
            stream: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            options: Option<OllamaOptions>,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            message: OllamaMessage,
        }

        #[derive(Deserialize)]
        struct OllamaMessage {
            content: String,
        }

        let url = format!("{}/api/chat", self.endpoint);
        debug!("Calling Ollama chat API: {} ({} messages)", url, messages.len());

        let request = OllamaRequest {
            model: &self.model,
            messages: wire_messages(messages),
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let response = Self::check_status(response).await?;

        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        let parsed: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::Malformed(format!("Failed to parse response: {e}")))?;

        non_empty(parsed.message.content)
    }
}

fn non_empty(content: String) -> Result<String, CompletionError> {
    if content.trim().is_empty() {
        Err(CompletionError::Empty)
    } else {
        Ok(content)
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, messages: &[Turn]) -> Result<String, CompletionError> {
        match self.provider {
            CompletionProvider::OpenAi => self.complete_openai(messages).await,
            CompletionProvider::Ollama => self.complete_ollama(messages).await,
        }
    }
}
