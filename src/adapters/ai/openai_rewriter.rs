//! OpenAI Rewriter - Implementation of TextRewriter over chat completions.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key).with_model("gpt-3.5-turbo");
//! let rewriter = OpenAIRewriter::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::ports::{RewriteError, RewriteRequest, TextRewriter};

const SYSTEM_PROMPT: &str =
    "You are a professional editor. Rewrite text so it reads as if a person wrote it.";

/// Configuration for the OpenAI rewriter.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com).
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 1000,
            timeout: Duration::from_secs(45),
        }
    }

    /// Builds the configuration from application settings, if a key is set.
    pub fn from_settings(settings: &AiConfig) -> Option<Self> {
        let key = settings.openai_api_key.as_ref()?;
        Some(Self {
            api_key: Secret::new(key.clone()),
            model: settings.model.clone(),
            base_url: settings.base_url().trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            timeout: settings.timeout(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Rewriter backed by OpenAI chat completions.
pub struct OpenAIRewriter {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIRewriter {
    pub fn new(config: OpenAIConfig) -> Result<Self, RewriteError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RewriteError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn build_request(&self, request: &RewriteRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.prompt(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: request.temperature(),
        }
    }
}

#[async_trait]
impl TextRewriter for OpenAIRewriter {
    async fn rewrite(&self, request: RewriteRequest) -> Result<String, RewriteError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&self.build_request(&request))
            .send()
            .await
            .map_err(|e| RewriteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "OpenAI completion failed");
            return Err(if status.is_client_error() && status.as_u16() != 429 {
                RewriteError::Rejected(extract_error_message(&body, status))
            } else {
                RewriteError::Unavailable(extract_error_message(&body, status))
            });
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Unavailable(format!("Invalid completion body: {}", e)))?;

        first_choice_text(completion)
    }
}

fn first_choice_text(completion: OpenAIResponse) -> Result<String, RewriteError> {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(RewriteError::EmptyResponse)
}

fn extract_error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<OpenAIErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| format!("OpenAI returned {}", status))
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: Option<String>,
}
