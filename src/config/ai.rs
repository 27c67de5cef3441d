//! Language model configuration for the rewrite endpoint

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Rewriter (OpenAI chat completions) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Chat model used for rewriting
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token cap per rewrite
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API base URL, public OpenAI endpoint when unset
    pub api_base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(OPENAI_BASE_URL)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_openai() {
            return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout() -> u64 {
    45
}
