//! Text rewriter port.
//!
//! Wraps the language model that performs the actual humanizing. The ledger
//! only cares whether the call produced text.

use async_trait::async_trait;
use thiserror::Error;

#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, request: RewriteRequest) -> Result<String, RewriteError>;
}

/// Text to rewrite plus style controls.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub text: String,
    pub tone: String,
    /// 0..=10, mapped onto sampling temperature.
    pub creativity: u8,
}

impl RewriteRequest {
    /// Sampling temperature for this request.
    pub fn temperature(&self) -> f32 {
        f32::from(self.creativity.min(10)) / 10.0
    }

    pub fn prompt(&self) -> String {
        format!("Rewrite this in a {} tone: {}", self.tone, self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("Rewriter unavailable: {0}")]
    Unavailable(String),

    #[error("Rewriter returned no text")]
    EmptyResponse,

    #[error("Rewriter rejected request: {0}")]
    Rejected(String),
}
