//! Mock Text Rewriter for testing.
//!
//! Returns queued results in order, then falls back to a deterministic
//! rewrite of the input. Records every request for verification.
//!
//! # Example
//!
//! ```ignore
//! let rewriter = MockRewriter::new()
//!     .with_error(RewriteError::Unavailable("down".into()));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{RewriteError, RewriteRequest, TextRewriter};

#[derive(Debug, Clone, Default)]
pub struct MockRewriter {
    /// Pre-configured results (consumed in order).
    queued: Arc<Mutex<VecDeque<Result<String, RewriteError>>>>,
    calls: Arc<Mutex<Vec<RewriteRequest>>>,
}

impl MockRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful rewrite.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: RewriteError) -> Self {
        self.push(Err(error));
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<RewriteRequest> {
        lock(&self.calls).clone()
    }

    fn push(&self, result: Result<String, RewriteError>) {
        lock(&self.queued).push_back(result);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TextRewriter for MockRewriter {
    async fn rewrite(&self, request: RewriteRequest) -> Result<String, RewriteError> {
        let fallback = format!("[{}] {}", request.tone, request.text);
        lock(&self.calls).push(request);
        lock(&self.queued).pop_front().unwrap_or(Ok(fallback))
    }
}

/// Rewriter used when no language model key is configured.
///
/// Every call fails, so a humanize request is refunded and reported as an
/// upstream failure.
#[derive(Debug, Clone, Default)]
pub struct DisabledRewriter;

#[async_trait]
impl TextRewriter for DisabledRewriter {
    async fn rewrite(&self, _request: RewriteRequest) -> Result<String, RewriteError> {
        Err(RewriteError::Unavailable(
            "no language model configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RewriteRequest {
        RewriteRequest {
            text: "hello".to_string(),
            tone: "casual".to_string(),
            creativity: 5,
        }
    }

    #[tokio::test]
    async fn queued_results_come_first() {
        let rewriter = MockRewriter::new()
            .with_error(RewriteError::EmptyResponse)
            .with_response("hey");

        assert_eq!(rewriter.rewrite(request()).await, Err(RewriteError::EmptyResponse));
        assert_eq!(rewriter.rewrite(request()).await.unwrap(), "hey");
        assert_eq!(rewriter.rewrite(request()).await.unwrap(), "[casual] hello");
        assert_eq!(rewriter.calls().len(), 3);
    }

    #[tokio::test]
    async fn disabled_rewriter_always_fails() {
        let result = DisabledRewriter.rewrite(request()).await;
        assert!(matches!(result, Err(RewriteError::Unavailable(_))));
    }
}
