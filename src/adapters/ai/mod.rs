//! Text Rewriter Adapters.
//!
//! Implementations of the TextRewriter port.
//!
//! ## Available Adapters
//!
//! - `OpenAIRewriter` - OpenAI chat completions
//! - `MockRewriter` - Configurable mock for testing
//! - `DisabledRewriter` - Fails every call; used when no API key is set

mod mock_rewriter;
mod openai_rewriter;

pub use mock_rewriter::{DisabledRewriter, MockRewriter};
pub use openai_rewriter::{OpenAIConfig, OpenAIRewriter};
