//! Completion provider trait: the opaque `complete(prompt) -> text` capability.

use async_trait::async_trait;

use crate::error::Result;

/// A generative model that turns a prompt into text.
///
/// Failures, including the backend's own timeout, must surface as
/// [`RagError::CompletionError`](crate::RagError::CompletionError).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
