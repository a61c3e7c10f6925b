//! Offline providers for running without any model server.
//!
//! [`HashEmbeddingProvider`] produces deterministic bag-of-words vectors by hashing each word
//! into a bucket, so identical text always maps to the same point and texts sharing words land
//! close together. [`StubCompletionProvider`] returns a canned reply. Together they
//! let the whole upload/ask flow run in tests and demos with zero API keys.

use async_trait::async_trait;

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default dimensionality for [`HashEmbeddingProvider`].
pub const DEFAULT_STUB_DIMENSIONS: usize = 64;

/// Reply returned by [`StubCompletionProvider::default`].
pub const DEFAULT_STUB_ANSWER: &str =
    "No language model is configured; the retrieved context is listed in the sources.";

/// Deterministic feature-hashed embeddings.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Length of every produced vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return Ok(emb);
        }

        let mut words = 0;
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = fnv1a(word.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            emb[bucket] += if hash >> 63 == 0 { 1.0 } else { -1.0 };
            words += 1;
        }
        if words == 0 {
            // Punctuation-only text still gets a stable, non-zero vector.
            let hash = fnv1a(text.as_bytes());
            emb[(hash % self.dimensions as u64) as usize] = 1.0;
        }

        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |acc, b| (acc ^ u64::from(*b)).wrapping_mul(0x100_0000_01b3))
}

/// A completer that always answers with the same text.
#[derive(Debug, Clone)]
pub struct StubCompletionProvider {
    answer: String,
}

impl StubCompletionProvider {
    /// Create a completer that replies with `answer`.
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }
}

impl Default for StubCompletionProvider {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_ANSWER)
    }
}

#[async_trait]
impl CompletionProvider for StubCompletionProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeddings_are_deterministic_and_normalized() {
        let provider = HashEmbeddingProvider::new(16);
        let a = provider.embed("same text").await.unwrap();
        let b = provider.embed("same text").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn shared_words_are_closer_than_unrelated_text() {
        let provider = HashEmbeddingProvider::default();
        let query = provider.embed("storm warning").await.unwrap();
        let related = provider.embed("A storm warning was issued").await.unwrap();
        let unrelated = provider.embed("bread flour yeast").await.unwrap();
        assert!(crate::squared_l2(&query, &related) < crate::squared_l2(&query, &unrelated));
    }

    #[tokio::test]
    async fn punctuation_only_text_is_not_a_zero_vector() {
        let v = HashEmbeddingProvider::new(8).embed("...").await.unwrap();
        assert!(v.iter().any(|x| *x != 0.0));
    }

    #[tokio::test]
    async fn stub_completion_ignores_prompt() {
        let provider = StubCompletionProvider::new("fixed");
        assert_eq!(provider.complete("anything").await.unwrap(), "fixed");
    }
}
