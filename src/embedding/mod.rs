//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote implementation
//! that calls an OpenAI-compatible `/embeddings` endpoint (1536
//! dimensions). The provider is created via [`create_provider`] from
//! configuration. The generator is an external collaborator: its failures
//! surface as [`EmbeddingError`] and must never take down task creation.

pub mod remote;

use thiserror::Error;

/// Number of dimensions in the embedding vectors (text-embedding-ada-002).
pub const EMBEDDING_DIM: usize = 1536;

/// Failure modes of embedding generation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Empty or whitespace-only input, rejected before the external call.
    #[error("input text must be non-empty")]
    MalformedInput,
    /// The external generator failed or returned an unusable vector.
    #[error("embedding unavailable: {0}")]
    Unavailable(String),
}

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`EMBEDDING_DIM`] dimensions.
/// All methods are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"remote"` is supported (OpenAI-compatible HTTP API).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => {
            let provider = remote::RemoteEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote"),
    }
}
