//! Embedding generation
//!
//! - `EmbeddingProvider` trait: the only seam the index depends on
//! - `OpenAiProvider`: OpenAI-compatible HTTP endpoint (default, 1536-dim)
//! - `FastEmbedProvider`: local model for offline operation
//! - `MockEmbeddingProvider`: deterministic bag-of-words vectors for tests
//! - `embed_in_batches`: sub-batching bounded by provider limits
mod batch;
mod mock;
mod openai;
mod provider;

pub use batch::embed_in_batches;
pub use mock::MockEmbeddingProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, DEFAULT_MAX_BATCH_SIZE};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Build the provider named by `config.provider`.
///
/// Missing credentials or a zero dimension fail here, at construction.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    if config.dimension == 0 {
        return Err(EmbeddingError::InitializationError(
            "Embedding dimension must be greater than 0".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(OpenAiConfig::from_config(config)?)?),
        "fastembed" => {
            let provider = FastEmbedProvider::new(&config.model)?;
            if provider.dimension() != config.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: config.dimension,
                    actual: provider.dimension(),
                });
            }
            Arc::new(provider)
        }
        "mock" => Arc::new(
            MockEmbeddingProvider::new(config.dimension)?
                .with_max_batch_size(config.batch_size),
        ),
        other => {
            return Err(EmbeddingError::InitializationError(format!(
                "Unknown embedding provider: {}",
                other
            )));
        }
    };

    Ok(provider)
}
