/// Sub-batched embedding of prepared documents
use super::provider::{check_dimension, EmbeddingError, EmbeddingProvider};
use tracing::{debug, info};

/// Embed `texts` in order, splitting into requests of at most `batch_size`
/// (further capped by the provider's own limit).
///
/// The first failing request aborts the whole call; nothing is returned for the
/// batches that did succeed, so callers never index a partial result.
pub fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let start = std::time::Instant::now();
    let chunk_size = batch_size.min(provider.max_batch_size()).max(1);
    let dimension = provider.dimension();
    let mut embeddings = Vec::with_capacity(texts.len());

    for (batch_number, chunk) in texts.chunks(chunk_size).enumerate() {
        let batch = provider.embed_documents(chunk)?;

        if batch.len() != chunk.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunk.len(),
                actual: batch.len(),
            });
        }

        for embedding in &batch {
            check_dimension(dimension, embedding)?;
        }

        debug!("Embedded batch {} ({} texts)", batch_number + 1, chunk.len());
        embeddings.extend(batch);
    }

    info!(
        "Embedded {} documents in {}ms",
        embeddings.len(),
        start.elapsed().as_millis()
    );

    Ok(embeddings)
}
