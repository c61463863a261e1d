//! Deterministic embedding provider for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::provider::{EmbeddingError, EmbeddingProvider, DEFAULT_MAX_BATCH_SIZE};

/// Mock provider that embeds text as a hashed bag of words.
///
/// Texts sharing (lightly stemmed) words land close together under L2 distance,
/// which is enough to exercise ranking without a model or network access.
pub struct MockEmbeddingProvider {
    dimension: usize,
    max_batch_size: usize,
    /// 1-based `embed_documents` call that fails, if any
    fail_on_call: Option<usize>,
    document_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            fail_on_call: None,
            document_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        })
    }

    /// Cap the number of texts accepted per `embed_documents` call.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Make the `call`-th `embed_documents` request (1-based) fail.
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of `embed_documents` requests served so far
    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed_query` requests served so far
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let bucket = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as usize
                % self.dimension;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

/// Lowercased alphanumeric words with common English suffixes stripped.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| stem(&w.to_lowercase()))
        .collect()
}

fn stem(word: &str) -> String {
    for suffix in ["ing", "ed", "s"] {
        if let Some(root) = word.strip_suffix(suffix) {
            if root.len() >= 3 {
                return root.to_string();
            }
        }
    }
    word.to_string()
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.document_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_on_call == Some(call) {
            return Err(EmbeddingError::GenerationError(format!(
                "Simulated failure on call {}",
                call
            )));
        }

        if texts.len() > self.max_batch_size {
            return Err(EmbeddingError::InvalidInput(format!(
                "Batch of {} exceeds provider limit {}",
                texts.len(),
                self.max_batch_size
            )));
        }

        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-bag-of-words"
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }

    #[test]
    fn test_deterministic() {
        let provider = MockEmbeddingProvider::new(64).unwrap();
        let a = provider.embed_query("booking flights").unwrap();
        let b = provider.embed_query("booking flights").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_stemming_brings_variants_together() {
        let provider = MockEmbeddingProvider::new(128).unwrap();
        let query = provider.embed_query("booking flights").unwrap();
        let related = provider.embed_query("I book flights").unwrap();
        let unrelated = provider.embed_query("the dashboard colours are ugly").unwrap();

        assert!(l2(&query, &related) < l2(&query, &unrelated));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(MockEmbeddingProvider::new(0).is_err());
    }

    #[test]
    fn test_failure_injection() {
        let provider = MockEmbeddingProvider::new(8)
            .unwrap()
            .with_failure_on_call(2);
        let texts = vec!["one".to_string()];

        assert!(provider.embed_documents(&texts).is_ok());
        assert!(provider.embed_documents(&texts).is_err());
        assert!(provider.embed_documents(&texts).is_ok());
        assert_eq!(provider.document_calls(), 3);
    }

    #[test]
    fn test_batch_limit() {
        let provider = MockEmbeddingProvider::new(8)
            .unwrap()
            .with_max_batch_size(2);
        let texts: Vec<String> = (0..3).map(|i| format!("text {}", i)).collect();
        assert!(provider.embed_documents(&texts).is_err());
    }
}
