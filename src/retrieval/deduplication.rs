//! Result deduplication by interview id

use crate::retrieval::ScoredResult;
use std::collections::HashSet;

/// Deduplicate results by interview id, keeping the first occurrence
///
/// Input order is preserved, so a best-first list stays best-first.
pub fn deduplicate_by_id(results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    let mut seen: HashSet<String> = HashSet::new();

    results
        .into_iter()
        .filter(|result| seen.insert(result.id.clone()))
        .collect()
}
