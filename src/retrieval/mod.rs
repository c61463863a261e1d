//! Query modes over indexed interviews
//!
//! - Semantic: embed the query, over-fetch nearest vectors, filter and rank
//! - Exact: case-insensitive substring scan of raw transcripts
//! - Similar: nearest neighbours of an already indexed interview
//!
//! All modes return `ScoredResult`s on the same similarity scale.

mod deduplication;
mod engine;
mod result;
mod scoring;

pub use deduplication::deduplicate_by_id;
pub use engine::{IndexStats, IngestReport, SearchEngine};
pub use result::{MatchType, ScoredResult};
pub use scoring::similarity_from_distance;
