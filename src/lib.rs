//! Interview Index - Semantic retrieval over research interview transcripts
//!
//! Turns interview transcripts into vectors, keeps a flat L2 index in lock-step
//! with an ordered id list, persists both to disk, and answers semantic,
//! exact-text and similar-interview queries.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieval;
pub mod transcript;

pub use error::{InterviewIndexError, Result};
pub use retrieval::{IngestReport, MatchType, ScoredResult, SearchEngine};
pub use transcript::{InterviewRecord, Turn};
