//! Scored interview results returned by every query mode

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transcript::{InterviewMetadata, InterviewRecord, Turn};

/// Query mode that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Semantic,
    Exact,
    Similar,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Semantic => write!(f, "semantic"),
            MatchType::Exact => write!(f, "exact"),
            MatchType::Similar => write!(f, "similar"),
        }
    }
}

/// An interview with its relevance score
///
/// `score` is on one scale for every mode: similarity in (0, 1], higher is
/// better. Exact matches score 1.0. Vector modes also carry the raw L2
/// `distance` the score was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Interview id
    pub id: String,

    pub metadata: InterviewMetadata,

    /// Full transcript as held by the transcript store
    pub transcript: Vec<Turn>,

    pub analysis: Option<String>,

    /// Similarity (0.0 to 1.0, higher is better)
    pub score: f32,

    /// Raw Euclidean distance to the query vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,

    pub match_type: MatchType,
}

impl ScoredResult {
    /// Build a result from a transcript-store record
    pub fn from_record(
        record: InterviewRecord,
        score: f32,
        distance: Option<f32>,
        match_type: MatchType,
    ) -> Self {
        let metadata = record.metadata();
        Self {
            id: record.id,
            metadata,
            transcript: record.transcript,
            analysis: record.analysis,
            score,
            distance,
            match_type,
        }
    }

    /// First `max_chars` characters of the rendered transcript
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self
            .transcript
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join(" ");

        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text,
        }
    }
}
