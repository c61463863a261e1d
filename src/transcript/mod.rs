//! Interview records owned by the transcript store
//!
//! The index never owns transcripts. It reads a record once at ingestion to
//! build the embedded document, then re-reads it from a `TranscriptStore` at
//! query time to materialize full results.

use serde::{Deserialize, Serialize};

mod preparer;
mod store;

pub use preparer::{PreparedDocument, TextPreparer};
pub use store::{JsonDirStore, MemoryTranscriptStore, TranscriptStore};

/// One utterance in an interview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
}

impl Turn {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// A complete interview: transcript, optional analysis, and project context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: String,
    #[serde(default)]
    pub transcript: Vec<Turn>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub interview_type: String,
    #[serde(default)]
    pub date: String,
}

/// Lightweight per-interview metadata kept alongside the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewMetadata {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub interview_type: String,
    #[serde(default)]
    pub date: String,
}

impl InterviewRecord {
    pub fn metadata(&self) -> InterviewMetadata {
        InterviewMetadata {
            project_name: self.project_name.clone(),
            interview_type: self.interview_type.clone(),
            date: self.date.clone(),
        }
    }

    /// Raw transcript as `speaker: text` turns joined by single spaces
    pub fn transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript.iter().any(|turn| !turn.text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_text() {
        let record = InterviewRecord {
            id: "int-1".to_string(),
            transcript: vec![
                Turn::new("Daria", "How do you travel?"),
                Turn::new("User", "Mostly by plane."),
            ],
            ..Default::default()
        };

        assert_eq!(
            record.transcript_text(),
            "Daria: How do you travel? User: Mostly by plane."
        );
        assert!(record.has_transcript());
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record: InterviewRecord = serde_json::from_str(
            r#"{"id": "int-2", "transcript": [{"text": "hello"}], "project_name": "Travel"}"#,
        )
        .unwrap();

        assert_eq!(record.transcript[0].speaker, "");
        assert!(record.analysis.is_none());
        assert_eq!(record.metadata().project_name, "Travel");
        assert_eq!(record.metadata().date, "");
    }

    #[test]
    fn test_empty_transcript() {
        let record = InterviewRecord {
            id: "int-3".to_string(),
            transcript: vec![Turn::new("User", "   ")],
            ..Default::default()
        };
        assert!(!record.has_transcript());
    }
}
