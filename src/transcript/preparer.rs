//! Transcript cleaning and document composition
//!
//! Only what the participant said is embedded. Interviewer turns, interviewer
//! lines echoed inside participant turns, and prompt boilerplate are removed
//! before the document is built.

use regex::{Regex, RegexBuilder};

use super::{InterviewRecord, Turn};
use crate::config::TranscriptConfig;
use crate::error::{InterviewIndexError, Result};

/// Cleaned text for one interview, ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDocument {
    pub id: String,
    pub text: String,
}

/// Builds embeddable documents from interview records
#[derive(Debug, Clone)]
pub struct TextPreparer {
    /// Lowercased interviewer speaker names
    interviewer_speakers: Vec<String>,
    /// Lowercased boilerplate markers
    boilerplate_markers: Vec<String>,
    /// Matches a line that opens with `<interviewer>:`
    interviewer_line: Option<Regex>,
    /// Matches a leading `You:` prefix
    participant_prefix: Regex,
}

impl TextPreparer {
    pub fn new(config: &TranscriptConfig) -> Result<Self> {
        let interviewer_speakers: Vec<String> = config
            .interviewer_speakers
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let interviewer_line = if interviewer_speakers.is_empty() {
            None
        } else {
            let names = interviewer_speakers
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&format!(r"^(?:{})\s*:", names))?)
        };

        Ok(Self {
            interviewer_speakers,
            boilerplate_markers: config
                .boilerplate_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.trim().is_empty())
                .collect(),
            interviewer_line,
            participant_prefix: compile(r"^you\s*:\s*")?,
        })
    }

    /// Participant response lines, in transcript order
    pub fn clean_transcript(&self, transcript: &[Turn]) -> Vec<String> {
        transcript
            .iter()
            .filter(|turn| !self.is_interviewer(&turn.speaker))
            .flat_map(|turn| turn.text.lines())
            .filter_map(|line| self.clean_line(line))
            .collect()
    }

    /// Compose the document embedded for `record`
    ///
    /// Returns `None` when nothing the participant said survives cleaning.
    pub fn prepare(&self, record: &InterviewRecord) -> Option<PreparedDocument> {
        let responses = self.clean_transcript(&record.transcript);
        if responses.is_empty() {
            return None;
        }

        let analysis = record.analysis.as_deref().unwrap_or("").trim();
        let text = format!(
            "Project: {}\nType: {}\n\nUser Responses:\n{}\n\nAnalysis:\n{}",
            record.project_name,
            record.interview_type,
            responses.join("\n"),
            analysis
        );

        Some(PreparedDocument {
            id: record.id.clone(),
            text,
        })
    }

    fn is_interviewer(&self, speaker: &str) -> bool {
        let speaker = speaker.trim().to_lowercase();
        self.interviewer_speakers.iter().any(|s| *s == speaker)
    }

    fn clean_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(re) = &self.interviewer_line {
            if re.is_match(line) {
                return None;
            }
        }

        let lowered = line.to_lowercase();
        if self
            .boilerplate_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
        {
            return None;
        }

        let response = self.participant_prefix.replace(line, "");
        let response = response.trim();
        if response.is_empty() {
            None
        } else {
            Some(response.to_string())
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            InterviewIndexError::Config(format!("Invalid transcript pattern '{}': {}", pattern, e))
        })
}
