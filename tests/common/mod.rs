//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use interview_index::config::SearchConfig;
use interview_index::embedding::MockEmbeddingProvider;
use interview_index::transcript::MemoryTranscriptStore;
use interview_index::{InterviewRecord, SearchEngine, Turn};

pub const DIMENSION: usize = 64;

/// Interview with one interviewer prompt and one participant answer
pub fn interview(id: &str, answer: &str) -> InterviewRecord {
    InterviewRecord {
        id: id.to_string(),
        transcript: vec![
            Turn::new("Daria", "How do you usually plan a trip?"),
            Turn::new("User", answer),
        ],
        analysis: Some(format!("Notes for {}", id)),
        project_name: "Travel App".to_string(),
        interview_type: "Discovery".to_string(),
        date: "2024-02-10".to_string(),
    }
}

/// Interview whose transcript is only interviewer lines
pub fn interviewer_only(id: &str) -> InterviewRecord {
    InterviewRecord {
        id: id.to_string(),
        transcript: vec![
            Turn::new("Daria", "Hello, can you hear me?"),
            Turn::new("Daria", "Previous response: none"),
        ],
        analysis: None,
        project_name: "Travel App".to_string(),
        interview_type: "Discovery".to_string(),
        date: "2024-02-11".to_string(),
    }
}

pub fn travel_corpus() -> Vec<InterviewRecord> {
    vec![
        interview("int-01", "I use it for booking flights"),
        interview("int-02", "I also book flights regularly"),
        interview("int-03", "Hotels near the beach are what I search for"),
        interview("int-04", "Train tickets across Europe, mostly in summer"),
        interview("int-05", "I compare car rental prices before every trip"),
        interview("int-06", "Loyalty points decide which airline I fly"),
        interview("int-07", "My family plans road trips with a shared map"),
        interview("int-08", "Budget hostels and night buses for backpacking"),
    ]
}

pub struct Fixture {
    pub provider: Arc<MockEmbeddingProvider>,
    pub store: Arc<MemoryTranscriptStore>,
    pub engine: SearchEngine,
}

/// Engine over `dir` with a mock provider and an in-memory store holding `records`
pub fn fixture(dir: &Path, records: &[InterviewRecord]) -> Fixture {
    fixture_with_provider(
        dir,
        records,
        MockEmbeddingProvider::new(DIMENSION).unwrap(),
    )
}

pub fn fixture_with_provider(
    dir: &Path,
    records: &[InterviewRecord],
    provider: MockEmbeddingProvider,
) -> Fixture {
    fixture_with_config(dir, records, provider, SearchConfig::default())
}

pub fn fixture_with_config(
    dir: &Path,
    records: &[InterviewRecord],
    provider: MockEmbeddingProvider,
    config: SearchConfig,
) -> Fixture {
    let provider = Arc::new(provider);
    let store = Arc::new(MemoryTranscriptStore::with_records(records.iter().cloned()));
    let engine = SearchEngine::open(
        provider.clone(),
        store.clone(),
        dir.to_path_buf(),
        config,
    )
    .unwrap();

    Fixture {
        provider,
        store,
        engine,
    }
}
