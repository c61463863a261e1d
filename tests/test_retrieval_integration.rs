/// Retrieval Integration Test
///
/// Semantic, exact and similar-interview queries over a small travel corpus
mod common;

use common::{fixture, fixture_with_config, interview, travel_corpus, DIMENSION};
use interview_index::config::SearchConfig;
use interview_index::embedding::MockEmbeddingProvider;
use interview_index::MatchType;
use std::collections::HashSet;
use tempfile::TempDir;

#[test]
fn test_booking_flights_scenario() {
    let temp = TempDir::new().unwrap();
    let a = interview("A", "I use it for booking flights");
    let b = interview("B", "I also book flights regularly");
    let records = vec![a.clone(), b.clone()];
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    let results = f.engine.semantic_search("booking flights", 5).unwrap();
    assert!(!results.is_empty());
    let top_text: String = results[0]
        .transcript
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert!(top_text.contains("flights"));
    assert_eq!(results[0].match_type, MatchType::Semantic);

    let similar = f.engine.find_similar(&a.id, 1).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].id, b.id);
}

#[test]
fn test_empty_query_returns_nothing() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    for k in [0, 1, 5, 100] {
        assert!(f.engine.semantic_search("", k).unwrap().is_empty());
        assert!(f.engine.semantic_search("  \t ", k).unwrap().is_empty());
    }
    // The provider is never consulted for an empty query
    assert_eq!(f.provider.query_calls(), 0);
}

#[test]
fn test_semantic_results_are_bounded_unique_and_scored() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    for (query, k) in [
        ("flights", 1),
        ("cheap hotels by the beach", 3),
        ("trip planning", 5),
        ("backpacking on a budget", 50),
    ] {
        let results = f.engine.semantic_search(query, k).unwrap();

        assert!(results.len() <= k);
        let ids: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), results.len(), "duplicate ids for {:?}", query);

        for result in &results {
            assert!(result.score > 0.0 && result.score < 1.0);
            assert!(result.distance.is_some());
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}

#[test]
fn test_semantic_search_on_empty_index() {
    let temp = TempDir::new().unwrap();
    let f = fixture(temp.path(), &[]);
    assert!(f.engine.semantic_search("flights", 5).unwrap().is_empty());
}

#[test]
fn test_semantic_search_skips_empty_store_transcripts() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    let mut blanked = records[0].clone();
    blanked.transcript.clear();
    f.store.insert(blanked);

    let results = f.engine.semantic_search("booking flights", 8).unwrap();
    assert!(results.iter().all(|r| r.id != records[0].id));
    assert!(!results.is_empty());
}

#[test]
fn test_exact_match_only_returns_containing_records() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);

    let results = f.engine.exact_match_search("TRIP", 10).unwrap();

    // Every transcript contains the interviewer's "plan a trip?" prompt
    assert_eq!(results.len(), records.len());
    for result in &results {
        let record = records.iter().find(|r| r.id == result.id).unwrap();
        assert!(record.transcript_text().to_lowercase().contains("trip"));
        assert_eq!(result.score, 1.0);
        assert!(result.distance.is_none());
    }

    let limited = f.engine.exact_match_search("trip", 3).unwrap();
    let ids: Vec<&str> = limited.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["int-01", "int-02", "int-03"]);
}

#[test]
fn test_exact_match_needs_no_index() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);

    let results = f.engine.exact_match_search("night buses", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "int-08");
    assert!(f.engine.exact_match_search("submarine", 5).unwrap().is_empty());
    assert!(f.engine.exact_match_search("", 5).unwrap().is_empty());
    assert_eq!(f.provider.query_calls(), 0);
}

#[test]
fn test_find_similar_never_returns_itself() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    for record in &records {
        for k in [1, 3, 7, 20] {
            let results = f.engine.find_similar(&record.id, k).unwrap();
            assert!(results.len() <= k);
            assert!(results.len() <= records.len() - 1);
            assert!(results.iter().all(|r| r.id != record.id));
            assert!(results.iter().all(|r| r.match_type == MatchType::Similar));
            assert!(results.iter().all(|r| r.score > 0.0 && r.score <= 0.5));
        }
    }
}

#[test]
fn test_find_similar_with_duplicate_vectors() {
    let temp = TempDir::new().unwrap();
    let records = vec![
        interview("first", "same words here"),
        interview("second", "same words here"),
    ];
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    // Identical vectors tie at distance zero; self must still be excluded
    let similar = f.engine.find_similar("second", 1).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].id, "first");
}

#[test]
fn test_find_similar_unknown_id() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    assert!(f.engine.find_similar("nope", 5).unwrap().is_empty());
}

#[test]
fn test_find_similar_falls_back_to_index_metadata() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records[..2]);
    f.engine.ingest(&records[..2]).unwrap();
    f.store.remove("int-02");

    let similar = f.engine.find_similar("int-01", 1).unwrap();
    assert_eq!(similar[0].id, "int-02");
    assert!(similar[0].transcript.is_empty());
    assert_eq!(similar[0].metadata.project_name, "Travel App");
}

#[test]
fn test_noise_threshold_drops_weak_candidates() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    let all = f.engine.semantic_search("booking flights", records.len()).unwrap();
    assert_eq!(all.len(), records.len());
    let threshold = all[1].score;
    let weakest = all[all.len() - 1].score;
    assert!(weakest < threshold);

    let kept: Vec<String> = all
        .iter()
        .filter(|r| r.score >= threshold)
        .map(|r| r.id.clone())
        .collect();
    assert!(kept.len() < all.len());

    // Reopen the same index with a raised threshold
    let strict = fixture_with_config(
        temp.path(),
        &records,
        MockEmbeddingProvider::new(DIMENSION).unwrap(),
        SearchConfig {
            min_similarity: threshold,
            ..Default::default()
        },
    );

    let results = strict
        .engine
        .semantic_search("booking flights", records.len())
        .unwrap();
    let ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, kept);
    assert!(results.iter().all(|r| r.score >= threshold));

    // Over-fetching still fills k from the candidates above the threshold
    let filled = strict
        .engine
        .semantic_search("booking flights", kept.len())
        .unwrap();
    assert_eq!(filled.len(), kept.len());
}
