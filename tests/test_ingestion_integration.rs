/// Ingestion & Removal Integration Test
///
/// Checks that the id list and the vector index stay aligned through ingest,
/// duplicate handling, removal and provider failures
mod common;

use common::{fixture, fixture_with_provider, interview, interviewer_only, travel_corpus, DIMENSION};
use interview_index::config::TranscriptConfig;
use interview_index::embedding::{EmbeddingProvider, MockEmbeddingProvider};
use interview_index::index::PersistenceManager;
use interview_index::transcript::TextPreparer;
use interview_index::InterviewRecord;
use tempfile::TempDir;

/// Every persisted vector must be the embedding of the document for the id at its position
fn assert_aligned(dir: &std::path::Path, records: &[InterviewRecord]) {
    let (index, metadata) = PersistenceManager::new(dir.to_path_buf())
        .load(DIMENSION)
        .unwrap()
        .unwrap();
    assert_eq!(index.len(), metadata.len());

    let preparer = TextPreparer::new(&TranscriptConfig::default()).unwrap();
    let provider = MockEmbeddingProvider::new(DIMENSION).unwrap();

    for (position, id) in metadata.ids().iter().enumerate() {
        let record = records.iter().find(|r| &r.id == id).unwrap();
        let document = preparer.prepare(record).unwrap();
        let expected = provider.embed_query(&document.text).unwrap();
        assert_eq!(index.reconstruct(position).unwrap(), expected, "misaligned at {}", id);
    }
}

#[test]
fn test_ingest_keeps_ids_and_vectors_aligned() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);

    let report = f.engine.ingest(&records).unwrap();

    assert_eq!(report.added, records.len());
    assert_eq!(f.engine.len().unwrap(), records.len());
    assert_aligned(temp.path(), &records);
}

#[test]
fn test_duplicate_ingest_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);

    f.engine.ingest(&records).unwrap();
    let ids_before = f.engine.ids().unwrap();
    let calls_before = f.provider.document_calls();

    let report = f.engine.ingest(&records).unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.skipped_duplicate, records.len());
    assert_eq!(f.engine.ids().unwrap(), ids_before);
    // Duplicates are never re-embedded
    assert_eq!(f.provider.document_calls(), calls_before);
}

#[test]
fn test_interviewer_only_transcript_is_skipped() {
    let temp = TempDir::new().unwrap();
    let records = vec![interview("int-01", "I book flights")];
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    let report = f.engine.ingest(&[interviewer_only("int-02")]).unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.skipped_empty, 1);
    assert_eq!(f.engine.len().unwrap(), 1);
    assert!(!f.engine.contains("int-02").unwrap());
}

#[test]
fn test_record_without_id_is_skipped() {
    let temp = TempDir::new().unwrap();
    let f = fixture(temp.path(), &[]);

    let report = f.engine.ingest(&[interview("", "I book flights")]).unwrap();

    assert_eq!(report.skipped_invalid, 1);
    assert!(f.engine.is_empty().unwrap());
    assert!(!PersistenceManager::new(temp.path().to_path_buf()).exists());
}

#[test]
fn test_remove_keeps_alignment() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    assert!(f.engine.remove("int-03").unwrap());
    assert!(f.engine.remove("int-01").unwrap());
    assert!(!f.engine.remove("int-99").unwrap());

    assert_eq!(f.engine.len().unwrap(), records.len() - 2);
    assert!(!f.engine.contains("int-03").unwrap());
    assert_eq!(
        f.engine.ids().unwrap(),
        vec!["int-02", "int-04", "int-05", "int-06", "int-07", "int-08"]
    );
    assert_aligned(temp.path(), &records);
}

#[test]
fn test_removed_id_can_be_ingested_again() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let f = fixture(temp.path(), &records);
    f.engine.ingest(&records).unwrap();

    f.engine.remove("int-02").unwrap();
    let report = f.engine.ingest(&records[1..2]).unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(f.engine.ids().unwrap().last().unwrap(), "int-02");
    assert_aligned(temp.path(), &records);
}

#[test]
fn test_provider_failure_leaves_index_untouched() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let provider = MockEmbeddingProvider::new(DIMENSION)
        .unwrap()
        .with_max_batch_size(3)
        .with_failure_on_call(2);
    let f = fixture_with_provider(temp.path(), &records, provider);

    assert!(f.engine.ingest(&records).is_err());
    assert!(f.engine.is_empty().unwrap());
    assert!(!PersistenceManager::new(temp.path().to_path_buf()).exists());

    // Retrying is safe once the provider recovers
    let report = f.engine.ingest(&records).unwrap();
    assert_eq!(report.added, records.len());
    assert_aligned(temp.path(), &records);
}

#[test]
fn test_sub_batches_respect_provider_limit() {
    let temp = TempDir::new().unwrap();
    let records = travel_corpus();
    let provider = MockEmbeddingProvider::new(DIMENSION)
        .unwrap()
        .with_max_batch_size(3);
    let f = fixture_with_provider(temp.path(), &records, provider);

    f.engine.ingest(&records).unwrap();

    // 8 documents in batches of at most 3
    assert_eq!(f.provider.document_calls(), 3);
}
