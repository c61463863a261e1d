//! Search engine over ingested interviews
//!
//! Owns the vector index and its id list behind one `RwLock`. Queries share the
//! read lock; ingestion, removal and saving take the write lock, and every
//! mutation is persisted before the lock is released. Embedding requests are
//! made before the write lock is taken so readers never wait on the provider.

use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::{ConfigValidator, SearchConfig};
use crate::embedding::{embed_in_batches, EmbeddingError, EmbeddingProvider};
use crate::error::{InterviewIndexError, Result};
use crate::index::{LoadOutcome, MetadataStore, Neighbor, PersistenceManager, VectorIndex};
use crate::retrieval::{deduplicate_by_id, similarity_from_distance, MatchType, ScoredResult};
use crate::transcript::{
    InterviewMetadata, InterviewRecord, PreparedDocument, TextPreparer, TranscriptStore,
};

/// Outcome of one `ingest` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Interviews embedded and indexed
    pub added: usize,
    /// Already indexed, or repeated within the call
    pub skipped_duplicate: usize,
    /// Nothing left to embed after transcript cleaning
    pub skipped_empty: usize,
    /// Missing id
    pub skipped_invalid: usize,
}

impl IngestReport {
    pub fn skipped(&self) -> usize {
        self.skipped_duplicate + self.skipped_empty + self.skipped_invalid
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub interviews: usize,
    pub dimension: usize,
    pub model: String,
    pub data_dir: PathBuf,
}

/// Vector index and id list, always mutated together
struct IndexState {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl IndexState {
    fn empty(dimension: usize) -> Result<Self> {
        Ok(Self {
            index: VectorIndex::new(dimension)?,
            metadata: MetadataStore::new(),
        })
    }

    fn check_aligned(&self) -> Result<()> {
        if self.index.len() != self.metadata.len() {
            return Err(InterviewIndexError::Integrity(format!(
                "{} vectors but {} interview ids",
                self.index.len(),
                self.metadata.len()
            )));
        }
        Ok(())
    }

    fn id_at(&self, position: usize) -> Result<&str> {
        self.metadata.id_at(position).ok_or_else(|| {
            InterviewIndexError::Integrity(format!(
                "Position {} has no interview id ({} ids)",
                position,
                self.metadata.len()
            ))
        })
    }

    /// Resolve neighbours to ids while the caller still holds the lock
    fn resolve(&self, neighbors: Vec<Neighbor>) -> Result<Vec<(String, Neighbor)>> {
        neighbors
            .into_iter()
            .map(|n| Ok((self.id_at(n.position)?.to_string(), n)))
            .collect()
    }
}

/// An accepted record with its prepared document
struct Accepted {
    document: PreparedDocument,
    metadata: InterviewMetadata,
}

/// Semantic, exact and similar-item search over interviews
pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn TranscriptStore>,
    preparer: TextPreparer,
    persistence: PersistenceManager,
    config: SearchConfig,
    batch_size: usize,
    state: RwLock<IndexState>,
}

impl SearchEngine {
    /// Open the engine over `data_dir`, restoring a persisted index if present
    ///
    /// An unreadable image is logged and replaced by an empty index. Invalid
    /// search tuning is rejected before anything is loaded.
    pub fn open(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn TranscriptStore>,
        data_dir: PathBuf,
        config: SearchConfig,
    ) -> Result<Self> {
        ConfigValidator::validate_search_config(&config)?;

        let dimension = provider.dimension();
        let persistence = PersistenceManager::new(data_dir);
        let (index, metadata, outcome) = persistence.load_or_empty(dimension)?;

        match outcome {
            LoadOutcome::Restored => info!(
                "Restored {} interviews from {}",
                metadata.len(),
                persistence.dir().display()
            ),
            LoadOutcome::Fresh => info!("Created new index with dimension {}", dimension),
            LoadOutcome::Recovered => warn!(
                "Persisted index at {} was unusable, started empty",
                persistence.dir().display()
            ),
        }

        let state = IndexState { index, metadata };
        state.check_aligned()?;

        Ok(Self {
            batch_size: provider.max_batch_size(),
            provider,
            store,
            preparer: TextPreparer::new(&Default::default())?,
            persistence,
            config,
            state: RwLock::new(state),
        })
    }

    /// Use custom transcript cleaning rules
    pub fn with_preparer(mut self, preparer: TextPreparer) -> Self {
        self.preparer = preparer;
        self
    }

    /// Cap texts per embedding request (the provider's own limit still applies)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed and index new interviews
    ///
    /// Ids already indexed are skipped, never re-embedded. A provider failure
    /// fails the whole call before the index is touched, so retrying is safe.
    pub fn ingest(&self, records: &[InterviewRecord]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        if records.is_empty() {
            warn!("No interviews provided to ingest");
            return Ok(report);
        }

        let accepted = self.accept(records, &mut report)?;
        if accepted.is_empty() {
            info!("Nothing to ingest ({} skipped)", report.skipped());
            return Ok(report);
        }

        let texts: Vec<String> = accepted.iter().map(|a| a.document.text.clone()).collect();
        let embeddings = embed_in_batches(self.provider.as_ref(), &texts, self.batch_size)?;

        let mut state = self.write_state()?;
        let mut vectors = Vec::with_capacity(accepted.len());
        let mut recorded = Vec::with_capacity(accepted.len());

        for (item, embedding) in accepted.into_iter().zip(embeddings) {
            // A concurrent ingest may have indexed this id since `accept`
            if state.metadata.contains(&item.document.id) {
                report.skipped_duplicate += 1;
                continue;
            }
            if embedding.len() != state.index.dimension() {
                Self::rollback(&mut state.metadata, &recorded);
                return Err(EmbeddingError::DimensionMismatch {
                    expected: state.index.dimension(),
                    actual: embedding.len(),
                }
                .into());
            }

            if let Err(e) = state.metadata.record(&item.document.id, item.metadata) {
                Self::rollback(&mut state.metadata, &recorded);
                return Err(e.into());
            }
            recorded.push(item.document.id);
            vectors.push(embedding);
        }

        if let Err(e) = state.index.append_batch(&vectors) {
            Self::rollback(&mut state.metadata, &recorded);
            return Err(e.into());
        }
        state.check_aligned()?;

        report.added = recorded.len();
        if report.added > 0 {
            self.persistence.save(&state.index, &state.metadata)?;
        }

        info!(
            "Ingested {} interviews ({} duplicate, {} empty, {} invalid)",
            report.added, report.skipped_duplicate, report.skipped_empty, report.skipped_invalid
        );

        Ok(report)
    }

    /// Records `ingest` would not skip as duplicates: the first occurrence of
    /// each id that is not yet indexed
    pub fn unindexed<'a>(&self, records: &'a [InterviewRecord]) -> Result<Vec<&'a InterviewRecord>> {
        let state = self.read_state()?;
        let mut seen = HashSet::new();
        let pending = records
            .iter()
            .filter(|r| !r.id.trim().is_empty())
            .filter(|r| !state.metadata.contains(&r.id) && seen.insert(r.id.as_str()))
            .collect();
        Ok(pending)
    }

    /// Remove an interview; `Ok(false)` if it was not indexed
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut state = self.write_state()?;
        state.check_aligned()?;

        let Some(position) = state.metadata.position_of(id) else {
            debug!("Remove requested for unknown interview {}", id);
            return Ok(false);
        };

        state.index.remove(position)?;
        state.metadata.remove(id);
        state.check_aligned()?;

        self.persistence.save(&state.index, &state.metadata)?;
        info!("Removed interview {} from position {}", id, position);

        Ok(true)
    }

    /// Rank interviews by meaning
    ///
    /// The query is trimmed and lowercased before it is embedded. Returns at
    /// most `k` results, best first. Candidates missing from the transcript
    /// store, with empty transcripts, or scoring below the noise threshold are
    /// skipped.
    pub fn semantic_search(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if self.is_empty()? {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed_query(&query)?;

        let candidates = {
            let state = self.read_state()?;
            let fetch = k
                .saturating_mul(self.config.overfetch_factor.max(1))
                .min(state.index.len());
            let neighbors = state.index.search(&embedding, fetch)?;
            state.resolve(neighbors)?
        };

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(k);

        for (id, neighbor) in candidates {
            if !seen.insert(id.clone()) {
                continue;
            }

            let record = match self.store.get(&id) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!("Interview {} not in transcript store, skipping", id);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to load interview {}: {}", id, e);
                    continue;
                }
            };
            if !record.has_transcript() {
                continue;
            }

            let score = similarity_from_distance(neighbor.distance, self.config.distance_scale);
            if score < self.config.min_similarity {
                continue;
            }

            results.push(ScoredResult::from_record(
                record,
                score,
                Some(neighbor.distance),
                MatchType::Semantic,
            ));
            if results.len() == k {
                break;
            }
        }

        sort_by_score(&mut results);
        debug!("Semantic search returned {} results", results.len());

        Ok(results)
    }

    /// Case-insensitive substring search over raw transcripts
    ///
    /// Scans the transcript store directly, without embeddings. The query is
    /// matched as given, surrounding whitespace included. Matches keep store
    /// order and all score 1.0.
    pub fn exact_match_search(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = query.to_lowercase();

        let matches: Vec<ScoredResult> = self
            .store
            .records()?
            .into_iter()
            .filter(|record| record.transcript_text().to_lowercase().contains(&query))
            .map(|record| ScoredResult::from_record(record, 1.0, None, MatchType::Exact))
            .collect();

        let mut results = deduplicate_by_id(matches);
        results.truncate(k);

        Ok(results)
    }

    /// Interviews nearest to an indexed one, excluding itself
    ///
    /// Uses the stored vector; nothing is re-embedded. Unknown ids give no results.
    pub fn find_similar(&self, id: &str, k: usize) -> Result<Vec<ScoredResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = {
            let state = self.read_state()?;
            let Some(position) = state.metadata.position_of(id) else {
                return Ok(Vec::new());
            };

            let vector = state.index.reconstruct(position)?;
            let neighbors: Vec<Neighbor> = state
                .index
                .search(&vector, k + 1)?
                .into_iter()
                .filter(|n| n.position != position)
                .collect();

            state
                .resolve(neighbors)?
                .into_iter()
                .map(|(other, n)| {
                    let metadata = state.metadata.metadata(&other).cloned().unwrap_or_default();
                    (other, n, metadata)
                })
                .collect::<Vec<_>>()
        };

        let mut results = Vec::with_capacity(k);
        for (other, neighbor, metadata) in candidates {
            let score = similarity_from_distance(neighbor.distance, self.config.distance_scale);
            let result = match self.store.get(&other) {
                Ok(Some(record)) => ScoredResult::from_record(
                    record,
                    score,
                    Some(neighbor.distance),
                    MatchType::Similar,
                ),
                Ok(None) | Err(_) => ScoredResult {
                    id: other,
                    metadata,
                    transcript: Vec::new(),
                    analysis: None,
                    score,
                    distance: Some(neighbor.distance),
                    match_type: MatchType::Similar,
                },
            };
            results.push(result);
        }

        let mut results = deduplicate_by_id(results);
        results.retain(|r| r.id != id);
        results.truncate(k);

        Ok(results)
    }

    /// Re-persist the current index
    pub fn save(&self) -> Result<()> {
        let state = self.write_state()?;
        state.check_aligned()?;
        self.persistence.save(&state.index, &state.metadata)?;
        Ok(())
    }

    /// Replace the in-memory index with the persisted image
    ///
    /// Returns `false` and leaves an empty index when the image is missing
    /// or unusable.
    pub fn load(&self) -> Result<bool> {
        let mut state = self.write_state()?;
        let dimension = self.provider.dimension();

        match self.persistence.load(dimension) {
            Ok(Some((index, metadata))) => {
                *state = IndexState { index, metadata };
                Ok(true)
            }
            Ok(None) => {
                *state = IndexState::empty(dimension)?;
                Ok(false)
            }
            Err(e) => {
                warn!("Failed to load vector store, creating new one: {}", e);
                *state = IndexState::empty(dimension)?;
                Ok(false)
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_state()?.metadata.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read_state()?.metadata.contains(id))
    }

    /// Indexed ids in position order
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.read_state()?.metadata.ids().to_vec())
    }

    /// Stored metadata for an indexed interview
    pub fn metadata(&self, id: &str) -> Result<Option<InterviewMetadata>> {
        Ok(self.read_state()?.metadata.metadata(id).cloned())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.read_state()?;
        Ok(IndexStats {
            interviews: state.metadata.len(),
            dimension: state.index.dimension(),
            model: self.provider.model_name().to_string(),
            data_dir: self.persistence.dir().to_path_buf(),
        })
    }

    /// Validate and prepare records; no lock is held while preparing
    fn accept(
        &self,
        records: &[InterviewRecord],
        report: &mut IngestReport,
    ) -> Result<Vec<Accepted>> {
        let indexed: HashSet<String> = {
            let state = self.read_state()?;
            records
                .iter()
                .filter(|r| state.metadata.contains(&r.id))
                .map(|r| r.id.clone())
                .collect()
        };

        let mut in_call = HashSet::new();
        let mut accepted = Vec::new();

        for record in records {
            if record.id.trim().is_empty() {
                warn!("Skipping interview without an id");
                report.skipped_invalid += 1;
                continue;
            }
            if indexed.contains(&record.id) || !in_call.insert(record.id.as_str()) {
                debug!("Skipping duplicate interview {}", record.id);
                report.skipped_duplicate += 1;
                continue;
            }

            match self.preparer.prepare(record) {
                Some(document) => accepted.push(Accepted {
                    document,
                    metadata: record.metadata(),
                }),
                None => {
                    warn!("Skipping interview {}: no user responses after cleaning", record.id);
                    report.skipped_empty += 1;
                }
            }
        }

        Ok(accepted)
    }

    fn rollback(metadata: &mut MetadataStore, recorded: &[String]) {
        for id in recorded.iter().rev() {
            metadata.remove(id);
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state
            .read()
            .map_err(|e| InterviewIndexError::LockPoisoned(e.to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        self.state
            .write()
            .map_err(|e| InterviewIndexError::LockPoisoned(e.to_string()))
    }
}

/// Stable sort, best first; ties keep candidate order
fn sort_by_score(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
