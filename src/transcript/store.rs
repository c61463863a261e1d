//! Transcript stores the search engine reads records from

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use super::InterviewRecord;
use crate::error::{InterviewIndexError, Result};

/// Source of full interview records
///
/// The engine calls `get` to materialize semantic and similar-item hits and
/// `records` to scan for exact matches.
pub trait TranscriptStore: Send + Sync {
    /// Fetch one record; `Ok(None)` when the id is unknown
    fn get(&self, id: &str) -> Result<Option<InterviewRecord>>;

    /// Every record, in the store's iteration order
    fn records(&self) -> Result<Vec<InterviewRecord>>;
}

/// One `{id}.json` file per interview in a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `record` to `{id}.json`, replacing any previous version
    pub fn put(&self, record: &InterviewRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.id).ok_or_else(|| {
            InterviewIndexError::Config(format!("Invalid interview id: {:?}", record.id))
        })?;

        std::fs::create_dir_all(&self.dir).map_err(|e| InterviewIndexError::Io {
            source: e,
            context: format!("Failed to create transcript directory: {:?}", self.dir),
        })?;

        let json = serde_json::to_vec_pretty(record).map_err(|e| InterviewIndexError::Json {
            source: e,
            context: format!("Failed to serialize interview {}", record.id),
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)
            .and_then(|_| std::fs::rename(&temp_path, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                InterviewIndexError::Io {
                    source: e,
                    context: format!("Failed to write interview file: {:?}", path),
                }
            })?;

        Ok(path)
    }

    /// Ids that would escape the directory have no path
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let invalid = id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\'])
            || id.contains('\0');
        if invalid {
            None
        } else {
            Some(self.dir.join(format!("{}.json", id)))
        }
    }

    fn read_record(path: &Path) -> Result<InterviewRecord> {
        let content = std::fs::read_to_string(path).map_err(|e| InterviewIndexError::Io {
            source: e,
            context: format!("Failed to read interview file: {:?}", path),
        })?;
        serde_json::from_str(&content).map_err(|e| InterviewIndexError::Json {
            source: e,
            context: format!("Failed to parse interview file: {:?}", path),
        })
    }
}

impl TranscriptStore for JsonDirStore {
    fn get(&self, id: &str) -> Result<Option<InterviewRecord>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        Self::read_record(&path).map(Some)
    }

    fn records(&self) -> Result<Vec<InterviewRecord>> {
        if !self.dir.exists() {
            debug!("Transcript directory {:?} does not exist", self.dir);
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| InterviewIndexError::Io {
            source: e,
            context: format!("Failed to list transcript directory: {:?}", self.dir),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable interview file: {}", e),
            }
        }

        Ok(records)
    }
}

/// Insertion-ordered in-memory store
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    records: RwLock<Vec<InterviewRecord>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = InterviewRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace in place; replacement keeps the original position
    pub fn insert(&self, record: InterviewRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn remove(&self, id: &str) -> Option<InterviewRecord> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let position = records.iter().position(|r| r.id == id)?;
        Some(records.remove(position))
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TranscriptStore for MemoryTranscriptStore {
    fn get(&self, id: &str) -> Result<Option<InterviewRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn records(&self) -> Result<Vec<InterviewRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.clone())
    }
}
