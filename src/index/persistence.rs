//! On-disk image of the vector index and its metadata sidecar.
//!
//! Two files live in the data directory:
//!
//! `index.bin` (little-endian):
//! - magic: `b"IVIX"`
//! - version: u8 (1)
//! - dimension: u32
//! - count: u64
//! - ids_hash: [u8; 32] (BLAKE3 of the newline-joined id list)
//! - payload_hash: [u8; 32] (BLAKE3 of the vector payload)
//! - payload: `count * dimension` f32 values in position order
//!
//! `metadata.json`:
//! `{ interview_ids, interview_metadata, last_updated }`
//!
//! The ids hash ties the two files together, so a sidecar from one save and an
//! index from another are rejected instead of silently misaligned.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::metadata::{MetadataError, MetadataImage, MetadataStore};
use super::vector_index::{VectorIndex, VectorIndexError};
use crate::transcript::InterviewMetadata;

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";

const MAGIC: &[u8; 4] = b"IVIX";
const FORMAT_VERSION: u8 = 1;

/// magic(4) + version(1) + dimension(4) + count(8) + ids_hash(32) + payload_hash(32)
const HEADER_SIZE: usize = 81;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid index file: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Checksum mismatch: index file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Metadata file not found: {0}")]
    MissingSidecar(PathBuf),

    #[error("Metadata file is malformed: {0}")]
    Sidecar(#[from] serde_json::Error),

    #[error("Index holds {vectors} vectors but metadata lists {ids} ids")]
    CountMismatch { vectors: usize, ids: usize },

    #[error("Index and metadata files come from different saves")]
    IdListMismatch,

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Index(#[from] VectorIndexError),
}

/// How `load_or_empty` obtained its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Restored from a valid persisted image
    Restored,
    /// No image on disk yet
    Fresh,
    /// An image existed but could not be used; started empty
    Recovered,
}

/// JSON sidecar schema
#[derive(Debug, Serialize, Deserialize)]
struct PersistedMetadata {
    interview_ids: Vec<String>,
    interview_metadata: BTreeMap<String, InterviewMetadata>,
    last_updated: String,
}

/// Reads and writes the two-file image under one directory
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    dir: PathBuf,
}

impl PersistenceManager {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Check if an index file exists
    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Write both files atomically (temp file, fsync, rename each)
    pub fn save(&self, index: &VectorIndex, metadata: &MetadataStore) -> Result<(), PersistenceError> {
        if index.len() != metadata.len() {
            return Err(PersistenceError::CountMismatch {
                vectors: index.len(),
                ids: metadata.len(),
            });
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let image = metadata.to_image();
        let sidecar = PersistedMetadata {
            interview_ids: image.interview_ids,
            interview_metadata: image.interview_metadata,
            last_updated: Utc::now().to_rfc3339(),
        };
        let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)?;

        let ids_hash = hash_ids(&sidecar.interview_ids);
        let index_bytes = encode_index(index, &ids_hash)?;

        write_atomic(&self.metadata_path(), &sidecar_bytes)?;
        write_atomic(&self.index_path(), &index_bytes)?;

        info!(
            "Saved {} interviews to {}",
            metadata.len(),
            self.dir.display()
        );

        Ok(())
    }

    /// Load both files; `Ok(None)` when no index file exists yet
    pub fn load(
        &self,
        expected_dimension: usize,
    ) -> Result<Option<(VectorIndex, MetadataStore)>, PersistenceError> {
        let index_path = self.index_path();
        if !index_path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&index_path).map_err(|source| PersistenceError::Io {
            path: index_path.clone(),
            source,
        })?;
        let (index, ids_hash) = decode_index(&bytes, expected_dimension)?;

        let metadata_path = self.metadata_path();
        if !metadata_path.exists() {
            return Err(PersistenceError::MissingSidecar(metadata_path));
        }
        let sidecar_bytes = std::fs::read(&metadata_path).map_err(|source| PersistenceError::Io {
            path: metadata_path.clone(),
            source,
        })?;
        let sidecar: PersistedMetadata = serde_json::from_slice(&sidecar_bytes)?;

        if sidecar.interview_ids.len() != index.len() {
            return Err(PersistenceError::CountMismatch {
                vectors: index.len(),
                ids: sidecar.interview_ids.len(),
            });
        }
        if hash_ids(&sidecar.interview_ids) != ids_hash {
            return Err(PersistenceError::IdListMismatch);
        }

        info!(
            "Loaded {} interviews (last updated {})",
            sidecar.interview_ids.len(),
            sidecar.last_updated
        );

        let metadata = MetadataStore::from_image(MetadataImage {
            interview_ids: sidecar.interview_ids,
            interview_metadata: sidecar.interview_metadata,
        })?;

        Ok(Some((index, metadata)))
    }

    /// Load the image, or start empty if it is absent or unusable
    pub fn load_or_empty(
        &self,
        dimension: usize,
    ) -> Result<(VectorIndex, MetadataStore, LoadOutcome), VectorIndexError> {
        match self.load(dimension) {
            Ok(Some((index, metadata))) => Ok((index, metadata, LoadOutcome::Restored)),
            Ok(None) => {
                info!("No existing index at {}, starting fresh", self.dir.display());
                Ok((VectorIndex::new(dimension)?, MetadataStore::new(), LoadOutcome::Fresh))
            }
            Err(e) => {
                warn!("Failed to load vector store, creating new one: {}", e);
                Ok((
                    VectorIndex::new(dimension)?,
                    MetadataStore::new(),
                    LoadOutcome::Recovered,
                ))
            }
        }
    }
}

fn hash_ids(ids: &[String]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

fn encode_index(index: &VectorIndex, ids_hash: &[u8; 32]) -> Result<Vec<u8>, PersistenceError> {
    let dimension = u32::try_from(index.dimension()).map_err(|_| {
        PersistenceError::InvalidFormat(format!("Dimension {} too large", index.dimension()))
    })?;

    let raw = index.as_raw();
    let mut payload = Vec::with_capacity(raw.len() * 4);
    for value in raw {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    let payload_hash = blake3::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    bytes.extend_from_slice(ids_hash);
    bytes.extend_from_slice(payload_hash.as_bytes());
    bytes.extend_from_slice(&payload);

    Ok(bytes)
}

fn decode_index(
    bytes: &[u8],
    expected_dimension: usize,
) -> Result<(VectorIndex, [u8; 32]), PersistenceError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PersistenceError::InvalidFormat(format!(
            "File is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_SIZE
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(PersistenceError::InvalidFormat("Bad magic".to_string()));
    }

    let version = bytes[4];
    if version != FORMAT_VERSION {
        return Err(PersistenceError::VersionMismatch(version, FORMAT_VERSION));
    }

    let dimension = u32::from_le_bytes(read_array(&bytes[5..9])) as usize;
    if dimension != expected_dimension {
        return Err(PersistenceError::DimensionMismatch {
            expected: expected_dimension,
            got: dimension,
        });
    }

    let count = u64::from_le_bytes(read_array(&bytes[9..17])) as usize;
    let ids_hash: [u8; 32] = read_array(&bytes[17..49]);
    let payload_hash: [u8; 32] = read_array(&bytes[49..81]);

    let payload = &bytes[HEADER_SIZE..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|floats| floats.checked_mul(4))
        .ok_or_else(|| PersistenceError::InvalidFormat("Vector count overflows".to_string()))?;
    if payload.len() != expected_len {
        return Err(PersistenceError::InvalidFormat(format!(
            "Payload is {} bytes, expected {}",
            payload.len(),
            expected_len
        )));
    }

    if *blake3::hash(payload).as_bytes() != payload_hash {
        return Err(PersistenceError::ChecksumMismatch);
    }

    let data: Vec<f32> = payload
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(read_array(chunk)))
        .collect();

    Ok((VectorIndex::from_raw(dimension, data)?, ids_hash))
}

/// Copy a slice whose length the caller has already checked into an array
fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&slice[..N]);
    array
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let temp_path = path.with_extension("tmp");

    let result = write_synced(&temp_path, bytes);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&temp_path);
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    Ok(())
}
