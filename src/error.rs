use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::{MetadataError, PersistenceError, VectorIndexError};

/// Main error type for the interview index
#[derive(Error, Debug)]
pub enum InterviewIndexError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Embedding provider failures
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index failures
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] VectorIndexError),

    /// Id list rejected an id
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Persisted image could not be written or read
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Position/id correspondence broken
    #[error("Index integrity violated: {0}")]
    Integrity(String),

    /// A panicking writer left the shared state poisoned
    #[error("Index lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for interview index operations
pub type Result<T> = std::result::Result<T, InterviewIndexError>;
