//! Configuration management for the interview index
//!
//! Loads a TOML file, applies `INTERVIEW_INDEX_SECTION__KEY` environment overrides,
//! and validates the result before any component is constructed.

use crate::error::{InterviewIndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "INTERVIEW_INDEX_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `index.bin` and `metadata.json`
    pub data_dir: PathBuf,
    /// Directory of `{id}.json` interview records
    pub transcripts_dir: PathBuf,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai", "fastembed" or "mock"
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 100,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Query-time tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidates fetched per requested result before filtering
    pub overfetch_factor: usize,
    /// Divisor applied to L2 distance before the sigmoid
    pub distance_scale: f32,
    /// Semantic hits scoring below this are dropped as noise
    pub min_similarity: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            overfetch_factor: 20,
            distance_scale: 15.0,
            min_similarity: 0.05,
        }
    }
}

/// Transcript cleaning rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Speakers whose turns are never embedded (case-insensitive)
    pub interviewer_speakers: Vec<String>,
    /// Lines containing any of these (case-insensitive) are dropped
    pub boilerplate_markers: Vec<String>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            interviewer_speakers: ["Daria", "Interviewer", "Assistant", "System"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            boilerplate_markers: [
                "previous response:",
                "continue the interview",
                "role:",
                "objective:",
                "instructions:",
                "project:",
                "type:",
                "date:",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InterviewIndexError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| InterviewIndexError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;

        config.resolve()
    }

    /// Load `path`, or fall back to defaults when it does not exist
    ///
    /// Env overrides and validation apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'interview-index config init' to create one."
        );
        Self::default().resolve()
    }

    fn resolve(mut self) -> Result<Self> {
        self.apply_env_overrides();
        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| InterviewIndexError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: INTERVIEW_INDEX_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "STORAGE__TRANSCRIPTS_DIR" => {
                self.storage.transcripts_dir = PathBuf::from(value);
            }
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "EMBEDDING__DIMENSION" => {
                self.embedding.dimension = parse_env(path, value)?;
            }
            "EMBEDDING__BATCH_SIZE" => {
                self.embedding.batch_size = parse_env(path, value)?;
            }
            "EMBEDDING__BASE_URL" => {
                self.embedding.base_url = value.to_string();
            }
            "SEARCH__MIN_SIMILARITY" => {
                self.search.min_similarity = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            InterviewIndexError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("interview-index").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            InterviewIndexError::Config("Cannot determine home directory".to_string())
        })?;

        Ok(home_dir.join(".interview-index"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| InterviewIndexError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.interview-index");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: data_dir.join("vector_store"),
                transcripts_dir: data_dir.join("interviews"),
            },
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}
