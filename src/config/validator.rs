use crate::config::{Config, SearchConfig};
use crate::error::{InterviewIndexError, Result, ValidationError};

/// Providers the binary knows how to construct
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["openai", "fastembed", "mock"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_transcript(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(InterviewIndexError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.storage.transcripts_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.transcripts_dir",
                "Transcripts directory cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    SUPPORTED_PROVIDERS, provider
                ),
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Embedding dimension must be greater than 0",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        // Only the network provider needs credentials; their presence is checked
        // when the provider is built, not here.
        if provider == "openai" {
            if config.embedding.api_key_env.is_empty() {
                errors.push(ValidationError::new(
                    "embedding.api_key_env",
                    "API key environment variable name cannot be empty",
                ));
            }
            if !config.embedding.base_url.starts_with("http") {
                errors.push(ValidationError::new(
                    "embedding.base_url",
                    format!("Base URL must be http(s), got '{}'", config.embedding.base_url),
                ));
            }
            if config.embedding.timeout_secs == 0 {
                errors.push(ValidationError::new(
                    "embedding.timeout_secs",
                    "Timeout must be greater than 0",
                ));
            }
        }
    }

    /// Check search tuning on its own, for engines built without a full `Config`
    pub fn validate_search_config(search: &SearchConfig) -> Result<()> {
        let mut errors = Vec::new();
        Self::check_search(search, &mut errors);

        if errors.is_empty() {
            return Ok(());
        }
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(InterviewIndexError::Config(message))
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        Self::check_search(&config.search, errors);
    }

    fn check_search(search: &SearchConfig, errors: &mut Vec<ValidationError>) {
        if search.overfetch_factor == 0 {
            errors.push(ValidationError::new(
                "search.overfetch_factor",
                "Over-fetch factor must be greater than 0",
            ));
        }

        let scale = search.distance_scale;
        if !scale.is_finite() || scale <= 0.0 {
            errors.push(ValidationError::new(
                "search.distance_scale",
                format!("Distance scale must be a positive number, got {}", scale),
            ));
        }

        let threshold = search.min_similarity;
        if !(0.0..1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "search.min_similarity",
                format!(
                    "Minimum similarity must be in [0.0, 1.0), got {}",
                    threshold
                ),
            ));
        }
    }

    fn validate_transcript(config: &Config, errors: &mut Vec<ValidationError>) {
        if config
            .transcript
            .interviewer_speakers
            .iter()
            .any(|s| s.trim().is_empty())
        {
            errors.push(ValidationError::new(
                "transcript.interviewer_speakers",
                "Speaker names cannot be empty",
            ));
        }

        if config
            .transcript
            .boilerplate_markers
            .iter()
            .any(|m| m.trim().is_empty())
        {
            errors.push(ValidationError::new(
                "transcript.boilerplate_markers",
                "Empty marker would drop every line",
            ));
        }
    }
}
