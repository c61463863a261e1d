use anyhow::{Context, Result};
use interview_index::cli::{Cli, Commands, ConfigAction};
use interview_index::config::Config;
use interview_index::embedding::{provider_from_config, EmbeddingProvider, MockEmbeddingProvider};
use interview_index::transcript::{JsonDirStore, TextPreparer, TranscriptStore};
use interview_index::{InterviewIndexError, InterviewRecord, ScoredResult, SearchEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ingest { files } => {
            cmd_ingest(cli.config, &files)?;
        }
        Commands::Search { query, k, json } => {
            let config = load_config(cli.config)?;
            let (engine, _) = open_engine(&config, true)?;
            let results = engine.semantic_search(&query, k)?;
            print_results(&results, json)?;
        }
        Commands::Exact { query, k, json } => {
            let config = load_config(cli.config)?;
            let (engine, _) = open_engine(&config, false)?;
            let results = engine.exact_match_search(&query, k)?;
            print_results(&results, json)?;
        }
        Commands::Similar { id, k, json } => {
            let config = load_config(cli.config)?;
            let (engine, _) = open_engine(&config, false)?;
            if !engine.contains(&id)? {
                anyhow::bail!("Interview {} is not indexed", id);
            }
            let results = engine.find_similar(&id, k)?;
            print_results(&results, json)?;
        }
        Commands::Remove { id } => {
            let config = load_config(cli.config)?;
            let (engine, _) = open_engine(&config, false)?;
            if engine.remove(&id)? {
                println!("✓ Removed {}", id);
            } else {
                println!("Interview {} is not indexed", id);
            }
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "interview_index=debug"
    } else {
        "interview_index=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the engine over the configured directories
///
/// Exact search, removal and similar-item lookups never embed anything, so
/// when `require_embeddings` is false an unavailable provider is replaced by a
/// local one of the configured dimension.
fn open_engine(config: &Config, require_embeddings: bool) -> Result<(SearchEngine, Arc<JsonDirStore>)> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    let transcripts_dir = expand_path(&config.storage.transcripts_dir)?;

    let provider: Arc<dyn EmbeddingProvider> = match provider_from_config(&config.embedding) {
        Ok(provider) => provider,
        Err(e) if !require_embeddings => {
            tracing::debug!("Embedding provider unavailable ({}), using local stand-in", e);
            Arc::new(MockEmbeddingProvider::new(config.embedding.dimension)?)
        }
        Err(e) => {
            return Err(e).context(format!(
                "Failed to initialize '{}' embedding provider",
                config.embedding.provider
            ));
        }
    };

    let store = Arc::new(JsonDirStore::new(transcripts_dir));
    let preparer = TextPreparer::new(&config.transcript)?;

    let engine = SearchEngine::open(provider, store.clone(), data_dir, config.search.clone())
        .context("Failed to open interview index")?
        .with_preparer(preparer)
        .with_batch_size(config.embedding.batch_size);

    Ok((engine, store))
}

fn cmd_ingest(config_path: Option<PathBuf>, files: &[PathBuf]) -> Result<()> {
    let config = load_config(config_path)?;
    let (engine, store) = open_engine(&config, true)?;

    let mut records = Vec::new();
    for file in files {
        records.extend(read_records(file)?);
    }

    // Already indexed ids keep their stored transcript
    for record in engine.unindexed(&records)? {
        store
            .put(record)
            .with_context(|| format!("Failed to store interview {}", record.id))?;
    }

    let report = engine.ingest(&records)?;

    println!("✓ Ingested {} interviews", report.added);
    if report.skipped() > 0 {
        println!(
            "  Skipped: {} duplicate, {} empty after cleaning, {} without id",
            report.skipped_duplicate, report.skipped_empty, report.skipped_invalid
        );
    }
    println!("  Indexed total: {}", engine.len()?);

    Ok(())
}

/// One record or an array of records per file
fn read_records(path: &Path) -> Result<Vec<InterviewRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read interview file: {}", path.display()))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<InterviewRecord>>(value),
        _ => serde_json::from_value::<InterviewRecord>(value).map(|record| vec![record]),
    }
    .with_context(|| format!("Invalid interview record in {}", path.display()))?;

    Ok(records)
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let (engine, store) = open_engine(&config, false)?;
    let stats = engine.stats()?;
    let stored = store.records()?.len();

    println!("Interview Index Status");
    println!("======================");
    println!("\nIndexed interviews: {}", stats.interviews);
    println!("Stored transcripts: {}", stored);
    println!("Embedding model:    {} ({})", config.embedding.model, config.embedding.provider);
    println!("Dimension:          {}", stats.dimension);
    println!("Data directory:     {}", stats.data_dir.display());
    println!("Transcripts:        {}", store.dir().display());

    Ok(())
}

fn print_results(results: &[ScoredResult], json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(results).map_err(|e| InterviewIndexError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching interviews");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        let distance = result
            .distance
            .map(|d| format!(" d={:.3}", d))
            .unwrap_or_default();
        println!(
            "{}. [{:.3}{}] {}  {} / {} ({})",
            rank + 1,
            result.score,
            distance,
            result.id,
            result.metadata.project_name,
            result.metadata.interview_type,
            result.metadata.date
        );
        if !result.transcript.is_empty() {
            println!("   {}", result.preview(160));
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let value = serde_json::to_value(&config).map_err(|e| InterviewIndexError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let value = match section {
                Some(section) => value
                    .get(&section)
                    .cloned()
                    .with_context(|| format!("Unknown config section: {}", section))?,
                None => value,
            };

            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| InterviewIndexError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    Ok(Config::load_or_default(&path)?)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| InterviewIndexError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            InterviewIndexError::Config("Cannot determine home directory".to_string())
        })?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
