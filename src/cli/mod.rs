//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "interview-index",
    version,
    author = "neur0map",
    about = "Semantic search over research interview transcripts",
    long_about = "Interview Index embeds research interview transcripts, keeps them in a persistent \
                  vector index, and answers semantic, exact-text and similar-interview queries."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/interview-index/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store interview JSON files and add them to the index
    Ingest {
        /// Interview files (one record or an array of records each)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Find interviews by meaning
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, default_value = "5")]
        k: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find interviews whose transcript contains the text
    Exact {
        /// Text to look for (case-insensitive)
        query: String,

        /// Maximum number of results to return
        #[arg(short, default_value = "5")]
        k: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find interviews similar to an indexed one
    Similar {
        /// Interview id
        id: String,

        /// Maximum number of results to return
        #[arg(short, default_value = "5")]
        k: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove an interview from the index
    Remove {
        /// Interview id
        id: String,
    },

    /// Show index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["interview-index", "search", "booking flights", "-k", "3"])
            .unwrap();
        match cli.command {
            Commands::Search { query, k, json } => {
                assert_eq!(query, "booking flights");
                assert_eq!(k, 3);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Cli::try_parse_from(["interview-index", "ingest"]).is_err());
    }
}
