//! News-Harvest: crawl, score and rank news articles by reader engagement
//!
//! This crate walks the paginated listings of a news site, scores every
//! discovered article from its comment and reply like-counts, and upserts the
//! ranked results into SQLite.

pub mod config;
pub mod crawler;
pub mod gateway;
pub mod output;
pub mod pipeline;
pub mod scorer;
pub mod site;
pub mod sink;
pub mod storage;
pub mod url;

use std::fmt;
use thiserror::Error;

pub use gateway::FetchError;
pub use site::SiteError;
pub use storage::StorageError;

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// A frontier crawl wave (1-based)
    CrawlWave(u32),
    /// The combined comment-count query of a batch
    CountQuery,
    /// First-level fan-out over top-level comments
    CommentFanout,
    /// Second-level fan-out over replies
    ReplyFanout,
    /// Committing the sink buffer
    SinkFlush,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrawlWave(wave) => write!(f, "crawl wave {}", wave),
            Self::CountQuery => write!(f, "comment count query"),
            Self::CommentFanout => write!(f, "comment fan-out (level 1)"),
            Self::ReplyFanout => write!(f, "reply fan-out (level 2)"),
            Self::SinkFlush => write!(f, "sink flush"),
        }
    }
}

/// Main error type for News-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error during {stage}: {source}")]
    Transport { stage: Stage, source: FetchError },

    #[error("Parse error during {stage} for {url}: {source}")]
    Parse {
        stage: Stage,
        url: String,
        source: SiteError,
    },

    #[error("Data shape error during {stage}: {message}")]
    DataShape { stage: Stage, message: String },

    #[error("Sink flush of {records} records failed: {source}")]
    Flush { records: usize, source: StorageError },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Background parse task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// The stage that produced this error, if it came out of the pipeline core
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Transport { stage, .. }
            | Self::Parse { stage, .. }
            | Self::DataShape { stage, .. } => Some(*stage),
            Self::Flush { .. } => Some(Stage::SinkFlush),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for News-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{Pipeline, RunSummary};
pub use site::Record;
