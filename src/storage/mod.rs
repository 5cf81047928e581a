//! Storage module for persisting scored articles
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Transactional bulk upsert of scored articles
//! - Ranked article queries for reports and statistics
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, StorageError, StorageResult};

/// Represents an article row in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub site: String,
    pub title: String,
    pub article_id: String,
    pub article_type: String,
    pub category: Option<String>,
    pub comment_count: u32,
    pub score: i64,
    pub create_time: String,
    pub update_time: String,
}

/// Represents a pipeline run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub site: String,
    pub status: RunStatus,
    pub articles_written: u64,
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
