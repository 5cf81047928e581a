//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::site::Record;
use crate::storage::{ArticleRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Articles are keyed by URL and belong to the site that crawled them; every
/// ranking and count is scoped to one site. Conflict resolution only ever
/// touches the mutable fields of an article (`score` and `update_time`).
pub trait ArticleStore {
    // ===== Articles =====

    /// Upserts a set of records crawled from `site` as one transaction
    ///
    /// Either every record is written or none is. Returns the number of
    /// records written.
    fn bulk_upsert(&mut self, site: &str, records: &[Record]) -> StorageResult<usize>;

    /// Gets an article by URL
    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Gets a site's articles ranked by score descending, ties broken by URL
    fn ranked_articles(
        &self,
        site: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ArticleRecord>>;

    /// Gets the article count of a site
    fn count_articles(&self, site: &str) -> StorageResult<u64>;

    /// Counts a site's articles that have at least one comment
    fn count_commented_articles(&self, site: &str) -> StorageResult<u64>;

    /// Gets `(category, article count)` pairs of a site, largest first
    fn get_category_breakdown(&self, site: &str) -> StorageResult<Vec<(String, u64)>>;

    // ===== Run Management =====

    /// Creates a new pipeline run in the `running` state
    fn create_run(&mut self, config_hash: &str, site: &str) -> StorageResult<i64>;

    /// Records the final status of a run with a finish timestamp
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        articles_written: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of a site
    fn get_latest_run(&self, site: &str) -> StorageResult<Option<RunRecord>>;

    /// Gets the run count of a site
    fn count_runs(&self, site: &str) -> StorageResult<u64>;
}
