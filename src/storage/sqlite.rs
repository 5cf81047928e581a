//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::site::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{ArticleRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ARTICLE_COLUMNS: &str = "id, url, site, title, article_id, article_type, category, \
     comment_count, score, create_time, update_time";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, site, status, articles_written";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
    Ok(ArticleRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        site: row.get(2)?,
        title: row.get(3)?,
        article_id: row.get(4)?,
        article_type: row.get(5)?,
        category: row.get(6)?,
        comment_count: row.get(7)?,
        score: row.get(8)?,
        create_time: row.get(9)?,
        update_time: row.get(10)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        site: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        articles_written: row.get::<_, i64>(6)? as u64,
    })
}

impl ArticleStore for SqliteStorage {
    // ===== Articles =====

    fn bulk_upsert(&mut self, site: &str, records: &[Record]) -> StorageResult<usize> {
        if let Some(record) = records.iter().find(|r| r.url.is_empty()) {
            return Err(StorageError::ConstraintViolation(format!(
                "article '{}' has no url",
                record.identifier
            )));
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            // Only score and update_time change on conflict
            let mut stmt = tx.prepare_cached(
                "INSERT INTO articles
                    (url, site, title, article_id, article_type, category, comment_count, score, create_time, update_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(url) DO UPDATE SET
                    score = excluded.score,
                    update_time = excluded.update_time",
            )?;

            for record in records {
                stmt.execute(params![
                    record.url,
                    site,
                    record.title,
                    record.article_id,
                    record.article_type,
                    record.category,
                    record.comment_count,
                    record.score,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS),
                params![url],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn ranked_articles(
        &self,
        site: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ArticleRecord>> {
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|n| n as i64).unwrap_or(-1);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM articles WHERE site = ?1 ORDER BY score DESC, url ASC LIMIT ?2",
            ARTICLE_COLUMNS
        ))?;

        let articles = stmt
            .query_map(params![site, limit], article_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn count_articles(&self, site: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE site = ?1",
            params![site],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_commented_articles(&self, site: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE site = ?1 AND comment_count > 0",
            params![site],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_category_breakdown(&self, site: &str) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(category, '(none)') AS name, COUNT(*) AS n
             FROM articles
             WHERE site = ?1
             GROUP BY name
             ORDER BY n DESC, name ASC",
        )?;

        let breakdown = stmt
            .query_map(params![site], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(breakdown)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, site: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, site, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, site, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        articles_written: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, articles_written = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, articles_written as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, site: &str) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM runs WHERE site = ?1 ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                params![site],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn count_runs(&self, site: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE site = ?1",
            params![site],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
