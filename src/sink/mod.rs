//! Buffered sink for scored records
//!
//! Records are buffered in arrival order and committed to an [`ArticleStore`]
//! in one transaction per flush. Within a flush window the last record seen
//! for a URL wins.

use crate::site::Record;
use crate::storage::ArticleStore;
use crate::{HarvestError, Result};
use std::collections::{HashMap, HashSet};

/// Buffers scored records and upserts them in bulk
pub struct BufferedSink<S: ArticleStore> {
    store: S,
    site: String,
    buffer: Vec<Record>,
    keys: HashSet<String>,
    limit: usize,
    written: u64,
}

impl<S: ArticleStore> BufferedSink<S> {
    /// Creates a sink for `site` that flushes once `limit` distinct URLs are
    /// buffered
    ///
    /// A limit of 0 disables auto-flush, so only [`close`](Self::close)
    /// commits.
    pub fn new(store: S, site: impl Into<String>, limit: usize) -> Self {
        Self {
            store,
            site: site.into(),
            buffer: Vec::new(),
            keys: HashSet::new(),
            limit,
            written: 0,
        }
    }

    /// Appends a record, flushing when the buffer reaches its limit
    ///
    /// The limit counts distinct URLs, so a record that repeats a buffered
    /// URL never triggers a flush on its own.
    pub fn accept(&mut self, record: Record) -> Result<()> {
        self.keys.insert(record.url.clone());
        self.buffer.push(record);

        if self.limit != 0 && self.keys.len() >= self.limit {
            self.flush()?;
        }
        Ok(())
    }

    /// Deduplicates and commits the buffer, returning the number of records
    /// written
    ///
    /// On failure nothing is committed and the buffer is left as it was, so
    /// the flush can be retried.
    pub fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let records = dedup_last_wins(&self.buffer);
        let written = self
            .store
            .bulk_upsert(&self.site, &records)
            .map_err(|source| HarvestError::Flush {
                records: records.len(),
                source,
            })?;

        tracing::info!(
            "Flushed {} {} articles ({} buffered)",
            written,
            self.site,
            self.buffer.len()
        );

        self.buffer.clear();
        self.keys.clear();
        self.written += written as u64;
        Ok(written)
    }

    /// Flushes any remaining records and returns the store
    ///
    /// If the final flush fails the buffered records are dropped with the
    /// sink. Call [`flush`](Self::flush) first to keep them for a retry.
    pub fn close(mut self) -> Result<S> {
        self.flush()?;
        tracing::debug!("Sink closed after writing {} articles", self.written);
        Ok(self.store)
    }

    /// Number of records waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total records written by successful flushes
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Access to the underlying store for run bookkeeping
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

/// Keeps only the last occurrence of each URL, in arrival order of the
/// survivors
pub fn dedup_last_wins(records: &[Record]) -> Vec<Record> {
    let last: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.url.as_str(), index))
        .collect();

    records
        .iter()
        .enumerate()
        .filter(|(index, record)| last.get(record.url.as_str()) == Some(index))
        .map(|(_, record)| record.clone())
        .collect()
}
