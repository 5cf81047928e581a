//! Pipeline orchestration
//!
//! A [`Pipeline`] is an explicitly constructed context holding everything one
//! run needs: configuration, the site variant and the article store. Running
//! it pulls batches from the frontier crawler, scores each one completely and
//! hands the scored records to the buffered sink before the next wave starts.

use crate::config::Config;
use crate::crawler::FrontierCrawler;
use crate::gateway::Gateway;
use crate::scorer::EngagementScorer;
use crate::sink::BufferedSink;
use crate::site::Site;
use crate::storage::{ArticleStore, RunStatus};
use crate::Result;
use futures::TryStreamExt;
use std::sync::Arc;

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: i64,
    pub batches: usize,
    pub articles_scored: usize,
    pub articles_written: u64,
}

/// Crawl, score and persist pipeline for one site
pub struct Pipeline<S: ArticleStore> {
    config: Config,
    site: Arc<dyn Site>,
    store: S,
    config_hash: String,
}

impl<S: ArticleStore> Pipeline<S> {
    pub fn new(config: Config, site: Arc<dyn Site>, store: S) -> Self {
        Self {
            config,
            site,
            store,
            config_hash: String::new(),
        }
    }

    /// Hash of the configuration file, recorded with the run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Runs the pipeline from the site's own start queries
    pub async fn run(self) -> Result<RunSummary> {
        let start_queries = self.site.start_queries();
        self.run_with(start_queries).await
    }

    /// Runs the pipeline from the given start queries
    ///
    /// On a fatal crawl or scoring error, records that were already scored
    /// are still flushed and the run is marked failed before the error is
    /// returned.
    pub async fn run_with(self, start_queries: Vec<String>) -> Result<RunSummary> {
        let Self {
            config,
            site,
            mut store,
            config_hash,
        } = self;

        let gateway = Gateway::new(&config.http)?;
        let run_id = store.create_run(&config_hash, site.name())?;
        tracing::info!(
            "Starting run {} on {} with {} start queries",
            run_id,
            site.name(),
            start_queries.len()
        );

        let mut sink = BufferedSink::new(store, site.name(), config.output.buffer_limit);
        let outcome = drive(&gateway, site, &config, start_queries, &mut sink).await;

        let flushed = sink.flush();
        let written = sink.written();
        let status = if outcome.is_ok() && flushed.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        let finished = sink.store_mut().finish_run(run_id, status, written);

        let closed = if flushed.is_ok() {
            sink.close().map(drop)
        } else {
            // Run already failed; the unflushed records go with the sink
            drop(sink);
            Ok(())
        };
        drop(gateway);

        if let Err(e) = outcome.as_ref() {
            tracing::error!("Run {} failed: {}", run_id, e);
        }
        let (batches, articles_scored) = outcome?;
        flushed?;
        finished?;
        closed?;

        tracing::info!(
            "Run {} completed: {} batches, {} articles scored, {} written",
            run_id,
            batches,
            articles_scored,
            written
        );

        Ok(RunSummary {
            run_id,
            batches,
            articles_scored,
            articles_written: written,
        })
    }
}

/// Pulls batches through scorer and sink, returning `(batches, scored)`
async fn drive<S: ArticleStore>(
    gateway: &Gateway,
    site: Arc<dyn Site>,
    config: &Config,
    start_queries: Vec<String>,
    sink: &mut BufferedSink<S>,
) -> Result<(usize, usize)> {
    let crawler = FrontierCrawler::new(
        gateway,
        Arc::clone(&site),
        start_queries,
        config.crawler.batch_target,
    )
    .with_max_waves(config.crawler.max_waves);
    let scorer = EngagementScorer::new(gateway, site, config.scorer.missing_count);

    let mut batches = Box::pin(crawler.into_stream());
    let mut count = 0;
    let mut scored = 0;

    while let Some(batch) = batches.try_next().await? {
        count += 1;
        tracing::info!("Scoring batch {} ({} articles)", count, batch.len());

        let batch = scorer.score(batch).await?;
        scored += batch.len();
        for record in batch {
            sink.accept(record)?;
        }
    }

    Ok((count, scored))
}
