//! Level-synchronized frontier crawl
//!
//! Every listing page in the frontier is fetched concurrently as one wave.
//! Records found in a wave are aggregated, and the next-page links they
//! reported become the next frontier. A wave never starts before the previous
//! one has fully completed.

use crate::gateway::{gather, Gateway, Request};
use crate::site::{Record, Site};
use crate::{HarvestError, Result, Stage};
use futures::stream::{self, Stream};
use std::sync::Arc;

/// Pull-based crawler over a site's paginated listings
pub struct FrontierCrawler<'a> {
    gateway: &'a Gateway,
    site: Arc<dyn Site>,
    frontier: Vec<String>,
    pending: Vec<Record>,
    batch_target: usize,
    max_waves: Option<u32>,
    waves: u32,
}

impl<'a> FrontierCrawler<'a> {
    /// Creates a crawler seeded with the given start queries
    ///
    /// `batch_target` is a soft limit: a batch is emitted as soon as at least
    /// that many records are pending, so batches may be larger.
    pub fn new(
        gateway: &'a Gateway,
        site: Arc<dyn Site>,
        start_queries: Vec<String>,
        batch_target: usize,
    ) -> Self {
        Self {
            gateway,
            site,
            frontier: start_queries,
            pending: Vec::new(),
            batch_target,
            max_waves: None,
            waves: 0,
        }
    }

    /// Stops following next-page links after `max_waves` waves
    pub fn with_max_waves(mut self, max_waves: Option<u32>) -> Self {
        self.max_waves = max_waves;
        self
    }

    /// Number of waves completed so far
    pub fn waves(&self) -> u32 {
        self.waves
    }

    /// Runs waves until a batch is ready, or returns `None` once the frontier
    /// is exhausted and nothing is pending
    ///
    /// Empty batches are never returned.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Record>>> {
        loop {
            if !self.pending.is_empty() && self.pending.len() >= self.batch_target {
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            if self.frontier.is_empty() {
                break;
            }

            if let Some(max) = self.max_waves {
                if self.waves >= max {
                    tracing::warn!(
                        "Reached wave limit of {}, dropping {} unvisited pages",
                        max,
                        self.frontier.len()
                    );
                    self.frontier.clear();
                    break;
                }
            }

            self.run_wave().await?;
        }

        if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut self.pending)))
        }
    }

    /// Turns the crawler into a lazy stream of batches
    ///
    /// The next wave is only fetched when the consumer polls for the next
    /// batch.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Record>>> + 'a {
        stream::try_unfold(self, |mut crawler| async move {
            let batch = crawler.next_batch().await?;
            Ok::<_, HarvestError>(batch.map(|batch| (batch, crawler)))
        })
    }

    async fn run_wave(&mut self) -> Result<()> {
        let wave = self.waves + 1;
        let urls = std::mem::take(&mut self.frontier);
        let page_count = urls.len();

        tracing::debug!("Starting wave {} over {} pages", wave, page_count);

        let futures = urls
            .into_iter()
            .map(|url| {
                let site = Arc::clone(&self.site);
                let request = Request::get(url.clone());
                self.gateway
                    .fetch_parsed(request, Stage::CrawlWave(wave), move |body| {
                        site.parse_page(&url, body)
                    })
            })
            .collect::<Vec<_>>();
        let pages = gather(futures, self.gateway.max_in_flight()).await?;

        let mut found = 0;
        for page in pages {
            found += page.records.len();
            self.pending.extend(page.records);
            if let Some(next) = page.next_page {
                self.frontier.push(next);
            }
        }
        self.waves = wave;

        tracing::info!(
            "Wave {}: {} pages, {} articles, {} next pages",
            wave,
            page_count,
            found,
            self.frontier.len()
        );
        Ok(())
    }
}
