//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{ArticleRecord, ArticleStore, RunRecord};
use crate::Result;

/// How many top-ranked articles the statistics include
const TOP_ARTICLES: usize = 10;

/// Harvest statistics summary for one site
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Site the statistics cover
    pub site: String,

    /// Total number of articles stored
    pub total_articles: u64,

    /// Articles with at least one comment
    pub commented_articles: u64,

    /// Article count per category, largest first
    pub categories: Vec<(String, u64)>,

    /// Highest scored articles
    pub top_articles: Vec<ArticleRecord>,

    /// Number of pipeline runs recorded
    pub total_runs: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads the statistics of `site` from storage
pub fn load_statistics(storage: &dyn ArticleStore, site: &str) -> Result<HarvestStatistics> {
    Ok(HarvestStatistics {
        site: site.to_string(),
        total_articles: storage.count_articles(site)?,
        commented_articles: storage.count_commented_articles(site)?,
        categories: storage.get_category_breakdown(site)?,
        top_articles: storage.ranked_articles(site, Some(TOP_ARTICLES))?,
        total_runs: storage.count_runs(site)?,
        latest_run: storage.get_latest_run(site)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview ({}):", stats.site);
    println!("  Total articles: {}", stats.total_articles);
    println!(
        "  With comments: {} ({:.1}%)",
        stats.commented_articles,
        stats.commented_share()
    );
    println!("  Runs recorded: {}", stats.total_runs);
    println!();

    if !stats.categories.is_empty() {
        println!("Articles by Category:");
        for (category, count) in &stats.categories {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !stats.top_articles.is_empty() {
        println!("Top {} Articles:", stats.top_articles.len());
        for article in &stats.top_articles {
            println!("  {:>7} {}", article.score, article.url);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Id: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Articles written: {}", run.articles_written);
        }
        None => println!("No runs recorded yet"),
    }
}

impl HarvestStatistics {
    /// Percentage of stored articles that have comments
    pub fn commented_share(&self) -> f64 {
        if self.total_articles > 0 {
            (self.commented_articles as f64 / self.total_articles as f64) * 100.0
        } else {
            0.0
        }
    }
}
