//! Crawler module for listing page traversal
//!
//! This module walks a site's paginated article listings in level-synchronized
//! waves and hands the discovered records downstream in batches.

mod frontier;

pub use frontier::FrontierCrawler;
