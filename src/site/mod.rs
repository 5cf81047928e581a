//! Site capability interface
//!
//! Everything that differs between news sites lives behind the [`Site`] trait:
//! how start queries are built, how a listing page is turned into records and
//! a next-page link, and how the comment API is queried and read. The crawler
//! and scorer only ever talk to `dyn Site`, and the variant is chosen once from
//! configuration by [`build_site`].

mod tuoitre;
mod vnexpress;

pub use tuoitre::TuoiTre;
pub use vnexpress::VnExpress;

use crate::config::{Config, SiteKind};
use crate::gateway::Request;
use crate::scorer::score_comments;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the site-specific parsing callbacks
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Missing element '{selector}' in {context}")]
    MissingElement { selector: String, context: String },

    #[error("Missing attribute '{attribute}' on '{selector}'")]
    MissingAttribute { selector: String, attribute: String },

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// An article discovered on a listing page
///
/// `url` is the persistence key. `identifier` only correlates comment-count
/// responses with records and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub url: String,
    pub title: String,
    pub identifier: String,
    /// Site object id used by the comment API
    pub article_id: String,
    /// Site object type used by the comment API
    pub article_type: String,
    pub category: Option<String>,
    pub comment_count: u32,
    pub score: i64,
}

/// Result of parsing one listing page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub records: Vec<Record>,
    pub next_page: Option<String>,
}

/// One comment as reported by a comment or reply API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment_id: String,
    pub like_count: i64,
    pub reply_count: u32,
}

/// Partial score of one comment API response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseScore {
    pub score: i64,
    /// `(comment_id, reply_count)` for every comment that has replies
    pub replies: Vec<(String, u32)>,
}

/// Publication window the crawl is restricted to
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    /// Window ending now and starting `days` days ago
    pub fn days_ago(days: u32) -> Self {
        let to = Utc::now();
        Self {
            from: to - Duration::days(i64::from(days)),
            to,
        }
    }
}

/// Capability interface implemented once per news site
pub trait Site: Send + Sync {
    /// Short name recorded with each run
    fn name(&self) -> &'static str;

    /// Listing URLs the frontier is seeded with
    fn start_queries(&self) -> Vec<String>;

    /// Extracts records and the next-page link from a listing page
    fn parse_page(&self, page_url: &str, body: &[u8]) -> Result<ParsedPage, SiteError>;

    /// Builds the combined comment-count request for a batch
    fn count_request(&self, records: &[Record]) -> Request;

    /// Reads `identifier -> comment_count` from a count response
    fn parse_count_response(&self, body: &[u8]) -> Result<HashMap<String, u32>, SiteError>;

    /// Builds the top-level comment request for one record
    fn comment_request(&self, record: &Record) -> Request;

    /// Builds the reply request for one comment, if the site has a reply API
    fn reply_request(&self, _record: &Record, _comment_id: &str, _reply_count: u32) -> Option<Request> {
        None
    }

    /// Reads the comments of a comment or reply response in server order
    fn parse_comments(&self, body: &[u8]) -> Result<Vec<CommentNode>, SiteError>;

    /// Scores one comment or reply response
    fn score_response(&self, body: &[u8]) -> Result<ResponseScore, SiteError> {
        Ok(score_comments(&self.parse_comments(body)?))
    }
}

impl fmt::Debug for dyn Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Site({})", self.name())
    }
}

/// Builds the site variant selected in the configuration
pub fn build_site(config: &Config) -> Arc<dyn Site> {
    let window = DateWindow::days_ago(config.crawler.days_ago);
    let endpoints = &config.endpoints;

    match config.crawler.site {
        SiteKind::VnExpress => {
            let mut site = VnExpress::new(window).with_categories(config.crawler.categories.clone());
            if let Some(url) = &endpoints.site_url {
                site = site.with_site_url(url);
            }
            if let Some(url) = &endpoints.comment_url {
                site = site.with_comment_url(url);
            }
            Arc::new(site)
        }
        SiteKind::TuoiTre => {
            let mut site = TuoiTre::new(window);
            if let Some(url) = &endpoints.site_url {
                site = site.with_site_url(url);
            }
            if let Some(url) = &endpoints.comment_url {
                site = site.with_comment_url(url);
            }
            Arc::new(site)
        }
    }
}

/// Ids arrive as JSON numbers or strings depending on the endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdValue {
    Num(i64),
    Str(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Parses a CSS selector, mapping failures into [`SiteError`]
pub(crate) fn selector(css: &str) -> Result<scraper::Selector, SiteError> {
    scraper::Selector::parse(css).map_err(|_| SiteError::Selector(css.to_string()))
}

/// Joins base URLs without doubling the slash
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
