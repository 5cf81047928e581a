//! VnExpress listing pages and comment API
//!
//! VnExpress allows searching articles by category and date range, which is
//! what the start queries exploit. The comment service lives on a separate
//! host and exposes count, comment and reply endpoints.

use crate::gateway::Request;
use crate::site::{
    endpoint, selector, CommentNode, DateWindow, IdValue, ParsedPage, Record, Site, SiteError,
};
use crate::url::{normalize_article_url, resolve_link};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

const SITE_URL: &str = "https://vnexpress.net";
const COMMENT_URL: &str = "https://usi-saas.vnexpress.net";
const SITE_ID: u32 = 1000000;

/// Categories crawled when none are configured (thoi-su, goc-nhin)
const DEFAULT_CATEGORIES: &[u64] = &[1001005, 1003450];

/// Selectors applied inside every article block of a listing page
struct BlockSelectors {
    title: Selector,
    link: Selector,
    meta: Selector,
}

impl BlockSelectors {
    fn new() -> Result<Self, SiteError> {
        Ok(Self {
            title: selector("h3")?,
            link: selector("h3 a")?,
            meta: selector("span.txt_num_comment")?,
        })
    }
}

/// VnExpress site variant
#[derive(Debug, Clone)]
pub struct VnExpress {
    site_url: String,
    comment_url: String,
    categories: Vec<u64>,
    window: DateWindow,
}

impl VnExpress {
    pub fn new(window: DateWindow) -> Self {
        Self {
            site_url: SITE_URL.to_string(),
            comment_url: COMMENT_URL.to_string(),
            categories: DEFAULT_CATEGORIES.to_vec(),
            window,
        }
    }

    /// Replaces the crawled categories; an empty list keeps the defaults
    pub fn with_categories(mut self, categories: Vec<u64>) -> Self {
        if !categories.is_empty() {
            self.categories = categories;
        }
        self
    }

    pub fn with_site_url(mut self, url: &str) -> Self {
        self.site_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_comment_url(mut self, url: &str) -> Self {
        self.comment_url = url.trim_end_matches('/').to_string();
        self
    }

    fn extract_record(
        &self,
        block: ElementRef<'_>,
        selectors: &BlockSelectors,
        base: &Url,
        category: Option<&str>,
    ) -> Result<Record, SiteError> {
        let title = block
            .select(&selectors.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .ok_or_else(|| missing("h3", "article block"))?;

        let link = block
            .select(&selectors.link)
            .next()
            .ok_or_else(|| missing("h3 a", "article block"))?;
        let href = attr(link, "h3 a", "href")?;
        let url = resolve_link(href, base)
            .and_then(|absolute| normalize_article_url(&absolute))
            .ok_or_else(|| SiteError::InvalidUrl(href.to_string()))?;

        let meta = block
            .select(&selectors.meta)
            .next()
            .ok_or_else(|| missing("span.txt_num_comment", "article block"))?;
        let article_id = attr(meta, "span.txt_num_comment", "data-objectid")?.to_string();
        let article_type = attr(meta, "span.txt_num_comment", "data-objecttype")?.to_string();

        Ok(Record {
            url,
            title,
            identifier: format!("{}-{}", article_id, article_type),
            article_id,
            article_type,
            category: category.map(str::to_string),
            comment_count: 0,
            score: 0,
        })
    }

    /// Follows `a.next-page` unless the site marks it disabled
    fn extract_next_page(&self, document: &Html, base: &Url) -> Result<Option<String>, SiteError> {
        let next_sel = selector("a.next-page[href]")?;

        let Some(next) = document.select(&next_sel).next() else {
            return Ok(None);
        };

        if next.value().classes().any(|class| class.starts_with("disable")) {
            return Ok(None);
        }

        Ok(next
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base)))
    }
}

impl Site for VnExpress {
    fn name(&self) -> &'static str {
        "vnexpress"
    }

    fn start_queries(&self) -> Vec<String> {
        let from = self.window.from.timestamp();
        let to = self.window.to.timestamp();
        self.categories
            .iter()
            .map(|category| {
                format!(
                    "{}/category/day?cateid={}&fromdate={}&todate={}",
                    self.site_url, category, from, to
                )
            })
            .collect()
    }

    fn parse_page(&self, page_url: &str, body: &[u8]) -> Result<ParsedPage, SiteError> {
        let base = Url::parse(page_url).map_err(|_| SiteError::InvalidUrl(page_url.to_string()))?;
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let category_sel = selector("nav.main-nav li.active")?;
        let category = document
            .select(&category_sel)
            .next()
            .and_then(|el| el.value().attr("data-id"));

        let block_sel = selector("article.item-news-common")?;
        let selectors = BlockSelectors::new()?;
        let records = document
            .select(&block_sel)
            .map(|block| self.extract_record(block, &selectors, &base, category))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Extracted {} articles from {}", records.len(), page_url);

        Ok(ParsedPage {
            records,
            next_page: self.extract_next_page(&document, &base)?,
        })
    }

    fn count_request(&self, records: &[Record]) -> Request {
        let ids = records
            .iter()
            .map(|record| record.identifier.as_str())
            .collect::<Vec<_>>()
            .join(";");
        Request::get(endpoint(&self.comment_url, "/widget/index/")).param("cid", ids)
    }

    /// The count widget answers with JavaScript of the form
    /// `CmtWidget.parse('widget-comment-ID', N);` repeated per identifier, in
    /// no guaranteed order.
    fn parse_count_response(&self, body: &[u8]) -> Result<HashMap<String, u32>, SiteError> {
        let pattern = Regex::new(r#"widget-comment-([^'"]+)['"]\s*,\s*(\d+)"#)
            .map_err(|e| SiteError::Malformed(e.to_string()))?;
        let text = String::from_utf8_lossy(body);

        pattern
            .captures_iter(&text)
            .map(|caps| {
                let count = caps[2]
                    .parse::<u32>()
                    .map_err(|e| SiteError::Malformed(format!("count '{}': {}", &caps[2], e)))?;
                Ok::<_, SiteError>((caps[1].to_string(), count))
            })
            .collect()
    }

    fn comment_request(&self, record: &Record) -> Request {
        let mut request = Request::get(endpoint(&self.comment_url, "/index/get"))
            .param("offset", 0)
            .param("limit", record.comment_count)
            .param("sort", "like")
            .param("objectid", &record.article_id)
            .param("objecttype", &record.article_type);
        if let Some(category) = &record.category {
            request = request.param("category_id", category);
        }
        request.param("siteid", SITE_ID)
    }

    fn reply_request(&self, record: &Record, comment_id: &str, reply_count: u32) -> Option<Request> {
        Some(
            Request::get(endpoint(&self.comment_url, "/index/getreplay"))
                .param("siteid", SITE_ID)
                .param("objectid", &record.article_id)
                .param("objecttype", &record.article_type)
                .param("id", comment_id)
                .param("offset", 0)
                .param("limit", reply_count)
                .param("sort_by", "like"),
        )
    }

    fn parse_comments(&self, body: &[u8]) -> Result<Vec<CommentNode>, SiteError> {
        let response: CommentResponse = serde_json::from_slice(body)?;
        let items = response.data.map(|data| data.items).unwrap_or_default();

        Ok(items
            .into_iter()
            .map(|item| CommentNode {
                comment_id: item.comment_id.map(|id| id.to_string()).unwrap_or_default(),
                like_count: item.userlike,
                reply_count: item.replys.map(|r| r.total).unwrap_or(0),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    data: Option<CommentData>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    items: Vec<CommentItem>,
}

#[derive(Debug, Deserialize)]
struct CommentItem {
    #[serde(default)]
    comment_id: Option<IdValue>,
    #[serde(default)]
    userlike: i64,
    #[serde(default)]
    replys: Option<ReplySummary>,
}

#[derive(Debug, Deserialize)]
struct ReplySummary {
    #[serde(default)]
    total: u32,
}

fn missing(selector: &str, context: &str) -> SiteError {
    SiteError::MissingElement {
        selector: selector.to_string(),
        context: context.to_string(),
    }
}

fn attr<'a>(el: ElementRef<'a>, selector: &str, attribute: &str) -> Result<&'a str, SiteError> {
    el.value()
        .attr(attribute)
        .ok_or_else(|| SiteError::MissingAttribute {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        })
}
