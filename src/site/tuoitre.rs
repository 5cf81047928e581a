//! TuoiTre timeline pages and comment API
//!
//! TuoiTre has no date-range search. Two timelines are paged instead, one for
//! articles (`/timeline/0/trang-N.htm`) and one for videos
//! (`/timeline/search.htm?pageindex=N`), and a timeline stops being followed
//! once its last item is older than the crawl window.
//!
//! Its comment API returns replies inline as `child_comments`, and the sort
//! order does not account for them, so scoring sums every like with no early
//! termination and no second-level fan-out.

use crate::gateway::Request;
use crate::site::{
    endpoint, selector, CommentNode, DateWindow, IdValue, ParsedPage, Record, ResponseScore, Site,
    SiteError,
};
use crate::url::{normalize_article_url, resolve_link};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

const SITE_URL: &str = "https://tuoitre.vn";
const COMMENT_URL: &str = "https://id.tuoitre.vn";

/// Timestamps on the site are GMT+7
const SITE_OFFSET_SECS: i32 = 7 * 3600;

/// Which of the two timelines a listing page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timeline {
    Article,
    Video,
}

impl Timeline {
    fn item_type(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Video => "video",
        }
    }
}

/// Selectors applied inside every timeline item
struct ItemSelectors {
    link: Selector,
    category: Selector,
    article_time: Selector,
    video_time: Selector,
}

impl ItemSelectors {
    fn new() -> Result<Self, SiteError> {
        Ok(Self {
            link: selector(".box-category-link-title")?,
            category: selector(".box-category-category")?,
            article_time: selector(".time-ago-last-news")?,
            video_time: selector("span.time")?,
        })
    }
}

/// TuoiTre site variant
#[derive(Debug, Clone)]
pub struct TuoiTre {
    site_url: String,
    comment_url: String,
    window: DateWindow,
}

impl TuoiTre {
    pub fn new(window: DateWindow) -> Self {
        Self {
            site_url: SITE_URL.to_string(),
            comment_url: COMMENT_URL.to_string(),
            window,
        }
    }

    pub fn with_site_url(mut self, url: &str) -> Self {
        self.site_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_comment_url(mut self, url: &str) -> Self {
        self.comment_url = url.trim_end_matches('/').to_string();
        self
    }

    fn page_url(&self, timeline: Timeline, index: u32) -> String {
        match timeline {
            Timeline::Article => format!("{}/timeline/0/trang-{}.htm", self.site_url, index),
            Timeline::Video => format!("{}/timeline/search.htm?pageindex={}", self.site_url, index),
        }
    }

    /// Works out which timeline and page index a listing URL points at
    fn locate(&self, url: &Url) -> Result<(Timeline, u32), SiteError> {
        if let Some((_, index)) = url.query_pairs().find(|(key, _)| key == "pageindex") {
            let index = index
                .parse::<u32>()
                .map_err(|_| SiteError::InvalidUrl(url.to_string()))?;
            return Ok((Timeline::Video, index));
        }

        let pattern =
            Regex::new(r"trang-(\d+)\.htm$").map_err(|e| SiteError::Malformed(e.to_string()))?;
        let index = pattern
            .captures(url.path())
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .ok_or_else(|| SiteError::InvalidUrl(url.to_string()))?;
        Ok((Timeline::Article, index))
    }

    fn extract_record(
        &self,
        block: ElementRef<'_>,
        selectors: &ItemSelectors,
        base: &Url,
        timeline: Timeline,
    ) -> Result<(Record, DateTime<Utc>), SiteError> {
        let link = block
            .select(&selectors.link)
            .next()
            .ok_or_else(|| SiteError::MissingElement {
                selector: ".box-category-link-title".to_string(),
                context: "timeline item".to_string(),
            })?;
        let href = attr(link, "href")?;
        let url = resolve_link(href, base)
            .and_then(|absolute| normalize_article_url(&absolute))
            .ok_or_else(|| SiteError::InvalidUrl(href.to_string()))?;
        let title = attr(link, "title")?.trim().to_string();
        let identifier = attr(link, "data-id")?.to_string();

        let category = block
            .select(&selectors.category)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        let published = published_time(block, selectors, timeline)?;

        Ok((
            Record {
                url,
                title,
                article_id: identifier.clone(),
                identifier,
                article_type: timeline.item_type().to_string(),
                category,
                comment_count: 0,
                score: 0,
            },
            published,
        ))
    }
}

impl Site for TuoiTre {
    fn name(&self) -> &'static str {
        "tuoitre"
    }

    fn start_queries(&self) -> Vec<String> {
        vec![
            self.page_url(Timeline::Article, 1),
            self.page_url(Timeline::Video, 1),
        ]
    }

    fn parse_page(&self, page_url: &str, body: &[u8]) -> Result<ParsedPage, SiteError> {
        let base = Url::parse(page_url).map_err(|_| SiteError::InvalidUrl(page_url.to_string()))?;
        let (timeline, index) = self.locate(&base)?;

        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);
        let block_sel = selector(".box-category-item")?;
        let selectors = ItemSelectors::new()?;

        let mut records = Vec::new();
        let mut last_published = None;
        for block in document.select(&block_sel) {
            let (record, published) = self.extract_record(block, &selectors, &base, timeline)?;
            records.push(record);
            last_published = Some(published);
        }

        // Timelines run newest first: keep paging while the oldest item on
        // this page is still inside the window.
        let next_page = match last_published {
            Some(published) if published > self.window.from => {
                Some(self.page_url(timeline, index + 1))
            }
            _ => {
                tracing::debug!(
                    "Stopped paging {} timeline at page {}",
                    timeline.item_type(),
                    index
                );
                None
            }
        };

        Ok(ParsedPage { records, next_page })
    }

    fn count_request(&self, records: &[Record]) -> Request {
        let ids = records
            .iter()
            .map(|record| record.identifier.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Request::get(endpoint(&self.comment_url, "/api/getcount-comment.api")).param("ids", ids)
    }

    /// `{"Success": true, "Data": [{"object_id": ..., "total_count": ...}]}`
    fn parse_count_response(&self, body: &[u8]) -> Result<HashMap<String, u32>, SiteError> {
        let response: CountResponse = serde_json::from_slice(body)?;
        Ok(response
            .data
            .into_iter()
            .map(|item| (item.object_id.to_string(), item.total_count.unwrap_or(0)))
            .collect())
    }

    fn comment_request(&self, record: &Record) -> Request {
        Request::get(endpoint(&self.comment_url, "/api/getlist-comment.api"))
            .param("objId", &record.article_id)
            .param("sort", 2)
            .param("objType", 1)
            .param("pageSize", record.comment_count)
    }

    /// `Data` is itself a JSON document encoded as a string; children follow
    /// their parent in the returned list
    fn parse_comments(&self, body: &[u8]) -> Result<Vec<CommentNode>, SiteError> {
        let response: ListResponse = serde_json::from_slice(body)?;
        let comments: Vec<Comment> = match response.data {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::String(text) if text.trim().is_empty() => Vec::new(),
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            other => serde_json::from_value(other)?,
        };

        let mut nodes = Vec::new();
        for comment in comments {
            let children = comment.child_comments.as_deref().unwrap_or_default();
            nodes.push(comment.node(children.len() as u32));
            nodes.extend(children.iter().map(|child| child.node(0)));
        }
        Ok(nodes)
    }

    fn score_response(&self, body: &[u8]) -> Result<ResponseScore, SiteError> {
        let score = self
            .parse_comments(body)?
            .iter()
            .map(|node| node.like_count)
            .sum();
        Ok(ResponseScore {
            score,
            replies: Vec::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(rename = "Data", default)]
    data: Vec<CountItem>,
}

#[derive(Debug, Deserialize)]
struct CountItem {
    object_id: IdValue,
    #[serde(default)]
    total_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(rename = "Data", default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    id: Option<IdValue>,
    #[serde(default)]
    likes: Option<i64>,
    #[serde(default)]
    child_comments: Option<Vec<Comment>>,
}

impl Comment {
    fn node(&self, reply_count: u32) -> CommentNode {
        CommentNode {
            comment_id: self.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            like_count: self.likes.unwrap_or(0),
            reply_count,
        }
    }
}

fn attr<'a>(el: ElementRef<'a>, attribute: &str) -> Result<&'a str, SiteError> {
    el.value()
        .attr(attribute)
        .ok_or_else(|| SiteError::MissingAttribute {
            selector: ".box-category-link-title".to_string(),
            attribute: attribute.to_string(),
        })
}

/// Articles carry a full timestamp in a `title` attribute, videos only a date
fn published_time(
    block: ElementRef<'_>,
    selectors: &ItemSelectors,
    timeline: Timeline,
) -> Result<DateTime<Utc>, SiteError> {
    let offset = FixedOffset::east_opt(SITE_OFFSET_SECS)
        .ok_or_else(|| SiteError::Malformed("site offset out of range".to_string()))?;

    let (css, raw) = match timeline {
        Timeline::Article => {
            let raw = block
                .select(&selectors.article_time)
                .next()
                .and_then(|el| el.value().attr("title"))
                .map(str::to_string);
            (".time-ago-last-news", raw)
        }
        Timeline::Video => {
            let raw = block
                .select(&selectors.video_time)
                .next()
                .map(|el| el.text().collect::<String>());
            ("span.time", raw)
        }
    };

    let raw = raw.ok_or_else(|| SiteError::MissingElement {
        selector: css.to_string(),
        context: "timeline item".to_string(),
    })?;
    let raw = raw.trim();

    let naive = match timeline {
        Timeline::Article => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"),
        Timeline::Video => {
            NaiveDate::parse_from_str(raw, "%d/%m/%Y").map(|date| date.and_time(NaiveTime::MIN))
        }
    }
    .map_err(|e| SiteError::Timestamp {
        value: raw.to_string(),
        message: e.to_string(),
    })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SiteError::Timestamp {
            value: raw.to_string(),
            message: "ambiguous local time".to_string(),
        })
}
