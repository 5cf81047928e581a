//! Fetch gateway
//!
//! This module owns the HTTP session shared by every concurrent request of a
//! pipeline run:
//! - Building the HTTP client with the configured user agent and timeout
//! - Issuing GET requests and turning non-success statuses into errors
//! - Running parse callbacks, optionally on the blocking thread pool
//! - Ordered, bounded gathering of concurrent requests

use crate::config::HttpConfig;
use crate::site::SiteError;
use crate::{HarvestError, Stage};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport failure of a single request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} timed out")]
    Timeout { url: String },

    #[error("GET {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Timeout { url } | Self::Network { url, .. } => url,
        }
    }

    fn from_reqwest(url: String, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source: error }
        }
    }
}

/// A GET request: base URL plus query parameters in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// First value of a query parameter
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The URL with its query string, as it goes on the wire
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        match Url::parse_with_params(&self.url, &self.params) {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Built without a cookie store, so no cookies are kept between requests.
///
/// # Example
///
/// ```no_run
/// use news_harvest::config::HttpConfig;
/// use news_harvest::gateway::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The HTTP session of one pipeline run
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    max_in_flight: usize,
    offload_parsing: bool,
}

impl Gateway {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_in_flight: config.max_in_flight,
            offload_parsing: config.offload_parsing,
        })
    }

    /// Concurrency bound for one wave or fan-out (0 = unbounded)
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Fetches a request and returns the raw body
    ///
    /// Any non-success status is a failure. Redirects are followed by the
    /// client.
    pub async fn fetch(&self, request: &Request) -> Result<Vec<u8>, FetchError> {
        let url = request.full_url();

        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.clone(), e))?;

        let status = response.status();
        tracing::info!("GET {} {}", status.as_u16(), url);

        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(body.to_vec())
    }

    /// Fetches a request and hands the body to a parse callback
    ///
    /// Transport failures become [`HarvestError::Transport`] and parse
    /// failures [`HarvestError::Parse`], both tagged with `stage`.
    pub async fn fetch_parsed<T, F>(&self, request: Request, stage: Stage, parse: F) -> crate::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&[u8]) -> Result<T, SiteError> + Send + 'static,
    {
        let body = self
            .fetch(&request)
            .await
            .map_err(|source| HarvestError::Transport { stage, source })?;

        let parsed = if self.offload_parsing {
            tokio::task::spawn_blocking(move || parse(&body)).await?
        } else {
            parse(&body)
        };

        parsed.map_err(|source| HarvestError::Parse {
            stage,
            url: request.full_url(),
            source,
        })
    }
}

/// Runs futures concurrently and returns their results in input order
///
/// At most `limit` futures are polled at once (0 = all of them). The first
/// failure aborts the gather and the futures still pending are dropped.
pub async fn gather<T, Fut>(futures: Vec<Fut>, limit: usize) -> crate::Result<Vec<T>>
where
    Fut: Future<Output = crate::Result<T>>,
{
    if limit == 0 {
        return try_join_all(futures).await;
    }
    stream::iter(futures).buffered(limit).try_collect().await
}
