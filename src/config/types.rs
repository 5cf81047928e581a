use serde::Deserialize;

/// Main configuration structure for News-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

/// Which news site the pipeline is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    VnExpress,
    TuoiTre,
}

impl SiteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VnExpress => "vnexpress",
            Self::TuoiTre => "tuoitre",
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Site variant to crawl
    pub site: SiteKind,

    /// Crawl articles published from this many days ago until now
    #[serde(rename = "days-ago")]
    pub days_ago: u32,

    /// Soft limit on records aggregated before a batch is handed downstream
    #[serde(rename = "batch-target", default = "default_batch_target")]
    pub batch_target: usize,

    /// Stop following next-page links after this many waves
    #[serde(rename = "max-waves", default)]
    pub max_waves: Option<u32>,

    /// Category ids used to build start queries (site-specific)
    #[serde(default)]
    pub categories: Vec<u64>,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests in one wave or fan-out (0 = unbounded)
    #[serde(rename = "max-in-flight", default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Run parse callbacks on the blocking thread pool
    #[serde(rename = "offload-parsing", default = "default_true")]
    pub offload_parsing: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_in_flight: default_max_in_flight(),
            offload_parsing: true,
        }
    }
}

/// What to do when the comment-count response omits a record's identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCountPolicy {
    /// Log a warning and treat the record as having no comments
    #[default]
    Zero,
    /// Abort the batch with a data shape error
    Fail,
}

/// Engagement scorer configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorerConfig {
    #[serde(rename = "missing-count", default)]
    pub missing_count: MissingCountPolicy,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Sink auto-flush threshold (0 = flush only on close)
    #[serde(rename = "buffer-limit", default = "default_buffer_limit")]
    pub buffer_limit: usize,

    /// Where `--report` writes the ranked list when no path is given on the CLI
    #[serde(rename = "report-path", default)]
    pub report_path: Option<String>,
}

/// Optional endpoint overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL serving the article listings
    #[serde(rename = "site-url", default)]
    pub site_url: Option<String>,

    /// Base URL serving the comment API
    #[serde(rename = "comment-url", default)]
    pub comment_url: Option<String>,
}

fn default_batch_target() -> usize {
    25
}

fn default_user_agent() -> String {
    format!("news-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_in_flight() -> usize {
    32
}

fn default_true() -> bool {
    true
}

fn default_buffer_limit() -> usize {
    1000
}
