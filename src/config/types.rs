use serde::Deserialize;

/// Browser-like user agent presented to the listing site.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Main configuration structure for veranda
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Canonical first-page search URL (page 1 of the listing search)
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Site origin used to absolutize site-relative listing URLs,
    /// e.g. "https://www.99acres.com" (no trailing slash)
    pub origin: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Highest API page number to walk (pagination starts at page 2)
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Total fetch attempts per URL before giving up
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Upper bound on the randomized exponential backoff, in seconds
    #[serde(rename = "backoff-cap-secs", default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// TCP connect timeout, in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Full-response read timeout, in seconds
    #[serde(rename = "read-timeout-secs", default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Lower bound of the politeness pause between page fetches, milliseconds
    #[serde(rename = "min-pause-ms", default = "default_min_pause_ms")]
    pub min_pause_ms: u64,

    /// Upper bound of the politeness pause between page fetches, milliseconds
    #[serde(rename = "max-pause-ms", default = "default_max_pause_ms")]
    pub max_pause_ms: u64,

    /// User agent string sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            retry_attempts: default_retry_attempts(),
            backoff_cap_secs: default_backoff_cap_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            min_pause_ms: default_min_pause_ms(),
            max_pause_ms: default_max_pause_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output artifact paths
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Raw crawled dataset (CSV)
    #[serde(rename = "raw-path")]
    pub raw_path: String,

    /// Cleaned dataset (CSV); rejects land next to it as <stem>.rejects.csv
    #[serde(rename = "clean-path")]
    pub clean_path: String,

    /// SQLite checkpoint database holding the visited-URL set
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Directory receiving archived raw HTML bodies (best effort)
    #[serde(rename = "html-archive-dir")]
    pub html_archive_dir: String,

    /// Fitted price model artifact (JSON)
    #[serde(rename = "model-path")]
    pub model_path: String,
}

/// Prediction endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    /// Address the HTTP server binds to
    #[serde(rename = "bind-addr", default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_max_pages() -> u32 {
    50
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_backoff_cap_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    40
}

fn default_min_pause_ms() -> u64 {
    1500
}

fn default_max_pause_ms() -> u64 {
    3500
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
