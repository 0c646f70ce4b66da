use crate::url::LinkScope;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tablecrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// First page of the crawl
    #[serde(default)]
    pub start_url: Option<String>,

    /// Cap on total pages dispatched (0 = unbounded)
    #[serde(default)]
    pub max_pages: u32,

    /// Maximum number of pages in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Retries per page after the first attempt
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,

    /// Delay between attempts on the same page (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout for a single navigation (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Timeout for the page to settle after navigation (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub stabilize_timeout_ms: u64,

    /// Pause after the scroll recovery when a pagination click fails (milliseconds)
    #[serde(default = "default_recovery_delay_ms")]
    pub recovery_delay_ms: u64,

    /// Which discovered links may enter the frontier
    #[serde(default)]
    pub link_scope: LinkScope,

    /// Selector of the primary data table
    #[serde(default = "default_table_selector")]
    pub table_selector: String,

    /// Extra links to follow besides pagination (empty = none)
    #[serde(default)]
    pub follow_selector: Option<String>,

    /// Whether robots.txt is checked before dispatching a page
    #[serde(default)]
    pub respect_robots_txt: bool,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn stabilize_timeout(&self) -> Duration {
        Duration::from_millis(self.stabilize_timeout_ms)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    /// Returns the follow selector, treating an empty string as unset
    pub fn follow_selector(&self) -> Option<&str> {
        self.follow_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: None,
            max_pages: 0,
            max_concurrency: default_max_concurrency(),
            max_request_retries: default_max_request_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            navigation_timeout_ms: default_timeout_ms(),
            stabilize_timeout_ms: default_timeout_ms(),
            recovery_delay_ms: default_recovery_delay_ms(),
            link_scope: LinkScope::default(),
            table_selector: default_table_selector(),
            follow_selector: None,
            respect_robots_txt: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Persist the full page HTML of every processed page
    #[serde(default = "default_true")]
    pub save_raw_html: bool,

    /// Persist one HTML document per chunk
    #[serde(default = "default_true")]
    pub save_chunk_html: bool,

    /// Rows per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Directory receiving HTML artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Path to the SQLite record database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the markdown summary file (empty = not written)
    #[serde(default)]
    pub summary_path: Option<String>,
}

impl OutputConfig {
    pub fn summary_path(&self) -> Option<&str> {
        self.summary_path.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_raw_html: true,
            save_chunk_html: true,
            chunk_size: default_chunk_size(),
            artifact_dir: default_artifact_dir(),
            database_path: default_database_path(),
            summary_path: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+url; email)`
    pub fn header_value(&self) -> String {
        let contact: Vec<&str> = [self.contact_url.as_deref(), self.contact_email.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} (+{})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}

fn default_max_concurrency() -> u32 {
    3
}

fn default_max_request_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_recovery_delay_ms() -> u64 {
    1_000
}

fn default_table_selector() -> String {
    crate::crawler::DEFAULT_TABLE_SELECTOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    20
}

fn default_artifact_dir() -> String {
    "./artifacts".to_string()
}

fn default_database_path() -> String {
    "./tablecrawl.db".to_string()
}

fn default_crawler_name() -> String {
    "tablecrawl".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
