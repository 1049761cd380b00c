use serde::Deserialize;

/// Main configuration structure for Ripple-Index
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Seed URLs for batch sessions
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawl session bounds and pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum hop distance from a seed (seeds are depth 0)
    pub max_depth: u32,

    /// Maximum number of links admitted from a single page
    pub max_fan_out: usize,

    /// Number of concurrent workers draining the frontier
    pub worker_count: usize,

    /// Pending-queue capacity; admissions beyond it are dropped
    pub queue_capacity: usize,

    /// Per-request fetch timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// Wall-clock bound for a whole session (seconds)
    pub session_timeout_secs: u64,

    /// Interval between background index flushes (seconds, 0 disables)
    pub flush_interval_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_fan_out: 10,
            worker_count: 5,
            queue_capacity: 1000,
            request_timeout_ms: 10_000,
            session_timeout_secs: 600,
            flush_interval_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Which discovered links are followed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Host patterns (e.g., "en.wikipedia.org" or "*.example.com")
    pub allowed_hosts: Vec<String>,

    /// Required path prefix, e.g. "/wiki/"
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Case-insensitive substrings that reject a link's path or query
    #[serde(default = "default_deny_segments")]
    pub deny_segments: Vec<String>,
}

/// Administrative and non-content path fragments skipped by default
pub const DEFAULT_DENY_SEGMENTS: &[&str] = &[
    "account",
    "login",
    "logout",
    "sign",
    "register",
    "contact",
    "special",
    "module",
    "template",
    "help",
    "talk",
    "user",
    "wikidata",
    "wikibooks",
    "wikiversity",
    "wikinews",
    "wikivoyage",
    "php",
    "mediawiki",
    "wikiquote",
    "wiktionary",
    "file",
    "category",
    "portal",
];

fn default_deny_segments() -> Vec<String> {
    DEFAULT_DENY_SEGMENTS.iter().map(|s| s.to_string()).collect()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Where accepted links go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Feed links back into this process's frontier
    #[default]
    Local,
    /// Forward links to a peer crawling unit
    Remote,
}

/// Link dispatch configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,

    /// Base URL of the peer unit (remote mode)
    #[serde(default)]
    pub peer: Option<String>,

    /// Consult the store's visited set before fetching
    #[serde(default)]
    pub shared_seen: bool,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8080"
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}
