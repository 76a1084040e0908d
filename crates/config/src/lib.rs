//! Configuration loading, validation, and management for inlet.
//!
//! Loads configuration from `~/.inlet/config.toml` with environment
//! variable overrides. Validates all settings at startup. TLS verification
//! is a per-client value threaded into each network-call site from here —
//! there is no process-wide toggle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.inlet/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InletConfig {
    /// Relay endpoint and exchange behavior
    #[serde(default)]
    pub relay: RelayConfig,

    /// Web-search backend and fetch pipeline settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// Settings for the relay exchange path.
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Streaming chat endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Non-streamed endpoint for background tasks (title/tag generation)
    #[serde(default = "default_task_endpoint")]
    pub task_endpoint: String,

    /// API key, sent as `Authorization: Bearer` when required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Whether the endpoint requires the API key
    #[serde(default)]
    pub requires_api_key: bool,

    /// Whether to verify the endpoint's TLS certificate
    #[serde(default = "default_true")]
    pub verify_certificate: bool,

    /// Preferred language for user-facing messages ("en" or "fr")
    #[serde(default = "default_language")]
    pub language: String,

    /// Token budget for inlining full document content into context
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Timeout for non-streamed task calls
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Timeout for streamed interactive calls (first byte can be slow)
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,

    /// Cosmetic delay between content emissions, 0 to disable
    #[serde(default = "default_smoothing_delay")]
    pub smoothing_delay_ms: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/chat/streaming".into()
}
fn default_task_endpoint() -> String {
    "http://localhost:8080/api/chat/task".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_max_context_tokens() -> usize {
    8000
}
fn default_task_timeout() -> u64 {
    30
}
fn default_stream_timeout() -> u64 {
    90
}
fn default_smoothing_delay() -> u64 {
    20
}
fn default_true() -> bool {
    true
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            task_endpoint: default_task_endpoint(),
            api_key: None,
            requires_api_key: false,
            verify_certificate: true,
            language: default_language(),
            max_context_tokens: default_max_context_tokens(),
            task_timeout_secs: default_task_timeout(),
            stream_timeout_secs: default_stream_timeout(),
            smoothing_delay_ms: default_smoothing_delay(),
        }
    }
}

/// Settings for the search backend and concurrent fetch pipeline.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Ranked-results endpoint
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Subscription key for the search backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Domain suffixes that are never fetched (deny-list, pre-network)
    #[serde(default)]
    pub ignored_websites: Vec<String>,

    /// Optional positive domain filter; empty = allow all
    #[serde(default)]
    pub included_domains: Vec<String>,

    /// How many scraped pages to return to the caller
    #[serde(default = "default_returned_pages")]
    pub returned_pages: usize,

    /// How many candidate pages to scrape (should exceed returned_pages)
    #[serde(default = "default_scraped_pages")]
    pub scraped_pages: usize,

    /// Word limit applied to each page's extracted text
    #[serde(default = "default_page_words_limit")]
    pub page_words_limit: usize,

    /// Whether to publish one citation event per retained result
    #[serde(default = "default_true")]
    pub citation_links: bool,

    /// Per-page fetch timeout, kept short so one slow page can't stall the batch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Bound on concurrently in-flight page fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_search_endpoint() -> String {
    "https://api.bing.microsoft.com/v7.0/search".into()
}
fn default_returned_pages() -> usize {
    3
}
fn default_scraped_pages() -> usize {
    6
}
fn default_page_words_limit() -> usize {
    5000
}
fn default_fetch_timeout() -> u64 {
    20
}
fn default_concurrency() -> usize {
    6
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            ignored_websites: Vec::new(),
            included_domains: Vec::new(),
            returned_pages: default_returned_pages(),
            scraped_pages: default_scraped_pages(),
            page_words_limit: default_page_words_limit(),
            citation_links: true,
            fetch_timeout_secs: default_fetch_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("endpoint", &self.endpoint)
            .field("task_endpoint", &self.task_endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("requires_api_key", &self.requires_api_key)
            .field("verify_certificate", &self.verify_certificate)
            .field("language", &self.language)
            .field("max_context_tokens", &self.max_context_tokens)
            .field("task_timeout_secs", &self.task_timeout_secs)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("smoothing_delay_ms", &self.smoothing_delay_ms)
            .finish()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("ignored_websites", &self.ignored_websites)
            .field("included_domains", &self.included_domains)
            .field("returned_pages", &self.returned_pages)
            .field("scraped_pages", &self.scraped_pages)
            .field("page_words_limit", &self.page_words_limit)
            .field("citation_links", &self.citation_links)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl InletConfig {
    /// Load configuration from the default path (~/.inlet/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `INLET_ENDPOINT`, `INLET_TASK_ENDPOINT`
    /// - `INLET_API_KEY`
    /// - `INLET_SEARCH_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(endpoint) = std::env::var("INLET_ENDPOINT") {
            config.relay.endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("INLET_TASK_ENDPOINT") {
            config.relay.task_endpoint = endpoint;
        }
        if config.relay.api_key.is_none() {
            config.relay.api_key = std::env::var("INLET_API_KEY").ok();
        }
        if config.search.api_key.is_none() {
            config.search.api_key = std::env::var("INLET_SEARCH_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".inlet")
    }

    /// Validate the configuration and normalize page counts.
    ///
    /// `returned_pages` is clamped to `scraped_pages` rather than rejected,
    /// matching how the fetch pipeline treats the pair.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.relay.language != "en" && self.relay.language != "fr" {
            return Err(ConfigError::ValidationError(format!(
                "unsupported language '{}', expected 'en' or 'fr'",
                self.relay.language
            )));
        }
        if self.search.scraped_pages == 0 {
            return Err(ConfigError::ValidationError(
                "scraped_pages must be at least 1".into(),
            ));
        }
        if self.search.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.search.returned_pages > self.search.scraped_pages {
            self.search.returned_pages = self.search.scraped_pages;
        }
        Ok(())
    }

    /// Generate a default config TOML string (for first-run setup).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
