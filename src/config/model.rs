// src/config/model.rs

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::tools::ToolKind;
use crate::types::RetryStrategy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// max_concurrency = 3
/// call_timeout_ms = 30000
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 500
/// strategy = "linear"
///
/// [cache]
/// ttl_secs = 86400
///
/// [tools.weather]
/// url = "https://tools.internal/weather"
/// api_key_env = "WEATHER_API_KEY"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub cache: CacheSection,

    /// Endpoints from `[tools.<name>]`.
    #[serde(default)]
    pub tools: HashMap<ToolKind, ToolEndpoint>,
}

/// Validated configuration. Obtain one through `ConfigFile::try_from(raw)`
/// or the loader; `ConfigFile::default()` is always valid.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub engine: EngineSection,
    pub retry: RetrySection,
    pub cache: CacheSection,
    pub tools: HashMap<ToolKind, ToolEndpoint>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            engine: raw.engine,
            retry: raw.retry,
            cache: raw.cache,
            tools: raw.tools,
        }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Maximum number of tasks executing at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upper bound on a single tool call; an attempt exceeding it fails.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_max_concurrency() -> usize {
    3
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl EngineSection {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total attempts per tool call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default)]
    pub strategy: RetryStrategy,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            strategy: RetryStrategy::default(),
        }
    }
}

/// `[cache]` section.
///
/// Backend selection is *not* configured here: it depends only on whether
/// the shared-store credentials are present in the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval of the best-effort sweep of the in-memory backend
    /// (0 disables it; reads re-check freshness regardless).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Timeout for requests to the shared store.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

fn default_ttl_secs() -> u64 {
    crate::cache::DEFAULT_TTL.as_secs()
}

fn default_cleanup_interval_secs() -> u64 {
    600
}

fn default_remote_timeout_ms() -> u64 {
    2_000
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            remote_timeout_ms: default_remote_timeout_ms(),
        }
    }
}

/// `[tools.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolEndpoint {
    pub url: String,

    /// Name of the environment variable holding a bearer token, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
}
