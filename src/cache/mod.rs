// src/cache/mod.rs

//! Result cache.
//!
//! - [`fingerprint`] derives stable keys from a task's identity.
//! - [`memory::MemoryCache`] is the process-local backend.
//! - [`remote::RestCache`] is the shared backend, reached over HTTP.
//! - [`build_cache`] picks one, once, at startup.
//!
//! Callers only see `Arc<dyn ResultCache>`. Backend errors are reported as
//! [`CacheError`] and the Task Runner treats them as a miss; the cache can
//! slow a plan down but never fail it.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::CacheSection;
use crate::errors::CacheError;
use crate::types::{BoxFuture, CacheBackendKind};

pub mod fingerprint;
pub mod memory;
pub mod remote;

pub use fingerprint::{fingerprint, fnv1a_32, normalize_description, task_fingerprint};
pub use memory::MemoryCache;
pub use remote::RestCache;

/// Environment variable holding the shared store's base URL.
pub const CACHE_URL_ENV: &str = "PLANDAG_CACHE_URL";
/// Environment variable holding the shared store's bearer token.
pub const CACHE_TOKEN_ENV: &str = "PLANDAG_CACHE_TOKEN";

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached payload and when it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    pub ttl_secs: f64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at: Utc::now(),
            ttl_secs: ttl.as_secs_f64(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.ttl_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// An entry is stale once `ttl` has elapsed since `stored_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age = (now - self.stored_at).to_std().unwrap_or(Duration::ZERO);
        age >= self.ttl()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Content-addressed result store.
///
/// `get` must never return an entry older than its TTL, regardless of any
/// background cleanup.
pub trait ResultCache: Send + Sync + Debug {
    fn backend(&self) -> CacheBackendKind;

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>>;

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// Credentials for the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub url: String,
    pub token: String,
}

/// Everything needed to construct the cache for this process.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub cleanup_interval: Option<Duration>,
    pub remote_timeout: Duration,
    pub remote: Option<RemoteCredentials>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_config(&CacheSection::default(), None)
    }
}

impl CacheSettings {
    pub fn from_config(section: &CacheSection, remote: Option<RemoteCredentials>) -> Self {
        let cleanup_interval = match section.cleanup_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            ttl: Duration::from_secs(section.ttl_secs),
            cleanup_interval,
            remote_timeout: Duration::from_millis(section.remote_timeout_ms),
            remote,
        }
    }

    /// Read shared-store credentials from the process environment.
    pub fn from_env(section: &CacheSection) -> Self {
        Self::from_lookup(section, |var| std::env::var(var).ok())
    }

    /// Same as [`CacheSettings::from_env`] with an injectable lookup.
    ///
    /// Both the URL and the token must be present and non-blank for the
    /// remote backend to be considered.
    pub fn from_lookup(section: &CacheSection, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let remote = match (non_blank(CACHE_URL_ENV), non_blank(CACHE_TOKEN_ENV)) {
            (Some(url), Some(token)) => Some(RemoteCredentials { url, token }),
            _ => None,
        };
        Self::from_config(section, remote)
    }
}

/// Construct the process cache.
///
/// With credentials, the shared store is tried first; any failure to
/// initialise it (bad URL, unreachable, rejected token) falls back to the
/// in-memory backend with a warning.
pub async fn build_cache(settings: &CacheSettings) -> Arc<dyn ResultCache> {
    if let Some(creds) = &settings.remote {
        match RestCache::connect(creds, settings.remote_timeout).await {
            Ok(cache) => {
                info!(url = %creds.url, "using shared result cache");
                return Arc::new(cache);
            }
            Err(err) => {
                warn!(url = %creds.url, error = %err, "shared result cache unavailable; falling back to in-memory cache");
            }
        }
    } else {
        info!("no shared cache credentials; using in-memory result cache");
    }

    let cache = Arc::new(MemoryCache::new());
    if let Some(interval) = settings.cleanup_interval {
        MemoryCache::spawn_cleanup(&cache, interval);
    }
    cache
}
