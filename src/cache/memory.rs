// src/cache/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheEntry, ResultCache};
use crate::errors::CacheError;
use crate::types::{BoxFuture, CacheBackendKind};

/// In-memory result cache.
///
/// Every read re-checks freshness and evicts stale entries, so the optional
/// background sweep ([`MemoryCache::spawn_cleanup`]) only bounds memory; it
/// is never relied upon for correctness.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Synchronous lookup used by the async trait method.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!(key = %key, "evicting stale cache entry on read");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Insert or overwrite; last write wins.
    pub fn insert(&self, key: &str, value: Value, ttl: Duration) {
        self.lock()
            .insert(key.to_string(), CacheEntry::new(key, value, ttl));
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        before - entries.len()
    }

    /// Periodically purge expired entries until the cache is dropped.
    pub fn spawn_cleanup(cache: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    debug!("memory cache dropped; stopping cleanup");
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, "purged expired cache entries");
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultCache for MemoryCache {
    fn backend(&self) -> CacheBackendKind {
        CacheBackendKind::Memory
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>> {
        Box::pin(async move { Ok(self.get_fresh(key)) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.insert(key, value, ttl);
            Ok(())
        })
    }
}
