// src/cache/remote.rs

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, RemoteCredentials, ResultCache};
use crate::errors::CacheError;
use crate::types::{BoxFuture, CacheBackendKind};

/// Reply shape of the REST key-value protocol: `{"result": ...}` on success,
/// `{"error": "..."}` otherwise.
#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared result cache speaking the Redis-over-REST convention:
///
/// - `GET  {base}/ping`
/// - `GET  {base}/get/{key}`            -> `{"result": "<string>" | null}`
/// - `POST {base}/set/{key}?EX={secs}`  (body: the string to store)
/// - `GET  {base}/del/{key}`
///
/// Values are stored as a JSON-encoded [`CacheEntry`], so freshness is
/// re-checked on every read even if the store's own expiry lags.
#[derive(Debug, Clone)]
pub struct RestCache {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl RestCache {
    /// Build the client and check that the store answers and accepts the
    /// token.
    pub async fn connect(creds: &RemoteCredentials, timeout: Duration) -> Result<Self, CacheError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let cache = Self {
            base_url: creds.url.trim_end_matches('/').to_string(),
            token: creds.token.clone(),
            http,
        };
        cache.ping().await?;
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.command(self.http.get(self.url("ping"))).await.map(|_| ())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let url = self.url(&format!("del/{key}"));
        self.command(self.http.get(url)).await.map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn command(&self, req: reqwest::RequestBuilder) -> Result<Option<Value>, CacheError> {
        let resp = req.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        let reply: RestReply = resp.json().await?;

        if let Some(err) = reply.error {
            return Err(CacheError::Unavailable(format!("HTTP {status}: {err}")));
        }
        if !status.is_success() {
            return Err(CacheError::Unavailable(format!("HTTP {status}")));
        }
        Ok(reply.result)
    }

    async fn fetch(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let url = self.url(&format!("get/{key}"));
        let raw = match self.command(self.http.get(url)).await? {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => return Ok(None),
            Some(other) => other.to_string(),
        };

        let entry: CacheEntry = serde_json::from_str(&raw)?;
        if entry.is_expired() {
            debug!(key = %key, "shared cache returned a stale entry; evicting");
            if let Err(err) = self.delete(key).await {
                debug!(key = %key, error = %err, "failed to evict stale shared entry");
            }
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn store(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl);
        let body = serde_json::to_string(&entry)?;
        // The store's own expiry is advisory; reads re-check `stored_at`.
        let secs = ttl.as_secs().max(1);
        let url = self.url(&format!("set/{key}?EX={secs}"));
        self.command(self.http.post(url).body(body)).await.map(|_| ())
    }
}

impl ResultCache for RestCache {
    fn backend(&self) -> CacheBackendKind {
        CacheBackendKind::Remote
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, CacheError>> {
        Box::pin(self.fetch(key))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(self.store(key, value, ttl))
    }
}
