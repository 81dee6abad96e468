use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::trace;

use crate::error::CacheError;

/// A cached upstream reply, stored verbatim and never re-parsed.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub created_at: Instant,
    pub response_bytes: Arc<Vec<u8>>,
}

/// Result of consulting the cache's dual-threshold freshness policy for a key.
#[derive(Debug)]
pub enum Freshness {
    /// age <= refresh threshold: return immediately, no upstream call.
    Fresh(Arc<Vec<u8>>),
    /// refresh threshold < age <= expire threshold: usable but must be
    /// renewed with a synchronous upstream call before being returned.
    StaleUsable(Arc<Vec<u8>>),
    /// No entry, or age > expire threshold (in which case the entry was
    /// just evicted).
    Miss,
}

/// Fingerprint-keyed cache of upstream JSON-RPC replies.
///
/// A single `tokio::sync::RwLock` guards the map: `get` takes the shared
/// lock, `add`/`remove`/`delete_stale` take the exclusive lock. No lock is
/// held across I/O — callers release the lock (by letting the guard drop,
/// which happens at the end of each method below) before making any
/// upstream call.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<RwLock<HashMap<String, CachedEntry>>>,
    refresh_threshold: Duration,
    expire_threshold: Duration,
}

impl ResultCache {
    pub fn new(refresh_threshold: Duration, expire_threshold: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            refresh_threshold,
            expire_threshold,
        }
    }

    pub fn expire_threshold(&self) -> Duration {
        self.expire_threshold
    }

    /// Inserts or overwrites the entry for `key` with `created_at = now`.
    pub async fn add(&self, key: String, response_bytes: Vec<u8>) {
        let mut guard = self.inner.write().await;
        guard.insert(
            key,
            CachedEntry { created_at: Instant::now(), response_bytes: Arc::new(response_bytes) },
        );
    }

    pub async fn get(&self, key: &str) -> Option<CachedEntry> {
        let guard = self.inner.read().await;
        guard.get(key).cloned()
    }

    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        guard.remove(key).map(|_| ()).ok_or(CacheError::NotFound)
    }

    /// Removes every entry with `now - created_at > ttl`. Returns the
    /// number of entries removed, for logging.
    pub async fn delete_stale(&self, ttl: Duration) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Applies the refresh/expire freshness policy to `key`. If the entry
    /// has expired, it is evicted here (so the caller sees a plain `Miss`,
    /// identical to a true cache miss).
    pub async fn freshness(&self, key: &str) -> Freshness {
        let Some(entry) = self.get(key).await else {
            return Freshness::Miss;
        };

        let age = entry.created_at.elapsed();
        if age <= self.refresh_threshold {
            trace!(key, age_ms = age.as_millis() as u64, "cache fresh hit");
            Freshness::Fresh(entry.response_bytes)
        } else if age <= self.expire_threshold {
            trace!(key, age_ms = age.as_millis() as u64, "cache stale-usable hit");
            Freshness::StaleUsable(entry.response_bytes)
        } else {
            trace!(key, age_ms = age.as_millis() as u64, "cache entry expired, evicting");
            let _ = self.remove(key).await;
            Freshness::Miss
        }
    }
}
