//! # Query cache
//! Memoizes store results per `(sql, params)` with an absolute TTL (no
//! sliding refresh). A miss runs the query on the wrapped store.

use anyhow::Result;
use metrics::counter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::query::{BoundQuery, QueryOutput};
use crate::store::ItemStore;

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Storage behind [`CachedStore`]. Swap it out to test without timing.
pub trait QueryCache: Send + Sync {
    fn get(&self, key: &str) -> Option<QueryOutput>;
    fn put(&self, key: String, value: QueryOutput);
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    value: QueryOutput,
}

/// In-memory map with a fixed time-to-live.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache for TtlCache {
    fn get(&self, key: &str) -> Option<QueryOutput> {
        let mut map = match self.entries.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        let fresh = map
            .get(key)
            .map(|e| e.stored_at.elapsed() < self.ttl)?;
        if fresh {
            map.get(key).map(|e| e.value.clone())
        } else {
            map.remove(key);
            None
        }
    }

    fn put(&self, key: String, value: QueryOutput) {
        let mut map = match self.entries.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        // Drop expired entries so the map does not grow with one-off filters.
        let ttl = self.ttl;
        map.retain(|_, e| e.stored_at.elapsed() < ttl);
        map.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }
}

/// [`ItemStore`] wrapper that consults a [`QueryCache`] first.
pub struct CachedStore<S> {
    inner: S,
    cache: Arc<dyn QueryCache>,
}

impl<S: ItemStore> CachedStore<S> {
    pub fn new(inner: S, cache: Arc<dyn QueryCache>) -> Self {
        Self { inner, cache }
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self::new(inner, Arc::new(TtlCache::new(ttl)))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<S: ItemStore> ItemStore for CachedStore<S> {
    async fn run(&self, query: &BoundQuery) -> Result<QueryOutput> {
        let key = query.cache_key();
        let label = query.kind.label();

        if let Some(hit) = self.cache.get(&key) {
            counter!("query_cache_hits_total", "kind" => label).increment(1);
            tracing::debug!(target: "cache", kind = label, "HIT");
            return Ok(hit);
        }

        counter!("query_cache_misses_total", "kind" => label).increment(1);
        tracing::debug!(target: "cache", kind = label, "MISS");

        // Errors are not cached; the next interaction retries the store.
        let fresh = self.inner.run(query).await?;
        self.cache.put(key, fresh.clone());
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
