//! Streaming asset cache
//!
//! Key-addressed cache of base assets with:
//! - **Request deduplication**: the first request for a key records the load
//!   as pending before any I/O happens, so every later request for that key
//!   joins the same load.
//! - **Clone-on-checkout**: every [`StreamingCache::load`] returns an
//!   independent [`CachedAsset::deep_clone`] of the base; the base itself is
//!   never handed out.
//! - **LRU eviction**: each request refreshes its key; inserting past capacity
//!   evicts the least recently used key.
//! - **Deferred disposal**: a base is disposed exactly once, after it has
//!   been evicted and the last in-flight checkout has copied it. A key
//!   evicted while still loading is parked until its load settles, and a new
//!   request for it revives the parked load instead of starting another.
//!
//! Inside a Tokio runtime every load is spawned as soon as it is created, so
//! it runs to completion even if every request for it is dropped. Outside a
//! runtime a load makes progress only while some checkout is polled. A failed,
//! timed-out or interrupted load removes its entry so the next request starts
//! fresh.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::{AssetLoader, LoadError};

/// An asset the cache can hand out copies of
pub trait CachedAsset: Send + Sync + Sized + 'static {
    /// Independent copy sharing no mutable state with `self`
    fn deep_clone(&self) -> Self;

    /// Release heavyweight resources held by a base asset.
    ///
    /// Called exactly once per base, never on checked-out copies. Must not
    /// call back into the cache.
    fn dispose(&self) {}
}

/// Cache errors
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Failed to load '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: LoadError,
    },

    #[error("Loading '{key}' timed out after {after:?}")]
    Timeout { key: String, after: Duration },

    #[error("Loading '{key}' was interrupted: {message}")]
    Interrupted { key: String, message: String },
}

impl CacheError {
    /// Key of the failed request
    pub fn key(&self) -> &str {
        match self {
            Self::Load { key, .. } | Self::Timeout { key, .. } | Self::Interrupted { key, .. } => {
                key
            }
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached keys (at least 1)
    pub capacity: usize,
    /// Give up on a load after this many milliseconds
    pub load_timeout_ms: Option<u64>,
}

impl CacheConfig {
    /// Default number of cached keys
    pub const DEFAULT_CAPACITY: usize = 20;

    /// Config with the given capacity and no timeout
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the load timeout, rounded up to whole milliseconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.load_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Capacity clamped to at least one key
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }

    /// Load timeout, if any
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            load_timeout_ms: None,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to `load`
    pub requests: u64,
    /// Requests served from a resolved base
    pub hits: u64,
    /// Requests that joined a pending load
    pub joins: u64,
    /// Requests that started a new load
    pub misses: u64,
    /// Keys evicted for capacity
    pub evictions: u64,
    /// Base assets disposed
    pub disposals: u64,
    /// Loads that failed or timed out
    pub failures: u64,
    /// Requests that revived a parked load
    pub revivals: u64,
}

impl CacheStats {
    /// Fraction of requests that did not start a load
    pub fn hit_rate(&self) -> f32 {
        if self.requests == 0 {
            0.0
        } else {
            (self.hits + self.joins + self.revivals) as f32 / self.requests as f32
        }
    }
}

/// A base asset owned by the cache. Disposed when the last reference drops.
struct Resident<A: CachedAsset> {
    key: String,
    asset: A,
    disposals: Arc<AtomicU64>,
}

impl<A: CachedAsset> Drop for Resident<A> {
    fn drop(&mut self) {
        log::debug!("Disposing base asset '{}'", self.key);
        self.asset.dispose();
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

type SharedLoad<A> = Shared<BoxFuture<'static, Result<Arc<Resident<A>>, CacheError>>>;

struct CacheEntry<A: CachedAsset> {
    generation: u64,
    load: SharedLoad<A>,
    base: Option<Arc<Resident<A>>>,
}

struct CacheInner<A: CachedAsset> {
    entries: HashMap<String, CacheEntry<A>>,
    /// Front is least recently used
    recency: VecDeque<String>,
    /// Evicted while pending; dropped when their load settles
    retiring: HashMap<String, CacheEntry<A>>,
    capacity: usize,
    next_generation: u64,
    stats: CacheStats,
}

impl<A: CachedAsset> CacheInner<A> {
    fn touch(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_back(key.to_string());
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            let Some(key) = self.recency.pop_front() else {
                break;
            };
            let Some(entry) = self.entries.remove(&key) else {
                continue;
            };
            self.stats.evictions += 1;
            if entry.base.is_some() {
                log::debug!("Evicting '{}'", key);
            } else {
                log::debug!("Evicting '{}' while loading; disposal deferred", key);
                self.retiring.insert(key, entry);
            }
        }
    }

    fn settle(&mut self, key: &str, generation: u64, result: &Result<Arc<Resident<A>>, CacheError>) {
        match result {
            Ok(base) => {
                if let Some(entry) = self
                    .entries
                    .get_mut(key)
                    .filter(|e| e.generation == generation)
                {
                    entry.base = Some(Arc::clone(base));
                    log::trace!("Loaded '{}'", key);
                } else if self
                    .retiring
                    .get(key)
                    .map_or(false, |e| e.generation == generation)
                {
                    self.retiring.remove(key);
                    log::debug!("Evicted load of '{}' settled", key);
                }
            }
            Err(err) => {
                self.stats.failures += 1;
                log::warn!("{}", err);
                if self
                    .entries
                    .get(key)
                    .map_or(false, |e| e.generation == generation)
                {
                    self.entries.remove(key);
                    self.recency.retain(|k| k != key);
                } else if self
                    .retiring
                    .get(key)
                    .map_or(false, |e| e.generation == generation)
                {
                    self.retiring.remove(key);
                }
            }
        }
    }
}

enum Checkout<A: CachedAsset> {
    Ready(A),
    Wait(SharedLoad<A>),
}

/// Asynchronous LRU cache of base assets with clone-on-checkout
pub struct StreamingCache<A: CachedAsset> {
    inner: Arc<Mutex<CacheInner<A>>>,
    loader: Arc<dyn AssetLoader<A>>,
    config: CacheConfig,
    disposals: Arc<AtomicU64>,
}

impl<A: CachedAsset> StreamingCache<A> {
    /// Create a cache over `loader`
    pub fn new(loader: Arc<dyn AssetLoader<A>>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                retiring: HashMap::new(),
                capacity: config.effective_capacity(),
                next_generation: 0,
                stats: CacheStats::default(),
            })),
            loader,
            config,
            disposals: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check out a copy of the asset for `key`.
    ///
    /// Bookkeeping happens when this is called, not when the future is first
    /// polled: the key is refreshed and, on a miss, recorded as pending
    /// before returning, so callers issued before the load resolves share it.
    pub fn load(&self, key: &str) -> BoxFuture<'static, Result<A, CacheError>> {
        match self.checkout(key) {
            Checkout::Ready(copy) => futures_util::future::ready(Ok(copy)).boxed(),
            Checkout::Wait(load) => async move {
                let base = load.await?;
                Ok(base.asset.deep_clone())
            }
            .boxed(),
        }
    }

    fn checkout(&self, key: &str) -> Checkout<A> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.stats.requests += 1;

        if let Some(entry) = inner.entries.get(key) {
            let checkout = match &entry.base {
                Some(base) => {
                    inner.stats.hits += 1;
                    log::trace!("Cache hit '{}'", key);
                    Checkout::Ready(base.asset.deep_clone())
                }
                None => {
                    inner.stats.joins += 1;
                    log::trace!("Joining pending load of '{}'", key);
                    Checkout::Wait(entry.load.clone())
                }
            };
            inner.touch(key);
            return checkout;
        }

        let (entry, checkout) = match inner.retiring.remove(key) {
            Some(entry) => {
                inner.stats.revivals += 1;
                log::debug!("Reviving pending load of '{}'", key);
                let load = entry.load.clone();
                (entry, Checkout::Wait(load))
            }
            None => {
                inner.stats.misses += 1;
                log::debug!("Cache miss '{}'", key);
                let generation = inner.next_generation;
                inner.next_generation += 1;
                let load = self.start_load(key, generation);
                let entry = CacheEntry {
                    generation,
                    load: load.clone(),
                    base: None,
                };
                (entry, Checkout::Wait(load))
            }
        };

        inner.entries.insert(key.to_string(), entry);
        inner.touch(key);
        inner.evict_overflow();
        checkout
    }

    fn start_load(&self, key: &str, generation: u64) -> SharedLoad<A> {
        let work = self.load_task(key, generation);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return work.shared();
        };

        let task = runtime.spawn(work);
        let key = key.to_string();
        let inner = Arc::downgrade(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join) => {
                    let err = CacheError::Interrupted {
                        key: key.clone(),
                        message: join.to_string(),
                    };
                    if let Some(inner) = inner.upgrade() {
                        inner.lock().settle(&key, generation, &Err(err.clone()));
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Read and settle one key
    fn load_task(
        &self,
        key: &str,
        generation: u64,
    ) -> BoxFuture<'static, Result<Arc<Resident<A>>, CacheError>> {
        let key = key.to_string();
        let loader = Arc::clone(&self.loader);
        let inner: Weak<Mutex<CacheInner<A>>> = Arc::downgrade(&self.inner);
        let disposals = Arc::clone(&self.disposals);
        let timeout = self.config.load_timeout();

        async move {
            let loaded = match timeout {
                Some(after) => match tokio::time::timeout(after, loader.load(&key)).await {
                    Ok(loaded) => loaded,
                    Err(_) => {
                        let err = CacheError::Timeout {
                            key: key.clone(),
                            after,
                        };
                        if let Some(inner) = inner.upgrade() {
                            inner.lock().settle(&key, generation, &Err(err.clone()));
                        }
                        return Err(err);
                    }
                },
                None => loader.load(&key).await,
            };

            let result = match loaded {
                Ok(asset) => Ok(Arc::new(Resident {
                    key: key.clone(),
                    asset,
                    disposals,
                })),
                Err(source) => Err(CacheError::Load {
                    key: key.clone(),
                    source,
                }),
            };
            if let Some(inner) = inner.upgrade() {
                inner.lock().settle(&key, generation, &result);
            }
            result
        }
        .boxed()
    }

    /// Forget every entry.
    ///
    /// Resolved bases are disposed once no checkout still holds them;
    /// pending loads are parked and their results disposed when they settle.
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let count = inner.entries.len();
        for (key, entry) in inner.entries.drain() {
            if entry.base.is_none() {
                inner.retiring.insert(key, entry);
            }
        }
        inner.recency.clear();
        log::debug!("Cleared {} cache entries", count);
    }

    /// Whether `key` is cached, pending or resolved
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Whether `key` has a resolved base
    pub fn is_resolved(&self, key: &str) -> bool {
        self.inner
            .lock()
            .entries
            .get(key)
            .map_or(false, |e| e.base.is_some())
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if no keys are cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicted keys whose loads have not settled yet
    pub fn pending_evictions(&self) -> usize {
        self.inner.lock().retiring.len()
    }

    /// Cached keys, least recently used first
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.inner.lock().recency.iter().cloned().collect()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.inner.lock().stats;
        stats.disposals = self.disposals.load(Ordering::SeqCst);
        stats
    }

    /// Maximum number of cached keys
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Configuration the cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<A: CachedAsset> Clone for StreamingCache<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            loader: Arc::clone(&self.loader),
            config: self.config.clone(),
            disposals: Arc::clone(&self.disposals),
        }
    }
}

impl<A: CachedAsset> fmt::Debug for StreamingCache<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}
