//! Expiring memoized cache with single-flight loads.
//!
//! [`MemoCache`] is an in-process key/value store where every entry carries
//! its own TTL, plus a registry of loads currently in flight. [`MemoCache::wrap`]
//! is the operation route handlers use: it returns a fresh cached value when
//! there is one, otherwise it attaches to the load already running for that
//! key, otherwise it starts one. However many callers ask for a key while its
//! load is pending, the loader runs once and every caller receives the same
//! `Arc`.
//!
//! # Concurrency
//!
//! Entries and in-flight records share one mutex that is never held across an
//! `.await`. The fresh-entry check, the in-flight lookup and the registration
//! of a new load happen under a single acquisition, so two callers can never
//! both conclude that nothing is in flight for the same key.
//!
//! A load is a [`Shared`] future. It makes progress while at least one caller
//! polls it, and it settles (populates the cache, deregisters itself) exactly
//! once. If every caller gives up, the registered record still holds the load
//! and the next caller for that key resumes it. Loads have no timeout at this
//! layer; a loader that never completes keeps its key marked in flight until
//! [`MemoCache::clear_all`] or a matching [`MemoCache::clear_namespace`].
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(MemoCache::new());
//! let products = cache
//!     .wrap("product:all", Duration::from_secs(60), move || async move {
//!         source.list_products().await
//!     })
//!     .await?;
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use vitrine_core::CacheSettings;

use super::key::CacheKey;
use super::stats::CacheStats;

type ErasedValue = Arc<dyn Any + Send + Sync>;
type SharedLoad<T, E> = Shared<BoxFuture<'static, Result<Arc<T>, E>>>;

/// Generation handed to loads that were never registered; real registrations
/// start at 1.
const UNREGISTERED: u64 = 0;

/// A stored key and its expiry, as listed by [`MemoCache::list_keys`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key: String,
    /// Expiry in milliseconds since the Unix epoch, `0` for never.
    pub expires_at_ms: i64,
}

impl KeyInfo {
    /// Whether the entry was stored without a TTL.
    pub fn never_expires(&self) -> bool {
        self.expires_at_ms == 0
    }
}

struct Entry {
    value: ErasedValue,
    type_name: &'static str,
    deadline: Option<Instant>,
    expires_at_ms: i64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

struct InFlight {
    generation: u64,
    /// A `SharedLoad<T, E>` for the `T`/`E` of the caller that registered it.
    load: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
    stats: CacheStats,
}

impl State {
    fn lookup<T>(&mut self, key: &str, now: Instant) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let Some(entry) = self.entries.get(key) else {
            self.stats.misses += 1;
            return None;
        };

        if entry.is_expired(now) {
            self.entries.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            debug!(key, "cache entry expired");
            return None;
        }

        match Arc::clone(&entry.value).downcast::<T>() {
            Ok(value) => {
                self.stats.hits += 1;
                Some(value)
            }
            Err(_) => {
                warn!(
                    key,
                    stored = entry.type_name,
                    requested = type_name::<T>(),
                    "cache entry holds a different type"
                );
                self.stats.misses += 1;
                None
            }
        }
    }

    fn store(&mut self, key: String, value: ErasedValue, type_name: &'static str, ttl: Duration) {
        let (deadline, expires_at_ms) = if ttl.is_zero() {
            (None, 0)
        } else {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            (
                Instant::now().checked_add(ttl),
                Utc::now().timestamp_millis().saturating_add(ttl_ms),
            )
        };

        self.entries.insert(
            key,
            Entry {
                value,
                type_name,
                deadline,
                expires_at_ms,
            },
        );
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len() as u64,
            in_flight: self.in_flight.len() as u64,
            ..self.stats.clone()
        }
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process cache with per-entry TTL and single-flight loading.
///
/// Construct one per process at the composition root and share it behind an
/// `Arc`. Values are stored type-erased; each call site reads back the type it
/// stored. Reading a key with a different type than it holds behaves like a
/// miss.
pub struct MemoCache {
    state: Arc<Mutex<State>>,
    settings: CacheSettings,
}

impl MemoCache {
    /// Create a cache with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    /// Create a cache with the given settings.
    pub fn with_settings(settings: CacheSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            settings,
        }
    }

    /// Get the cache settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// TTL configured for the namespace of `key`, or the default TTL for keys
    /// outside the known namespaces.
    pub fn ttl_for(&self, key: &str) -> Duration {
        CacheKey::parse(key)
            .map(|k| k.namespace().ttl(&self.settings))
            .unwrap_or(self.settings.default_ttl)
    }

    /// Get a fresh value.
    ///
    /// An entry whose TTL has passed is removed and reported as absent.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lock(&self.state).lookup(key, Instant::now())
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// A zero `ttl` stores the entry without expiry. Returns the shared value.
    pub fn set<T>(&self, key: &str, value: T, ttl: Duration) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        self.set_arc(key, Arc::new(value), ttl)
    }

    /// Like [`MemoCache::set`] for a value that is already shared.
    pub fn set_arc<T>(&self, key: &str, value: Arc<T>, ttl: Duration) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let erased: ErasedValue = Arc::clone(&value) as ErasedValue;
        lock(&self.state).store(key.to_string(), erased, type_name::<T>(), ttl);
        value
    }

    /// Remove the entry for `key`. Returns whether there was one.
    pub fn delete(&self, key: &str) -> bool {
        lock(&self.state).entries.remove(key).is_some()
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Loads in flight under the prefix are forgotten as in
    /// [`MemoCache::clear_all`]: they still answer their own callers but no
    /// longer populate the cache, so data read before an invalidating write
    /// cannot land after it. Returns the number of removed entries.
    pub fn clear_namespace(&self, prefix: &str) -> usize {
        let mut state = lock(&self.state);
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - state.entries.len();

        let in_flight_before = state.in_flight.len();
        state.in_flight.retain(|key, _| !key.starts_with(prefix));
        let forgotten = in_flight_before - state.in_flight.len();

        debug!(prefix, removed, forgotten, "cleared cache namespace");
        removed
    }

    /// Remove every entry and forget every in-flight load.
    ///
    /// Callers already awaiting a forgotten load still receive its result, but
    /// that result is not cached; the next `wrap` for the key starts over.
    pub fn clear_all(&self) {
        let mut state = lock(&self.state);
        let entries = state.entries.len();
        let in_flight = state.in_flight.len();
        state.entries.clear();
        state.in_flight.clear();
        debug!(entries, in_flight, "cleared cache");
    }

    /// Snapshot of stored keys and their expiries, sorted by key.
    ///
    /// Entries past their TTL are listed until something evicts them.
    pub fn list_keys(&self) -> Vec<KeyInfo> {
        let state = lock(&self.state);
        let mut keys: Vec<KeyInfo> = state
            .entries
            .iter()
            .map(|(key, entry)| KeyInfo {
                key: key.clone(),
                expires_at_ms: entry.expires_at_ms,
            })
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));
        keys
    }

    /// Evict every entry whose TTL has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = lock(&self.state);
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();
        state.stats.expirations += removed as u64;
        removed
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads currently in flight.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    /// Get a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        lock(&self.state).snapshot()
    }

    /// Zero the accumulated counters.
    pub fn reset_stats(&self) {
        lock(&self.state).stats = CacheStats::default();
    }

    /// Return the cached value for `key`, loading it with `loader` on a miss.
    ///
    /// 1. A fresh entry is returned without calling `loader`.
    /// 2. If a load for `key` is already in flight, the caller awaits that
    ///    load's result and `loader` is dropped uncalled.
    /// 3. Otherwise a new load is registered and `loader` runs. On success the
    ///    value is stored with `ttl` (zero means no expiry); on failure nothing
    ///    is stored. Either way the load is deregistered as soon as it settles,
    ///    and every waiting caller receives the same outcome.
    ///
    /// Errors are the loader's own, cloned to each waiter. They are never
    /// cached: the next call after a failure runs the loader again.
    pub async fn wrap<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let load: SharedLoad<T, E> = {
            let mut state = lock(&self.state);

            if let Some(value) = state.lookup::<T>(key, Instant::now()) {
                return Ok(value);
            }

            let existing = state
                .in_flight
                .get(key)
                .map(|in_flight| in_flight.load.downcast_ref::<SharedLoad<T, E>>().cloned());

            match existing {
                Some(Some(load)) => {
                    state.stats.coalesced_waits += 1;
                    debug!(key, "joining in-flight load");
                    load
                }
                Some(None) => {
                    warn!(
                        key,
                        requested = type_name::<T>(),
                        "in-flight load has a different type, loading without coalescing"
                    );
                    state.stats.loads_started += 1;
                    let weak = Arc::downgrade(&self.state);
                    run_load(weak, key.to_string(), UNREGISTERED, ttl, loader)
                        .boxed()
                        .shared()
                }
                None => {
                    state.next_generation += 1;
                    let generation = state.next_generation;
                    let weak = Arc::downgrade(&self.state);
                    let load = run_load(weak, key.to_string(), generation, ttl, loader)
                        .boxed()
                        .shared();
                    state.in_flight.insert(
                        key.to_string(),
                        InFlight {
                            generation,
                            load: Box::new(load.clone()),
                        },
                    );
                    state.stats.loads_started += 1;
                    debug!(key, generation, "starting load");
                    load
                }
            }
        };

        load.await
    }
}

/// Run `loader` and settle the in-flight record registered as `generation`.
///
/// The result is cached only while that record is still the registered one;
/// a load forgotten by `clear_all` just hands its result to its own waiters.
async fn run_load<T, E, F, Fut>(
    state: Weak<Mutex<State>>,
    key: String,
    generation: u64,
    ttl: Duration,
    loader: F,
) -> Result<Arc<T>, E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let outcome = loader().await.map(Arc::new);

    let Some(state) = state.upgrade() else {
        return outcome;
    };
    let mut state = lock(&state);

    let registered = state
        .in_flight
        .get(&key)
        .is_some_and(|in_flight| in_flight.generation == generation);
    if registered {
        state.in_flight.remove(&key);
    }

    match &outcome {
        Ok(value) if registered => {
            let erased: ErasedValue = Arc::clone(value) as ErasedValue;
            state.store(key.clone(), erased, type_name::<T>(), ttl);
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            debug!(key = %key, generation, ttl_ms, "load cached");
        }
        Ok(_) => {
            debug!(key = %key, generation, "load no longer registered, result not cached");
        }
        Err(_) => {
            state.stats.load_failures += 1;
            warn!(key = %key, generation, "load failed, nothing cached");
        }
    }

    outcome
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("MemoCache")
            .field("entries", &stats.entry_count)
            .field("in_flight", &stats.in_flight)
            .field("settings", &self.settings)
            .finish()
    }
}
