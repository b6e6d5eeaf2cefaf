//! Dispatcher cache
//!
//! Bounded, expiring map from class to dispatcher. Concurrent misses for the
//! same class share one synthesis: the first caller becomes the leader of an
//! in-flight build, later callers wait on it and receive its result.
//!
//! Expiry is lazy. An idle entry is dropped by the next lookup that finds it
//! (or by [`AccessorCache::purge_expired`]); there is no background thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mirror_types::{ClassId, ClassRef};
use parking_lot::{Condvar, Mutex};

use super::catalog::check_target;
use super::clock::Clock;
use super::dispatcher::TypeDispatcher;
use super::synthesizer::Synthesizer;
use crate::error::{ReflectError, ReflectResult};
use crate::options::CacheOptions;

type BuildResult = ReflectResult<Arc<TypeDispatcher>>;

struct CacheEntry {
    dispatcher: Arc<TypeDispatcher>,
    /// Clock reading of the last access, in nanoseconds
    last_access: AtomicU64,
}

impl CacheEntry {
    fn new(dispatcher: Arc<TypeDispatcher>, now: u64) -> Self {
        Self {
            dispatcher,
            last_access: AtomicU64::new(now),
        }
    }

    fn touch(&self, now: u64) {
        self.last_access.fetch_max(now, Ordering::Relaxed);
    }

    fn idle_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_access.load(Ordering::Relaxed))
    }
}

/// One in-flight synthesis
struct Flight {
    result: Mutex<Option<BuildResult>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, result: BuildResult) {
        let mut slot = self.result.lock();
        if slot.is_none() {
            *slot = Some(result);
        }
        self.done.notify_all();
    }

    fn wait(&self) -> BuildResult {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

/// Releases waiters even if the leader unwinds
struct FlightGuard<'a> {
    in_flight: &'a DashMap<ClassId, Arc<Flight>>,
    id: ClassId,
    type_name: String,
    flight: Arc<Flight>,
}

impl FlightGuard<'_> {
    fn finish(&self, result: BuildResult) {
        self.flight.complete(result);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // No-op when finish() already published a result
        self.flight.complete(Err(ReflectError::AccessorBuildFailed {
            type_name: self.type_name.clone(),
            source: Arc::new(ReflectError::SynthesisAborted {
                type_name: self.type_name.clone(),
            }),
        }));
        let flight = &self.flight;
        self.in_flight
            .remove_if(&self.id, |_, current| Arc::ptr_eq(current, flight));
    }
}

/// Cache counters
#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found no live entry
    pub misses: u64,
    /// Syntheses started
    pub builds: u64,
    /// Syntheses that failed
    pub failures: u64,
    /// Entries dropped for capacity or idleness
    pub evictions: u64,
}

/// Bounded, expiring, single-flight cache of dispatchers
pub struct AccessorCache {
    synthesizer: Synthesizer,
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    idle_nanos: u64,
    entries: DashMap<ClassId, CacheEntry>,
    in_flight: DashMap<ClassId, Arc<Flight>>,
    counters: CacheCounters,
}

impl AccessorCache {
    /// Create a cache building through `synthesizer`
    pub fn new(synthesizer: Synthesizer, options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        let shards = options.shard_amount();
        let idle_nanos = u64::try_from(options.idle_timeout.as_nanos()).unwrap_or(u64::MAX);
        Self {
            synthesizer,
            entries: DashMap::with_capacity_and_shard_amount(options.initial_capacity, shards),
            in_flight: DashMap::with_shard_amount(shards),
            options,
            clock,
            idle_nanos,
            counters: CacheCounters::default(),
        }
    }

    /// Synthesizer used on misses
    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Cache settings
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Number of cached dispatchers (expired entries not yet purged included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            builds: self.counters.builds.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn now(&self) -> u64 {
        u64::try_from(self.clock.now().as_nanos()).unwrap_or(u64::MAX)
    }

    fn is_expired(&self, entry: &CacheEntry, now: u64) -> bool {
        entry.idle_for(now) >= self.idle_nanos
    }

    /// Live entry for `id`, touching it; drops the entry if it has expired
    fn fresh(&self, id: ClassId, now: u64) -> Option<Arc<TypeDispatcher>> {
        let expired = match self.entries.get(&id) {
            Some(entry) if !self.is_expired(&entry, now) => {
                entry.touch(now);
                return Some(entry.dispatcher.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired
            && self
                .entries
                .remove_if(&id, |_, entry| self.is_expired(entry, now))
                .is_some()
        {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(class_id = id.as_u64(), "expired idle dispatcher");
        }
        None
    }

    /// Cached dispatcher for `class`, without building one
    pub fn get_if_present(&self, class: &ClassRef) -> Option<Arc<TypeDispatcher>> {
        let found = self.fresh(class.id(), self.now());
        if found.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Dispatcher for `class`, synthesizing it on a miss
    ///
    /// A primitive, `void` or root class is rejected with
    /// [`ReflectError::InvalidTargetKind`] before the cache is consulted.
    pub fn get_or_build(&self, class: &ClassRef) -> ReflectResult<Arc<TypeDispatcher>> {
        check_target(class)?;
        self.get_or_insert_with(class, || self.synthesizer.compile(class))
    }

    /// Dispatcher for `class`, calling `build` on a miss
    ///
    /// At most one `build` runs per class at a time; concurrent callers block
    /// until it finishes and share its result. A failed build is reported to
    /// every waiter as [`ReflectError::AccessorBuildFailed`] and not cached.
    pub fn get_or_insert_with<F>(
        &self,
        class: &ClassRef,
        build: F,
    ) -> ReflectResult<Arc<TypeDispatcher>>
    where
        F: FnOnce() -> ReflectResult<TypeDispatcher>,
    {
        let id = class.id();
        if let Some(dispatcher) = self.fresh(id, self.now()) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(class = class.name(), "accessor cache hit");
            return Ok(dispatcher);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let flight = match self.in_flight.entry(id) {
            Entry::Occupied(entry) => {
                let flight = entry.get().clone();
                drop(entry);
                tracing::trace!(class = class.name(), "waiting for in-flight synthesis");
                return flight.wait();
            }
            Entry::Vacant(entry) => {
                let flight = Arc::new(Flight::new());
                entry.insert(flight.clone());
                flight
            }
        };
        let guard = FlightGuard {
            in_flight: &self.in_flight,
            id,
            type_name: class.name().to_string(),
            flight,
        };

        // A previous leader may have published between the lookup and the claim
        if let Some(dispatcher) = self.fresh(id, self.now()) {
            guard.finish(Ok(dispatcher.clone()));
            return Ok(dispatcher);
        }

        self.counters.builds.fetch_add(1, Ordering::Relaxed);
        let result = match build() {
            Ok(dispatcher) => {
                let dispatcher = Arc::new(dispatcher);
                self.store(id, dispatcher.clone());
                Ok(dispatcher)
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(class = class.name(), error = %err, "accessor synthesis failed");
                Err(ReflectError::AccessorBuildFailed {
                    type_name: class.name().to_string(),
                    source: Arc::new(err),
                })
            }
        };
        guard.finish(result.clone());
        result
    }

    fn store(&self, id: ClassId, dispatcher: Arc<TypeDispatcher>) {
        let max = self.options.max_capacity;
        if max == 0 {
            return;
        }
        // Approximate under concurrent stores, exact otherwise
        while self.entries.len() >= max && !self.entries.contains_key(&id) {
            if !self.evict_least_recent() {
                break;
            }
        }
        self.entries
            .insert(id, CacheEntry::new(dispatcher, self.now()));
    }

    fn evict_least_recent(&self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_access.load(Ordering::Relaxed))
            .map(|entry| *entry.key());
        match victim.and_then(|id| self.entries.remove(&id)) {
            Some((id, entry)) => {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    class = entry.dispatcher.class().name(),
                    class_id = id.as_u64(),
                    "evicted least recently used dispatcher"
                );
                true
            }
            None => false,
        }
    }

    /// Drop the cached dispatcher of `class`
    pub fn invalidate(&self, class: &ClassRef) -> bool {
        self.entries.remove(&class.id()).is_some()
    }

    /// Drop every cached dispatcher
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = !self.is_expired(entry, now);
            if !keep {
                purged += 1;
            }
            keep
        });
        if purged > 0 {
            self.counters
                .evictions
                .fetch_add(purged as u64, Ordering::Relaxed);
            tracing::debug!(purged, "purged expired dispatchers");
        }
        purged
    }
}

impl fmt::Debug for AccessorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}
