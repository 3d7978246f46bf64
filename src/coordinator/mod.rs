// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tier coordinator.
//!
//! The [`TierCoordinator`] decides which of three tiers holds each entry and
//! keeps entries where they belong:
//! - **fast**: volatile, for high-priority and hot entries
//! - **durable-small**: medium-priority entries
//! - **durable-large**: low-priority and oversized entries
//!
//! A key lives in at most one tier. Reads probe fastest first and promote
//! entries that become hot; the optimizer sweeps all tiers on a timer to
//! evict expired entries and rebalance the rest.
//!
//! # Concurrency
//!
//! Operations on the same key are not serialized. Two concurrent `get`/`set`
//! calls may interleave at any await point; callers that need per-key
//! consistency must serialize their own calls.
//!
//! # Example
//!
//! ```rust
//! use cache_tiers::{CoordinatorConfig, SetOptions, Tier, TierCoordinator, TierSet};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = TierCoordinator::new(TierSet::in_memory(), CoordinatorConfig::default());
//!
//! let stored = cache
//!     .set("session:42", &json!({"x": 1}), &SetOptions::default().with_priority(8))
//!     .await
//!     .unwrap();
//! assert!(stored);
//! assert_eq!(cache.locate("session:42").await, Some(Tier::Fast));
//! assert_eq!(cache.get("session:42").await, Some(json!({"x": 1})));
//!
//! cache.destroy();
//! # }
//! ```

mod types;
mod batch;
mod optimizer;
mod registry;
mod stats;

pub use types::{CacheError, CacheStats, OptimizationReport, TierDistribution};
pub use registry::CacheFacade;

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigWarning, CoordinatorConfig};
use crate::entry::{CacheEntry, Tier};
use crate::events::{CacheEvent, EventBus, EventKind, EvictReason, ListenerId};
use crate::eviction::TanCurvePolicy;
use crate::set_options::SetOptions;
use crate::storage::TierSet;
use crate::strategy;

/// Result of trying to move an entry between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MoveOutcome {
    Moved,
    /// Not attempted: the fast tier has no room
    Skipped,
    /// The source copy was deleted by someone else mid-move; nothing to do
    Vanished,
    Failed,
}

/// What a removal across all tiers did.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Removal {
    pub removed: bool,
    pub failed: bool,
}

/// Multi-tier cache coordinator.
///
/// Construct with [`new`](Self::new) or [`with_clock`](Self::with_clock);
/// both return an `Arc` because the periodic optimizer holds a weak
/// reference back to the coordinator.
///
/// # Thread Safety
///
/// `Send + Sync`. Counters are atomics, fast-tier size tracking is a
/// `DashMap`, and listener/facade lists sit behind `parking_lot` locks.
pub struct TierCoordinator {
    /// The three backing tiers
    pub(super) tiers: TierSet,

    /// Sanitized configuration
    pub(super) config: CoordinatorConfig,

    /// Fields that were defaulted during construction
    pub(super) config_warnings: Vec<ConfigWarning>,

    pub(super) clock: Arc<dyn Clock>,

    pub(super) events: EventBus,

    pub(super) hits: AtomicU64,
    pub(super) misses: AtomicU64,

    /// Fast tier size tracking (key -> size_bytes)
    pub(super) fast_sizes: DashMap<String, u64>,
    pub(super) fast_bytes: AtomicI64,

    /// Registered facades, insertion-ordered
    pub(super) facades: RwLock<Vec<Arc<dyn CacheFacade>>>,

    /// Victim scoring for over-capacity tiers
    pub(super) eviction_policy: TanCurvePolicy,

    /// Held for the duration of an optimizer sweep
    pub(super) sweep_lock: Mutex<()>,

    /// Stops the optimizer timer
    pub(super) shutdown: watch::Sender<bool>,

    /// Periodic optimizer task, if one was spawned
    pub(super) optimizer_task: parking_lot::Mutex<Option<JoinHandle<()>>>,

    pub(super) destroyed: AtomicBool,
}

impl TierCoordinator {
    /// Create a coordinator using the system clock.
    ///
    /// Invalid configuration values are replaced with defaults and logged;
    /// construction never fails. When called inside a Tokio runtime the
    /// periodic optimizer starts immediately.
    pub fn new(tiers: TierSet, config: CoordinatorConfig) -> Arc<Self> {
        Self::with_clock(tiers, config, Arc::new(SystemClock))
    }

    /// Create a coordinator reading time from `clock`.
    pub fn with_clock(tiers: TierSet, config: CoordinatorConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (config, config_warnings) = config.sanitized();
        for warning in &config_warnings {
            warn!(field = warning.field, reason = %warning.reason, "Invalid coordinator configuration, using default");
        }

        let (shutdown, _) = watch::channel(false);

        let coordinator = Arc::new(Self {
            tiers,
            config,
            config_warnings,
            clock,
            events: EventBus::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fast_sizes: DashMap::new(),
            fast_bytes: AtomicI64::new(0),
            facades: RwLock::new(Vec::new()),
            eviction_policy: TanCurvePolicy::default(),
            sweep_lock: Mutex::new(()),
            shutdown,
            optimizer_task: parking_lot::Mutex::new(None),
            destroyed: AtomicBool::new(false),
        });

        coordinator.ensure_optimizer();
        info!(
            fast_limit = coordinator.config.fast_tier_limit_bytes,
            interval_ms = coordinator.config.optimization_interval_millis,
            "Tier coordinator created"
        );
        coordinator
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Configuration fields replaced by defaults at construction.
    #[must_use]
    pub fn config_warnings(&self) -> &[ConfigWarning] {
        &self.config_warnings
    }

    /// Subscribe to coordinator events.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    /// Unsubscribe. Unknown ids are ignored and return `false`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    fn validate_key(&self, key: &str) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".into()));
        }
        if key.len() > self.config.max_key_bytes {
            return Err(CacheError::InvalidKey(format!(
                "key is {} bytes, limit is {}",
                key.len(),
                self.config.max_key_bytes
            )));
        }
        Ok(())
    }

    // --- Core operations ---

    /// Read a value.
    ///
    /// Probes fast → durable-small → durable-large and returns the first live
    /// entry. A failing tier is logged and skipped. Expired entries found on
    /// the way are deleted. Never fails; a miss is `None`.
    #[tracing::instrument(skip(self), fields(tier))]
    pub async fn get(&self, key: &str) -> Option<Value> {
        let start = Instant::now();
        if key.is_empty() {
            debug!("Empty key, nothing to read");
            return None;
        }
        let now = self.clock.now_millis();

        for tier in Tier::ALL {
            let store = self.tiers.get(tier);
            let mut entry = match store.get(key).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Tier lookup failed");
                    crate::metrics::record_operation(tier.as_str(), "get", "error");
                    continue;
                }
            };

            if entry.is_expired(now) {
                debug!(tier = %tier, "Expired entry found on read");
                self.evict(key, tier, &entry, EvictReason::Expired).await;
                continue;
            }

            let value = match entry.value() {
                Ok(value) => value,
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Stored entry could not be decoded");
                    crate::metrics::record_operation(tier.as_str(), "get", "error");
                    continue;
                }
            };

            entry.record_access(now);
            entry.metadata.assigned_tier = tier;
            if let Err(e) = store.set(key, &entry).await {
                warn!(tier = %tier, error = %e, "Failed to persist access metadata");
            }

            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::Span::current().record("tier", tier.as_str());
            debug!(access_count = entry.metadata.access_count, "Cache hit");
            crate::metrics::record_hit(tier.as_str());
            crate::metrics::record_operation(tier.as_str(), "get", "hit");
            crate::metrics::record_latency(tier.as_str(), "get", start.elapsed());
            self.events.emit(&CacheEvent::Hit {
                key: key.to_string(),
                tier,
                timestamp: now,
            });

            if tier != Tier::Fast
                && strategy::is_hot(entry.metadata.access_count, entry.size_bytes(), &self.config)
            {
                // Failures are logged inside; the caller already has its value
                self.promote(key, tier, &entry).await;
            }
            return Some(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::Span::current().record("tier", "miss");
        debug!("Cache miss");
        crate::metrics::record_miss();
        crate::metrics::record_latency("all", "get", start.elapsed());
        self.events.emit(&CacheEvent::Miss {
            key: key.to_string(),
            timestamp: now,
        });
        None
    }

    /// Store a value.
    ///
    /// Returns `Ok(true)` once the entry is written to the tier chosen by
    /// [`strategy::select`], `Ok(false)` if that write failed. There is no
    /// fallback to another tier. `Err` only for a malformed key or options.
    #[tracing::instrument(skip(self, value, options), fields(tier))]
    pub async fn set(&self, key: &str, value: &Value, options: &SetOptions) -> Result<bool, CacheError> {
        self.validate_key(key)?;
        if let Some(problem) = options.problem() {
            return Err(CacheError::InvalidOptions(problem));
        }

        match self.write(key, value, options).await {
            Ok(tier) => {
                tracing::Span::current().record("tier", tier.as_str());
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Cache write failed");
                Ok(false)
            }
        }
    }

    /// Serialize `value` and [`set`](Self::set) it.
    pub async fn set_as<T>(&self, key: &str, value: &T, options: &SetOptions) -> Result<bool, CacheError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::SerializationFailure(e.to_string()))?;
        self.set(key, &value, options).await
    }

    /// [`get`](Self::get) and deserialize into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::SerializationFailure(e.to_string())),
            None => Ok(None),
        }
    }

    /// Remove a key from every tier.
    ///
    /// Deleting an absent key succeeds. `Ok(false)` means some tier failed
    /// and the key may still be present there.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.validate_key(key)?;
        let _timer = crate::metrics::LatencyTimer::new("all", "delete");
        let removal = self.remove(key).await;
        Ok(!removal.failed)
    }

    /// Empty every tier and notify registered facades.
    ///
    /// Returns `false` if any tier failed to clear; the other tiers are
    /// still cleared.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> bool {
        let _timer = crate::metrics::LatencyTimer::new("all", "clear");
        let mut ok = true;
        for tier in Tier::ALL {
            match self.tiers.get(tier).clear().await {
                Ok(()) => {
                    if tier == Tier::Fast {
                        self.fast_sizes.clear();
                        self.fast_bytes.store(0, Ordering::Release);
                        crate::metrics::set_fast_tier_bytes(0);
                    }
                    crate::metrics::record_operation(tier.as_str(), "clear", "success");
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Failed to clear tier");
                    crate::metrics::record_operation(tier.as_str(), "clear", "error");
                    ok = false;
                }
            }
        }

        self.notify_cleared();
        self.events.emit(&CacheEvent::Clear {
            timestamp: self.clock.now_millis(),
        });
        info!(ok, "Cache cleared");
        ok
    }

    /// Tier currently holding a live entry for `key`.
    ///
    /// Does not count as a hit or miss and does not touch access metadata.
    pub async fn locate(&self, key: &str) -> Option<Tier> {
        let now = self.clock.now_millis();
        for tier in Tier::ALL {
            match self.tiers.get(tier).get(key).await {
                Ok(Some(entry)) if !entry.is_expired(now) => return Some(tier),
                Ok(_) => {}
                Err(e) => warn!(tier = %tier, error = %e, "Tier lookup failed"),
            }
        }
        None
    }

    /// Whether a live entry exists for `key`. Does not affect statistics.
    pub async fn contains(&self, key: &str) -> bool {
        self.locate(key).await.is_some()
    }

    // --- Write path ---

    async fn write(&self, key: &str, value: &Value, options: &SetOptions) -> Result<Tier, CacheError> {
        let start = Instant::now();
        let serialized =
            serde_json::to_vec(value).map_err(|e| CacheError::SerializationFailure(e.to_string()))?;
        let size = serialized.len() as u64;
        let now = self.clock.now_millis();

        let existing = self.find_stored(key).await;
        let live_access = existing
            .as_ref()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.metadata.access_count);

        let placement = strategy::select(size, options, live_access, &self.config);
        let tier = placement.tier;

        let limit = self.config.tier_limit(tier);
        if size > limit {
            crate::metrics::record_capacity_rejection(tier.as_str());
            return Err(CacheError::CapacityExceeded { tier, size, limit });
        }

        let ttl_millis = options
            .ttl
            .map_or(self.config.default_ttl_millis, |ttl| {
                u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
            });

        let mut entry = CacheEntry::build(
            serialized,
            placement.compress,
            tier,
            options.priority(),
            now,
            ttl_millis,
            options.tags.clone(),
        )
        .map_err(|e| CacheError::SerializationFailure(e.to_string()))?;

        if let Some(count) = live_access {
            entry.metadata.access_count = count;
        }

        // Single location: drop the old copy before writing elsewhere
        if let Some((old_tier, _)) = &existing {
            let old_tier = *old_tier;
            if old_tier != tier {
                self.tiers
                    .get(old_tier)
                    .delete(key)
                    .await
                    .map_err(|e| CacheError::from_storage(old_tier, e))?;
                if old_tier == Tier::Fast {
                    self.untrack_fast(key);
                }
                debug!(from = %old_tier, to = %tier, "Replaced entry moves tier");
            }
        }

        match self.tiers.get(tier).set(key, &entry).await {
            Ok(true) => {}
            Ok(false) => {
                crate::metrics::record_operation(tier.as_str(), "set", "rejected");
                return Err(CacheError::TierUnavailable {
                    tier,
                    reason: "write declined".into(),
                });
            }
            Err(e) => {
                crate::metrics::record_operation(tier.as_str(), "set", "error");
                return Err(CacheError::from_storage(tier, e));
            }
        }

        if tier == Tier::Fast {
            self.track_fast(key, size);
        }

        crate::metrics::record_operation(tier.as_str(), "set", "success");
        crate::metrics::record_latency(tier.as_str(), "set", start.elapsed());
        self.events.emit(&CacheEvent::Set {
            key: key.to_string(),
            tier,
            size_bytes: size,
            timestamp: now,
        });
        debug!(tier = %tier, size, compressed = placement.compress, "Entry stored");
        Ok(tier)
    }

    /// First stored copy of `key`, expired or not.
    async fn find_stored(&self, key: &str) -> Option<(Tier, CacheEntry)> {
        for tier in Tier::ALL {
            match self.tiers.get(tier).get(key).await {
                Ok(Some(entry)) => return Some((tier, entry)),
                Ok(None) => {}
                Err(e) => warn!(tier = %tier, error = %e, "Tier lookup failed"),
            }
        }
        None
    }

    /// Presence-check each tier and delete where found.
    pub(super) async fn remove(&self, key: &str) -> Removal {
        let mut removal = Removal::default();
        let now = self.clock.now_millis();

        for tier in Tier::ALL {
            let store = self.tiers.get(tier);
            match store.has(key).await {
                Ok(true) => {}
                Ok(false) => {
                    if tier == Tier::Fast {
                        self.untrack_fast(key);
                    }
                    continue;
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Presence check failed");
                    removal.failed = true;
                    continue;
                }
            }

            match store.delete(key).await {
                Ok(deleted) => {
                    if tier == Tier::Fast {
                        self.untrack_fast(key);
                    }
                    if deleted {
                        removal.removed = true;
                        crate::metrics::record_operation(tier.as_str(), "delete", "success");
                        self.events.emit(&CacheEvent::Delete {
                            key: key.to_string(),
                            tier,
                            timestamp: now,
                        });
                    }
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Delete failed");
                    crate::metrics::record_operation(tier.as_str(), "delete", "error");
                    removal.failed = true;
                }
            }
        }
        removal
    }

    // --- Moves between tiers ---

    /// Move `key` into the fast tier if it fits.
    pub(super) async fn promote(&self, key: &str, from: Tier, entry: &CacheEntry) -> MoveOutcome {
        let size = entry.size_bytes();
        let used = self.fast_bytes();
        if used.saturating_add(size) > self.config.fast_tier_limit_bytes {
            warn!(
                key = %key,
                size,
                used,
                limit = self.config.fast_tier_limit_bytes,
                "Fast tier full, promotion skipped"
            );
            return MoveOutcome::Skipped;
        }

        let outcome = self.relocate(key, entry, from, Tier::Fast).await;
        if outcome != MoveOutcome::Moved {
            return outcome;
        }

        crate::metrics::record_move("promote", from.as_str(), Tier::Fast.as_str());
        self.events.emit(&CacheEvent::Promote {
            key: key.to_string(),
            from,
            to: Tier::Fast,
            timestamp: self.clock.now_millis(),
        });
        debug!(key = %key, from = %from, "Promoted to fast tier");
        MoveOutcome::Moved
    }

    /// Move `key` one step towards slower storage.
    pub(super) async fn demote(&self, key: &str, from: Tier, to: Tier, entry: &CacheEntry) -> MoveOutcome {
        let outcome = self.relocate(key, entry, from, to).await;
        if outcome != MoveOutcome::Moved {
            return outcome;
        }

        crate::metrics::record_move("demote", from.as_str(), to.as_str());
        self.events.emit(&CacheEvent::Demote {
            key: key.to_string(),
            from,
            to,
            timestamp: self.clock.now_millis(),
        });
        debug!(key = %key, from = %from, to = %to, "Demoted");
        MoveOutcome::Moved
    }

    /// Write to `to`, then delete from `from`.
    ///
    /// If the source delete fails the new copy is removed again, so the key
    /// never ends up in two tiers. If the source copy was already gone, the
    /// key was deleted while we held a stale read; the new copy is removed
    /// too and the move reports [`MoveOutcome::Vanished`].
    async fn relocate(&self, key: &str, entry: &CacheEntry, from: Tier, to: Tier) -> MoveOutcome {
        let moved = entry.moved_to(to);

        match self.tiers.get(to).set(key, &moved).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(key = %key, from = %from, to = %to, "Target tier declined move");
                return MoveOutcome::Failed;
            }
            Err(e) => {
                warn!(key = %key, from = %from, to = %to, error = %e, "Move failed writing target");
                return MoveOutcome::Failed;
            }
        }
        if to == Tier::Fast {
            self.track_fast(key, moved.size_bytes());
        }

        match self.tiers.get(from).delete(key).await {
            Ok(true) => {
                if from == Tier::Fast {
                    self.untrack_fast(key);
                }
                MoveOutcome::Moved
            }
            Ok(false) => {
                debug!(key = %key, from = %from, to = %to, "Entry deleted mid-move, dropping new copy");
                if from == Tier::Fast {
                    self.untrack_fast(key);
                }
                self.undo_move(key, to).await;
                MoveOutcome::Vanished
            }
            Err(e) => {
                warn!(key = %key, from = %from, to = %to, error = %e, "Move failed removing source, rolling back");
                self.undo_move(key, to).await;
                MoveOutcome::Failed
            }
        }
    }

    /// Remove the copy a failed or abandoned move wrote to `to`.
    async fn undo_move(&self, key: &str, to: Tier) {
        match self.tiers.get(to).delete(key).await {
            Ok(_) => {
                if to == Tier::Fast {
                    self.untrack_fast(key);
                }
            }
            Err(e) => {
                warn!(key = %key, tier = %to, error = %e, "Rollback failed, key may be in two tiers");
            }
        }
    }

    /// Delete an entry the coordinator decided to drop.
    pub(super) async fn evict(&self, key: &str, tier: Tier, entry: &CacheEntry, reason: EvictReason) -> bool {
        match self.tiers.get(tier).delete(key).await {
            Ok(_) => {
                if tier == Tier::Fast {
                    self.untrack_fast(key);
                }
                let reason_label = match reason {
                    EvictReason::Expired => "expired",
                    EvictReason::Capacity => "capacity",
                };
                crate::metrics::record_eviction(tier.as_str(), reason_label, entry.size_bytes());
                self.events.emit(&CacheEvent::Evict {
                    key: key.to_string(),
                    tier,
                    reason,
                    timestamp: self.clock.now_millis(),
                });
                true
            }
            Err(e) => {
                warn!(key = %key, tier = %tier, error = %e, "Eviction failed");
                false
            }
        }
    }

    // --- Fast tier size tracking ---

    pub(super) fn track_fast(&self, key: &str, size: u64) {
        let previous = self.fast_sizes.insert(key.to_string(), size).unwrap_or(0);
        self.fast_bytes.fetch_add(size as i64 - previous as i64, Ordering::AcqRel);
        crate::metrics::set_fast_tier_bytes(self.fast_bytes());
    }

    pub(super) fn untrack_fast(&self, key: &str) {
        if let Some((_, size)) = self.fast_sizes.remove(key) {
            self.fast_bytes.fetch_sub(size as i64, Ordering::AcqRel);
            crate::metrics::set_fast_tier_bytes(self.fast_bytes());
        }
    }

    /// Bytes currently tracked in the fast tier.
    #[must_use]
    pub fn fast_bytes(&self) -> u64 {
        self.fast_bytes.load(Ordering::Acquire).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use parking_lot::Mutex as SyncMutex;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    const START: u64 = 1_000_000;

    fn setup(config: CoordinatorConfig) -> (Arc<TierCoordinator>, Arc<ManualClock>, TierSet) {
        let clock = Arc::new(ManualClock::new(START));
        let tiers = TierSet::in_memory();
        let coordinator = TierCoordinator::with_clock(tiers.clone(), config, clock.clone());
        (coordinator, clock, tiers)
    }

    fn priority(p: u8) -> SetOptions {
        SetOptions::default().with_priority(p)
    }

    async fn stored(tiers: &TierSet, tier: Tier, key: &str) -> Option<CacheEntry> {
        tiers.get(tier).get(key).await.unwrap()
    }

    #[tokio::test]
    async fn test_priority_selects_tier() {
        let (cache, _, _) = setup(CoordinatorConfig::default());

        assert!(cache.set("hi", &json!(1), &priority(9)).await.unwrap());
        assert!(cache.set("mid", &json!(2), &priority(5)).await.unwrap());
        assert!(cache.set("lo", &json!(3), &priority(1)).await.unwrap());

        assert_eq!(cache.locate("hi").await, Some(Tier::Fast));
        assert_eq!(cache.locate("mid").await, Some(Tier::DurableSmall));
        assert_eq!(cache.locate("lo").await, Some(Tier::DurableLarge));
    }

    #[tokio::test]
    async fn test_roundtrip_and_fast_tracking() {
        let (cache, _, _) = setup(CoordinatorConfig::default());
        let value = json!({"mood": "steady", "entries": [1, 2, 3]});

        cache.set("journal:1", &value, &priority(9)).await.unwrap();

        assert_eq!(cache.get("journal:1").await, Some(value.clone()));
        assert_eq!(cache.fast_bytes(), serde_json::to_vec(&value).unwrap().len() as u64);
    }

    #[tokio::test]
    async fn test_large_payload_goes_to_large_tier_compressed() {
        let config = CoordinatorConfig {
            compression_threshold_bytes: 100,
            large_object_threshold_bytes: 1_000,
            ..Default::default()
        };
        let (cache, _, tiers) = setup(config);
        let value = json!({"blob": "z".repeat(5_000)});

        assert!(cache.set("blob", &value, &priority(9)).await.unwrap());

        let entry = stored(&tiers, Tier::DurableLarge, "blob").await.unwrap();
        assert!(entry.metadata.compressed);
        assert_eq!(entry.size_bytes(), serde_json::to_vec(&value).unwrap().len() as u64);
        assert_eq!(cache.get("blob").await, Some(value));
    }

    #[tokio::test]
    async fn test_forced_compression_roundtrip() {
        let (cache, _, tiers) = setup(CoordinatorConfig::default());
        let value = json!({"note": "short"});

        cache.set("c", &value, &priority(9).compressed()).await.unwrap();

        assert!(stored(&tiers, Tier::Fast, "c").await.unwrap().metadata.compressed);
        assert_eq!(cache.get("c").await, Some(value));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_location() {
        let (cache, _, tiers) = setup(CoordinatorConfig::default());

        cache.set("k", &json!("v1"), &priority(9)).await.unwrap();
        cache.set("k", &json!("v2"), &priority(0)).await.unwrap();

        assert!(stored(&tiers, Tier::Fast, "k").await.is_none());
        assert!(stored(&tiers, Tier::DurableSmall, "k").await.is_none());
        assert!(stored(&tiers, Tier::DurableLarge, "k").await.is_some());
        assert_eq!(cache.fast_bytes(), 0);
        assert_eq!(cache.get("k").await, Some(json!("v2")));
    }

    #[tokio::test]
    async fn test_expiry_is_strict() {
        let (cache, clock, tiers) = setup(CoordinatorConfig::default());
        let opts = priority(9).with_ttl(Duration::from_millis(1_000));

        cache.set("t", &json!(true), &opts).await.unwrap();

        clock.advance(1_000);
        assert_eq!(cache.get("t").await, Some(json!(true)));

        clock.advance(1);
        assert_eq!(cache.get("t").await, None);
        assert!(stored(&tiers, Tier::Fast, "t").await.is_none());
        assert_eq!(cache.fast_bytes(), 0);
    }

    #[tokio::test]
    async fn test_default_ttl_applies() {
        let config = CoordinatorConfig { default_ttl_millis: 500, ..Default::default() };
        let (cache, _, tiers) = setup(config);

        cache.set("d", &json!(1), &priority(5)).await.unwrap();

        let entry = stored(&tiers, Tier::DurableSmall, "d").await.unwrap();
        assert_eq!(entry.metadata.expires_at, START + 500);
    }

    #[tokio::test]
    async fn test_reads_promote_hot_entry() {
        let config = CoordinatorConfig { frequency_promotion_threshold: 3, ..Default::default() };
        let (cache, _, tiers) = setup(config);

        cache.set("hot", &json!("x"), &priority(0)).await.unwrap();
        cache.get("hot").await;
        cache.get("hot").await;
        assert_eq!(cache.locate("hot").await, Some(Tier::DurableLarge));

        cache.get("hot").await;
        assert_eq!(cache.locate("hot").await, Some(Tier::Fast));
        assert!(stored(&tiers, Tier::DurableLarge, "hot").await.is_none());

        let entry = stored(&tiers, Tier::Fast, "hot").await.unwrap();
        assert_eq!(entry.metadata.assigned_tier, Tier::Fast);
        assert_eq!(entry.metadata.access_count, 3);
    }

    #[tokio::test]
    async fn test_hot_entry_stays_fast_on_overwrite() {
        let config = CoordinatorConfig { frequency_promotion_threshold: 2, ..Default::default() };
        let (cache, _, _) = setup(config);

        cache.set("k", &json!(1), &priority(0)).await.unwrap();
        cache.get("k").await;
        cache.get("k").await;
        assert_eq!(cache.locate("k").await, Some(Tier::Fast));

        cache.set("k", &json!(2), &priority(0)).await.unwrap();
        assert_eq!(cache.locate("k").await, Some(Tier::Fast));
    }

    #[tokio::test]
    async fn test_promotion_skipped_when_fast_tier_full() {
        let config = CoordinatorConfig {
            fast_tier_limit_bytes: 4,
            frequency_promotion_threshold: 1,
            ..Default::default()
        };
        let (cache, _, _) = setup(config);

        cache.set("k", &json!("longer than four bytes"), &priority(0)).await.unwrap();
        assert!(cache.get("k").await.is_some());
        assert_eq!(cache.locate("k").await, Some(Tier::DurableLarge));
    }

    #[tokio::test]
    async fn test_write_over_tier_limit_fails_without_fallback() {
        let config = CoordinatorConfig { small_tier_limit_bytes: 8, ..Default::default() };
        let (cache, _, _) = setup(config);

        let ok = cache.set("k", &json!("definitely more than eight"), &priority(5)).await.unwrap();

        assert!(!ok);
        assert!(!cache.contains("k").await);
    }

    #[tokio::test]
    async fn test_hits_misses_and_events() {
        let (cache, _, _) = setup(CoordinatorConfig::default());
        let seen = Arc::new(SyncMutex::new(Vec::new()));

        let s = seen.clone();
        cache.on(EventKind::Hit, move |e| s.lock().push(e.clone()));
        let s = seen.clone();
        cache.on(EventKind::Miss, move |e| s.lock().push(e.clone()));

        cache.set("k", &json!(1), &priority(9)).await.unwrap();
        cache.get("k").await;
        cache.get("absent").await;

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                CacheEvent::Hit { key: "k".into(), tier: Tier::Fast, timestamp: START },
                CacheEvent::Miss { key: "absent".into(), timestamp: START },
            ]
        );
        assert_eq!(cache.hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.misses.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_contains_and_locate_do_not_count() {
        let (cache, _, _) = setup(CoordinatorConfig::default());
        cache.set("k", &json!(1), &priority(9)).await.unwrap();

        assert!(cache.contains("k").await);
        assert!(!cache.contains("nope").await);
        assert_eq!(cache.hits.load(Ordering::Relaxed), 0);
        assert_eq!(cache.misses.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_preconditions_are_rejected() {
        let config = CoordinatorConfig { max_key_bytes: 8, ..Default::default() };
        let (cache, _, _) = setup(config);

        assert!(matches!(
            cache.set("", &json!(1), &SetOptions::default()).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.set("much-too-long", &json!(1), &SetOptions::default()).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.set("k", &json!(1), &priority(12)).await,
            Err(CacheError::InvalidOptions(_))
        ));
        assert!(matches!(cache.delete("").await, Err(CacheError::InvalidKey(_))));
        assert_eq!(cache.get("").await, None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (cache, _, _) = setup(CoordinatorConfig::default());

        assert!(cache.delete("never-set").await.unwrap());

        cache.set("k", &json!(1), &priority(9)).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.fast_bytes(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_all_tiers() {
        let (cache, _, tiers) = setup(CoordinatorConfig::default());
        let cleared = Arc::new(AtomicU64::new(0));
        let c = cleared.clone();
        cache.on(EventKind::Clear, move |_| { c.fetch_add(1, Ordering::Relaxed); });

        for (i, p) in [9u8, 5, 0].iter().enumerate() {
            cache.set(&format!("k{}", i), &json!(i), &priority(*p)).await.unwrap();
        }
        assert!(cache.clear().await);

        for tier in Tier::ALL {
            assert_eq!(tiers.get(tier).size().await.unwrap(), 0);
        }
        assert_eq!(cache.fast_bytes(), 0);
        assert_eq!(cleared.load(Ordering::Relaxed), 1);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct CheckIn {
        mood: u8,
        note: String,
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let (cache, _, _) = setup(CoordinatorConfig::default());
        let check_in = CheckIn { mood: 7, note: "slept well".into() };

        assert!(cache.set_as("checkin:1", &check_in, &priority(8)).await.unwrap());
        assert_eq!(cache.get_as::<CheckIn>("checkin:1").await.unwrap(), Some(check_in));
        assert_eq!(cache.get_as::<CheckIn>("checkin:2").await.unwrap(), None);

        cache.set("wrong", &json!("a string"), &priority(8)).await.unwrap();
        assert!(matches!(
            cache.get_as::<CheckIn>("wrong").await,
            Err(CacheError::SerializationFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_is_defaulted() {
        let config = CoordinatorConfig { optimization_interval_millis: 0, ..Default::default() };
        let (cache, _, _) = setup(config);

        assert_eq!(cache.config_warnings().len(), 1);
        assert_eq!(cache.config_warnings()[0].field, "optimization_interval_millis");
        assert_eq!(
            cache.config().optimization_interval_millis,
            CoordinatorConfig::default().optimization_interval_millis
        );
    }
}
