// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Periodic and on-demand rebalancing.
//!
//! # Sweep
//!
//! ```text
//! for each tier, for each key:
//!   expired                         → evict
//!   hot and not in fast             → promote (if the fast tier has room)
//!   cold, stale and in fast         → demote to durable-small
//! then, per tier over its byte limit (lowest tan-curve score first):
//!   fast → durable-small → durable-large → evicted
//! ```
//!
//! Entries that vanish mid-sweep are skipped, including ones deleted between
//! being read and being moved. A failure on one entry is counted in the
//! report and the sweep moves on. Each key is visited at most once per sweep,
//! even after it moves to a tier that has not been scanned yet.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{MoveOutcome, OptimizationReport, TierCoordinator};
use crate::entry::{CacheEntry, Tier};
use crate::events::{CacheEvent, EvictReason};
use crate::eviction::Candidate;
use crate::strategy;

/// Entries still resident in a tier after the first pass.
type Resident = HashMap<String, CacheEntry>;

impl TierCoordinator {
    /// Run one optimization sweep now.
    ///
    /// Waits for any sweep already in progress to finish first.
    #[tracing::instrument(skip(self))]
    pub async fn optimize_cache(&self) -> OptimizationReport {
        let _guard = self.sweep_lock.lock().await;
        self.sweep().await
    }

    async fn sweep(&self) -> OptimizationReport {
        let start = Instant::now();
        let now = self.clock.now_millis();
        let mut report = OptimizationReport::default();
        let mut resident: [Resident; 3] = Default::default();
        let mut moved: HashSet<String> = HashSet::new();

        for tier in Tier::ALL {
            let store = self.tiers.get(tier);
            let keys = match store.keys().await {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Key enumeration failed, skipping tier");
                    report.errors += 1;
                    continue;
                }
            };
            crate::metrics::set_tier_entries(tier.as_str(), keys.len());

            for key in keys {
                if moved.contains(&key) {
                    continue;
                }
                report.scanned += 1;
                let entry = match store.get(&key).await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(tier = %tier, key = %key, error = %e, "Entry read failed during sweep");
                        report.errors += 1;
                        continue;
                    }
                };

                if entry.is_expired(now) {
                    if self.evict(&key, tier, &entry, EvictReason::Expired).await {
                        report.expired_evicted += 1;
                    } else {
                        report.errors += 1;
                    }
                    continue;
                }

                if tier != Tier::Fast
                    && strategy::is_hot(entry.metadata.access_count, entry.size_bytes(), &self.config)
                {
                    match self.promote(&key, tier, &entry).await {
                        MoveOutcome::Moved => {
                            report.promoted += 1;
                            resident[Tier::Fast.index()].insert(key, entry.moved_to(Tier::Fast));
                            continue;
                        }
                        MoveOutcome::Skipped => report.capacity_skipped += 1,
                        MoveOutcome::Vanished => continue,
                        MoveOutcome::Failed => report.errors += 1,
                    }
                } else if tier == Tier::Fast && self.is_stale(&entry, now) {
                    match self.demote(&key, Tier::Fast, Tier::DurableSmall, &entry).await {
                        MoveOutcome::Moved => {
                            report.demoted += 1;
                            moved.insert(key.clone());
                            resident[Tier::DurableSmall.index()]
                                .insert(key, entry.moved_to(Tier::DurableSmall));
                            continue;
                        }
                        MoveOutcome::Vanished => continue,
                        MoveOutcome::Skipped | MoveOutcome::Failed => report.errors += 1,
                    }
                }

                resident[tier.index()].insert(key, entry);
            }
        }

        self.shed_over_capacity(&mut resident, now, &mut report).await;

        let elapsed = start.elapsed();
        crate::metrics::record_optimization(elapsed, report.errors);
        crate::metrics::set_hit_rate(self.hit_rate());
        self.events.emit(&CacheEvent::Optimize {
            report,
            timestamp: now,
        });
        info!(
            scanned = report.scanned,
            expired = report.expired_evicted,
            promoted = report.promoted,
            demoted = report.demoted,
            capacity_evicted = report.capacity_evicted,
            capacity_skipped = report.capacity_skipped,
            errors = report.errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cache optimization complete"
        );
        report
    }

    /// Cold fast-tier entry that has not been read within the staleness window.
    fn is_stale(&self, entry: &CacheEntry, now: u64) -> bool {
        entry.metadata.access_count < self.config.frequency_promotion_threshold
            && now.saturating_sub(entry.metadata.last_access_time) > self.config.stale_after_millis
    }

    /// Move the lowest-scoring entries out of every tier whose resident bytes
    /// exceed its limit.
    async fn shed_over_capacity(&self, resident: &mut [Resident; 3], now: u64, report: &mut OptimizationReport) {
        for tier in Tier::ALL {
            let used: u64 = resident[tier.index()].values().map(CacheEntry::size_bytes).sum();
            let limit = self.config.tier_limit(tier);
            if used <= limit {
                continue;
            }

            let candidates: Vec<Candidate> = resident[tier.index()]
                .iter()
                .map(|(key, entry)| Candidate::from_entry(key, entry))
                .collect();
            let victims = self.eviction_policy.select_victims(&candidates, used - limit, now);
            debug!(tier = %tier, used, limit, victims = victims.len(), "Tier over capacity");

            for key in victims {
                let Some(entry) = resident[tier.index()].remove(&key) else {
                    continue;
                };
                match tier.slower() {
                    Some(to) => match self.demote(&key, tier, to, &entry).await {
                        MoveOutcome::Moved => {
                            report.demoted += 1;
                            resident[to.index()].insert(key, entry.moved_to(to));
                        }
                        MoveOutcome::Vanished => {}
                        MoveOutcome::Skipped | MoveOutcome::Failed => report.errors += 1,
                    },
                    None => {
                        if self.evict(&key, tier, &entry, EvictReason::Capacity).await {
                            report.capacity_evicted += 1;
                        } else {
                            report.errors += 1;
                        }
                    }
                }
            }
        }
    }

    /// Make sure the periodic optimizer is running on the current Tokio
    /// runtime.
    ///
    /// Spawns the timer if it was never started or its task has ended, for
    /// example because the runtime it was spawned on shut down. Returns
    /// `true` if a timer is running afterwards. Without a runtime, or once
    /// destroyed, nothing is spawned and `optimize_cache` must be called
    /// explicitly.
    pub fn ensure_optimizer(self: &Arc<Self>) -> bool {
        if self.is_destroyed() {
            return false;
        }

        let mut task = self.optimizer_task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return true;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No Tokio runtime, periodic optimization is not running");
            return false;
        };

        if task.is_some() {
            info!("Optimizer timer had stopped, restarting");
        }
        *task = Some(handle.spawn(Self::run_optimizer(
            Arc::downgrade(self),
            self.shutdown.subscribe(),
            Duration::from_millis(self.config.optimization_interval_millis),
        )));
        true
    }

    async fn run_optimizer(weak: Weak<Self>, mut shutdown: watch::Receiver<bool>, period: Duration) {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(coordinator) = weak.upgrade() else {
                        break;
                    };
                    if coordinator.is_destroyed() {
                        break;
                    }
                    // Skip the tick if an on-demand sweep is running
                    let guard = coordinator.sweep_lock.try_lock();
                    match guard {
                        Ok(_guard) => {
                            coordinator.sweep().await;
                        }
                        Err(_) => debug!("Sweep already running, skipping scheduled run"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Optimizer timer stopped");
    }

    /// Stop the optimizer timer and detach every listener.
    ///
    /// Safe to call more than once and while a sweep is running; in-flight
    /// tier operations are not cancelled. The coordinator stays usable but
    /// no longer emits events.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, std::sync::atomic::Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);
        self.events.close();
        info!("Tier coordinator destroyed");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(std::sync::atomic::Ordering::Acquire)
    }
}
