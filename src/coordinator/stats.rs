//! Hit/miss accounting and tier distribution.

use std::sync::atomic::Ordering;

use tracing::error;

use super::{CacheStats, TierCoordinator, TierDistribution};
use crate::entry::Tier;

impl TierCoordinator {
    /// Aggregate counts from every tier.
    ///
    /// A tier whose `size()` fails is logged and counted as empty.
    #[tracing::instrument(skip(self))]
    pub async fn get_cache_stats(&self) -> CacheStats {
        let mut distribution = TierDistribution::default();
        for tier in Tier::ALL {
            let count = match self.tiers.get(tier).size().await {
                Ok(count) => count,
                Err(e) => {
                    error!(tier = %tier, error = %e, "Tier size query failed");
                    crate::metrics::record_operation(tier.as_str(), "size", "error");
                    0
                }
            };
            crate::metrics::set_tier_entries(tier.as_str(), count);
            distribution.set(tier, count);
        }

        let hit_rate = self.hit_rate();
        crate::metrics::set_hit_rate(hit_rate);

        CacheStats {
            total_keys: distribution.total(),
            distribution,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            hit_rate,
            memory_usage: self.fast_bytes(),
        }
    }

    /// Fraction of reads served by any tier; 0 before the first read.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits.saturating_add(misses);
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64).clamp(0.0, 1.0)
        }
    }
}
