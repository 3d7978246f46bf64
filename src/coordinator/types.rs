//! Public types for the tier coordinator.

use serde::Serialize;
use thiserror::Error;

use crate::entry::Tier;
use crate::storage::StorageError;

/// Errors raised by coordinator operations.
///
/// Only the precondition variants ([`InvalidKey`](Self::InvalidKey),
/// [`InvalidOptions`](Self::InvalidOptions), and
/// [`SerializationFailure`](Self::SerializationFailure) from the typed
/// helpers) reach callers as `Err`. Tier failures are logged and surface as
/// `Ok(false)` or an absent value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Tier {tier} unavailable: {reason}")]
    TierUnavailable { tier: Tier, reason: String },
    #[error("Capacity exceeded in {tier}: entry is {size} bytes, limit {limit}")]
    CapacityExceeded { tier: Tier, size: u64, limit: u64 },
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),
}

impl CacheError {
    /// Attach tier context to an adapter error.
    pub fn from_storage(tier: Tier, err: StorageError) -> Self {
        match err {
            StorageError::TierUnavailable(reason) => Self::TierUnavailable { tier, reason },
            StorageError::CapacityExceeded { needed, available } => Self::CapacityExceeded {
                tier,
                size: needed,
                limit: available,
            },
            StorageError::Serialization(msg) => Self::SerializationFailure(msg),
        }
    }

    /// Whether this error is the caller's fault rather than a tier's.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidOptions(_))
    }
}

/// Entry counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierDistribution {
    pub fast: usize,
    pub durable_small: usize,
    pub durable_large: usize,
}

impl TierDistribution {
    #[must_use]
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Fast => self.fast,
            Tier::DurableSmall => self.durable_small,
            Tier::DurableLarge => self.durable_large,
        }
    }

    pub(crate) fn set(&mut self, tier: Tier, count: usize) {
        match tier {
            Tier::Fast => self.fast = count,
            Tier::DurableSmall => self.durable_small = count,
            Tier::DurableLarge => self.durable_large = count,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.fast + self.durable_small + self.durable_large
    }
}

/// Snapshot returned by [`super::TierCoordinator::get_cache_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Sum of entry counts across tiers
    pub total_keys: usize,
    pub distribution: TierDistribution,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before any read
    pub hit_rate: f64,
    /// Tracked bytes held by the fast tier
    pub memory_usage: u64,
}

/// Outcome of one optimizer sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
    /// Distinct keys looked at, across all tiers
    pub scanned: usize,
    pub expired_evicted: usize,
    pub promoted: usize,
    /// Cold and over-capacity demotions
    pub demoted: usize,
    /// Entries dropped from the large tier because it was over its limit
    pub capacity_evicted: usize,
    /// Hot entries left in place because the fast tier had no room
    pub capacity_skipped: usize,
    pub errors: usize,
}
