use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::{CacheEntry, Tier};
use super::memory::MemoryTier;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Tier unavailable: {0}")]
    TierUnavailable(String),
    #[error("Capacity exceeded: need {needed} bytes, {available} available")]
    CapacityExceeded {
        needed: u64,
        available: u64,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key-value contract every backing tier satisfies.
///
/// Implementations own their storage mechanism entirely; the coordinator only
/// relies on these operations. Any call may fail, and a failure in one tier
/// is never allowed to affect another.
#[async_trait]
pub trait TierStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError>;

    /// Store an entry. `Ok(false)` means the tier declined without an error.
    async fn set(&self, key: &str, entry: &CacheEntry) -> Result<bool, StorageError>;

    /// Remove an entry. `Ok(false)` means nothing was stored under `key`.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;

    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Number of stored entries.
    async fn size(&self) -> Result<usize, StorageError>;

    /// Presence check.
    /// Default implementation falls back to `get`.
    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// The three adapters a coordinator runs on.
#[derive(Clone)]
pub struct TierSet {
    pub fast: Arc<dyn TierStore>,
    pub durable_small: Arc<dyn TierStore>,
    pub durable_large: Arc<dyn TierStore>,
}

impl TierSet {
    pub fn new(
        fast: Arc<dyn TierStore>,
        durable_small: Arc<dyn TierStore>,
        durable_large: Arc<dyn TierStore>,
    ) -> Self {
        Self { fast, durable_small, durable_large }
    }

    /// Three unbounded in-memory tiers.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTier::new()),
            Arc::new(MemoryTier::new()),
            Arc::new(MemoryTier::new()),
        )
    }

    #[must_use]
    pub fn get(&self, tier: Tier) -> &Arc<dyn TierStore> {
        match tier {
            Tier::Fast => &self.fast,
            Tier::DurableSmall => &self.durable_small,
            Tier::DurableLarge => &self.durable_large,
        }
    }
}

impl Default for TierSet {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for TierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierSet").finish_non_exhaustive()
    }
}
