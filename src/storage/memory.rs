use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::entry::CacheEntry;
use super::traits::{StorageError, TierStore};

/// In-memory tier backed by a `DashMap`, optionally bounded in bytes.
///
/// Usage is the sum of the stored entries' `size_bytes`.
pub struct MemoryTier {
    data: DashMap<String, CacheEntry>,
    used_bytes: AtomicU64,
    capacity_bytes: Option<u64>,
}

impl MemoryTier {
    /// Unbounded tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            used_bytes: AtomicU64::new(0),
            capacity_bytes: None,
        }
    }

    /// Tier that rejects writes pushing usage past `capacity_bytes`.
    #[must_use]
    pub fn with_capacity_bytes(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes: Some(capacity_bytes),
            ..Self::new()
        }
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes currently accounted to this tier.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Acquire)
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TierStore for MemoryTier {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, entry: &CacheEntry) -> Result<bool, StorageError> {
        let new_size = entry.size_bytes();
        let old_size = self.data.get(key).map_or(0, |r| r.value().size_bytes());

        if let Some(capacity) = self.capacity_bytes {
            let projected = self.used_bytes().saturating_sub(old_size).saturating_add(new_size);
            if projected > capacity {
                return Err(StorageError::CapacityExceeded {
                    needed: new_size,
                    available: capacity.saturating_sub(self.used_bytes().saturating_sub(old_size)),
                });
            }
        }

        if let Some(old) = self.data.insert(key.to_string(), entry.clone()) {
            // Update: subtract old size, add new size
            let current = self.used_bytes.load(Ordering::Acquire);
            let new_total = current.saturating_sub(old.size_bytes()).saturating_add(new_size);
            self.used_bytes.store(new_total, Ordering::Release);
        } else {
            self.used_bytes.fetch_add(new_size, Ordering::Release);
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match self.data.remove(key) {
            Some((_, old)) => {
                let current = self.used_bytes.load(Ordering::Acquire);
                self.used_bytes.store(current.saturating_sub(old.size_bytes()), Ordering::Release);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.data.clear();
        self.used_bytes.store(0, Ordering::Release);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.data.iter().map(|r| r.key().clone()).collect())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.data.len())
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.contains_key(key))
    }
}
