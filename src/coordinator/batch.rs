//! Bulk operations built on the single-key paths.
//!
//! Every key is handled independently: one failure or miss never aborts the
//! rest, and nothing is rolled back.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::{CacheError, TierCoordinator};
use crate::set_options::SetOptions;

impl TierCoordinator {
    /// Read many keys. Every requested key appears in the result.
    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn get_multiple<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, Option<Value>> {
        let mut results = HashMap::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let value = self.get(key).await;
            results.insert(key.to_string(), value);
        }
        debug!(found = results.values().filter(|v| v.is_some()).count(), "Batch get complete");
        results
    }

    /// Write many entries with the same options.
    ///
    /// Returns the keys that were stored, in input order. Keys that fail
    /// (including malformed ones) are left out. Invalid `options` reject the
    /// whole call before any write.
    #[tracing::instrument(skip(self, entries, options))]
    pub async fn set_multiple<I, K>(&self, entries: I, options: &SetOptions) -> Result<Vec<String>, CacheError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if let Some(problem) = options.problem() {
            return Err(CacheError::InvalidOptions(problem));
        }

        let mut stored = Vec::new();
        let mut failed = 0usize;
        for (key, value) in entries {
            let key = key.into();
            match self.set(&key, &value, options).await {
                Ok(true) => stored.push(key),
                Ok(false) => failed += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping entry in batch set");
                    failed += 1;
                }
            }
        }

        debug!(stored = stored.len(), failed, "Batch set complete");
        Ok(stored)
    }

    /// Delete many keys.
    ///
    /// Returns the keys that were actually removed. Absent and malformed keys
    /// are skipped silently.
    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn delete_multiple<K: AsRef<str>>(&self, keys: &[K]) -> Vec<String> {
        let mut removed = Vec::new();
        for key in keys {
            let key = key.as_ref();
            if let Err(e) = self.validate_key(key) {
                debug!(error = %e, "Skipping key in batch delete");
                continue;
            }
            let removal = self.remove(key).await;
            if removal.removed {
                removed.push(key.to_string());
            }
        }
        debug!(removed = removed.len(), "Batch delete complete");
        removed
    }
}
