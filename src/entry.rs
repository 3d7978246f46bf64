// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache entry envelope.
//!
//! A [`CacheEntry`] is what every tier stores: the (possibly compressed)
//! serialized payload plus the [`EntryMetadata`] the coordinator needs for
//! placement, expiry and rebalancing decisions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compression::{self, CompressionError};

/// The three storage tiers, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Fast, volatile (process memory)
    Fast,
    /// Durable, small capacity
    DurableSmall,
    /// Durable, large capacity
    DurableLarge,
}

impl Tier {
    /// Probe order for reads.
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::DurableSmall, Tier::DurableLarge];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::DurableSmall => "durable-small",
            Tier::DurableLarge => "durable-large",
        }
    }

    /// The next slower tier, if any.
    #[must_use]
    pub fn slower(&self) -> Option<Tier> {
        match self {
            Tier::Fast => Some(Tier::DurableSmall),
            Tier::DurableSmall => Some(Tier::DurableLarge),
            Tier::DurableLarge => None,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Tier::Fast => 0,
            Tier::DurableSmall => 1,
            Tier::DurableLarge => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement and bookkeeping data carried with every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Absolute expiry (epoch millis). Expired once `expires_at < now`.
    pub expires_at: u64,
    /// 0 (lowest) to 9 (highest)
    pub priority: u8,
    /// Tier currently holding the entry
    pub assigned_tier: Tier,
    pub access_count: u64,
    /// Epoch millis of the last successful read (write time until first read)
    pub last_access_time: u64,
    /// Length of the uncompressed serialized payload
    pub size_bytes: u64,
    /// Whether `data` holds zstd output
    pub compressed: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// The stored unit: payload bytes plus metadata.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use cache_tiers::{CacheEntry, Tier};
/// use serde_json::json;
///
/// let value = json!({"x": 1});
/// let bytes = serde_json::to_vec(&value).unwrap();
/// let entry = CacheEntry::build(bytes, false, Tier::Fast, 5, 1_000, 60_000, BTreeSet::new()).unwrap();
///
/// assert_eq!(entry.metadata.expires_at, 61_000);
/// assert_eq!(entry.value().unwrap(), value);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<u8>,
    pub metadata: EntryMetadata,
}

impl CacheEntry {
    /// Build an envelope from an already-serialized payload.
    ///
    /// `size_bytes` is taken from `serialized` before compression.
    pub fn build(
        serialized: Vec<u8>,
        compress: bool,
        tier: Tier,
        priority: u8,
        now: u64,
        ttl_millis: u64,
        tags: BTreeSet<String>,
    ) -> Result<Self, CompressionError> {
        let size_bytes = serialized.len() as u64;
        let data = if compress {
            compression::compress_bytes(&serialized)?
        } else {
            serialized
        };

        Ok(Self {
            data,
            metadata: EntryMetadata {
                expires_at: now.saturating_add(ttl_millis),
                priority,
                assigned_tier: tier,
                access_count: 0,
                last_access_time: now,
                size_bytes,
                compressed: compress,
                tags,
            },
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.metadata.expires_at < now
    }

    pub fn record_access(&mut self, now: u64) {
        self.metadata.access_count = self.metadata.access_count.saturating_add(1);
        self.metadata.last_access_time = now;
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.metadata.size_bytes
    }

    /// Decode the payload back to JSON.
    ///
    /// Decompression is driven by the magic bytes rather than the flag, so a
    /// payload stored uncompressed by another producer still decodes.
    pub fn value(&self) -> Result<Value, CompressionError> {
        let raw = compression::decompress_bytes(&self.data)?;
        serde_json::from_slice(&raw).map_err(CompressionError::from)
    }

    /// Copy of this entry re-stamped for another tier.
    #[must_use]
    pub fn moved_to(&self, tier: Tier) -> Self {
        let mut moved = self.clone();
        moved.metadata.assigned_tier = tier;
        moved
    }
}
