// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tier placement policy.
//!
//! [`select`] is a pure function: given the serialized size, the write
//! options and the current access count of an existing entry, it decides the
//! target tier and whether the payload gets compressed. It performs no I/O.
//!
//! Decision order (first match wins):
//!
//! ```text
//! size > large_object_threshold            → DurableLarge
//! access_count ≥ promotion threshold       → Fast
//! priority ≥ high_priority_cutoff          → Fast
//! priority ≥ medium_priority_cutoff        → DurableSmall
//! otherwise                                → DurableLarge
//! ```

use crate::config::CoordinatorConfig;
use crate::entry::Tier;
use crate::set_options::SetOptions;

/// Outcome of a placement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub tier: Tier,
    pub compress: bool,
}

/// Choose the tier for a write.
///
/// `existing_access_count` is the access count of the entry being replaced,
/// if any.
///
/// # Example
///
/// ```
/// use cache_tiers::{CoordinatorConfig, SetOptions, Tier};
/// use cache_tiers::strategy::select;
///
/// let config = CoordinatorConfig::default();
/// let placement = select(128, &SetOptions::default().with_priority(9), None, &config);
/// assert_eq!(placement.tier, Tier::Fast);
/// assert!(!placement.compress);
/// ```
#[must_use]
pub fn select(
    size_bytes: u64,
    options: &SetOptions,
    existing_access_count: Option<u64>,
    config: &CoordinatorConfig,
) -> Placement {
    let compress = options.compressed || size_bytes > config.compression_threshold_bytes;
    let priority = options.priority();

    let tier = if size_bytes > config.large_object_threshold_bytes {
        Tier::DurableLarge
    } else if existing_access_count.is_some_and(|n| n >= config.frequency_promotion_threshold) {
        Tier::Fast
    } else if priority >= config.high_priority_cutoff {
        Tier::Fast
    } else if priority >= config.medium_priority_cutoff {
        Tier::DurableSmall
    } else {
        Tier::DurableLarge
    };

    Placement { tier, compress }
}

/// Whether an entry of this size and access count belongs in the fast tier.
///
/// Shared by the read path and the optimizer so both promote by the same rule.
#[must_use]
pub fn is_hot(access_count: u64, size_bytes: u64, config: &CoordinatorConfig) -> bool {
    access_count >= config.frequency_promotion_threshold
        && size_bytes <= config.large_object_threshold_bytes
}
