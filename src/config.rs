// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the tier coordinator.
//!
//! Bad values never stop a coordinator from being built: each invalid field
//! is replaced by its default and reported as a [`ConfigWarning`].
//!
//! # Example
//!
//! ```
//! use cache_tiers::CoordinatorConfig;
//!
//! // Minimal config (uses defaults)
//! let config = CoordinatorConfig::default();
//! assert_eq!(config.fast_tier_limit_bytes, 50 * 1024 * 1024);
//!
//! // Zero interval is replaced by the default, with a warning
//! let (config, warnings) = CoordinatorConfig {
//!     optimization_interval_millis: 0,
//!     ..Default::default()
//! }
//! .sanitized();
//! assert_eq!(config.optimization_interval_millis, 5 * 60 * 1000);
//! assert_eq!(warnings.len(), 1);
//! ```

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::entry::Tier;
use crate::set_options::MAX_PRIORITY;

/// Configuration for the tier coordinator.
///
/// All fields have defaults. Keys accept both `snake_case` and the
/// `camelCase` spelling used by browser-side callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoordinatorConfig {
    /// Fast tier capacity in bytes (default: 50 MB)
    #[serde(default = "default_fast_tier_limit_bytes", alias = "fastTierLimitBytes")]
    pub fast_tier_limit_bytes: u64,

    /// Durable-small tier capacity in bytes (default: 5 MB)
    #[serde(default = "default_small_tier_limit_bytes", alias = "smallTierLimitBytes")]
    pub small_tier_limit_bytes: u64,

    /// Durable-large tier capacity in bytes (default: 500 MB)
    #[serde(default = "default_large_tier_limit_bytes", alias = "largeTierLimitBytes")]
    pub large_tier_limit_bytes: u64,

    /// TTL applied when a write does not carry one (default: 24 h)
    #[serde(default = "default_ttl_millis", alias = "defaultTTLMillis", alias = "defaultTtlMillis")]
    pub default_ttl_millis: u64,

    /// Payloads larger than this are compressed (default: 10 KB)
    #[serde(default = "default_compression_threshold_bytes", alias = "compressionThresholdBytes")]
    pub compression_threshold_bytes: u64,

    /// Payloads larger than this always go to durable-large (default: 100 KB)
    #[serde(default = "default_large_object_threshold_bytes", alias = "largeObjectThresholdBytes")]
    pub large_object_threshold_bytes: u64,

    /// Priority at or above which entries go to the fast tier
    #[serde(default = "default_high_priority_cutoff", alias = "highPriorityCutoff")]
    pub high_priority_cutoff: u8,

    /// Priority at or above which entries go to durable-small
    #[serde(default = "default_medium_priority_cutoff", alias = "mediumPriorityCutoff")]
    pub medium_priority_cutoff: u8,

    /// Reads after which an entry is considered hot
    #[serde(default = "default_frequency_promotion_threshold", alias = "frequencyPromotionThreshold")]
    pub frequency_promotion_threshold: u64,

    /// Optimizer period (default: 5 min)
    #[serde(default = "default_optimization_interval_millis", alias = "optimizationIntervalMillis")]
    pub optimization_interval_millis: u64,

    /// Idle time after which a cold fast-tier entry is demoted (default: 30 min)
    #[serde(default = "default_stale_after_millis", alias = "staleAfterMillis")]
    pub stale_after_millis: u64,

    /// Longest accepted key in bytes
    #[serde(default = "default_max_key_bytes", alias = "maxKeyBytes")]
    pub max_key_bytes: usize,
}

fn default_fast_tier_limit_bytes() -> u64 { 50 * 1024 * 1024 } // 50 MB
fn default_small_tier_limit_bytes() -> u64 { 5 * 1024 * 1024 } // 5 MB
fn default_large_tier_limit_bytes() -> u64 { 500 * 1024 * 1024 } // 500 MB
fn default_ttl_millis() -> u64 { 24 * 60 * 60 * 1000 }
fn default_compression_threshold_bytes() -> u64 { 10 * 1024 }
fn default_large_object_threshold_bytes() -> u64 { 100 * 1024 }
fn default_high_priority_cutoff() -> u8 { 7 }
fn default_medium_priority_cutoff() -> u8 { 4 }
fn default_frequency_promotion_threshold() -> u64 { 5 }
fn default_optimization_interval_millis() -> u64 { 5 * 60 * 1000 }
fn default_stale_after_millis() -> u64 { 30 * 60 * 1000 }
fn default_max_key_bytes() -> usize { 512 }

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fast_tier_limit_bytes: default_fast_tier_limit_bytes(),
            small_tier_limit_bytes: default_small_tier_limit_bytes(),
            large_tier_limit_bytes: default_large_tier_limit_bytes(),
            default_ttl_millis: default_ttl_millis(),
            compression_threshold_bytes: default_compression_threshold_bytes(),
            large_object_threshold_bytes: default_large_object_threshold_bytes(),
            high_priority_cutoff: default_high_priority_cutoff(),
            medium_priority_cutoff: default_medium_priority_cutoff(),
            frequency_promotion_threshold: default_frequency_promotion_threshold(),
            optimization_interval_millis: default_optimization_interval_millis(),
            stale_after_millis: default_stale_after_millis(),
            max_key_bytes: default_max_key_bytes(),
        }
    }
}

/// A configuration value that was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigWarning {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration for `{}`: {} (using default)", self.field, self.reason)
    }
}

impl CoordinatorConfig {
    /// Replace invalid values with defaults.
    ///
    /// Zero limits, TTLs, thresholds and intervals are invalid, as are
    /// priority cutoffs above 9 and a medium cutoff above the high cutoff.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        macro_rules! non_zero {
            ($field:ident, $default:expr) => {
                if self.$field == 0 {
                    warnings.push(ConfigWarning::new(stringify!($field), "must be greater than zero"));
                    self.$field = $default;
                }
            };
        }

        non_zero!(fast_tier_limit_bytes, default_fast_tier_limit_bytes());
        non_zero!(small_tier_limit_bytes, default_small_tier_limit_bytes());
        non_zero!(large_tier_limit_bytes, default_large_tier_limit_bytes());
        non_zero!(default_ttl_millis, default_ttl_millis());
        non_zero!(large_object_threshold_bytes, default_large_object_threshold_bytes());
        non_zero!(frequency_promotion_threshold, default_frequency_promotion_threshold());
        non_zero!(optimization_interval_millis, default_optimization_interval_millis());
        non_zero!(stale_after_millis, default_stale_after_millis());
        non_zero!(max_key_bytes, default_max_key_bytes());

        if self.high_priority_cutoff > MAX_PRIORITY {
            warnings.push(ConfigWarning::new(
                "high_priority_cutoff",
                format!("{} outside 0..={}", self.high_priority_cutoff, MAX_PRIORITY),
            ));
            self.high_priority_cutoff = default_high_priority_cutoff();
        }
        if self.medium_priority_cutoff > MAX_PRIORITY {
            warnings.push(ConfigWarning::new(
                "medium_priority_cutoff",
                format!("{} outside 0..={}", self.medium_priority_cutoff, MAX_PRIORITY),
            ));
            self.medium_priority_cutoff = default_medium_priority_cutoff();
        }
        if self.medium_priority_cutoff > self.high_priority_cutoff {
            warnings.push(ConfigWarning::new(
                "medium_priority_cutoff",
                format!(
                    "{} is above high_priority_cutoff {}",
                    self.medium_priority_cutoff, self.high_priority_cutoff
                ),
            ));
            self.medium_priority_cutoff = default_medium_priority_cutoff()
                .min(self.high_priority_cutoff);
        }

        (self, warnings)
    }

    /// Build a config from loosely-typed JSON.
    ///
    /// Unknown keys are ignored. Negative numbers, fractions, strings and
    /// other wrong types fall back to the default for that field. The result
    /// is already sanitized.
    ///
    /// ```
    /// use cache_tiers::CoordinatorConfig;
    /// use serde_json::json;
    ///
    /// let (config, warnings) = CoordinatorConfig::from_value(&json!({
    ///     "fastTierLimitBytes": -1,
    ///     "defaultTTLMillis": 60000,
    /// }));
    /// assert_eq!(config.fast_tier_limit_bytes, CoordinatorConfig::default().fast_tier_limit_bytes);
    /// assert_eq!(config.default_ttl_millis, 60000);
    /// assert_eq!(warnings.len(), 1);
    /// ```
    #[must_use]
    pub fn from_value(value: &Value) -> (Self, Vec<ConfigWarning>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                warnings.push(ConfigWarning::new("config", "expected an object"));
            }
            return (config, warnings);
        };

        macro_rules! read {
            ($field:literal, $($alias:literal),+) => {
                read_u64(obj, &mut warnings, $field, &[$($alias),+])
            };
        }

        if let Some(v) = read!("fast_tier_limit_bytes", "fastTierLimitBytes") {
            config.fast_tier_limit_bytes = v;
        }
        if let Some(v) = read!("small_tier_limit_bytes", "smallTierLimitBytes") {
            config.small_tier_limit_bytes = v;
        }
        if let Some(v) = read!("large_tier_limit_bytes", "largeTierLimitBytes") {
            config.large_tier_limit_bytes = v;
        }
        if let Some(v) = read!("default_ttl_millis", "defaultTTLMillis", "defaultTtlMillis") {
            config.default_ttl_millis = v;
        }
        if let Some(v) = read!("compression_threshold_bytes", "compressionThresholdBytes") {
            config.compression_threshold_bytes = v;
        }
        if let Some(v) = read!("large_object_threshold_bytes", "largeObjectThresholdBytes") {
            config.large_object_threshold_bytes = v;
        }
        if let Some(v) = read!("high_priority_cutoff", "highPriorityCutoff") {
            config.high_priority_cutoff = u8::try_from(v).unwrap_or(u8::MAX);
        }
        if let Some(v) = read!("medium_priority_cutoff", "mediumPriorityCutoff") {
            config.medium_priority_cutoff = u8::try_from(v).unwrap_or(u8::MAX);
        }
        if let Some(v) = read!("frequency_promotion_threshold", "frequencyPromotionThreshold") {
            config.frequency_promotion_threshold = v;
        }
        if let Some(v) = read!("optimization_interval_millis", "optimizationIntervalMillis") {
            config.optimization_interval_millis = v;
        }
        if let Some(v) = read!("stale_after_millis", "staleAfterMillis") {
            config.stale_after_millis = v;
        }
        if let Some(v) = read!("max_key_bytes", "maxKeyBytes") {
            config.max_key_bytes = usize::try_from(v).unwrap_or(usize::MAX);
        }

        let (config, more) = config.sanitized();
        warnings.extend(more);
        (config, warnings)
    }

    /// Configured byte capacity of a tier.
    #[must_use]
    pub fn tier_limit(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Fast => self.fast_tier_limit_bytes,
            Tier::DurableSmall => self.small_tier_limit_bytes,
            Tier::DurableLarge => self.large_tier_limit_bytes,
        }
    }
}

/// Read a non-negative integer field under its name or any alias.
fn read_u64(
    obj: &serde_json::Map<String, Value>,
    warnings: &mut Vec<ConfigWarning>,
    field: &'static str,
    aliases: &[&str],
) -> Option<u64> {
    let raw = std::iter::once(field)
        .chain(aliases.iter().copied())
        .find_map(|name| obj.get(name))?;
    match raw.as_u64() {
        Some(n) => Some(n),
        None => {
            let reason = if raw.as_i64().is_some_and(|n| n < 0) {
                format!("negative value {}", raw)
            } else {
                format!("expected a non-negative integer, got {}", raw)
            };
            warnings.push(ConfigWarning::new(field, reason));
            None
        }
    }
}
