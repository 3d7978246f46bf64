// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-write options.
//!
//! Options feed the placement decision (priority, forced compression) and the
//! entry envelope (TTL, tags). They are validated before any tier is touched.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use cache_tiers::SetOptions;
//!
//! let opts = SetOptions::default()
//!     .with_priority(8)
//!     .with_ttl(Duration::from_secs(60))
//!     .with_tag("session");
//! assert_eq!(opts.priority, Some(8));
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

/// Highest accepted priority.
pub const MAX_PRIORITY: u8 = 9;

/// Priority used when the caller does not supply one.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Options for a single `set()` (or every entry of a `set_multiple()`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// 0-9; `None` uses [`DEFAULT_PRIORITY`]
    pub priority: Option<u8>,

    /// Time to live; `None` uses the coordinator's default TTL
    pub ttl: Option<Duration>,

    /// Free-form labels stored with the entry
    pub tags: BTreeSet<String>,

    /// Force compression even below the size threshold
    pub compressed: bool,
}

impl SetOptions {
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_ttl_millis(self, millis: u64) -> Self {
        self.with_ttl(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Effective priority.
    #[must_use]
    pub fn priority(&self) -> u8 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Reason the options are malformed, if they are.
    #[must_use]
    pub fn problem(&self) -> Option<String> {
        if let Some(p) = self.priority {
            if p > MAX_PRIORITY {
                return Some(format!("priority {} outside 0..={}", p, MAX_PRIORITY));
            }
        }
        if let Some(ttl) = self.ttl {
            if ttl.is_zero() {
                return Some("ttl must be greater than zero".to_string());
            }
        }
        if self.tags.iter().any(String::is_empty) {
            return Some("tags must not be empty strings".to_string());
        }
        None
    }
}
