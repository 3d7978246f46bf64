//! # Cache Tiers
//!
//! A coordinator that places cached entries across three storage tiers and
//! keeps rebalancing them as access patterns change.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TierCoordinator                         │
//! │  • set(): strategy selects tier, envelope, single location  │
//! │  • get(): fast → small → large, promotes hot entries        │
//! │  • optimizer: expiry, promotion/demotion, capacity shedding │
//! │  • stats, events, facade registry                           │
//! └─────────────────────────────────────────────────────────────┘
//!            │                  │                   │
//!            ▼                  ▼                   ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │   fast           │ │  durable-small   │ │  durable-large   │
//! │  volatile        │ │  medium priority │ │  low priority,   │
//! │  high priority,  │ │                  │ │  oversized       │
//! │  hot entries     │ │                  │ │                  │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//!          (any TierStore implementation; MemoryTier included)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cache_tiers::{CoordinatorConfig, SetOptions, TierCoordinator, TierSet};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TierCoordinator::new(TierSet::in_memory(), CoordinatorConfig::default());
//!
//!     let opts = SetOptions::default()
//!         .with_priority(8)
//!         .with_ttl(Duration::from_secs(60));
//!     cache.set("session:42", &json!({"x": 1}), &opts).await.unwrap();
//!
//!     if let Some(value) = cache.get("session:42").await {
//!         println!("Found: {}", value);
//!     }
//!
//!     let stats = cache.get_cache_stats().await;
//!     println!("hit rate {:.2}", stats.hit_rate);
//!
//!     cache.destroy();
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`CoordinatorConfig`]. Invalid values are replaced with defaults and
//! reported through [`TierCoordinator::config_warnings`].
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`TierCoordinator`] and its operations
//! - [`strategy`]: pure tier placement
//! - [`storage`]: tier adapter contract and the in-memory tier
//! - [`entry`]: the stored envelope
//! - [`eviction`]: tan-curve scoring for over-capacity tiers
//! - [`events`]: publish/subscribe for coordinator events
//! - [`global`]: process-wide shared coordinator

pub mod clock;
pub mod compression;
pub mod config;
pub mod coordinator;
pub mod entry;
pub mod events;
pub mod eviction;
pub mod global;
pub mod metrics;
pub mod set_options;
pub mod storage;
pub mod strategy;

pub use config::{ConfigWarning, CoordinatorConfig};
pub use coordinator::{
    CacheError, CacheFacade, CacheStats, OptimizationReport, TierCoordinator, TierDistribution,
};
pub use entry::{CacheEntry, EntryMetadata, Tier};
pub use events::{CacheEvent, EventKind, EvictReason, ListenerId};
pub use set_options::SetOptions;
pub use storage::{MemoryTier, StorageError, TierSet, TierStore};
pub use metrics::LatencyTimer;
