//! Tier adapter contract and the in-memory reference tier.

pub mod traits;
pub mod memory;

pub use traits::{StorageError, TierSet, TierStore};
pub use memory::MemoryTier;
