// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Process-wide coordinator.
//!
//! The first call builds the coordinator; every later call returns the same
//! instance and ignores its arguments. Code that needs its own tiers (tests
//! in particular) should construct a [`TierCoordinator`] directly instead.
//!
//! The shared instance lives for the rest of the process, but its optimizer
//! timer lives on a Tokio runtime. Each call restarts the timer on the
//! caller's runtime if the runtime that started it has shut down, or if the
//! first call came from outside any runtime. Calling
//! [`TierCoordinator::destroy`] on it stops its timer and events for every
//! user.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::config::CoordinatorConfig;
use crate::coordinator::TierCoordinator;
use crate::storage::TierSet;

static SHARED: OnceLock<Arc<TierCoordinator>> = OnceLock::new();

/// The shared coordinator over in-memory tiers.
pub fn shared_coordinator(config: Option<CoordinatorConfig>) -> Arc<TierCoordinator> {
    shared_coordinator_with(TierSet::in_memory, config)
}

/// The shared coordinator, built from `tiers()` on first use.
///
/// `tiers` is only invoked if the coordinator does not exist yet.
pub fn shared_coordinator_with<F>(tiers: F, config: Option<CoordinatorConfig>) -> Arc<TierCoordinator>
where
    F: FnOnce() -> TierSet,
{
    let coordinator = SHARED
        .get_or_init(|| {
            info!("Creating shared tier coordinator");
            TierCoordinator::new(tiers(), config.unwrap_or_default())
        })
        .clone();
    coordinator.ensure_optimizer();
    coordinator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    // One test only: the singleton is shared by the whole test binary
    #[test]
    fn test_shared_instance_and_timer_survive_runtime_shutdown() {
        let config = CoordinatorConfig {
            optimization_interval_millis: 50,
            ..Default::default()
        };

        let first = runtime().block_on(async { shared_coordinator(Some(config)) });

        // The runtime that started the timer is gone now
        let second = runtime().block_on(async {
            let second = shared_coordinator(Some(CoordinatorConfig {
                fast_tier_limit_bytes: 1,
                ..Default::default()
            }));
            let third = shared_coordinator_with(TierSet::in_memory, None);
            assert!(Arc::ptr_eq(&second, &third));

            let sweeps = Arc::new(AtomicUsize::new(0));
            let s = sweeps.clone();
            second.on(EventKind::Optimize, move |_| {
                s.fetch_add(1, Ordering::Relaxed);
            });
            tokio::time::sleep(Duration::from_millis(400)).await;
            assert!(sweeps.load(Ordering::Relaxed) >= 1);
            second
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().optimization_interval_millis, 50);
        assert_ne!(second.config().fast_tier_limit_bytes, 1);
    }
}
