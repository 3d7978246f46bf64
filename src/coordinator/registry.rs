//! Facades sharing one coordinator.
//!
//! Higher-level caches register themselves so coordinator-wide operations
//! (currently [`TierCoordinator::clear`]) can notify them. The coordinator
//! never looks inside a facade.

use std::sync::Arc;

use tracing::debug;

use super::TierCoordinator;

/// A higher-level cache built on a shared coordinator.
pub trait CacheFacade: Send + Sync {
    fn name(&self) -> &str;

    /// Called after the coordinator cleared every tier.
    fn on_clear(&self) {}
}

fn same_facade(a: &Arc<dyn CacheFacade>, b: &Arc<dyn CacheFacade>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl TierCoordinator {
    /// Track a facade. Registering the same handle twice is a no-op and
    /// returns `false`.
    pub fn register(&self, facade: Arc<dyn CacheFacade>) -> bool {
        let mut facades = self.facades.write();
        if facades.iter().any(|existing| same_facade(existing, &facade)) {
            return false;
        }
        debug!(facade = facade.name(), "Facade registered");
        facades.push(facade);
        true
    }

    /// Stop tracking a facade. Returns `false` if it was not registered.
    pub fn unregister(&self, facade: &Arc<dyn CacheFacade>) -> bool {
        let mut facades = self.facades.write();
        let before = facades.len();
        facades.retain(|existing| !same_facade(existing, facade));
        let removed = facades.len() != before;
        if removed {
            debug!(facade = facade.name(), "Facade unregistered");
        }
        removed
    }

    /// Registered facades in registration order.
    #[must_use]
    pub fn registered_instances(&self) -> Vec<Arc<dyn CacheFacade>> {
        self.facades.read().clone()
    }

    pub(super) fn notify_cleared(&self) {
        // Snapshot so a facade may re-register from its callback
        for facade in self.registered_instances() {
            facade.on_clear();
        }
    }
}
