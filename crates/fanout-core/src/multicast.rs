#![forbid(unsafe_code)]

//! One-to-many delegate fan-out.
//!
//! A [`MulticastDelegate`] never owns its delegates. Each one lives exactly
//! as long as its other owners; once released it silently drops out of the
//! delegate list. Registration is append-only: adding the same delegate
//! twice makes it fire twice, and removal takes out the first match.

use std::fmt;
use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::error::BroadcastReport;
use crate::identity::{ListenerId, Membership};
use crate::registry::ListenerRegistry;

/// Weakly held, ordered set of delegates implementing capability `L`.
pub struct MulticastDelegate<L: ?Sized> {
    registry: ListenerRegistry<L>,
}

impl<L: ?Sized> fmt::Debug for MulticastDelegate<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("entries", &self.registry.raw_len())
            .finish()
    }
}

impl<L: ?Sized> Default for MulticastDelegate<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> MulticastDelegate<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ListenerRegistry::with_config(RegistryConfig::append_only()),
        }
    }

    /// Seed the delegate list, preserving order.
    #[must_use]
    pub fn from_delegates(delegates: &[Arc<L>]) -> Self {
        let multicast = Self::new();
        for delegate in delegates {
            multicast.add_delegate(delegate);
        }
        multicast
    }

    pub fn add_delegate(&self, delegate: &Arc<L>) -> ListenerId {
        self.registry.add(delegate, Membership::Weak)
    }

    /// Remove the first registration of `delegate`. No-op when absent.
    pub fn remove_delegate(&self, delegate: &L) -> bool {
        self.registry.remove(delegate)
    }

    /// Live delegates in registration order.
    #[must_use]
    pub fn delegates(&self) -> Vec<Arc<L>> {
        self.registry.live_listeners()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Call `f` on every live delegate.
    pub fn invoke_delegates(&self, f: impl FnMut(&L)) -> BroadcastReport {
        self.registry.notify_all(f)
    }
}
