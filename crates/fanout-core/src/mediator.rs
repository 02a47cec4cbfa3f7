#![forbid(unsafe_code)]

//! Colleague registry with sender-excluding broadcast.
//!
//! Colleagues talk to each other only through the [`Mediator`]. A message
//! sent by one colleague reaches every other live colleague, never echoing
//! back to the sender. Colleagues can be owned by the mediator (strong) or
//! merely tracked while someone else owns them (weak).

use std::fmt;
use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::error::BroadcastReport;
use crate::identity::{ListenerId, Membership};
use crate::registry::ListenerRegistry;

pub struct Mediator<L: ?Sized> {
    registry: ListenerRegistry<L>,
}

impl<L: ?Sized> fmt::Debug for Mediator<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<L: ?Sized> Default for Mediator<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Mediator<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ListenerRegistry::with_config(RegistryConfig::append_only()),
        }
    }

    pub fn add_colleague(&self, colleague: &Arc<L>, membership: Membership) -> ListenerId {
        self.registry.add(colleague, membership)
    }

    /// Remove the first registration of `colleague`. No-op when absent.
    pub fn remove_colleague(&self, colleague: &L) -> bool {
        self.registry.remove(colleague)
    }

    /// Live colleagues in registration order.
    #[must_use]
    pub fn colleagues(&self) -> Vec<Arc<L>> {
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

    /// Call `f` on every live colleague.
    pub fn invoke_colleagues(&self, f: impl FnMut(&L)) -> BroadcastReport {
        self.registry.notify_all(f)
    }

    /// Call `f` on every live colleague other than `sender`.
    pub fn invoke_colleagues_except(&self, sender: &L, f: impl FnMut(&L)) -> BroadcastReport {
        self.registry.notify_excluding(sender, f)
    }
}
