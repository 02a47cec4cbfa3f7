#![forbid(unsafe_code)]

//! Listener identity, membership, and interest flags.
//!
//! Identity is by address, never by value: two listeners that compare equal
//! field-by-field are still distinct registrations. [`ListenerKey`] is derived
//! from the data pointer of the listener so a `&dyn Trait` borrowed inside a
//! callback compares equal to the `Arc<dyn Trait>` it was registered from.

use std::fmt;
use std::sync::{Arc, Weak};

use bitflags::bitflags;

/// How a registry holds on to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Membership {
    /// The registry owns a reference and keeps the listener alive.
    #[default]
    Strong,
    /// The registry holds a non-owning reference; the entry dies with the
    /// last external owner and is reaped on the next traversal.
    Weak,
}

/// Handle returned by registration, usable for removal.
///
/// Ids are allocated monotonically per registry and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Address identity of a listener.
///
/// Built from the data pointer only, so trait-object metadata never takes
/// part in the comparison. A weak entry pins its allocation, so a key cannot
/// be reused by a new listener while a dead entry still carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(usize);

impl ListenerKey {
    /// Key of a borrowed listener.
    #[must_use]
    pub fn of<L: ?Sized>(listener: &L) -> Self {
        Self(std::ptr::from_ref(listener).cast::<()>() as usize)
    }

    /// Key of a shared listener.
    #[must_use]
    pub fn of_arc<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener).cast::<()>() as usize)
    }

    /// Key of a weak reference. Valid whether or not the referent is alive.
    #[must_use]
    pub fn of_weak<L: ?Sized>(listener: &Weak<L>) -> Self {
        Self(Weak::as_ptr(listener).cast::<()>() as usize)
    }
}

bitflags! {
    /// Event kinds a value observer wants to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interest: u8 {
        /// Replay the current value once, synchronously, at registration.
        const INITIAL = 1 << 0;
        /// The value as it was before a write.
        const OLD = 1 << 1;
        /// The value as it is after a write.
        const NEW = 1 << 2;
    }
}

impl Default for Interest {
    fn default() -> Self {
        Self::NEW
    }
}

/// Tag attached to every value notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Initial,
    Old,
    New,
}

impl ChangeKind {
    /// The interest flag that subscribes to this kind.
    #[must_use]
    pub const fn as_interest(self) -> Interest {
        match self {
            Self::Initial => Interest::INITIAL,
            Self::Old => Interest::OLD,
            Self::New => Interest::NEW,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Old => "old",
            Self::New => "new",
        };
        f.write_str(name)
    }
}
