#![forbid(unsafe_code)]

//! Ordered listener registry with weak/strong membership.
//!
//! # Design
//!
//! [`ListenerRegistry<L, C>`] keeps an insertion-ordered list of entries,
//! each holding a listener of capability type `L` (usually a trait object
//! such as `dyn Log`) either strongly (`Arc<L>`) or weakly (`Weak<L>`), plus
//! a per-entry payload `C` (unit for plain capability registries, a
//! callback for value observation).
//!
//! Broadcast takes a snapshot of the live entries under the lock, releases
//! the lock, and then invokes callbacks in registration order. Callbacks are
//! therefore free to `add`/`remove` on the same registry:
//!
//! - an entry added during a broadcast is first notified on the next one;
//! - an entry removed during a broadcast still receives the current event if
//!   it had not been reached yet, and never receives it twice.
//!
//! # Invariants
//!
//! 1. Traversal and counting reap dead weak entries first; a dead entry is
//!    never handed to a caller.
//! 2. Notification order is registration order.
//! 3. With replace-on-add, an identity appears at most once.
//! 4. The entry lock is never held while user code runs. That includes the
//!    `Drop` of listeners and payloads released by `remove`, `clear`, a
//!    replacing `add`, or reaping.
//!
//! # Failure Modes
//!
//! - **Listener panic / error**: contained per callback, reported in the
//!   [`BroadcastReport`], logged at `warn`. Remaining listeners still run.
//! - **Panic with `catch_panics` disabled**: unwinds to the broadcaster. The
//!   registry stays consistent because no lock is held.
//! - **Stale counts**: a weak listener dropped on another thread right after
//!   a reap is counted until the next traversal.

use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, debug_span, trace, warn};

use crate::config::RegistryConfig;
use crate::error::{BroadcastReport, FaultCause, ListenerFault};
use crate::identity::{ChangeKind, Interest, ListenerId, ListenerKey, Membership};

enum Slot<L: ?Sized> {
    Strong(Arc<L>),
    Weak(Weak<L>),
}

impl<L: ?Sized> Slot<L> {
    fn upgrade(&self) -> Option<Arc<L>> {
        match self {
            Self::Strong(listener) => Some(Arc::clone(listener)),
            Self::Weak(listener) => listener.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Strong(_) => true,
            Self::Weak(listener) => listener.strong_count() > 0,
        }
    }

    fn membership(&self) -> Membership {
        match self {
            Self::Strong(_) => Membership::Strong,
            Self::Weak(_) => Membership::Weak,
        }
    }
}

struct Entry<L: ?Sized, C> {
    id: ListenerId,
    key: ListenerKey,
    slot: Slot<L>,
    interest: Interest,
    callback: C,
}

/// A live, upgraded entry taken from a registry snapshot.
pub struct LiveEntry<L: ?Sized, C> {
    pub id: ListenerId,
    pub key: ListenerKey,
    pub membership: Membership,
    pub interest: Interest,
    pub listener: Arc<L>,
    pub callback: C,
}

impl<L: ?Sized, C> fmt::Debug for LiveEntry<L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveEntry")
            .field("id", &self.id)
            .field("membership", &self.membership)
            .field("interest", &self.interest)
            .finish_non_exhaustive()
    }
}

/// Per-registration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddOptions {
    pub membership: Membership,
    pub interest: Interest,
    /// Overrides [`RegistryConfig::replace_on_add`] for this call.
    pub replace: Option<bool>,
}

impl AddOptions {
    /// Strong membership, `NEW` interest.
    #[must_use]
    pub fn strong() -> Self {
        Self::default()
    }

    /// Weak membership, `NEW` interest.
    #[must_use]
    pub fn weak() -> Self {
        Self {
            membership: Membership::Weak,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    #[must_use]
    pub fn with_interest(mut self, interest: Interest) -> Self {
        self.interest = interest;
        self
    }

    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = Some(replace);
        self
    }
}

/// Which live entries a broadcast reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    only: Option<ListenerId>,
    exclude: Option<ListenerKey>,
    interest: Option<Interest>,
}

impl Dispatch {
    /// Every live entry.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Every live entry except those registered under `sender`'s identity.
    #[must_use]
    pub fn excluding<L: ?Sized>(sender: &L) -> Self {
        Self {
            exclude: Some(ListenerKey::of(sender)),
            ..Self::default()
        }
    }

    /// Only the entry created by the registration that returned `id`.
    #[must_use]
    pub fn only(id: ListenerId) -> Self {
        Self {
            only: Some(id),
            ..Self::default()
        }
    }

    /// Restrict to entries whose interest intersects `interest`.
    #[must_use]
    pub fn with_interest(mut self, interest: Interest) -> Self {
        self.interest = Some(interest);
        self
    }

    /// Restrict to entries subscribed to `kind`.
    #[must_use]
    pub fn for_kind(self, kind: ChangeKind) -> Self {
        self.with_interest(kind.as_interest())
    }

    fn passes_over<L: ?Sized, C>(&self, entry: &LiveEntry<L, C>) -> bool {
        if self.only.is_some_and(|id| id != entry.id) || self.exclude == Some(entry.key) {
            return true;
        }
        self.interest
            .is_some_and(|interest| !entry.interest.intersects(interest))
    }
}

/// Ordered, identity-keyed registry of capability-typed listeners.
///
/// All methods take `&self`; the entry list sits behind a single mutex.
pub struct ListenerRegistry<L: ?Sized, C = ()> {
    entries: Mutex<Vec<Entry<L, C>>>,
    next_id: AtomicU64,
    config: RegistryConfig,
}

impl<L: ?Sized, C> fmt::Debug for ListenerRegistry<L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let weak = entries
            .iter()
            .filter(|e| e.slot.membership() == Membership::Weak)
            .count();
        f.debug_struct("ListenerRegistry")
            .field("entries", &entries.len())
            .field("weak_entries", &weak)
            .field("config", &self.config)
            .finish()
    }
}

impl<L: ?Sized, C: Clone> Default for ListenerRegistry<L, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized, C: Clone> ListenerRegistry<L, C> {
    /// Create an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a listener with its payload.
    ///
    /// With replace-on-add in effect, every existing entry for the same
    /// identity is removed before the new one is appended.
    pub fn add_with(&self, listener: &Arc<L>, options: AddOptions, callback: C) -> ListenerId {
        let key = ListenerKey::of_arc(listener);
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = match options.membership {
            Membership::Strong => Slot::Strong(Arc::clone(listener)),
            Membership::Weak => Slot::Weak(Arc::downgrade(listener)),
        };
        let replace = options.replace.unwrap_or(self.config.replace_on_add);

        let replaced = {
            let mut entries = self.entries.lock();
            let replaced = if replace {
                extract_where(&mut *entries, |e| e.key == key)
            } else {
                Vec::new()
            };
            entries.push(Entry {
                id,
                key,
                slot,
                interest: options.interest,
                callback,
            });
            replaced
        };

        debug!(
            listener = %id,
            membership = ?options.membership,
            interest = ?options.interest,
            replaced = replaced.len(),
            "listener registered"
        );
        drop(replaced);
        id
    }

    /// Remove the first entry registered under `listener`'s identity.
    ///
    /// Returns `false` when no such entry exists.
    pub fn remove(&self, listener: &L) -> bool {
        self.remove_key(ListenerKey::of(listener))
    }

    /// Remove the first entry registered under `key`.
    pub fn remove_key(&self, key: ListenerKey) -> bool {
        self.remove_first(|e| e.key == key)
    }

    /// Remove every entry registered under `key`. Returns how many went.
    pub fn remove_every(&self, key: ListenerKey) -> usize {
        let removed = extract_where(&mut *self.entries.lock(), |e| e.key == key);
        if !removed.is_empty() {
            debug!(count = removed.len(), "listener entries removed");
        }
        removed.len()
    }

    /// Remove the entry created by the registration that returned `id`.
    pub fn remove_id(&self, id: ListenerId) -> bool {
        self.remove_first(|e| e.id == id)
    }

    fn remove_first(&self, matches: impl Fn(&Entry<L, C>) -> bool) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            entries
                .iter()
                .position(matches)
                .map(|index| entries.remove(index))
        };
        match removed {
            Some(entry) => {
                debug!(listener = %entry.id, "listener removed");
                drop(entry);
                true
            }
            None => false,
        }
    }

    /// Whether a live entry exists for `listener`'s identity.
    #[must_use]
    pub fn contains(&self, listener: &L) -> bool {
        self.contains_key(ListenerKey::of(listener))
    }

    /// Whether a live entry exists under `key`.
    #[must_use]
    pub fn contains_key(&self, key: ListenerKey) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.key == key && e.slot.is_alive())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        if !entries.is_empty() {
            debug!(count = entries.len(), "registry cleared");
        }
        drop(entries);
    }

    /// Remove dead weak entries. Returns how many were removed.
    pub fn reap(&self) -> usize {
        let (dead, remaining) = {
            let mut entries = self.entries.lock();
            let dead = extract_where(&mut *entries, |e| !e.slot.is_alive());
            (dead, entries.len())
        };
        if !dead.is_empty() {
            trace!(reaped = dead.len(), remaining, "reaped dead listeners");
        }
        dead.len()
    }

    /// Live entry count, after reaping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reap();
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry count including dead weak entries not yet reaped.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Reap, then return every live entry in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LiveEntry<L, C>> {
        let mut live = Vec::new();
        let dead = {
            let mut entries = self.entries.lock();
            live.reserve(entries.len());
            extract_where(&mut *entries, |entry| match entry.slot.upgrade() {
                Some(listener) => {
                    live.push(LiveEntry {
                        id: entry.id,
                        key: entry.key,
                        membership: entry.slot.membership(),
                        interest: entry.interest,
                        listener,
                        callback: entry.callback.clone(),
                    });
                    false
                }
                None => true,
            })
        };
        if !dead.is_empty() {
            trace!(reaped = dead.len(), remaining = live.len(), "reaped dead listeners");
        }
        live
    }

    /// Reap, then return the live listeners in registration order.
    #[must_use]
    pub fn live_listeners(&self) -> Vec<Arc<L>> {
        self.snapshot().into_iter().map(|e| e.listener).collect()
    }

    /// Invoke `f` on every live listener.
    pub fn notify_all(&self, mut f: impl FnMut(&L)) -> BroadcastReport {
        self.broadcast(Dispatch::all(), |listener, _| {
            f(listener);
            Ok::<(), Infallible>(())
        })
    }

    /// Invoke `f` on every live listener except `sender`.
    pub fn notify_excluding(&self, sender: &L, mut f: impl FnMut(&L)) -> BroadcastReport {
        self.broadcast(Dispatch::excluding(sender), |listener, _| {
            f(listener);
            Ok::<(), Infallible>(())
        })
    }

    /// Fallible form of [`notify_all`](Self::notify_all). Errors are
    /// reported as faults; delivery continues.
    pub fn try_notify_all<E: fmt::Display>(
        &self,
        mut f: impl FnMut(&L) -> Result<(), E>,
    ) -> BroadcastReport {
        self.broadcast(Dispatch::all(), |listener, _| f(listener))
    }

    /// Fallible form of [`notify_excluding`](Self::notify_excluding).
    pub fn try_notify_excluding<E: fmt::Display>(
        &self,
        sender: &L,
        mut f: impl FnMut(&L) -> Result<(), E>,
    ) -> BroadcastReport {
        self.broadcast(Dispatch::excluding(sender), |listener, _| f(listener))
    }

    /// Deliver to the snapshot selected by `dispatch`, in registration order.
    ///
    /// `f` receives each listener and its payload. A panic (when
    /// `catch_panics` is set) or an `Err` from `f` is recorded as a
    /// [`ListenerFault`] and the broadcast moves on.
    pub fn broadcast<E, F>(&self, dispatch: Dispatch, mut f: F) -> BroadcastReport
    where
        E: fmt::Display,
        F: FnMut(&L, &C) -> Result<(), E>,
    {
        let snapshot = self.snapshot();
        let _span = self
            .config
            .trace_broadcasts
            .then(|| debug_span!("broadcast", listeners = snapshot.len()).entered());

        let mut report = BroadcastReport::default();
        for (position, entry) in snapshot.iter().enumerate() {
            if dispatch.passes_over(entry) {
                report.skipped += 1;
                continue;
            }
            let outcome = if self.config.catch_panics {
                let call = AssertUnwindSafe(|| f(&*entry.listener, &entry.callback));
                match panic::catch_unwind(call) {
                    Ok(result) => result.map_err(|e| FaultCause::Failed(e.to_string())),
                    Err(payload) => Err(FaultCause::from_panic(payload.as_ref())),
                }
            } else {
                f(&*entry.listener, &entry.callback).map_err(|e| FaultCause::Failed(e.to_string()))
            };
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(cause) => {
                    warn!(listener = %entry.id, position, %cause, "listener fault during broadcast");
                    report.faults.push(ListenerFault {
                        listener: entry.id,
                        position,
                        cause,
                    });
                }
            }
        }
        report
    }
}

impl<L: ?Sized, C: Clone + Default> ListenerRegistry<L, C> {
    /// Register a listener with default interest and payload.
    pub fn add(&self, listener: &Arc<L>, membership: Membership) -> ListenerId {
        self.add_with(
            listener,
            AddOptions::default().with_membership(membership),
            C::default(),
        )
    }

    /// Hand a listener to the registry, which becomes its owner.
    pub fn add_owned(&self, listener: Arc<L>) -> ListenerId {
        self.add(&listener, Membership::Strong)
    }
}

/// Split off every entry matching `pred`, preserving the order of the rest.
fn extract_where<T>(items: &mut Vec<T>, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
    let mut extracted = Vec::new();
    let mut kept = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if pred(&item) {
            extracted.push(item);
        } else {
            kept.push(item);
        }
    }
    *items = kept;
    extracted
}
