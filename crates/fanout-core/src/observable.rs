#![forbid(unsafe_code)]

//! Watched value with before/after change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared storage
//! (`Arc<RwLock<..>>`) next to a [`ListenerRegistry`] of observers. Every
//! observer entry is anchored on an observer object (held weakly by default)
//! and carries its own callback and [`Interest`] set.
//!
//! Every write stores the new value first and only then notifies:
//!
//! ```text
//! set(B) while value == A
//! ┌────────────────────────────────────────────────┐
//! │ writer lock held throughout                    │
//! │ 1. value := B, version += 1   (value lock)     │
//! │ 2. OLD pass:  callback(&A, Old)  (value free)  │
//! │ 3. NEW pass:  callback(&B, New)  (value free)  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! A callback reading the observable during the `Old` pass sees `B`.
//!
//! Writes are serialized by a reentrant writer lock: a write on another
//! thread waits until the current write has finished both passes, so each
//! observer sees complete `Old`/`New` pairs in write order. A callback may
//! write the same observable from its own thread; the nested write runs its
//! passes inside the outer ones. Registration with `Initial` replay takes the
//! writer lock too, so the replayed value is never older than the first
//! write the observer is told about.
//!
//! # Failure Modes
//!
//! - **Re-entrant access from `update` or `with`**: the closures passed to
//!   [`Observable::update`] and [`Observable::with`] run under the value
//!   lock and must not write the same observable (`with` may still read
//!   it). Callbacks, which run without the value lock, may.
//! - **Cross-thread waits in callbacks**: a callback that blocks on another
//!   thread which is itself writing this observable deadlocks, because that
//!   writer queues behind the current write.
//! - **Observer leak**: strongly held observers live as long as the
//!   observable. Weak observers are reaped lazily on the next write.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{ReentrantMutex, RwLock};

use crate::config::RegistryConfig;
use crate::error::BroadcastReport;
use crate::identity::{ChangeKind, Interest, ListenerId, ListenerKey, Membership};
use crate::registry::{AddOptions, Dispatch, ListenerRegistry};

type Anchor = dyn Any + Send + Sync;
type ObserverFn<T> = Arc<dyn Fn(&T, ChangeKind) + Send + Sync>;

/// Registration options for value observers.
///
/// Unlike plain registries, observers default to weak membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub membership: Membership,
    pub interest: Interest,
    /// Overrides the observable's replace-on-add setting for this call.
    pub replace: Option<bool>,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            membership: Membership::Weak,
            interest: Interest::NEW,
            replace: None,
        }
    }
}

impl ObserveOptions {
    /// Weak observer interested in `interest`.
    #[must_use]
    pub fn new(interest: Interest) -> Self {
        Self {
            interest,
            ..Self::default()
        }
    }

    /// Hold the observer strongly.
    #[must_use]
    pub fn strong(mut self) -> Self {
        self.membership = Membership::Strong;
        self
    }

    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = Some(replace);
        self
    }
}

impl From<ObserveOptions> for AddOptions {
    fn from(options: ObserveOptions) -> Self {
        Self {
            membership: options.membership,
            interest: options.interest,
            replace: options.replace,
        }
    }
}

/// Result of registering an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverRegistration {
    pub id: ListenerId,
    /// Outcome of the `Initial` replay. Empty when `INITIAL` was not
    /// requested.
    pub initial: BroadcastReport,
}

struct ObservableInner<T> {
    /// Held across a write and both of its notification passes.
    writer: ReentrantMutex<()>,
    value: RwLock<T>,
    version: AtomicU64,
    observers: ListenerRegistry<Anchor, ObserverFn<T>>,
}

/// A shared, version-tracked value that notifies observers on every write.
///
/// Cloning an `Observable` creates a new handle to the **same** value and
/// observers.
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.read())
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .field("observer_count", &self.inner.observers.raw_len())
            .finish()
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_config(value, RegistryConfig::default())
    }

    /// Create a new observable whose observer registry uses `config`.
    #[must_use]
    pub fn with_config(value: T, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                writer: ReentrantMutex::new(()),
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                observers: ListenerRegistry::with_config(config),
            }),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// `f` runs under the value's read lock. It may read this observable but
    /// must not write it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Number of writes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the value, then notify `Old` observers with the previous
    /// value and `New` observers with the stored one.
    pub fn set(&self, value: T) -> BroadcastReport {
        let _writer = self.inner.writer.lock();
        let new = value.clone();
        let old = std::mem::replace(&mut *self.inner.value.write(), value);
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.emit(&old, &new)
    }

    /// Modify the value in place, then notify as [`set`](Self::set) does.
    ///
    /// `f` runs under the value's write lock and must not access this
    /// observable.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> BroadcastReport {
        let _writer = self.inner.writer.lock();
        let (old, new) = {
            let mut value = self.inner.value.write();
            let old = value.clone();
            f(&mut *value);
            (old, value.clone())
        };
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.emit(&old, &new)
    }

    /// Register `callback` on behalf of `observer`.
    ///
    /// The observer object only supplies identity and, for weak membership,
    /// lifetime: once it is dropped the callback stops firing. When
    /// `options.interest` contains [`Interest::INITIAL`] the callback runs
    /// once with the current value before this returns, and any fault it
    /// raises is in the returned [`ObserverRegistration::initial`].
    pub fn add_observer<O, F>(
        &self,
        observer: &Arc<O>,
        options: ObserveOptions,
        callback: F,
    ) -> ObserverRegistration
    where
        O: Any + Send + Sync,
        F: Fn(&T, ChangeKind) + Send + Sync + 'static,
    {
        let anchor: Arc<Anchor> = observer.clone();
        self.register(&anchor, options, Arc::new(callback))
    }

    /// Remove every callback registered for `observer`.
    pub fn remove_observer<O: ?Sized>(&self, observer: &O) -> bool {
        self.inner.observers.remove_every(ListenerKey::of(observer)) > 0
    }

    /// Remove the callback registered under `id`.
    pub fn remove_id(&self, id: ListenerId) -> bool {
        self.inner.observers.remove_id(id)
    }

    /// Live observer entries, after reaping.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Subscribe a standalone callback for `New` values.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes the
    /// callback (it will not fire again, though its entry lingers until the
    /// next write reaps it).
    pub fn subscribe(
        &self,
        callback: impl Fn(&T, ChangeKind) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_with(Interest::NEW, callback)
    }

    /// Subscribe a standalone callback for the given event kinds.
    pub fn subscribe_with(
        &self,
        interest: Interest,
        callback: impl Fn(&T, ChangeKind) + Send + Sync + 'static,
    ) -> Subscription {
        let guard: Arc<Anchor> = Arc::new(SubscriptionToken);
        let ObserverRegistration { id, initial } =
            self.register(&guard, ObserveOptions::new(interest), Arc::new(callback));
        Subscription {
            id,
            initial,
            _guard: guard,
        }
    }

    fn register(
        &self,
        anchor: &Arc<Anchor>,
        options: ObserveOptions,
        callback: ObserverFn<T>,
    ) -> ObserverRegistration {
        let _writer = self.inner.writer.lock();
        let id = self
            .inner
            .observers
            .add_with(anchor, options.into(), callback);
        let initial = if options.interest.contains(Interest::INITIAL) {
            let current = self.get();
            self.inner
                .observers
                .broadcast(Dispatch::only(id), |_, cb| {
                    cb(&current, ChangeKind::Initial);
                    Ok::<(), Infallible>(())
                })
        } else {
            BroadcastReport::default()
        };
        ObserverRegistration { id, initial }
    }

    fn emit(&self, old: &T, new: &T) -> BroadcastReport {
        let mut report = self.pass(old, ChangeKind::Old);
        report.merge(self.pass(new, ChangeKind::New));
        report
    }

    fn pass(&self, value: &T, kind: ChangeKind) -> BroadcastReport {
        self.inner
            .observers
            .broadcast(Dispatch::all().for_kind(kind), |_, cb| {
                cb(value, kind);
                Ok::<(), Infallible>(())
            })
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Set the value only if it differs from the current one.
    ///
    /// Returns `None` (no version bump, no notifications) when equal.
    pub fn set_if_changed(&self, value: T) -> Option<BroadcastReport> {
        let _writer = self.inner.writer.lock();
        let new = value.clone();
        let old = {
            let mut current = self.inner.value.write();
            if *current == value {
                return None;
            }
            std::mem::replace(&mut *current, value)
        };
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        Some(self.emit(&old, &new))
    }
}

struct SubscriptionToken;

/// RAII guard for a standalone subscriber callback.
///
/// The observable holds the guard's token weakly; dropping the guard makes
/// the entry dead and it is reaped on the next traversal.
pub struct Subscription {
    id: ListenerId,
    initial: BroadcastReport,
    _guard: Arc<Anchor>,
}

impl Subscription {
    /// Registration id of this subscription.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Outcome of the `Initial` replay, if one was requested.
    #[must_use]
    pub fn initial_report(&self) -> &BroadcastReport {
        &self.initial
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
