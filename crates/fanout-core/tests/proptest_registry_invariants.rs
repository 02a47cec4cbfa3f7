//! Property-based invariant tests for the listener registry and observable.
//!
//! A simple model (an ordered list of `(identity, weak)` pairs) is driven in
//! lockstep with a real registry by arbitrary add/remove/drop sequences:
//!
//! **ListenerRegistry:**
//! 1. Live listeners come back in registration order.
//! 2. Dropping the last owner of a weak listener removes it on next read.
//! 3. With replace-on-add, an identity is present at most once, at the
//!    position of its latest registration.
//! 4. Excluding broadcast reaches every live listener except the sender.
//! 5. Broadcast delivers exactly once per live entry.
//!
//! **Observable:**
//! 6. Each write produces exactly one `Old` then one `New` notification,
//!    carrying the previous and the written value.
//! 7. Version equals the number of writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fanout_core::{ChangeKind, Interest, ListenerRegistry, Membership, Observable};
use parking_lot::Mutex;
use proptest::prelude::*;

trait Probe: Send + Sync {
    fn ident(&self) -> u64;
}

struct Ident(u64);

impl Probe for Ident {
    fn ident(&self) -> u64 {
        self.0
    }
}

const SLOTS: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Add { slot: usize, weak: bool },
    Remove { slot: usize },
    Release { slot: usize },
}

// ── Strategies ────────────────────────────────────────────────────────────

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..SLOTS, any::<bool>()).prop_map(|(slot, weak)| Op::Add { slot, weak }),
        1 => (0..SLOTS).prop_map(|slot| Op::Remove { slot }),
        1 => (0..SLOTS).prop_map(|slot| Op::Release { slot }),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op_strategy(), 1..=max_len)
}

// ── Harness ───────────────────────────────────────────────────────────────

struct Harness {
    registry: ListenerRegistry<dyn Probe>,
    slots: Vec<Option<Arc<dyn Probe>>>,
    /// Expected live entries, in order: (identity, weak).
    model: Vec<(u64, bool)>,
    next_ident: AtomicU64,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: ListenerRegistry::new(),
            slots: vec![None; SLOTS],
            model: Vec::new(),
            next_ident: AtomicU64::new(1),
        }
    }

    fn listener(&mut self, slot: usize) -> Arc<dyn Probe> {
        if self.slots[slot].is_none() {
            let ident = self.next_ident.fetch_add(1, Ordering::Relaxed);
            self.slots[slot] = Some(Arc::new(Ident(ident)));
        }
        self.slots[slot].clone().expect("slot just filled")
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Add { slot, weak } => {
                let listener = self.listener(slot);
                let membership = if weak {
                    Membership::Weak
                } else {
                    Membership::Strong
                };
                self.registry.add(&listener, membership);
                let ident = listener.ident();
                self.model.retain(|(i, _)| *i != ident);
                self.model.push((ident, weak));
            }
            Op::Remove { slot } => {
                if let Some(listener) = self.slots[slot].clone() {
                    let expected = self.model.iter().any(|(i, _)| *i == listener.ident());
                    assert_eq!(self.registry.remove(&*listener), expected);
                    if let Some(pos) = self.model.iter().position(|(i, _)| *i == listener.ident()) {
                        self.model.remove(pos);
                    }
                }
            }
            Op::Release { slot } => {
                if let Some(listener) = self.slots[slot].take() {
                    let ident = listener.ident();
                    drop(listener);
                    self.model.retain(|(i, weak)| !(*i == ident && *weak));
                }
            }
        }
    }

    fn live_idents(&self) -> Vec<u64> {
        self.registry
            .live_listeners()
            .iter()
            .map(|l| l.ident())
            .collect()
    }

    fn model_idents(&self) -> Vec<u64> {
        self.model.iter().map(|(i, _)| *i).collect()
    }
}

// ── Registry properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn live_listeners_match_model(ops in ops_strategy(60)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
            prop_assert_eq!(harness.live_idents(), harness.model_idents());
        }
    }

    #[test]
    fn identities_are_unique_with_replace_on_add(ops in ops_strategy(60)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
        }
        let mut idents = harness.live_idents();
        let total = idents.len();
        idents.sort_unstable();
        idents.dedup();
        prop_assert_eq!(idents.len(), total);
        prop_assert_eq!(harness.registry.len(), total);
    }

    #[test]
    fn broadcast_delivers_once_per_live_entry(ops in ops_strategy(40)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
        }
        let mut seen = Vec::new();
        let report = harness.registry.notify_all(|l| seen.push(l.ident()));
        prop_assert!(report.is_clean());
        prop_assert_eq!(report.delivered, seen.len());
        prop_assert_eq!(seen, harness.model_idents());
    }

    #[test]
    fn excluding_broadcast_skips_only_sender(ops in ops_strategy(40), pick in any::<prop::sample::Index>()) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
        }
        let live = harness.registry.live_listeners();
        prop_assume!(!live.is_empty());
        let sender = Arc::clone(pick.get(&live));

        let mut seen = Vec::new();
        let report = harness.registry.notify_excluding(&*sender, |l| seen.push(l.ident()));
        let expected: Vec<u64> = harness
            .model_idents()
            .into_iter()
            .filter(|i| *i != sender.ident())
            .collect();
        prop_assert_eq!(report.skipped, 1);
        prop_assert_eq!(seen, expected);
    }
}

// ── Observable properties ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn every_write_emits_old_then_new(initial in any::<i32>(), writes in proptest::collection::vec(any::<i32>(), 0..30)) {
        let obs = Observable::new(initial);
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let _sub = obs.subscribe_with(Interest::OLD | Interest::NEW, move |v: &i32, kind| {
            log_clone.lock().push((kind, *v));
        });

        let mut expected = Vec::new();
        let mut previous = initial;
        for &w in &writes {
            obs.set(w);
            expected.push((ChangeKind::Old, previous));
            expected.push((ChangeKind::New, w));
            previous = w;
        }

        prop_assert_eq!(&*log.lock(), &expected);
        prop_assert_eq!(obs.version(), writes.len() as u64);
        prop_assert_eq!(obs.get(), previous);
    }
}
