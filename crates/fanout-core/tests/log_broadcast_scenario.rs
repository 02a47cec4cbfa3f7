//! End-to-end broadcast over a `Log(message)` capability with mixed
//! membership, a released weak listener, and a faulting listener.

use std::sync::Arc;

use fanout_core::{FaultCause, ListenerRegistry, Membership};
use parking_lot::Mutex;

trait Log: Send + Sync {
    fn log(&self, message: &str);
}

#[derive(Default)]
struct Capture {
    lines: Mutex<Vec<String>>,
}

impl Log for Capture {
    fn log(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

struct Exploding;

impl Log for Exploding {
    fn log(&self, message: &str) {
        panic!("cannot log {message}");
    }
}

#[test]
fn released_weak_listener_misses_broadcast() {
    let registry: ListenerRegistry<dyn Log> = ListenerRegistry::new();
    let l1 = Arc::new(Capture::default());
    let l2 = Arc::new(Capture::default());
    let l3 = Arc::new(Capture::default());
    let l2_weak = Arc::downgrade(&l2);

    for (listener, membership) in [
        (&l1, Membership::Strong),
        (&l2, Membership::Weak),
        (&l3, Membership::Strong),
    ] {
        let as_log: Arc<dyn Log> = listener.clone();
        registry.add(&as_log, membership);
    }
    assert_eq!(registry.live_listeners().len(), 3);

    drop(l2);
    assert!(l2_weak.upgrade().is_none());

    let report = registry.notify_all(|l| l.log("x"));
    assert_eq!(report.delivered, 2);
    assert!(report.is_clean());
    assert_eq!(*l1.lines.lock(), vec!["x"]);
    assert_eq!(*l3.lines.lock(), vec!["x"]);
    assert_eq!(registry.live_listeners().len(), 2);
}

#[test]
fn faulting_listener_is_reported_and_isolated() {
    let registry: ListenerRegistry<dyn Log> = ListenerRegistry::new();
    let before = Arc::new(Capture::default());
    let after = Arc::new(Capture::default());

    let before_log: Arc<dyn Log> = before.clone();
    let exploding: Arc<dyn Log> = Arc::new(Exploding);
    let after_log: Arc<dyn Log> = after.clone();
    registry.add(&before_log, Membership::Strong);
    let bad = registry.add(&exploding, Membership::Strong);
    registry.add(&after_log, Membership::Strong);

    let report = registry.notify_all(|l| l.log("x"));
    assert_eq!(report.delivered, 2);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].listener, bad);
    assert_eq!(
        report.faults[0].cause,
        FaultCause::Panicked("cannot log x".to_string())
    );
    assert_eq!(*before.lines.lock(), vec!["x"]);
    assert_eq!(*after.lines.lock(), vec!["x"]);

    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("1 listener fault(s)"));
}

#[test]
fn registry_is_shareable_across_threads() {
    let registry: Arc<ListenerRegistry<dyn Log>> = Arc::new(ListenerRegistry::new());
    let sink = Arc::new(Capture::default());
    let as_log: Arc<dyn Log> = sink.clone();
    registry.add(&as_log, Membership::Weak);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.notify_all(|l| l.log(&format!("thread-{i}")));
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("broadcast thread panicked");
    }

    let mut lines = sink.lines.lock().clone();
    lines.sort();
    assert_eq!(lines, vec!["thread-0", "thread-1", "thread-2", "thread-3"]);
}
