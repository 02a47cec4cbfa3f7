#![forbid(unsafe_code)]

//! Application lifecycle events fanned out to weakly held delegates.

use std::sync::Arc;

use fanout_core::MulticastDelegate;

use super::Transcript;

pub trait AppDelegate: Send + Sync {
    fn did_finish_launching(&self);
    fn will_terminate(&self);
}

struct Component {
    name: &'static str,
    transcript: Arc<Transcript>,
}

impl AppDelegate for Component {
    fn did_finish_launching(&self) {
        self.transcript
            .line(format!("{} saw the app finish launching", self.name));
    }

    fn will_terminate(&self) {
        self.transcript
            .line(format!("{} is saving state before exit", self.name));
    }
}

/// Delegate that cannot handle termination.
struct Flaky;

impl AppDelegate for Flaky {
    fn did_finish_launching(&self) {}

    fn will_terminate(&self) {
        panic!("flaky delegate lost its state");
    }
}

fn component(name: &'static str, transcript: &Arc<Transcript>) -> Arc<dyn AppDelegate> {
    Arc::new(Component {
        name,
        transcript: Arc::clone(transcript),
    })
}

#[must_use]
pub fn run() -> Vec<String> {
    let transcript = Arc::new(Transcript::default());
    let analytics = component("analytics", &transcript);
    let cache = component("cache", &transcript);
    let session = component("session", &transcript);
    let flaky: Arc<dyn AppDelegate> = Arc::new(Flaky);

    let app: MulticastDelegate<dyn AppDelegate> =
        MulticastDelegate::from_delegates(&[Arc::clone(&analytics), Arc::clone(&cache)]);
    app.add_delegate(&session);
    app.add_delegate(&flaky);

    app.invoke_delegates(|d| d.did_finish_launching());

    drop(cache);
    app.remove_delegate(&*session);
    transcript.line(format!("{} delegates remain", app.len()));

    let report = app.invoke_delegates(|d| d.will_terminate());
    for fault in &report.faults {
        transcript.line(format!("fault: {}", fault.cause));
    }
    transcript.line(format!(
        "shutdown reached {} of {} delegates",
        report.delivered,
        report.invoked()
    ));
    transcript.lines()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_then_shutdown_with_fault() {
        assert_eq!(
            run(),
            vec![
                "analytics saw the app finish launching",
                "cache saw the app finish launching",
                "session saw the app finish launching",
                "2 delegates remain",
                "analytics is saving state before exit",
                "fault: panicked: flaky delegate lost its state",
                "shutdown reached 1 of 2 delegates",
            ]
        );
    }
}
