#![forbid(unsafe_code)]

//! A user whose name is observed, first by a weakly held observer object and
//! then by a subscription guard.

use std::sync::Arc;

use fanout_core::{Interest, ObserveOptions, Observable};

use super::Transcript;

pub struct User {
    pub name: Observable<String>,
}

impl User {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Observable::new(name.to_string()),
        }
    }
}

/// Observer object with no state of its own; it exists to own a lifetime.
struct NameWatcher;

#[must_use]
pub fn run() -> Vec<String> {
    let transcript = Arc::new(Transcript::default());
    let user = User::new("Madeline");

    let watcher = Arc::new(NameWatcher);
    let sink = Arc::clone(&transcript);
    user.name.add_observer(
        &watcher,
        ObserveOptions::new(Interest::INITIAL | Interest::NEW),
        move |name: &String, _| sink.line(format!("User's name is {name}")),
    );

    user.name.set("Amelia".to_string());
    drop(watcher);
    user.name.set("Amelia is outta here!".to_string());

    let sink = Arc::clone(&transcript);
    let subscription = user
        .name
        .subscribe_with(Interest::OLD | Interest::NEW, move |name: &String, kind| {
            sink.line(format!("{kind}: {name}"));
        });
    user.name.set("Madeline again".to_string());
    drop(subscription);
    user.name.set("Nobody is listening".to_string());

    transcript.line(format!(
        "final name {:?} after {} writes",
        user.name.get(),
        user.name.version()
    ));
    transcript.lines()
}
