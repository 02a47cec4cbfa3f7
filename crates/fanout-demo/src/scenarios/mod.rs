#![forbid(unsafe_code)]

//! Walkthroughs of each fanout primitive.
//!
//! Every scenario writes its narrative into a [`Transcript`] and returns the
//! collected lines, so callers decide whether to print or assert on them.

pub mod flyweight;
pub mod mediator;
pub mod multicast;
pub mod observer;

use parking_lot::Mutex;
use tracing::{debug, info_span};

use crate::cli::Scenario;

/// Append-only line buffer shared by scenario participants.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    pub fn line(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(%line, "transcript");
        self.lines.lock().push(line);
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

/// Run `scenario` (or every scenario, for [`Scenario::All`]).
#[must_use]
pub fn run(scenario: Scenario) -> Vec<String> {
    match scenario {
        Scenario::All => {
            let mut out = Vec::new();
            for (i, each) in Scenario::EACH.into_iter().enumerate() {
                if i > 0 {
                    out.push(String::new());
                }
                out.extend(run(each));
            }
            out
        }
        single => {
            let _span = info_span!("scenario", name = %single).entered();
            let mut out = vec![format!("-- {single} --")];
            out.extend(match single {
                Scenario::Observer => observer::run(),
                Scenario::Multicast => multicast::run(),
                Scenario::Mediator => mediator::run(),
                Scenario::Flyweight => flyweight::run(),
                Scenario::All => Vec::new(),
            });
            out
        }
    }
}
