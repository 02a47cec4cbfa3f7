#![forbid(unsafe_code)]

//! Three musketeers talking through a mediator that owns them.

use std::sync::{Arc, Weak};

use fanout_core::{Mediator, Membership};

use super::Transcript;

pub trait Colleague: Send + Sync {
    fn name(&self) -> &str;
    fn receive(&self, from: Option<&dyn Colleague>, message: &str);
}

/// Routes messages between colleagues and owns them.
#[derive(Default)]
pub struct MusketeerMediator {
    colleagues: Mediator<dyn Colleague>,
}

impl MusketeerMediator {
    pub fn send_message(&self, message: &str, by: &(dyn Colleague + 'static)) {
        self.colleagues
            .invoke_colleagues_except(by, |c| c.receive(Some(by), message));
    }

    pub fn announce(&self, message: &str) {
        self.colleagues.invoke_colleagues(|c| c.receive(None, message));
    }
}

pub struct Musketeer {
    name: String,
    mediator: Weak<MusketeerMediator>,
    transcript: Arc<Transcript>,
}

impl Musketeer {
    /// Create a musketeer and hand ownership of it to `mediator`.
    pub fn join(
        mediator: &Arc<MusketeerMediator>,
        name: &str,
        transcript: &Arc<Transcript>,
    ) -> Weak<Self> {
        let musketeer = Arc::new(Self {
            name: name.to_string(),
            mediator: Arc::downgrade(mediator),
            transcript: Arc::clone(transcript),
        });
        let colleague: Arc<dyn Colleague> = musketeer.clone();
        mediator
            .colleagues
            .add_colleague(&colleague, Membership::Strong);
        Arc::downgrade(&musketeer)
    }

    pub fn send_message(&self, message: &str) {
        self.transcript
            .line(format!("{} sent: {message}", self.name));
        if let Some(mediator) = self.mediator.upgrade() {
            mediator.send_message(message, self);
        }
    }
}

impl Colleague for Musketeer {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, _from: Option<&dyn Colleague>, message: &str) {
        self.transcript
            .line(format!("{} received {message}", self.name));
    }
}

fn speak(musketeer: &Weak<Musketeer>, message: &str) {
    if let Some(musketeer) = musketeer.upgrade() {
        musketeer.send_message(message);
    }
}

#[must_use]
pub fn run() -> Vec<String> {
    let transcript = Arc::new(Transcript::default());
    let mediator = Arc::new(MusketeerMediator::default());
    let athos = Musketeer::join(&mediator, "Athos", &transcript);
    let porthos = Musketeer::join(&mediator, "Porthos", &transcript);
    let aramis = Musketeer::join(&mediator, "Aramis", &transcript);

    speak(&athos, "One for all...!");
    speak(&porthos, "and all for one...!");
    speak(&aramis, "Unus pro omnibus, omnes pro uno");
    mediator.announce("Charge!");

    drop(mediator);
    transcript.line(format!(
        "musketeers alive after the mediator is gone: {}",
        [&athos, &porthos, &aramis]
            .iter()
            .filter(|m| m.upgrade().is_some())
            .count()
    ));
    transcript.lines()
}
