#![forbid(unsafe_code)]

//! Broadcast outcomes and listener faults.
//!
//! Registry bookkeeping never fails: removing an absent listener is a no-op
//! and re-registering an identity replaces the previous entry. The only
//! failures are faults raised by listeners themselves. They are contained at
//! the call site, the broadcast continues, and every fault is returned in the
//! [`BroadcastReport`].

use std::any::Any;
use std::fmt;

use crate::identity::ListenerId;

/// What went wrong inside a single listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCause {
    /// The callback panicked. Carries the panic payload when it was a string.
    Panicked(String),
    /// The callback returned an error. Carries its rendered message.
    Failed(String),
}

impl FaultCause {
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// A fault raised by one listener during a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFault {
    /// The entry whose callback faulted.
    pub listener: ListenerId,
    /// Zero-based position of the entry in the broadcast snapshot.
    pub position: usize,
    pub cause: FaultCause,
}

impl fmt::Display for ListenerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {} {}", self.listener, self.position, self.cause)
    }
}

impl std::error::Error for ListenerFault {}

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Callbacks that ran to completion without a fault.
    pub delivered: usize,
    /// Live entries passed over because they were excluded or not interested.
    pub skipped: usize,
    /// Faults raised by callbacks, in delivery order.
    pub faults: Vec<ListenerFault>,
}

impl BroadcastReport {
    /// Whether every invoked callback completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Number of callbacks invoked, faulted or not.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.delivered + self.faults.len()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: BroadcastReport) {
        self.delivered += other.delivered;
        self.skipped += other.skipped;
        self.faults.extend(other.faults);
    }

    /// Convert into a `Result`, yielding the delivered count when clean.
    pub fn into_result(self) -> Result<usize, BroadcastError> {
        if self.faults.is_empty() {
            Ok(self.delivered)
        } else {
            Err(BroadcastError {
                delivered: self.delivered,
                faults: self.faults,
            })
        }
    }
}

/// A broadcast that completed with at least one listener fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastError {
    pub delivered: usize,
    pub faults: Vec<ListenerFault>,
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listener fault(s) during broadcast ({} delivered)",
            self.faults.len(),
            self.delivered
        )?;
        if let Some(first) = self.faults.first() {
            write!(f, "; first: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.faults
            .first()
            .map(|fault| fault as &(dyn std::error::Error + 'static))
    }
}
