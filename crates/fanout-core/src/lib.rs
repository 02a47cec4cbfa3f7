#![forbid(unsafe_code)]

//! Core: ownership-aware listener registries and ordered broadcast.
//!
//! # Role in fanout
//! `fanout-core` owns the one primitive every notification pattern in the
//! workspace is built from: [`ListenerRegistry`], an ordered collection of
//! capability-typed listeners held either strongly or weakly.
//!
//! # Primary responsibilities
//! - **ListenerRegistry**: identity-keyed registration, lazy reaping of dead
//!   weak entries, snapshot broadcast with per-listener fault isolation.
//! - **Observable**: a watched value firing `Old`/`New` notifications on
//!   every write, with optional `Initial` replay.
//! - **MulticastDelegate / Mediator**: thin specializations for delegate
//!   fan-out and colleague messaging with sender exclusion.
//! - **FlyweightCache**: explicit shared-instance cache.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fanout_core::{ListenerRegistry, Membership};
//!
//! trait Log: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct Stdout;
//! impl Log for Stdout {
//!     fn log(&self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! let registry: ListenerRegistry<dyn Log> = ListenerRegistry::new();
//! let sink: Arc<dyn Log> = Arc::new(Stdout);
//! registry.add(&sink, Membership::Weak);
//!
//! let report = registry.notify_all(|l| l.log("hello"));
//! assert_eq!(report.delivered, 1);
//!
//! drop(sink);
//! assert!(registry.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod flyweight;
pub mod identity;
pub mod mediator;
pub mod multicast;
pub mod observable;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{BroadcastError, BroadcastReport, FaultCause, ListenerFault};
pub use flyweight::FlyweightCache;
pub use identity::{ChangeKind, Interest, ListenerId, ListenerKey, Membership};
pub use mediator::Mediator;
pub use multicast::MulticastDelegate;
pub use observable::{ObserveOptions, Observable, ObserverRegistration, Subscription};
pub use registry::{AddOptions, Dispatch, ListenerRegistry, LiveEntry};
