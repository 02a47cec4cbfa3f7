#![forbid(unsafe_code)]

//! Runnable walkthroughs for `fanout-core`.
//!
//! The binary parses [`cli::Opts`], installs a tracing subscriber through
//! [`logging::init_tracing`], and prints the lines returned by
//! [`scenarios::run`].

pub mod cli;
pub mod logging;
pub mod scenarios;
