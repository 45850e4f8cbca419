//! Stream application services.
//!
//! - `controller`: per-subject session state machine (`StreamController`)
//! - `disposition`: what happened to an inbound event (`EventDisposition`)
//! - `cache`: one controller per subject (`ControllerCache`)

mod cache;
mod controller;
mod disposition;

pub use cache::{ControllerCache, SharedController};
pub use controller::{OutcomeCallback, StreamController};
pub use disposition::{EventDisposition, IgnoreReason};
