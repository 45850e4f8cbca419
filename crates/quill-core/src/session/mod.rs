//! Session domain module.
//!
//! This module contains the types describing one generation session and the
//! messages exchanged with the producer.
//!
//! # Module Structure
//!
//! - `model`: Session identity and lifecycle (`Session`, `CorrelationId`, `SessionStatus`)
//! - `event`: Wire types (`GenerationRequest`, `StreamEvent`, `StreamEventKind`)
//! - `outcome`: Terminal results (`StreamOutcome`, `FailureReason`)
//!
//! # Usage
//!
//! ```ignore
//! use quill_core::session::{CorrelationId, Session, SubjectId};
//! use quill_core::session::{StreamEvent, StreamEventKind, StreamOutcome};
//! ```

mod event;
mod model;
mod outcome;

// Re-export public API
pub use event::{GenerationRequest, StreamEvent, StreamEventKind};
pub use model::{CorrelationId, Session, SessionStatus, SubjectId};
pub use outcome::{FailureReason, StreamOutcome};
