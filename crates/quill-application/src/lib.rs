//! Application layer for Quill.
//!
//! Coordinates the domain pieces from `quill-core` into the streaming
//! protocol: the document mutator that performs atomic writes, and the stream
//! controller that routes producer events to the ledger, the position
//! resolver and the mutator.

pub mod mutator;
pub mod stream;

pub use mutator::{DocumentMutator, SharedDocument};
pub use stream::{
    ControllerCache, EventDisposition, IgnoreReason, OutcomeCallback, StreamController,
};
