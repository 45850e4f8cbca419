//! Domain layer for Quill.
//!
//! Holds the pieces of the streaming block-materialization protocol that do
//! not depend on a runtime: session and wire types, the correlation registry,
//! the block ledger, the position resolver, and the traits for the two
//! collaborators the protocol consumes (the document and the channel).

pub mod channel;
pub mod config;
pub mod correlation;
pub mod document;
pub mod error;
pub mod ledger;
pub mod position;
pub mod session;

// Re-export common error type
pub use error::{DocumentError, QuillError};
