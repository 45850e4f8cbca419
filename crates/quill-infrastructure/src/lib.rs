//! Infrastructure adapters for Quill: the in-memory document, the loopback
//! generation channel, configuration loading and trace files.

pub mod config_service;
pub mod loopback_channel;
pub mod memory_document;
pub mod paths;
pub mod trace_file;

pub use crate::config_service::ConfigService;
pub use crate::loopback_channel::{LoopbackChannel, LoopbackProducer, loopback};
pub use crate::memory_document::{InMemoryDocument, NodeSnapshot};
pub use crate::paths::QuillPaths;
