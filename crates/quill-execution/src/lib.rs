//! Runtime pieces for Quill: the per-subject event loop and logging setup.

pub mod driver;
pub mod logging;
pub mod tracing_layer;

pub use driver::StreamDriver;
pub use logging::init_logging;
pub use tracing_layer::{STREAM_TARGET, StreamTraceEvent, StreamTraceLayer};
