//! Observability infrastructure: tracing subscriber setup

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingOptions};
