//! # notaryflow Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Configuration loading (files, environment overrides)
//! - Child process execution for the Apple command line tools
//! - HTTP log retrieval
//! - File-backed submission ledger, ticket writer and binary list reader
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `notaryflow-core`
//! - Depends on `notaryflow-domain` and `notaryflow-core`
//! - Contains all "impure" code (I/O, processes, network)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod process;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpLogFetcher};
pub use observability::{init_logging, LogFormat, LoggingOptions};
pub use process::TokioProcessRunner;
pub use storage::{read_binary_list, FileSubmissionLedger, FileTicketWriter};
