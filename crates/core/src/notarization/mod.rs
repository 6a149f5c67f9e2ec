//! Notarization submission and status polling
//!
//! This module provides the ports, the tool output parser, the submission
//! client, the polling engine and the batch service tying them together.

pub mod client;
pub mod engine;
pub mod parser;
pub mod ports;
pub mod service;

pub use client::{redact_arguments, NotarizationClient};
pub use engine::{PollingEngine, PollingError};
pub use parser::{parse_request_id, parse_status};
pub use ports::{ExternalToolRunner, LogFetcher, StatusQuery, SubmissionLedger, TicketStore};
pub use service::{artifacts_from_lines, NotarizationService};
