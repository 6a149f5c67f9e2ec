//! Domain types and models
//!
//! Submission and status data flowing between the notarization client, the
//! polling engine and the result writers.

pub mod artifact;
pub mod notarization;
pub mod report;

pub use artifact::{derive_bundle_id, ensure_unique_bundle_ids, validate_bundle_id, Artifact};
pub use notarization::{
    Classification, NotarizationStatus, StatusRecord, SubmissionRecord, TicketDocument,
    ToolOutput,
};
pub use report::BatchReport;
