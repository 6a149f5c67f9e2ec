//! Port interfaces for notarization

use std::path::Path;

use async_trait::async_trait;
use notaryflow_domain::{Result, StatusRecord, SubmissionRecord, TicketDocument, ToolOutput};

/// Trait for running external executables
///
/// Implementations capture both output streams in full. A non-zero exit code
/// is not an error; only failing to run the program (spawn failure, timeout)
/// is.
#[async_trait]
pub trait ExternalToolRunner: Send + Sync {
    /// Run `program` with `args`, optionally inside `working_dir`
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<ToolOutput>;
}

/// Trait for querying the notarization status of one submission
#[async_trait]
pub trait StatusQuery: Send + Sync {
    /// Query the current status of `request_id`, tagging the record with
    /// `bundle_id`
    async fn query(&self, bundle_id: &str, request_id: &str) -> Result<StatusRecord>;
}

/// Trait for retrieving developer logs / ticket payloads by URL
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch the body at `url` as text
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Trait for persisting ticket documents
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Create or overwrite the document for `ticket.bundle_id`
    async fn write(&self, ticket: &TicketDocument) -> Result<()>;
}

/// Trait for the durable bundle id → request id mapping
#[async_trait]
pub trait SubmissionLedger: Send + Sync {
    /// Append one record after the existing ones
    async fn append(&self, record: &SubmissionRecord) -> Result<()>;

    /// Load every record in insertion order
    async fn load_all(&self) -> Result<Vec<SubmissionRecord>>;

    /// Replace the ledger contents with `records`
    async fn persist_all(&self, records: &[SubmissionRecord]) -> Result<()>;
}
