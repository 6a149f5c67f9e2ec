//! Ticket documents written under the output directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notaryflow_core::TicketStore;
use notaryflow_domain::{validate_bundle_id, Result, TicketDocument};

use crate::errors::InfraError;

/// Writes `<output_dir>/<bundleId>.notarization.json`, replacing any
/// previous document for the same bundle.
#[derive(Debug, Clone)]
pub struct FileTicketWriter {
    output_dir: PathBuf,
}

impl FileTicketWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Ticket path inside the output directory.
    ///
    /// # Errors
    /// Returns `NotaryError::InvalidInput` if the bundle id would name a file
    /// outside `output_dir`.
    pub fn path_for(&self, ticket: &TicketDocument) -> Result<PathBuf> {
        validate_bundle_id(&ticket.bundle_id)?;
        Ok(self.output_dir.join(ticket.file_name()))
    }
}

#[async_trait]
impl TicketStore for FileTicketWriter {
    async fn write(&self, ticket: &TicketDocument) -> Result<()> {
        let path = self.path_for(ticket)?;
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(InfraError::from)?;

        tokio::fs::write(&path, ticket.content.as_bytes()).await.map_err(InfraError::from)?;

        tracing::info!(
            bundle_id = %ticket.bundle_id,
            path = %path.display(),
            bytes = ticket.content.len(),
            "Ticket written"
        );
        Ok(())
    }
}
