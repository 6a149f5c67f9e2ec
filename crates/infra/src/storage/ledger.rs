//! File-backed submission ledger
//!
//! Plain UTF-8 text: a bundle id line followed by its request id line,
//! repeated. An empty request id line records a failed submission.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notaryflow_core::SubmissionLedger;
use notaryflow_domain::{validate_bundle_id, NotaryError, Result, SubmissionRecord};
use tokio::io::AsyncWriteExt;

use crate::errors::InfraError;

/// Ledger stored at a single file path.
#[derive(Debug, Clone)]
pub struct FileSubmissionLedger {
    path: PathBuf,
}

impl FileSubmissionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }
        Ok(())
    }
}

fn validate(record: &SubmissionRecord) -> Result<()> {
    validate_bundle_id(&record.bundle_id)?;
    if record.request_id.contains(['\n', '\r']) {
        return Err(NotaryError::InvalidInput(format!(
            "request id {:?} contains a line break and cannot be stored in the ledger",
            record.request_id
        )));
    }
    Ok(())
}

fn encode(record: &SubmissionRecord) -> String {
    format!("{}\n{}\n", record.bundle_id, record.request_id)
}

/// Parse ledger text into records.
///
/// # Errors
/// - `NotaryError::LedgerCorrupted` if the line count is odd
/// - `NotaryError::InvalidInput` if a bundle id line could not name a ticket
///   file inside the output directory
pub fn decode(contents: &str, path: &Path) -> Result<Vec<SubmissionRecord>> {
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() % 2 != 0 {
        return Err(NotaryError::LedgerCorrupted { path: path.to_path_buf(), line_count: lines.len() });
    }

    lines
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| {
            validate_bundle_id(pair[0]).map_err(|e| {
                NotaryError::InvalidInput(format!("{} line {}: {e}", path.display(), index * 2 + 1))
            })?;
            Ok(SubmissionRecord::new(pair[0], pair[1]))
        })
        .collect()
}

#[async_trait]
impl SubmissionLedger for FileSubmissionLedger {
    async fn append(&self, record: &SubmissionRecord) -> Result<()> {
        validate(record)?;
        self.ensure_parent().await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(InfraError::from)?;
        file.write_all(encode(record).as_bytes()).await.map_err(InfraError::from)?;
        file.flush().await.map_err(InfraError::from)?;

        tracing::debug!(
            path = %self.path.display(),
            bundle_id = %record.bundle_id,
            request_id = %record.request_id,
            "Ledger record appended"
        );
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<SubmissionRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NotaryError::NotFound(format!("submission ledger {}", self.path.display()))
            } else {
                InfraError::from(e).into()
            }
        })?;

        let records = decode(&contents, &self.path)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "Ledger loaded");
        Ok(records)
    }

    async fn persist_all(&self, records: &[SubmissionRecord]) -> Result<()> {
        for record in records {
            validate(record)?;
        }
        self.ensure_parent().await?;

        let contents: String = records.iter().map(encode).collect();
        tokio::fs::write(&self.path, contents).await.map_err(InfraError::from)?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "Ledger rewritten");
        Ok(())
    }
}
