//! Binary list input file: one artifact path per line

use std::path::Path;

use notaryflow_core::artifacts_from_lines;
use notaryflow_domain::{Artifact, NotaryError, Result};

use crate::errors::InfraError;

/// Read the artifacts named in `path`.
///
/// Blank lines are skipped and surrounding whitespace is trimmed.
///
/// # Errors
/// Returns `NotaryError::NotFound` if the file does not exist, and the
/// validation errors of [`artifacts_from_lines`] (including duplicate bundle
/// ids) otherwise.
pub async fn read_binary_list(path: &Path) -> Result<Vec<Artifact>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NotaryError::NotFound(format!("binary list {}", path.display()))
        } else {
            InfraError::from(e).into()
        }
    })?;

    let artifacts = artifacts_from_lines(contents.lines())?;
    tracing::info!(path = %path.display(), artifacts = artifacts.len(), "Binary list loaded");
    Ok(artifacts)
}
