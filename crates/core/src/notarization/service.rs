//! Batch notarization service
//!
//! Ties submission, the ledger and the polling engine together:
//!
//! 1. Reject batches with colliding bundle ids
//! 2. Submit each artifact in turn, appending to the ledger as it goes
//! 3. Poll the recorded submissions until they are terminal
//!
//! Polling can also be resumed from a ledger written by an earlier run.

use std::collections::HashSet;
use std::sync::Arc;

use notaryflow_domain::{
    ensure_unique_bundle_ids, Artifact, BatchReport, Result, SubmissionRecord,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::client::NotarizationClient;
use super::engine::{PollingEngine, PollingError};
use super::ports::SubmissionLedger;

/// Build the artifact list for a batch from lines of paths.
///
/// Lines are trimmed, blank lines skipped and repeated paths dropped (first
/// occurrence wins).
///
/// # Errors
/// - `NotaryError::InvalidInput` if a path yields no bundle id
/// - `NotaryError::DuplicateBundleId` if two different paths derive the same
///   bundle id
pub fn artifacts_from_lines<I, S>(lines: I) -> Result<Vec<Artifact>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut artifacts = Vec::new();

    for line in lines {
        let path = line.as_ref().trim();
        if path.is_empty() || !seen.insert(path.to_string()) {
            continue;
        }
        artifacts.push(Artifact::from_path(path)?);
    }

    ensure_unique_bundle_ids(&artifacts)?;
    Ok(artifacts)
}

/// Submission and polling for a batch of artifacts.
pub struct NotarizationService {
    client: NotarizationClient,
    ledger: Arc<dyn SubmissionLedger>,
    engine: PollingEngine,
}

impl NotarizationService {
    pub fn new(
        client: NotarizationClient,
        ledger: Arc<dyn SubmissionLedger>,
        engine: PollingEngine,
    ) -> Self {
        Self { client, ledger, engine }
    }

    /// Submit every artifact and record the results in the ledger.
    ///
    /// The ledger is cleared first, then appended to after each submission so
    /// an interrupted batch can still be polled. Submissions that yield no
    /// request id (including tool failures) are recorded with an empty id.
    /// Cancellation stops before the next artifact; the records made so far
    /// are returned.
    ///
    /// # Errors
    /// - `NotaryError::DuplicateBundleId` before anything is submitted
    /// - ledger errors
    #[instrument(skip_all, fields(artifacts = artifacts.len()))]
    pub async fn submit_batch(
        &self,
        artifacts: &[Artifact],
        cancel: &CancellationToken,
    ) -> Result<Vec<SubmissionRecord>> {
        ensure_unique_bundle_ids(artifacts)?;
        self.ledger.persist_all(&[]).await?;

        let mut records = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            if cancel.is_cancelled() {
                warn!(
                    submitted = records.len(),
                    remaining = artifacts.len() - records.len(),
                    "Submission cancelled"
                );
                break;
            }

            let record = match self.client.submit(artifact).await {
                Ok(record) => record,
                Err(err) => {
                    error!(bundle_id = %artifact.bundle_id, error = %err, "Submission failed");
                    SubmissionRecord::new(artifact.bundle_id.clone(), String::new())
                }
            };

            self.ledger.append(&record).await?;
            records.push(record);
        }

        let submitted = records.iter().filter(|record| record.is_submitted()).count();
        info!(submitted, failed = records.len() - submitted, "Submission finished");
        Ok(records)
    }

    /// Poll `records` to terminal states.
    ///
    /// # Errors
    /// See [`PollingEngine::run`].
    pub async fn poll(
        &self,
        records: Vec<SubmissionRecord>,
        cancel: &CancellationToken,
    ) -> std::result::Result<BatchReport, PollingError> {
        self.engine.run(records, cancel).await
    }

    /// Poll the submissions recorded in the ledger without resubmitting.
    ///
    /// # Errors
    /// Ledger errors (missing or corrupted file) and see
    /// [`PollingEngine::run`].
    #[instrument(skip_all)]
    pub async fn resume(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<BatchReport, PollingError> {
        let records = self.ledger.load_all().await?;
        info!(records = records.len(), "Resuming from submission ledger");
        self.engine.run(records, cancel).await
    }

    /// Submit then poll a whole batch.
    ///
    /// # Errors
    /// See [`NotarizationService::submit_batch`] and [`PollingEngine::run`].
    pub async fn notarize(
        &self,
        artifacts: &[Artifact],
        cancel: &CancellationToken,
    ) -> std::result::Result<BatchReport, PollingError> {
        let records = self.submit_batch(artifacts, cancel).await?;
        self.engine.run(records, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use notaryflow_domain::NotaryError;

    use super::*;

    #[test]
    fn lines_are_trimmed_and_deduplicated() {
        let artifacts = artifacts_from_lines([
            "  /out/Tableau-Public.zip  ",
            "",
            "   ",
            "/out/Tableau-Reader.dmg",
            "/out/Tableau-Public.zip",
        ])
        .expect("artifacts");

        let ids: Vec<_> = artifacts.iter().map(|a| a.bundle_id.as_str()).collect();
        assert_eq!(ids, ["Tableau.Public", "Tableau.Reader"]);
    }

    #[test]
    fn colliding_paths_are_rejected() {
        let err = artifacts_from_lines(["/a/Tool-One.dmg", "/b/Tool_One.pkg"]).unwrap_err();
        assert!(matches!(err, NotaryError::DuplicateBundleId { .. }));
    }

    #[test]
    fn empty_input_yields_no_artifacts() {
        assert!(artifacts_from_lines(Vec::<String>::new()).expect("artifacts").is_empty());
    }
}
