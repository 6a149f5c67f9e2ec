//! Artifact preparation before submission
//!
//! Every artifact is checked with `codesign` and signed when needed, then app
//! bundles are zipped. Signing happens on the original path so the archive
//! contains the signed bundle.

pub mod packaging;
pub mod signing;

use notaryflow_domain::{Artifact, NotaryError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

pub use packaging::BundlePackager;
pub use signing::{CodeSigner, SignatureState, SigningOutcome};

/// Signing and packaging for a batch.
pub struct Preparation {
    signer: CodeSigner,
    packager: BundlePackager,
}

impl Preparation {
    pub fn new(signer: CodeSigner, packager: BundlePackager) -> Self {
        Self { signer, packager }
    }

    /// Sign then package each artifact, returning the artifacts to submit in
    /// the same order.
    ///
    /// Cancellation stops before the next artifact and returns
    /// `NotaryError::Cancelled`.
    ///
    /// # Errors
    /// Tool invocation failures and packaging failures abort the batch.
    #[instrument(skip_all, fields(artifacts = artifacts.len()))]
    pub async fn prepare(
        &self,
        artifacts: &[Artifact],
        cancel: &CancellationToken,
    ) -> Result<Vec<Artifact>> {
        let mut prepared = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            if cancel.is_cancelled() {
                return Err(NotaryError::Cancelled(format!(
                    "preparation stopped before {}",
                    artifact.path.display()
                )));
            }

            let outcome = self.signer.ensure_signed(&artifact.path).await?;
            if let SigningOutcome::Failed { exit_code } = outcome {
                warn!(
                    bundle_id = %artifact.bundle_id,
                    exit_code = ?exit_code,
                    "Continuing with an unsigned artifact; notarization will likely reject it"
                );
            }

            prepared.push(self.packager.package(artifact).await?);
        }

        Ok(prepared)
    }
}
