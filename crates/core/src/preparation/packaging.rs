//! Zipping `.app` bundles for upload

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notaryflow_domain::{Artifact, Config, NotaryError, Result};
use tracing::{debug, info};

use crate::notarization::ports::ExternalToolRunner;

/// Packs `.app` bundles into `<staging_dir>/<bundleId>.zip` with `ditto`.
///
/// The notary service only accepts archives, disk images and installers;
/// everything that is not an app bundle passes through unchanged.
#[derive(Clone)]
pub struct BundlePackager {
    runner: Arc<dyn ExternalToolRunner>,
    ditto: String,
    staging_dir: PathBuf,
}

impl BundlePackager {
    pub fn new(
        runner: Arc<dyn ExternalToolRunner>,
        ditto: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { runner, ditto: ditto.into(), staging_dir: staging_dir.into() }
    }

    pub fn from_config(runner: Arc<dyn ExternalToolRunner>, config: &Config) -> Self {
        Self::new(runner, config.tools.ditto.clone(), config.paths.staging_dir.clone())
    }

    /// Where the archive for `artifact` is written.
    pub fn archive_path(&self, artifact: &Artifact) -> PathBuf {
        self.staging_dir.join(format!("{}.zip", artifact.bundle_id))
    }

    pub fn archive_arguments(&self, source: &Path, archive: &Path) -> Vec<String> {
        vec![
            "-c".to_string(),
            "-k".to_string(),
            "--keepParent".to_string(),
            source.display().to_string(),
            archive.display().to_string(),
        ]
    }

    /// Return the artifact to submit for `artifact`.
    ///
    /// # Errors
    /// Returns `NotaryError::ToolInvocation` if `ditto` cannot be run or
    /// exits unsuccessfully.
    pub async fn package(&self, artifact: &Artifact) -> Result<Artifact> {
        if !artifact.is_app_bundle() {
            debug!(bundle_id = %artifact.bundle_id, "Not an app bundle; submitting as is");
            return Ok(artifact.clone());
        }

        let archive = self.archive_path(artifact);
        let args = self.archive_arguments(&artifact.path, &archive);
        let output = self.runner.run(&self.ditto, &args, None).await?;

        if !output.success() {
            return Err(NotaryError::tool(
                self.ditto.clone(),
                format!(
                    "zipping {} exited with {:?}: {}",
                    artifact.path.display(),
                    output.exit_code,
                    output.stderr.trim()
                ),
            ));
        }

        info!(
            bundle_id = %artifact.bundle_id,
            archive = %archive.display(),
            "App bundle zipped"
        );
        Ok(artifact.relocated(archive))
    }
}
