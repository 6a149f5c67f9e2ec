//! Attaching notarization tickets with `stapler`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notaryflow_domain::constants::STAPLEABLE_EXTENSIONS;
use notaryflow_domain::{Artifact, BatchReport, Config};
use serde::Serialize;
use tracing::{info, warn};

use crate::notarization::ports::ExternalToolRunner;

/// Outcome of stapling one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StapleResult {
    pub path: PathBuf,
    pub stapled: bool,
    pub validated: bool,
}

/// Whether the notary ticket can be stapled onto `path`.
pub fn is_stapleable(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| STAPLEABLE_EXTENSIONS.contains(&ext.as_str()))
}

/// Runs `stapler staple` and `stapler validate`.
///
/// Exit codes are logged and reported, never turned into errors.
#[derive(Clone)]
pub struct Stapler {
    runner: Arc<dyn ExternalToolRunner>,
    stapler: String,
}

impl Stapler {
    pub fn new(runner: Arc<dyn ExternalToolRunner>, stapler: impl Into<String>) -> Self {
        Self { runner, stapler: stapler.into() }
    }

    pub fn from_config(runner: Arc<dyn ExternalToolRunner>, config: &Config) -> Self {
        Self::new(runner, config.tools.stapler.clone())
    }

    pub async fn staple(&self, path: &Path) -> StapleResult {
        let stapled = self.step("staple", path).await;
        let validated = self.step("validate", path).await;

        info!(path = %path.display(), stapled, validated, "Stapling finished");
        StapleResult { path: path.to_path_buf(), stapled, validated }
    }

    /// Staple every artifact that notarized successfully in `report`.
    ///
    /// Artifacts are stapled at their original paths (the app bundle, not
    /// the uploaded archive).
    pub async fn staple_notarized(
        &self,
        artifacts: &[Artifact],
        report: &BatchReport,
    ) -> Vec<StapleResult> {
        let notarized: HashSet<&str> =
            report.notarized.iter().map(|record| record.bundle_id.as_str()).collect();

        let mut results = Vec::new();
        for artifact in artifacts {
            if !notarized.contains(artifact.bundle_id.as_str()) {
                continue;
            }
            if !is_stapleable(&artifact.path) {
                info!(path = %artifact.path.display(), "Artifact type cannot be stapled");
                continue;
            }
            results.push(self.staple(&artifact.path).await);
        }

        results
    }

    async fn step(&self, action: &str, path: &Path) -> bool {
        let args = vec![action.to_string(), path.display().to_string()];
        match self.runner.run(&self.stapler, &args, None).await {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!(
                    path = %path.display(),
                    action,
                    exit_code = ?output.exit_code,
                    output = %output.combined().trim(),
                    "stapler exited unsuccessfully"
                );
                false
            }
            Err(err) => {
                warn!(path = %path.display(), action, error = %err, "stapler could not be run");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stapleable_extensions() {
        assert!(is_stapleable(Path::new("/out/Tableau-Desktop.dmg")));
        assert!(is_stapleable(Path::new("/out/Installer.PKG")));
        assert!(is_stapleable(Path::new("/out/Tool.app")));
        assert!(!is_stapleable(Path::new("/out/Tool.zip")));
        assert!(!is_stapleable(Path::new("/out/tool")));
    }
}
