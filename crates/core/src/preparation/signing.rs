//! Code signature check and signing through `codesign`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notaryflow_domain::constants::CODE_NOT_SIGNED_TEXT;
use notaryflow_domain::{Config, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::notarization::ports::ExternalToolRunner;

/// Result of `codesign -dvv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    Signed,
    Unsigned,
    /// `codesign` failed without reporting the binary as unsigned (missing
    /// file, unreadable bundle, ...).
    Unreadable,
}

/// What happened when an artifact was run through the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SigningOutcome {
    AlreadySigned,
    Signed,
    /// Unsigned, but no certificate is configured.
    Skipped,
    /// `codesign` could not inspect the artifact; left untouched.
    Unverified,
    /// Signing ran and exited unsuccessfully.
    Failed { exit_code: Option<i32> },
}

/// Thin wrapper around the `codesign` executable.
#[derive(Clone)]
pub struct CodeSigner {
    runner: Arc<dyn ExternalToolRunner>,
    codesign: String,
    certificate_id: Option<String>,
    entitlements: Option<PathBuf>,
}

impl CodeSigner {
    pub fn new(
        runner: Arc<dyn ExternalToolRunner>,
        codesign: impl Into<String>,
        certificate_id: Option<String>,
        entitlements: Option<PathBuf>,
    ) -> Self {
        Self { runner, codesign: codesign.into(), certificate_id, entitlements }
    }

    pub fn from_config(runner: Arc<dyn ExternalToolRunner>, config: &Config) -> Self {
        Self::new(
            runner,
            config.tools.codesign.clone(),
            config.signing.certificate_id.clone().filter(|id| !id.trim().is_empty()),
            config.signing.entitlements.clone(),
        )
    }

    /// Inspect the signature of `path`.
    ///
    /// # Errors
    /// Returns `NotaryError::ToolInvocation` if `codesign` could not be run.
    pub async fn check(&self, path: &Path) -> Result<SignatureState> {
        let args = vec!["-dvv".to_string(), path.display().to_string()];
        let output = self.runner.run(&self.codesign, &args, None).await?;

        let state = if output.combined().contains(CODE_NOT_SIGNED_TEXT) {
            SignatureState::Unsigned
        } else if output.success() {
            SignatureState::Signed
        } else {
            warn!(
                path = %path.display(),
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "codesign could not inspect artifact"
            );
            SignatureState::Unreadable
        };

        Ok(state)
    }

    /// Arguments used to sign `path` with `certificate_id`.
    pub fn sign_arguments(&self, certificate_id: &str, path: &Path) -> Vec<String> {
        let mut args: Vec<String> =
            ["--deep", "--force", "--options", "runtime"].iter().map(ToString::to_string).collect();
        if let Some(entitlements) = &self.entitlements {
            args.push("--entitlements".to_string());
            args.push(entitlements.display().to_string());
        }
        args.extend(
            ["--strict", "--timestamp", "--verbose", "--sign", certificate_id]
                .iter()
                .map(ToString::to_string),
        );
        args.push(path.display().to_string());
        args
    }

    /// Sign `path` if `codesign` reports it as unsigned.
    ///
    /// # Errors
    /// Returns `NotaryError::ToolInvocation` if `codesign` could not be run.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ensure_signed(&self, path: &Path) -> Result<SigningOutcome> {
        match self.check(path).await? {
            SignatureState::Signed => {
                info!("Artifact already signed");
                return Ok(SigningOutcome::AlreadySigned);
            }
            SignatureState::Unreadable => return Ok(SigningOutcome::Unverified),
            SignatureState::Unsigned => {}
        }

        let Some(certificate_id) = self.certificate_id.as_deref() else {
            warn!("Artifact is unsigned and no signing certificate is configured");
            return Ok(SigningOutcome::Skipped);
        };

        let args = self.sign_arguments(certificate_id, path);
        let output = self.runner.run(&self.codesign, &args, None).await?;

        if output.success() {
            info!("Artifact signed");
            Ok(SigningOutcome::Signed)
        } else {
            warn!(exit_code = ?output.exit_code, stderr = %output.stderr.trim(), "Signing failed");
            Ok(SigningOutcome::Failed { exit_code: output.exit_code })
        }
    }
}
