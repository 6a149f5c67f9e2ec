//! Artifacts and bundle identifier derivation

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{BUNDLE_ID_MAX_SEGMENTS, BUNDLE_ID_SEPARATOR};
use crate::errors::{NotaryError, Result};

/// A binary, disk image, installer or bundle submitted for notarization.
///
/// The bundle identifier is the primary key for the artifact across
/// submission, the ledger, polling and ticket files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub bundle_id: String,
}

impl Artifact {
    /// Create an artifact whose bundle id is derived from the file name.
    ///
    /// # Errors
    /// Returns `NotaryError::InvalidInput` if the path has no usable file
    /// name.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                NotaryError::InvalidInput(format!("no file name in {}", path.display()))
            })?;

        Self::with_bundle_id(path, derive_bundle_id(&file_name))
    }

    /// Create an artifact with an explicit bundle id.
    ///
    /// # Errors
    /// Returns `NotaryError::InvalidInput` if the bundle id fails
    /// [`validate_bundle_id`].
    pub fn with_bundle_id(path: impl Into<PathBuf>, bundle_id: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let bundle_id = bundle_id.into();

        validate_bundle_id(&bundle_id).map_err(|e| match e {
            NotaryError::InvalidInput(reason) => {
                NotaryError::InvalidInput(format!("{reason} (derived for {})", path.display()))
            }
            other => other,
        })?;

        Ok(Self { path, bundle_id })
    }

    /// Same artifact, submitted from a different file (e.g. a zipped bundle).
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), bundle_id: self.bundle_id.clone() }
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the artifact is an `.app` bundle directory.
    pub fn is_app_bundle(&self) -> bool {
        self.extension().as_deref() == Some("app")
    }
}

/// Derive the short bundle identifier for a file name.
///
/// The extension is dropped, `_` is treated like `-`, and the first five
/// `-`-separated segments are joined with `.`. Empty segments are skipped.
///
/// ```
/// use notaryflow_domain::derive_bundle_id;
///
/// assert_eq!(derive_bundle_id("Tableau-Public.zip"), "Tableau.Public");
/// assert_eq!(derive_bundle_id("Tableau_Desktop-2024-1-0-x64-extra.dmg"), "Tableau.Desktop.2024.1.0");
/// ```
pub fn derive_bundle_id(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map_or_else(|| file_name.to_string(), |stem| stem.to_string_lossy().into_owned());

    stem.replace('_', "-")
        .split('-')
        .filter(|segment| !segment.is_empty())
        .take(BUNDLE_ID_MAX_SEGMENTS)
        .collect::<Vec<_>>()
        .join(BUNDLE_ID_SEPARATOR)
}

/// Check that a bundle id can key a ledger line and name a ticket file.
///
/// The id must be non-blank, a single line, and a single path component:
/// no `/` or `\` separators, and not `.` or `..`.
///
/// # Errors
/// Returns `NotaryError::InvalidInput` describing the first problem found.
pub fn validate_bundle_id(bundle_id: &str) -> Result<()> {
    if bundle_id.trim().is_empty() {
        return Err(NotaryError::InvalidInput("empty bundle id".into()));
    }
    if bundle_id.contains(['\n', '\r']) {
        return Err(NotaryError::InvalidInput(format!("bundle id {bundle_id:?} contains a line break")));
    }
    if bundle_id.contains(['/', '\\', '\0']) || matches!(bundle_id, "." | "..") {
        return Err(NotaryError::InvalidInput(format!(
            "bundle id {bundle_id:?} is not a plain file name component"
        )));
    }
    Ok(())
}

/// Reject batches where two artifacts share a bundle identifier.
///
/// Ledger entries and ticket files are keyed by bundle id, so a collision
/// would silently overwrite the earlier artifact's results.
///
/// # Errors
/// Returns `NotaryError::DuplicateBundleId` naming the first collision.
pub fn ensure_unique_bundle_ids(artifacts: &[Artifact]) -> Result<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(artifacts.len());

    for artifact in artifacts {
        if let Some(first) = seen.insert(&artifact.bundle_id, &artifact.path) {
            return Err(NotaryError::DuplicateBundleId {
                bundle_id: artifact.bundle_id.clone(),
                first: first.to_path_buf(),
                second: artifact.path.clone(),
            });
        }
    }

    Ok(())
}
