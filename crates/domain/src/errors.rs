//! Error types used throughout the application

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for notaryflow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum NotaryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// An external tool could not be spawned, timed out, or produced
    /// unreadable output.
    #[error("Tool invocation failed: {program}: {message}")]
    ToolInvocation { program: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The submission ledger cannot be turned back into bundle/request pairs.
    #[error("Submission ledger {} is corrupted: {line_count} lines (expected an even count)", .path.display())]
    LedgerCorrupted { path: PathBuf, line_count: usize },

    /// Two artifacts in one batch derive the same bundle identifier.
    #[error("Bundle id '{bundle_id}' derived from both {} and {}", .first.display(), .second.display())]
    DuplicateBundleId { bundle_id: String, first: PathBuf, second: PathBuf },

    /// Work stopped because the batch was cancelled.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotaryError {
    /// Build a [`NotaryError::ToolInvocation`] for `program`.
    pub fn tool(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation { program: program.into(), message: message.into() }
    }

    /// Whether this error came from running an external tool rather than from
    /// the data it returned.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::ToolInvocation { .. })
    }
}

/// Result type alias for notaryflow operations
pub type Result<T> = std::result::Result<T, NotaryError>;
