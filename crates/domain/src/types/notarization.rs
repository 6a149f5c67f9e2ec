//! Submission, status and ticket records

use serde::{Deserialize, Serialize};

use crate::constants::TICKET_FILE_SUFFIX;
use crate::impl_domain_status_conversions;

/// Pairing of an artifact's bundle id with the request id returned by the
/// notary service.
///
/// An empty `request_id` marks a submission whose response could not be
/// parsed; such records are persisted but never polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub bundle_id: String,
    pub request_id: String,
}

impl SubmissionRecord {
    pub fn new(bundle_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self { bundle_id: bundle_id.into(), request_id: request_id.into() }
    }

    /// Whether a request id was obtained for this submission.
    pub fn is_submitted(&self) -> bool {
        !self.request_id.trim().is_empty()
    }
}

/// Notarization status as reported by the status-check tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotarizationStatus {
    /// Apple is still processing the upload (`in progress`).
    Pending,
    Success,
    Invalid,
    /// Absent or unrecognised status text.
    #[default]
    Unknown,
}

impl_domain_status_conversions!(NotarizationStatus {
    Pending => "in progress",
    Success => "success",
    Invalid => "invalid",
    Unknown => "unknown",
});

impl NotarizationStatus {
    /// Parse tool text, falling back to [`NotarizationStatus::Unknown`].
    pub fn from_tool_text(text: &str) -> Self {
        text.parse().unwrap_or(Self::Unknown)
    }
}

/// How the polling engine treats a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// `success` with status code 0; a ticket is collected.
    Succeeded,
    /// `invalid`, whatever the status code.
    Rejected,
    /// Anything else; queried again next wave.
    Pending,
}

impl Classification {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One parsed answer from the status-check tool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    pub bundle_id: String,
    pub request_id: String,
    pub status: NotarizationStatus,
    pub status_code: Option<i64>,
    pub log_file_url: Option<String>,
    pub status_message: Option<String>,
}

impl StatusRecord {
    /// Status code 0 means the service considers the request successful.
    pub fn is_success_coded(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Terminal success needs both the `success` status and a zero status
    /// code; `invalid` is terminal regardless of the code.
    pub fn classify(&self) -> Classification {
        match self.status {
            NotarizationStatus::Success if self.is_success_coded() => Classification::Succeeded,
            NotarizationStatus::Invalid => Classification::Rejected,
            _ => Classification::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.classify().is_terminal()
    }
}

/// Result payload persisted for a successfully notarized artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDocument {
    pub bundle_id: String,
    pub content: String,
}

impl TicketDocument {
    pub fn new(bundle_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { bundle_id: bundle_id.into(), content: content.into() }
    }

    /// `<bundleId>.notarization.json`
    pub fn file_name(&self) -> String {
        format!("{}{}", self.bundle_id, TICKET_FILE_SUFFIX)
    }
}

/// Captured result of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined by a newline, the text the parsers scan.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}
