//! Parsing of notary tool text output
//!
//! Both parsers are total: malformed or unrelated input yields empty/default
//! fields, never an error. Callers decide what an empty result means.
//!
//! # Examples
//!
//! ```
//! use notaryflow_core::notarization::parser::{parse_request_id, parse_status};
//!
//! let submitted = "No errors uploading 'Tool.zip'.\nRequestUUID = 2cf2d3a1-7d2c-4a3e-9a55-0e2b1f6c7d8e\n";
//! assert_eq!(parse_request_id(submitted), "2cf2d3a1-7d2c-4a3e-9a55-0e2b1f6c7d8e");
//!
//! let status = parse_status("        Status: success\n   Status Code: 0\n");
//! assert!(status.is_terminal());
//! ```

use lazy_static::lazy_static;
use notaryflow_domain::constants::{
    ALREADY_UPLOADED_MARKER, KEY_VALUE_SEPARATOR, LOG_FILE_URL_KEY, REQUEST_UUID_ASSIGNMENT,
    REQUEST_UUID_KEY, STATUS_CODE_KEY, STATUS_KEY, STATUS_MESSAGE_KEY,
};
use notaryflow_domain::{NotarizationStatus, StatusRecord};
use regex::Regex;

lazy_static! {
    /// Loose UUID shape used by the duplicate-upload message
    static ref UPLOAD_ID_PATTERN: Option<Regex> =
        Regex::new(r"The upload ID is (\d*\w*-\d*\w*-\d*\w*-\d*\w*-\d*\w*)").ok();
}

/// Extract the request id from submission output.
///
/// Looks for `RequestUUID = <id>` first. When absent, recovers the id from the
/// service's "already uploaded" conflict message, which is an alternate
/// success signal. Returns an empty string when neither is present.
pub fn parse_request_id(raw_output: &str) -> String {
    let assigned = raw_output.lines().find_map(|line| {
        line.find(REQUEST_UUID_ASSIGNMENT)
            .map(|start| line[start + REQUEST_UUID_ASSIGNMENT.len()..].trim())
            .filter(|value| !value.is_empty())
    });

    if let Some(id) = assigned {
        return id.to_string();
    }

    raw_output
        .lines()
        .filter(|line| line.contains(ALREADY_UPLOADED_MARKER))
        .find_map(upload_id_from_conflict)
        .unwrap_or_default()
}

fn upload_id_from_conflict(line: &str) -> Option<String> {
    UPLOAD_ID_PATTERN
        .as_ref()?
        .captures(line)?
        .get(1)
        .map(|id| id.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Parse status-check output into a [`StatusRecord`].
///
/// Recognised keys are matched at the start of each (trimmed) line; the value
/// is everything after the first `": "`, trimmed. The returned record has an
/// empty `bundle_id`; callers tag it.
pub fn parse_status(raw_output: &str) -> StatusRecord {
    let mut record = StatusRecord::default();

    for line in raw_output.lines() {
        let line = line.trim_start();

        // Longer keys first: "Status Code:" and "Status Message:" share the
        // "Status" prefix.
        if line.starts_with(STATUS_MESSAGE_KEY) {
            record.status_message = value_of(line);
        } else if line.starts_with(STATUS_CODE_KEY) {
            record.status_code = value_of(line).and_then(|code| code.parse::<i64>().ok());
        } else if line.starts_with(STATUS_KEY) {
            record.status = value_of(line)
                .map_or(NotarizationStatus::Unknown, |s| NotarizationStatus::from_tool_text(&s));
        } else if line.starts_with(REQUEST_UUID_KEY) {
            record.request_id = value_of(line).unwrap_or_default();
        } else if line.starts_with(LOG_FILE_URL_KEY) {
            record.log_file_url = value_of(line);
        }
    }

    record
}

fn value_of(line: &str) -> Option<String> {
    line.split_once(KEY_VALUE_SEPARATOR)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
