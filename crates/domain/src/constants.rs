//! Application constants
//!
//! Centralized location for the markers and defaults shared by the parser,
//! the polling engine and the configuration layer.

// Submission / status output markers (altool text format)
pub const REQUEST_UUID_ASSIGNMENT: &str = "RequestUUID = ";
pub const ALREADY_UPLOADED_MARKER: &str =
    "The software asset has already been uploaded. The upload ID is";
pub const STATUS_KEY: &str = "Status:";
pub const STATUS_CODE_KEY: &str = "Status Code:";
pub const STATUS_MESSAGE_KEY: &str = "Status Message:";
pub const REQUEST_UUID_KEY: &str = "RequestUUID:";
pub const LOG_FILE_URL_KEY: &str = "LogFileURL:";
pub const KEY_VALUE_SEPARATOR: &str = ": ";

// codesign output marker for unsigned binaries
pub const CODE_NOT_SIGNED_TEXT: &str = "code object is not signed at all";

// Bundle identifier derivation
pub const BUNDLE_ID_MAX_SEGMENTS: usize = 5;
pub const BUNDLE_ID_SEPARATOR: &str = ".";

// Output files
pub const TICKET_FILE_SUFFIX: &str = ".notarization.json";
pub const DEFAULT_LEDGER_PATH: &str = "out/bundleUUIDList.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "out/tickets";
pub const DEFAULT_STAGING_DIR: &str = "out/zips";

// Polling defaults
pub const DEFAULT_INITIAL_JITTER_MS: u64 = 100;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 6;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

// Extensions that accept a stapled ticket
pub const STAPLEABLE_EXTENSIONS: &[&str] = &["dmg", "pkg", "app"];

// External tool defaults
pub const DEFAULT_XCRUN: &str = "xcrun";
pub const DEFAULT_CODESIGN: &str = "codesign";
pub const DEFAULT_DITTO: &str = "/usr/bin/ditto";
pub const DEFAULT_STAPLER: &str = "stapler";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 1800;

// HTTP defaults for log retrieval
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_HTTP_BACKOFF_MS: u64 = 200;

/// Placeholder substituted for secrets when argument lists are logged.
pub const REDACTED: &str = "<redacted>";
