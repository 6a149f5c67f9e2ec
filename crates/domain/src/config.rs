//! Configuration structures
//!
//! Every section is defaulted so a config file only needs to name what
//! differs from the defaults. Loading (files, environment overrides) lives in
//! the infrastructure crate.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CODESIGN, DEFAULT_DITTO, DEFAULT_HTTP_BACKOFF_MS, DEFAULT_HTTP_MAX_ATTEMPTS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INITIAL_JITTER_MS, DEFAULT_LEDGER_PATH,
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_OUTPUT_DIR, DEFAULT_RETRY_DELAY_SECS, DEFAULT_STAGING_DIR,
    DEFAULT_STAPLER, DEFAULT_TOOL_TIMEOUT_SECS, DEFAULT_XCRUN, REDACTED,
};
use crate::errors::{NotaryError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub tools: ToolsConfig,
    pub signing: SigningConfig,
    pub polling: PollingConfig,
    pub paths: PathsConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Check values that would make a batch misbehave.
    ///
    /// # Errors
    /// Returns `NotaryError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.polling.validate()?;

        if self.http.max_attempts == 0 {
            return Err(NotaryError::Config("http.max_attempts must be at least 1".into()));
        }
        if self.tools.timeout_secs == 0 {
            return Err(NotaryError::Config("tools.timeout_secs must be greater than 0".into()));
        }

        Ok(())
    }
}

/// Apple ID credentials passed to the notary tool.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub apple_id: Option<String>,
    /// App-specific password, or a `@keychain:<item>` / `@env:<var>` reference
    /// understood by the notary tool.
    pub app_specific_password: Option<String>,
}

impl CredentialsConfig {
    /// Both credentials, or a configuration error naming the missing one.
    ///
    /// # Errors
    /// Returns `NotaryError::Config` if either value is missing or blank.
    pub fn require(&self) -> Result<(&str, &str)> {
        let apple_id = non_blank(self.apple_id.as_deref())
            .ok_or_else(|| NotaryError::Config("credentials.apple_id is not set".into()))?;
        let password = non_blank(self.app_specific_password.as_deref()).ok_or_else(|| {
            NotaryError::Config("credentials.app_specific_password is not set".into())
        })?;

        Ok((apple_id, password))
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("apple_id", &self.apple_id)
            .field("app_specific_password", &self.app_specific_password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Locations of the external executables and how long one run may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub xcrun: String,
    pub codesign: String,
    pub ditto: String,
    pub stapler: String,
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            xcrun: DEFAULT_XCRUN.into(),
            codesign: DEFAULT_CODESIGN.into(),
            ditto: DEFAULT_DITTO.into(),
            stapler: DEFAULT_STAPLER.into(),
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Code signing identity used when an artifact turns out to be unsigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub certificate_id: Option<String>,
    pub entitlements: Option<PathBuf>,
}

/// Polling engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay before each round-0 query.
    pub initial_jitter_ms: u64,
    /// Delay between retry waves.
    pub retry_delay_secs: u64,
    /// Maximum concurrent status queries within a wave.
    pub max_in_flight: usize,
    /// Give up on pending artifacts after this long; `None` polls until
    /// cancelled.
    pub deadline_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_jitter_ms: DEFAULT_INITIAL_JITTER_MS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            deadline_secs: None,
        }
    }
}

impl PollingConfig {
    pub fn initial_jitter(&self) -> Duration {
        Duration::from_millis(self.initial_jitter_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// # Errors
    /// Returns `NotaryError::Config` if no query could ever run.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(NotaryError::Config("polling.max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}

/// Where batch state and results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub ledger_path: PathBuf,
    /// Ticket documents (`<bundleId>.notarization.json`).
    pub output_dir: PathBuf,
    /// Zipped app bundles awaiting submission.
    pub staging_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ledger_path: DEFAULT_LEDGER_PATH.into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            staging_dir: DEFAULT_STAGING_DIR.into(),
        }
    }
}

/// HTTP settings for developer log retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_HTTP_BACKOFF_MS,
        }
    }
}
