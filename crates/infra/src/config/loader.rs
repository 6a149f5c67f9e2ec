//! Configuration loader
//!
//! Loads application configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. Read the explicit config file, or the first discovered file if none is
//!    given (no file at all means built-in defaults)
//! 2. Apply `NOTARYFLOW_*` environment overrides
//! 3. Validate the result
//!
//! ## Environment Variables
//! - `NOTARYFLOW_APPLE_ID`, `NOTARYFLOW_APP_SPECIFIC_PASSWORD`: credentials
//! - `NOTARYFLOW_CERTIFICATE_ID`, `NOTARYFLOW_ENTITLEMENTS`: signing identity
//! - `NOTARYFLOW_XCRUN`, `NOTARYFLOW_CODESIGN`, `NOTARYFLOW_DITTO`,
//!   `NOTARYFLOW_STAPLER`: tool locations
//! - `NOTARYFLOW_TOOL_TIMEOUT_SECS`: per-invocation timeout
//! - `NOTARYFLOW_INITIAL_JITTER_MS`, `NOTARYFLOW_RETRY_DELAY_SECS`,
//!   `NOTARYFLOW_MAX_IN_FLIGHT`, `NOTARYFLOW_DEADLINE_SECS`: polling
//! - `NOTARYFLOW_LEDGER_PATH`, `NOTARYFLOW_OUTPUT_DIR`,
//!   `NOTARYFLOW_STAGING_DIR`: output locations
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./notaryflow.toml`, `./notaryflow.json`, `./config.toml`,
//!    `./config.json` (current working directory)
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use notaryflow_domain::{Config, NotaryError, Result};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["notaryflow.toml", "notaryflow.json", "config.toml", "config.json"];

/// Load configuration from `path` (or a discovered file) plus environment
/// overrides, then validate it.
///
/// # Errors
/// Returns `NotaryError::Config` if:
/// - An explicit file does not exist
/// - The file format is invalid
/// - An environment override cannot be parsed
/// - Validation fails
pub fn load(path: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_from_file(Some(path))?,
        None => match discover_config_path() {
            Some(found) => load_from_file(Some(found))?,
            None => {
                tracing::debug!("No config file found; using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches several locations for a config file.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `NotaryError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(NotaryError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => discover_config_path().ok_or_else(|| {
            NotaryError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| NotaryError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(NotaryError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search the default locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Apply `NOTARYFLOW_*` environment variables on top of `config`.
///
/// # Errors
/// Returns `NotaryError::Config` if a numeric variable cannot be parsed.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup (the environment in production).
///
/// Empty values are ignored.
///
/// # Errors
/// Returns `NotaryError::Config` if a numeric value cannot be parsed.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("NOTARYFLOW_APPLE_ID") {
        config.credentials.apple_id = Some(value);
    }
    if let Some(value) = get("NOTARYFLOW_APP_SPECIFIC_PASSWORD") {
        config.credentials.app_specific_password = Some(value);
    }
    if let Some(value) = get("NOTARYFLOW_CERTIFICATE_ID") {
        config.signing.certificate_id = Some(value);
    }
    if let Some(value) = get("NOTARYFLOW_ENTITLEMENTS") {
        config.signing.entitlements = Some(value.into());
    }

    if let Some(value) = get("NOTARYFLOW_XCRUN") {
        config.tools.xcrun = value;
    }
    if let Some(value) = get("NOTARYFLOW_CODESIGN") {
        config.tools.codesign = value;
    }
    if let Some(value) = get("NOTARYFLOW_DITTO") {
        config.tools.ditto = value;
    }
    if let Some(value) = get("NOTARYFLOW_STAPLER") {
        config.tools.stapler = value;
    }
    if let Some(value) = get("NOTARYFLOW_TOOL_TIMEOUT_SECS") {
        config.tools.timeout_secs = parse_number("NOTARYFLOW_TOOL_TIMEOUT_SECS", &value)?;
    }

    if let Some(value) = get("NOTARYFLOW_INITIAL_JITTER_MS") {
        config.polling.initial_jitter_ms = parse_number("NOTARYFLOW_INITIAL_JITTER_MS", &value)?;
    }
    if let Some(value) = get("NOTARYFLOW_RETRY_DELAY_SECS") {
        config.polling.retry_delay_secs = parse_number("NOTARYFLOW_RETRY_DELAY_SECS", &value)?;
    }
    if let Some(value) = get("NOTARYFLOW_MAX_IN_FLIGHT") {
        config.polling.max_in_flight = parse_number("NOTARYFLOW_MAX_IN_FLIGHT", &value)?;
    }
    if let Some(value) = get("NOTARYFLOW_DEADLINE_SECS") {
        config.polling.deadline_secs = Some(parse_number("NOTARYFLOW_DEADLINE_SECS", &value)?);
    }

    if let Some(value) = get("NOTARYFLOW_LEDGER_PATH") {
        config.paths.ledger_path = value.into();
    }
    if let Some(value) = get("NOTARYFLOW_OUTPUT_DIR") {
        config.paths.output_dir = value.into();
    }
    if let Some(value) = get("NOTARYFLOW_STAGING_DIR") {
        config.paths.staging_dir = value.into();
    }

    Ok(())
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| NotaryError::Config(format!("Invalid value for {key}: {e}")))
}
