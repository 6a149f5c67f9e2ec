//! Tracing subscriber initialization
//!
//! `RUST_LOG` wins over the configured level when it is set, so a single
//! run can be made more verbose without editing the config file.

use std::str::FromStr;

use notaryflow_domain::{NotaryError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = NotaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(NotaryError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `notaryflow_core=debug,info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self { level: "info".into(), format: LogFormat::Pretty }
    }
}

impl LoggingOptions {
    pub fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .map_err(|e| NotaryError::Config(format!("invalid log level '{}': {e}", self.level)))
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays free
/// for command output.
///
/// # Errors
/// Returns `NotaryError::Config` for an unparsable level and
/// `NotaryError::Internal` if a global subscriber is already installed.
pub fn init_logging(options: &LoggingOptions) -> Result<()> {
    let filter = options.filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match options.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| NotaryError::Internal(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!("xml".parse::<LogFormat>(), Err(NotaryError::Config(_))));
    }

    #[test]
    fn rejects_malformed_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let options = LoggingOptions { level: "notaryflow_core=loud".into(), ..Default::default() };
        assert!(matches!(options.filter(), Err(NotaryError::Config(_))));
    }
}
