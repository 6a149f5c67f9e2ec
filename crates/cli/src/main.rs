//! notaryflow - batch notarization of macOS artifacts
//!
//! Logs go to stderr; machine readable results (reports, parsed records) are
//! printed to stdout as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use notaryflow_infra::{init_logging, LogFormat, LoggingOptions};

mod app;
mod commands;

/// notaryflow - submit, poll and staple macOS notarizations
#[derive(Parser, Debug)]
#[command(name = "notaryflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (TOML or JSON); searched for when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Stop polling after this many seconds (overrides `polling.deadline_secs`)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare, submit, poll and staple every artifact in a binary list
    Notarize {
        /// Text file with one artifact path per line
        list: PathBuf,

        /// Submit the artifacts as they are, without signing or zipping
        #[arg(long)]
        no_prepare: bool,

        /// Do not staple tickets after a successful run
        #[arg(long)]
        no_staple: bool,
    },

    /// Prepare and submit every artifact, recording request ids in the ledger
    Submit {
        /// Text file with one artifact path per line
        list: PathBuf,

        /// Submit the artifacts as they are, without signing or zipping
        #[arg(long)]
        no_prepare: bool,
    },

    /// Poll the submissions recorded in the ledger
    #[command(alias = "resume")]
    Poll,

    /// Staple tickets onto every stapleable artifact in a binary list
    Staple {
        /// Text file with one artifact path per line
        list: PathBuf,
    },

    /// Report whether an artifact carries a code signature
    CheckSignature {
        /// Artifact to inspect
        path: PathBuf,

        /// Sign the artifact when it is unsigned
        #[arg(long)]
        sign: bool,
    },

    /// Parse saved `--notarization-info` output and print it as JSON
    ParseStatus {
        /// File holding the tool output; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging = LoggingOptions {
        level: cli.log_level.clone(),
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty },
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("notaryflow: {e}");
        return ExitCode::from(commands::EXIT_FAILURE);
    }

    match commands::run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Command failed");
            eprintln!("notaryflow: {e:#}");
            ExitCode::from(commands::EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "notaryflow",
            "notarize",
            "binaries.txt",
            "--timeout",
            "3600",
            "--config",
            "ci/notaryflow.toml",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(3600));
        assert_eq!(cli.config, Some(PathBuf::from("ci/notaryflow.toml")));
        assert!(cli.json_logs);
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Commands::Notarize { list, no_prepare, no_staple } => {
                assert_eq!(list, PathBuf::from("binaries.txt"));
                assert!(!no_prepare);
                assert!(!no_staple);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn resume_is_an_alias_for_poll() {
        let cli = Cli::try_parse_from(["notaryflow", "resume", "--log-level", "debug"]).unwrap();

        assert!(matches!(cli.command, Commands::Poll));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn parse_status_file_is_optional() {
        let cli = Cli::try_parse_from(["notaryflow", "parse-status"]).unwrap();
        assert!(matches!(cli.command, Commands::ParseStatus { file: None }));

        let cli = Cli::try_parse_from(["notaryflow", "check-signature", "Tableau.app", "--sign"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckSignature { sign: true, .. }));
    }

    #[test]
    fn timeout_must_be_a_number() {
        let result = Cli::try_parse_from(["notaryflow", "poll", "--timeout", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn list_is_required() {
        assert!(Cli::try_parse_from(["notaryflow", "submit"]).is_err());
    }
}
