//! Subcommand handlers
//!
//! Exit codes: 0 when everything notarized (or the command succeeded),
//! 1 on errors, 2 when the batch finished with rejections or failed
//! submissions, 3 when it was cancelled or hit the deadline.

#![allow(clippy::print_stdout)]

use std::path::Path;

use anyhow::Context;
use notaryflow_core::{is_stapleable, parse_status, PollingError, StapleResult};
use notaryflow_domain::{Artifact, BatchReport, NotaryError};
use notaryflow_infra::read_binary_list;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;
use crate::{Cli, Commands};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INCOMPLETE: u8 = 2;
pub const EXIT_INTERRUPTED: u8 = 3;

#[derive(Serialize)]
struct NotarizeOutput<'a> {
    report: &'a BatchReport,
    stapled: Vec<StapleResult>,
}

pub async fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::ParseStatus { file } => parse_status_command(file.as_deref()).await,
        command => {
            let app = App::load(cli.config, cli.timeout)?;
            let cancel = cancel_on_ctrl_c();
            dispatch(&app, command, &cancel).await
        }
    }
}

async fn dispatch(app: &App, command: Commands, cancel: &CancellationToken) -> anyhow::Result<u8> {
    match command {
        Commands::Notarize { list, no_prepare, no_staple } => {
            notarize(app, &list, no_prepare, no_staple, cancel).await
        }
        Commands::Submit { list, no_prepare } => submit(app, &list, no_prepare, cancel).await,
        Commands::Poll => poll(app, cancel).await,
        Commands::Staple { list } => staple(app, &list).await,
        Commands::CheckSignature { path, sign } => check_signature(app, &path, sign).await,
        Commands::ParseStatus { file } => parse_status_command(file.as_deref()).await,
    }
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping the batch");
            child.cancel();
        }
    });
    token
}

async fn prepared_artifacts(
    app: &App,
    list: &Path,
    no_prepare: bool,
    cancel: &CancellationToken,
) -> Result<(Vec<Artifact>, Vec<Artifact>), NotaryError> {
    let artifacts = read_binary_list(list).await?;
    let submitted = if no_prepare {
        artifacts.clone()
    } else {
        app.preparation().prepare(&artifacts, cancel).await?
    };
    Ok((artifacts, submitted))
}

async fn notarize(
    app: &App,
    list: &Path,
    no_prepare: bool,
    no_staple: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<u8> {
    let service = app.service()?;
    let (artifacts, submitted) = match prepared_artifacts(app, list, no_prepare, cancel).await {
        Ok(prepared) => prepared,
        Err(NotaryError::Cancelled(reason)) => {
            warn!(%reason, "Batch cancelled during preparation");
            return Ok(EXIT_INTERRUPTED);
        }
        Err(e) => return Err(e).context("failed to prepare artifacts"),
    };

    let report = match service.notarize(&submitted, cancel).await {
        Ok(report) => report,
        Err(e) => return interrupted_or_error(e),
    };

    let stapled = if no_staple {
        Vec::new()
    } else {
        app.stapler().staple_notarized(&artifacts, &report).await
    };

    print_json(&NotarizeOutput { report: &report, stapled })?;
    Ok(report_exit_code(&report))
}

async fn submit(
    app: &App,
    list: &Path,
    no_prepare: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<u8> {
    let service = app.service()?;
    let (_, submitted) = match prepared_artifacts(app, list, no_prepare, cancel).await {
        Ok(prepared) => prepared,
        Err(NotaryError::Cancelled(reason)) => {
            warn!(%reason, "Submission cancelled during preparation");
            return Ok(EXIT_INTERRUPTED);
        }
        Err(e) => return Err(e).context("failed to prepare artifacts"),
    };

    let records = service.submit_batch(&submitted, cancel).await?;
    print_json(&records)?;

    if records.len() < submitted.len() {
        return Ok(EXIT_INTERRUPTED);
    }
    if records.iter().any(|record| !record.is_submitted()) {
        return Ok(EXIT_INCOMPLETE);
    }
    Ok(EXIT_SUCCESS)
}

async fn poll(app: &App, cancel: &CancellationToken) -> anyhow::Result<u8> {
    let service = app.service()?;
    match service.resume(cancel).await {
        Ok(report) => {
            print_json(&report)?;
            Ok(report_exit_code(&report))
        }
        Err(e) => interrupted_or_error(e),
    }
}

async fn staple(app: &App, list: &Path) -> anyhow::Result<u8> {
    let artifacts = read_binary_list(list).await?;
    let stapler = app.stapler();

    let mut results = Vec::new();
    for artifact in &artifacts {
        if is_stapleable(&artifact.path) {
            results.push(stapler.staple(&artifact.path).await);
        } else {
            info!(path = %artifact.path.display(), "Artifact type cannot be stapled");
        }
    }

    print_json(&results)?;
    if results.iter().all(|result| result.stapled && result.validated) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_INCOMPLETE)
    }
}

async fn check_signature(app: &App, path: &Path, sign: bool) -> anyhow::Result<u8> {
    let signer = app.signer();

    if sign {
        let outcome = signer.ensure_signed(path).await?;
        print_json(&outcome)?;
        return Ok(EXIT_SUCCESS);
    }

    let state = signer.check(path).await?;
    print_json(&serde_json::json!({ "path": path, "signature": state }))?;
    Ok(EXIT_SUCCESS)
}

async fn parse_status_command(file: Option<&Path>) -> anyhow::Result<u8> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read stdin")?;
            buffer
        }
    };

    print_json(&parse_status(&raw))?;
    Ok(EXIT_SUCCESS)
}

fn interrupted_or_error(error: PollingError) -> anyhow::Result<u8> {
    match error.partial_report() {
        Some(report) => {
            warn!(error = %error, summary = %report.summary(), "Polling stopped early");
            print_json(report)?;
            Ok(EXIT_INTERRUPTED)
        }
        None => Err(error.into()),
    }
}

fn report_exit_code(report: &BatchReport) -> u8 {
    info!(summary = %report.summary(), "Batch finished");
    if report.all_notarized() {
        EXIT_SUCCESS
    } else if report.is_complete() {
        EXIT_INCOMPLETE
    } else {
        EXIT_INTERRUPTED
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
