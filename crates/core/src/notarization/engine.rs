//! Wave-based status polling
//!
//! The engine owns the pending set. Each wave fans the pending submissions out
//! to spawned query tasks (bounded by a semaphore), joins all of them, and
//! only then decides which submissions are terminal. Query tasks hand their
//! result back by value; ticket files are written by the coordinating loop
//! after the join.
//!
//! A bundle id appearing more than once (a ledger where a later submission
//! overwrote an earlier one) is collapsed to its last record before the first
//! wave.
//!
//! Cancellation and the optional deadline are checked while waiting between
//! waves and while a wave is in flight. Either one stops the batch with a
//! partial [`BatchReport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use notaryflow_domain::{
    BatchReport, Classification, NotarizationStatus, NotaryError, PollingConfig, StatusRecord,
    SubmissionRecord, TicketDocument,
};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{LogFetcher, StatusQuery, TicketStore};

/// Ways a polling run can end without every submission reaching a terminal
/// state.
#[derive(Debug, Error)]
pub enum PollingError {
    #[error("Polling cancelled with {} artifact(s) pending", .report.pending.len())]
    Cancelled { report: Box<BatchReport> },

    #[error(
        "Polling deadline of {}s exceeded; still pending: {}",
        .deadline.as_secs(),
        .report.pending.join(", ")
    )]
    DeadlineExceeded { deadline: Duration, report: Box<BatchReport> },

    #[error("Failed to write ticket for {bundle_id}: {source}")]
    TicketWrite {
        bundle_id: String,
        #[source]
        source: NotaryError,
    },

    #[error(transparent)]
    Domain(#[from] NotaryError),
}

impl PollingError {
    /// Report of the work finished before the run stopped, if any.
    pub fn partial_report(&self) -> Option<&BatchReport> {
        match self {
            Self::Cancelled { report } | Self::DeadlineExceeded { report, .. } => Some(report),
            Self::TicketWrite { .. } | Self::Domain(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Interruption {
    Cancelled,
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    limit: Duration,
    at: Instant,
}

/// Query outcomes indexed like the pending records they answer.
type WaveResults = Vec<Option<notaryflow_domain::Result<StatusRecord>>>;

/// Drives submitted artifacts to terminal notarization states.
pub struct PollingEngine {
    status: Arc<dyn StatusQuery>,
    log_fetcher: Arc<dyn LogFetcher>,
    tickets: Arc<dyn TicketStore>,
    config: PollingConfig,
}

impl PollingEngine {
    pub fn new(
        status: Arc<dyn StatusQuery>,
        log_fetcher: Arc<dyn LogFetcher>,
        tickets: Arc<dyn TicketStore>,
        config: PollingConfig,
    ) -> Self {
        Self { status, log_fetcher, tickets, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Poll every submitted record until it is terminal.
    ///
    /// Records without a request id are reported as submission failures and
    /// never queried. When several records share a bundle id, the last one
    /// wins.
    ///
    /// # Errors
    /// - `PollingError::Cancelled` / `PollingError::DeadlineExceeded` with the
    ///   partial report when the run is stopped early
    /// - `PollingError::TicketWrite` if a ticket document cannot be persisted
    /// - `PollingError::Domain` for invalid polling configuration
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn run(
        &self,
        records: Vec<SubmissionRecord>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PollingError> {
        self.config.validate()?;

        let mut report = BatchReport::started();
        let deadline = self.config.deadline().map(|limit| Deadline { limit, at: Instant::now() + limit });

        let mut pending = Vec::with_capacity(records.len());
        for record in last_record_per_bundle(records) {
            if record.is_submitted() {
                pending.push(record);
            } else {
                warn!(bundle_id = %record.bundle_id, "Submission has no request id; not polling");
                report.submission_failures.push(record.bundle_id);
            }
        }

        while !pending.is_empty() {
            let delay = if report.waves == 0 {
                self.config.initial_jitter()
            } else {
                self.config.retry_delay()
            };

            if let Some(stop) = pause(delay, cancel, deadline).await {
                return Err(interrupted(stop, report, &pending));
            }

            report.waves += 1;
            debug!(wave = report.waves, pending = pending.len(), "Starting query wave");

            let results = match self.query_wave(&pending, cancel, deadline).await {
                Ok(results) => results,
                Err(stop) => return Err(interrupted(stop, report, &pending)),
            };

            pending = self.settle_wave(pending, results, &mut report).await?;

            if !pending.is_empty() {
                info!(
                    wave = report.waves,
                    pending = pending.len(),
                    retry_in_secs = self.config.retry_delay_secs,
                    "Submissions still pending"
                );
            }
        }

        report.finished_at = Utc::now();
        info!(summary = %report.summary(), "Polling finished");
        Ok(report)
    }

    /// Query every pending record concurrently and join the whole wave.
    async fn query_wave(
        &self,
        pending: &[SubmissionRecord],
        cancel: &CancellationToken,
        deadline: Option<Deadline>,
    ) -> Result<WaveResults, Interruption> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        for (index, record) in pending.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let status = Arc::clone(&self.status);
            let SubmissionRecord { bundle_id, request_id } = record.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, Err(NotaryError::Internal("query semaphore closed".into())))
                    }
                };
                (index, status.query(&bundle_id, &request_id).await)
            });
        }

        let mut results: WaveResults = std::iter::repeat_with(|| None).take(pending.len()).collect();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(Interruption::Cancelled);
                }
                () = deadline_reached(deadline) => {
                    tasks.abort_all();
                    return Err(expired(deadline));
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, outcome))) => {
                        if let Some(slot) = results.get_mut(index) {
                            *slot = Some(outcome);
                        }
                    }
                    Some(Err(err)) => warn!(error = %err, "Status query task did not complete"),
                    None => break,
                },
            }
        }

        Ok(results)
    }

    /// Classify one wave's results; returns the records that stay pending.
    async fn settle_wave(
        &self,
        pending: Vec<SubmissionRecord>,
        results: WaveResults,
        report: &mut BatchReport,
    ) -> Result<Vec<SubmissionRecord>, PollingError> {
        let mut still_pending = Vec::new();

        for (record, result) in pending.into_iter().zip(results) {
            let status = match result {
                Some(Ok(status)) => status,
                Some(Err(err)) => {
                    count_query_failure(report, &record.bundle_id);
                    if err.is_tool_failure() {
                        error!(
                            bundle_id = %record.bundle_id,
                            request_id = %record.request_id,
                            error = %err,
                            "Status tool invocation failed"
                        );
                    } else {
                        warn!(
                            bundle_id = %record.bundle_id,
                            request_id = %record.request_id,
                            error = %err,
                            "Status query failed"
                        );
                    }
                    still_pending.push(record);
                    continue;
                }
                None => {
                    count_query_failure(report, &record.bundle_id);
                    warn!(bundle_id = %record.bundle_id, "No status result returned for wave");
                    still_pending.push(record);
                    continue;
                }
            };

            match status.classify() {
                Classification::Succeeded => {
                    info!(
                        bundle_id = %status.bundle_id,
                        request_id = %status.request_id,
                        status = %status.status,
                        "Notarization succeeded"
                    );
                    self.write_ticket(&status).await?;
                    report.tickets_written.push(status.bundle_id.clone());
                    report.notarized.push(status);
                }
                Classification::Rejected => {
                    warn!(
                        bundle_id = %status.bundle_id,
                        request_id = %status.request_id,
                        status_code = ?status.status_code,
                        status_message = status.status_message.as_deref().unwrap_or_default(),
                        "Notarization rejected"
                    );
                    self.report_rejection(&status).await;
                    report.rejected.push(status);
                }
                Classification::Pending => {
                    if status.status == NotarizationStatus::Success {
                        warn!(
                            bundle_id = %status.bundle_id,
                            status_code = ?status.status_code,
                            "Success reported without a zero status code; polling again"
                        );
                    } else {
                        debug!(
                            bundle_id = %status.bundle_id,
                            request_id = %status.request_id,
                            status = %status.status,
                            "Notarization not finished"
                        );
                    }
                    still_pending.push(record);
                }
            }
        }

        Ok(still_pending)
    }

    async fn write_ticket(&self, status: &StatusRecord) -> Result<(), PollingError> {
        let content = match status.log_file_url.as_deref() {
            Some(url) => match self.log_fetcher.fetch(url).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(
                        bundle_id = %status.bundle_id,
                        error = %err,
                        "Could not fetch notarization log; writing empty ticket"
                    );
                    String::new()
                }
            },
            None => {
                warn!(bundle_id = %status.bundle_id, "No log URL; writing empty ticket");
                String::new()
            }
        };

        let ticket = TicketDocument::new(status.bundle_id.clone(), content);
        self.tickets.write(&ticket).await.map_err(|source| PollingError::TicketWrite {
            bundle_id: status.bundle_id.clone(),
            source,
        })?;

        debug!(bundle_id = %ticket.bundle_id, file = %ticket.file_name(), "Ticket written");
        Ok(())
    }

    async fn report_rejection(&self, status: &StatusRecord) {
        let Some(url) = status.log_file_url.as_deref() else {
            return;
        };

        match self.log_fetcher.fetch(url).await {
            Ok(body) => {
                for line in body.lines() {
                    warn!(bundle_id = %status.bundle_id, "notary log: {}", line);
                }
            }
            Err(err) => {
                warn!(bundle_id = %status.bundle_id, error = %err, "Could not fetch rejection log");
            }
        }
    }
}

/// Keep the last record for each bundle id, at the position of its first
/// occurrence.
fn last_record_per_bundle(records: Vec<SubmissionRecord>) -> Vec<SubmissionRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<SubmissionRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.bundle_id) {
            Some(&position) => {
                warn!(
                    bundle_id = %record.bundle_id,
                    replaced_request_id = %unique[position].request_id,
                    request_id = %record.request_id,
                    "Bundle id recorded more than once; polling the latest submission"
                );
                unique[position] = record;
            }
            None => {
                positions.insert(record.bundle_id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

fn count_query_failure(report: &mut BatchReport, bundle_id: &str) {
    *report.query_failures.entry(bundle_id.to_string()).or_insert(0) += 1;
}

async fn pause(
    delay: Duration,
    cancel: &CancellationToken,
    deadline: Option<Deadline>,
) -> Option<Interruption> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Some(Interruption::Cancelled),
        () = deadline_reached(deadline) => Some(expired(deadline)),
        () = tokio::time::sleep(delay) => None,
    }
}

async fn deadline_reached(deadline: Option<Deadline>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.at).await,
        None => std::future::pending().await,
    }
}

fn expired(deadline: Option<Deadline>) -> Interruption {
    Interruption::DeadlineExceeded(deadline.map_or(Duration::ZERO, |d| d.limit))
}

fn interrupted(
    stop: Interruption,
    mut report: BatchReport,
    pending: &[SubmissionRecord],
) -> PollingError {
    report.pending = pending.iter().map(|record| record.bundle_id.clone()).collect();
    report.finished_at = Utc::now();

    match stop {
        Interruption::Cancelled => {
            warn!(pending = report.pending.len(), "Polling cancelled");
            PollingError::Cancelled { report: Box::new(report) }
        }
        Interruption::DeadlineExceeded(deadline) => {
            error!(
                deadline_secs = deadline.as_secs(),
                pending = ?report.pending,
                "Polling deadline exceeded"
            );
            PollingError::DeadlineExceeded { deadline, report: Box::new(report) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_pending(ids: &[&str]) -> BatchReport {
        let mut report = BatchReport::started();
        report.pending = ids.iter().map(ToString::to_string).collect();
        report
    }

    #[test]
    fn deadline_error_lists_pending_ids() {
        let err = PollingError::DeadlineExceeded {
            deadline: Duration::from_secs(60),
            report: Box::new(report_with_pending(&["A.One", "B.Two"])),
        };
        let message = err.to_string();
        assert!(message.contains("60s"));
        assert!(message.contains("A.One, B.Two"));
        assert_eq!(err.partial_report().map(|r| r.pending.len()), Some(2));
    }

    #[test]
    fn domain_errors_carry_no_report() {
        let err = PollingError::from(NotaryError::Config("bad".into()));
        assert!(err.partial_report().is_none());
    }

    #[test]
    fn repeated_bundle_keeps_last_record_in_first_position() {
        let records = vec![
            SubmissionRecord::new("A.One", "r1"),
            SubmissionRecord::new("B.Two", "r2"),
            SubmissionRecord::new("A.One", "r3"),
        ];

        let unique = last_record_per_bundle(records);

        assert_eq!(unique, vec![SubmissionRecord::new("A.One", "r3"), SubmissionRecord::new("B.Two", "r2")]);
    }

    #[test]
    fn interruption_fills_pending_from_records() {
        let pending = vec![SubmissionRecord::new("A.One", "r1"), SubmissionRecord::new("B.Two", "r2")];
        let err = interrupted(Interruption::Cancelled, BatchReport::started(), &pending);
        match err {
            PollingError::Cancelled { report } => assert_eq!(report.pending, vec!["A.One", "B.Two"]),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
}
