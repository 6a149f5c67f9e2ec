//! Shared test helpers for `notaryflow-core` integration tests.
//!
//! In-memory implementations of the core ports plus builders for status
//! records, so engine and service tests can focus on behaviour.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notaryflow_core::{ExternalToolRunner, LogFetcher, StatusQuery, SubmissionLedger, TicketStore};
use notaryflow_domain::{
    NotarizationStatus, NotaryError, PollingConfig, Result as DomainResult, StatusRecord,
    SubmissionRecord, TicketDocument, ToolOutput,
};
use parking_lot::Mutex;

pub const LOG_URL_BASE: &str = "https://osxapps-ssl.example.com/log";

pub fn log_url(bundle_id: &str) -> String {
    format!("{LOG_URL_BASE}/{bundle_id}.json")
}

pub fn success(bundle_id: &str, request_id: &str) -> StatusRecord {
    StatusRecord {
        bundle_id: bundle_id.into(),
        request_id: request_id.into(),
        status: NotarizationStatus::Success,
        status_code: Some(0),
        log_file_url: Some(log_url(bundle_id)),
        status_message: Some("Package Approved".into()),
    }
}

pub fn in_progress(bundle_id: &str, request_id: &str) -> StatusRecord {
    StatusRecord {
        bundle_id: bundle_id.into(),
        request_id: request_id.into(),
        status: NotarizationStatus::Pending,
        ..Default::default()
    }
}

pub fn invalid(bundle_id: &str, request_id: &str) -> StatusRecord {
    StatusRecord {
        bundle_id: bundle_id.into(),
        request_id: request_id.into(),
        status: NotarizationStatus::Invalid,
        status_code: Some(2),
        log_file_url: Some(log_url(bundle_id)),
        status_message: Some("Package Invalid".into()),
    }
}

/// Polling config with the production jitter/retry delays; tests run with
/// paused time so the delays cost nothing.
pub fn polling_config(max_in_flight: usize) -> PollingConfig {
    PollingConfig { max_in_flight, ..PollingConfig::default() }
}

/// `StatusQuery` that replays a script of answers per bundle id.
///
/// The last scripted answer repeats once the script runs out. Unscripted
/// bundle ids answer `in progress`.
#[derive(Default)]
pub struct ScriptedStatusQuery {
    scripts: Mutex<HashMap<String, VecDeque<DomainResult<StatusRecord>>>>,
    calls: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<(String, String)>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStatusQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each query sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency: Some(latency), ..Self::default() }
    }

    pub fn script(self, bundle_id: &str, answers: Vec<DomainResult<StatusRecord>>) -> Self {
        self.scripts.lock().insert(bundle_id.to_string(), answers.into());
        self
    }

    pub fn calls_for(&self, bundle_id: &str) -> usize {
        self.calls.lock().get(bundle_id).copied().unwrap_or(0)
    }

    /// Request ids queried for `bundle_id`, in call order.
    pub fn requests_for(&self, bundle_id: &str) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|(bundle, _)| bundle == bundle_id)
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of queries observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusQuery for ScriptedStatusQuery {
    async fn query(&self, bundle_id: &str, request_id: &str) -> DomainResult<StatusRecord> {
        *self.calls.lock().entry(bundle_id.to_string()).or_insert(0) += 1;
        self.requests.lock().push((bundle_id.to_string(), request_id.to_string()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let answer = {
            let mut scripts = self.scripts.lock();
            match scripts.get_mut(bundle_id) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer.unwrap_or_else(|| Ok(in_progress(bundle_id, request_id)))
    }
}

/// `LogFetcher` serving fixed bodies by URL; unknown URLs fail.
#[derive(Default)]
pub struct StaticLogFetcher {
    bodies: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl StaticLogFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl LogFetcher for StaticLogFetcher {
    async fn fetch(&self, url: &str) -> DomainResult<String> {
        self.fetched.lock().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| NotaryError::Network(format!("404 Not Found: {url}")))
    }
}

/// `TicketStore` keeping documents in memory.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<Vec<TicketDocument>>,
    fail_writes: bool,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub fn tickets(&self) -> Vec<TicketDocument> {
        self.tickets.lock().clone()
    }

    pub fn ticket(&self, bundle_id: &str) -> Option<TicketDocument> {
        self.tickets.lock().iter().find(|t| t.bundle_id == bundle_id).cloned()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn write(&self, ticket: &TicketDocument) -> DomainResult<()> {
        if self.fail_writes {
            return Err(NotaryError::Io(format!("read-only file system: {}", ticket.file_name())));
        }
        self.tickets.lock().push(ticket.clone());
        Ok(())
    }
}

/// `SubmissionLedger` backed by a vector.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl MemoryLedger {
    pub fn with_records(records: Vec<SubmissionRecord>) -> Self {
        Self { records: Mutex::new(records) }
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl SubmissionLedger for MemoryLedger {
    async fn append(&self, record: &SubmissionRecord) -> DomainResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn load_all(&self) -> DomainResult<Vec<SubmissionRecord>> {
        Ok(self.records.lock().clone())
    }

    async fn persist_all(&self, records: &[SubmissionRecord]) -> DomainResult<()> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}

/// `ExternalToolRunner` answering from canned outputs.
///
/// A rule matches when the argument list contains its needle; the rule's
/// outputs are replayed in order with the last one repeating. Unmatched
/// invocations exit 0 with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, VecDeque<DomainResult<ToolOutput>>)>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, outputs: Vec<DomainResult<ToolOutput>>) -> Self {
        self.rules.lock().push((needle.to_string(), outputs.into()));
        self
    }

    pub fn on_stdout(self, needle: &str, stdout: &str) -> Self {
        self.on(needle, vec![Ok(stdout_output(stdout))])
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls.lock().iter().filter(|(p, _)| p == program).map(|(_, a)| a.clone()).collect()
    }
}

pub fn stdout_output(stdout: &str) -> ToolOutput {
    ToolOutput { exit_code: Some(0), stdout: stdout.into(), stderr: String::new() }
}

pub fn failed_output(exit_code: i32, stderr: &str) -> ToolOutput {
    ToolOutput { exit_code: Some(exit_code), stdout: String::new(), stderr: stderr.into() }
}

#[async_trait]
impl ExternalToolRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _working_dir: Option<&Path>,
    ) -> DomainResult<ToolOutput> {
        self.calls.lock().push((program.to_string(), args.to_vec()));

        let mut rules = self.rules.lock();
        let rule = rules.iter_mut().find(|(needle, _)| args.iter().any(|arg| arg == needle));

        match rule {
            Some((_, outputs)) if outputs.len() > 1 => {
                outputs.pop_front().unwrap_or_else(|| Ok(stdout_output("")))
            }
            Some((_, outputs)) => outputs.front().cloned().unwrap_or_else(|| Ok(stdout_output(""))),
            None => Ok(stdout_output("")),
        }
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
