//! Batch-level polling results

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notarization::StatusRecord;

/// Outcome of driving one batch of submissions to terminal states.
///
/// A report with a non-empty `pending` list is partial: the batch was
/// cancelled or ran out of time before every artifact finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of query waves executed (round 0 included).
    pub waves: u32,
    /// Terminal-success records, in completion order.
    pub notarized: Vec<StatusRecord>,
    /// Terminal-failure (`invalid`) records, in completion order.
    pub rejected: Vec<StatusRecord>,
    /// Bundle ids that never obtained a request id.
    pub submission_failures: Vec<String>,
    /// Bundle ids still without a terminal status.
    pub pending: Vec<String>,
    /// Bundle ids whose ticket document was written.
    pub tickets_written: Vec<String>,
    /// Number of failed status-query invocations per bundle id.
    pub query_failures: BTreeMap<String, u32>,
}

impl BatchReport {
    /// Empty report starting now.
    pub fn started() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            waves: 0,
            notarized: Vec::new(),
            rejected: Vec::new(),
            submission_failures: Vec::new(),
            pending: Vec::new(),
            tickets_written: Vec::new(),
            query_failures: BTreeMap::new(),
        }
    }

    /// Every submitted artifact reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Every artifact was submitted and notarized successfully.
    pub fn all_notarized(&self) -> bool {
        self.is_complete() && self.rejected.is_empty() && self.submission_failures.is_empty()
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} notarized, {} rejected, {} failed to submit, {} pending after {} wave(s)",
            self.notarized.len(),
            self.rejected.len(),
            self.submission_failures.len(),
            self.pending.len(),
            self.waves
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_complete_and_clean() {
        let report = BatchReport::started();
        assert!(report.is_complete());
        assert!(report.all_notarized());
        assert_eq!(report.summary(), "0 notarized, 0 rejected, 0 failed to submit, 0 pending after 0 wave(s)");
    }

    #[test]
    fn pending_or_failures_make_report_partial() {
        let mut report = BatchReport::started();
        report.pending.push("Tableau.Public".into());
        assert!(!report.is_complete());

        let mut report = BatchReport::started();
        report.submission_failures.push("Tableau.Reader".into());
        assert!(report.is_complete());
        assert!(!report.all_notarized());
    }
}
