// backend/steamid_core/src/stats.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::outcome::Outcome;

/// How many failures the counters remember.
pub const RECENT_ERRORS_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    pub error: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

/// Aggregate state of a run. Only the driver mutates it; everyone else
/// works on clones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub started_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub current_id: Option<String>,
    pub running: bool,
    recent_errors: VecDeque<ErrorRecord>,
}

impl RunCounters {
    /// Resets everything for a run over `total` identifiers.
    pub fn begin(&mut self, total: usize) {
        *self = RunCounters {
            started_at: Some(Utc::now()),
            total,
            running: true,
            ..RunCounters::default()
        };
    }

    pub fn start_item(&mut self, steam_id: &str) {
        self.current_id = Some(steam_id.to_string());
        self.processed += 1;
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { .. } => self.successful += 1,
            Outcome::Failure { steam_id, reason } => {
                self.failed += 1;
                self.push_error(ErrorRecord {
                    steam_id: Some(steam_id.clone()),
                    error: reason.to_string(),
                    timestamp: Utc::now(),
                    fatal: false,
                });
            }
        }
    }

    /// A failure that ended the run before (or instead of) processing.
    pub fn record_fatal(&mut self, error: impl fmt::Display) {
        self.push_error(ErrorRecord {
            steam_id: None,
            error: error.to_string(),
            timestamp: Utc::now(),
            fatal: true,
        });
        self.finish();
    }

    pub fn finish(&mut self) {
        self.running = false;
        self.current_id = None;
    }

    fn push_error(&mut self, record: ErrorRecord) {
        if self.recent_errors.len() >= RECENT_ERRORS_CAPACITY {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(record);
    }

    /// Oldest first.
    pub fn recent_errors(&self) -> impl DoubleEndedIterator<Item = &ErrorRecord> + ExactSizeIterator {
        self.recent_errors.iter()
    }

    /// The last `n` errors, oldest first.
    pub fn latest_errors(&self, n: usize) -> Vec<ErrorRecord> {
        let skip = self.recent_errors.len().saturating_sub(n);
        self.recent_errors.iter().skip(skip).cloned().collect()
    }

    /// `processed / total` as a rounded percentage, 0 before anything is known.
    pub fn progress_percent(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        let processed = self.processed as u64;
        let total = self.total as u64;
        (processed * 100 + total / 2) / total
    }

    pub fn progress_label(&self) -> String {
        if self.total == 0 {
            "0/0".to_string()
        } else {
            format!(
                "{}/{} ({}%)",
                self.processed,
                self.total,
                self.progress_percent()
            )
        }
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub recent_errors: Vec<ErrorRecord>,
}

impl RunSummary {
    pub fn from_counters(counters: &RunCounters, elapsed: Duration) -> Self {
        Self {
            total: counters.total,
            processed: counters.processed,
            successful: counters.successful,
            failed: counters.failed,
            elapsed,
            recent_errors: counters.recent_errors().cloned().collect(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processing Summary:")?;
        writeln!(f, "Successful: {}", self.successful)?;
        writeln!(f, "Failed: {}", self.failed)?;
        write!(f, "Duration: {}ms", self.elapsed.as_millis())?;
        if !self.recent_errors.is_empty() {
            write!(f, "\n\nRecent Errors:")?;
            for record in &self.recent_errors {
                match &record.steam_id {
                    Some(id) => write!(f, "\n  - {}: {}", id, record.error)?,
                    None => write!(f, "\n  - {}", record.error)?,
                }
            }
        }
        Ok(())
    }
}
