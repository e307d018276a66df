// backend/steamid_core/src/driver.rs

use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{error, info};

use crate::error::LoadError;
use crate::loader::load_steam_ids;
use crate::notifier::Notify;
use crate::stats::{RunCounters, RunSummary};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Read side of the driver's counters. Cheap to clone; every clone sees the
/// state as of the driver's last completed step.
#[derive(Clone)]
pub struct StatusReader {
    rx: watch::Receiver<RunCounters>,
}

impl StatusReader {
    pub fn snapshot(&self) -> RunCounters {
        self.rx.borrow().clone()
    }
}

impl From<watch::Receiver<RunCounters>> for StatusReader {
    fn from(rx: watch::Receiver<RunCounters>) -> Self {
        Self { rx }
    }
}

/// Walks the identifier list one at a time, pausing between calls.
pub struct Driver<N> {
    notifier: N,
    delay: Duration,
    counters: RunCounters,
    published: watch::Sender<RunCounters>,
}

impl<N: Notify> Driver<N> {
    pub fn new(notifier: N, delay: Duration) -> Self {
        let (published, _) = watch::channel(RunCounters::default());
        Self {
            notifier,
            delay,
            counters: RunCounters::default(),
            published,
        }
    }

    pub fn subscribe(&self) -> StatusReader {
        StatusReader {
            rx: self.published.subscribe(),
        }
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    fn publish(&self) {
        self.published.send_replace(self.counters.clone());
    }

    /// Loads the ID document and processes it. A load failure is recorded as a
    /// fatal error and returned; nothing is sent in that case.
    pub async fn run_file(&mut self, path: &Path) -> Result<RunSummary, LoadError> {
        match load_steam_ids(path).await {
            Ok(ids) => Ok(self.run(ids).await),
            Err(e) => {
                error!("{}", e);
                self.counters.record_fatal(&e);
                self.publish();
                Err(e)
            }
        }
    }

    pub async fn run(&mut self, steam_ids: Vec<String>) -> RunSummary {
        let started = Instant::now();
        let total = steam_ids.len();
        info!("Starting Steam ID processing...");
        self.counters.begin(total);
        self.publish();

        for (idx, steam_id) in steam_ids.iter().enumerate() {
            self.counters.start_item(steam_id);
            self.publish();
            info!("Processing {}/{}: {}", idx + 1, total, steam_id);

            let outcome = self.notifier.notify(steam_id).await;
            self.counters.record(&outcome);
            self.publish();

            if idx + 1 < total {
                sleep(self.delay).await;
            }
        }

        self.counters.finish();
        self.publish();

        let summary = RunSummary::from_counters(&self.counters, started.elapsed());
        info!(
            successful = summary.successful,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Processing complete"
        );
        summary
    }

    /// Freezes the counters when a run is abandoned mid-way (e.g. on shutdown).
    pub fn abort(&mut self) {
        self.counters.finish();
        self.publish();
    }
}
