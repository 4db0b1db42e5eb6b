use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::{Collapser, ScanReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Scheduled,
    /// A scan was already pending; this trigger folds into it.
    Absorbed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub requested: usize,
    pub absorbed: usize,
    pub completed: usize,
}

/// Runs scans after a delay, keeping at most one scan pending. Timers are
/// fire-and-forget; a redundant scan is harmless because scans are
/// idempotent.
pub struct ScanScheduler {
    collapser: Arc<Collapser>,
    startup_delay: Duration,
    debounce: Duration,
    pending: AtomicBool,
    requested: AtomicUsize,
    absorbed: AtomicUsize,
    completed: AtomicUsize,
    reports: watch::Sender<Option<ScanReport>>,
}

impl ScanScheduler {
    pub fn new(collapser: Arc<Collapser>) -> Arc<Self> {
        let (reports, _) = watch::channel(None);
        Arc::new(Self {
            startup_delay: collapser.settings().startup_delay(),
            debounce: collapser.settings().debounce(),
            collapser,
            pending: AtomicBool::new(false),
            requested: AtomicUsize::new(0),
            absorbed: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            reports,
        })
    }

    /// Gives the host page time to finish its first render.
    pub fn schedule_startup(self: &Arc<Self>) -> ScheduleOutcome {
        self.request(self.startup_delay, "startup")
    }

    pub fn request_scan(self: &Arc<Self>) -> ScheduleOutcome {
        self.request(self.debounce, "mutation")
    }

    fn request(self: &Arc<Self>, delay: Duration, reason: &'static str) -> ScheduleOutcome {
        self.requested.fetch_add(1, Ordering::Relaxed);
        if self.pending.swap(true, Ordering::AcqRel) {
            self.absorbed.fetch_add(1, Ordering::Relaxed);
            trace!(reason, "scan already pending, trigger absorbed");
            return ScheduleOutcome::Absorbed;
        }

        debug!(reason, delay_ms = delay.as_millis() as u64, "scan scheduled");
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.run_pending();
        });
        ScheduleOutcome::Scheduled
    }

    fn run_pending(&self) {
        // Cleared first: anything observed from here on needs a new scan.
        self.pending.store(false, Ordering::Release);
        let report = self.collapser.scan();
        let scan = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            scan,
            candidates = report.candidates,
            wrapped = report.wrapped,
            skipped = report.skipped,
            "scan completed"
        );
        self.reports.send_replace(Some(report));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            requested: self.requested.load(Ordering::Relaxed),
            absorbed: self.absorbed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }

    /// Latest scan report; `None` until the first scan finishes.
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<ScanReport>> {
        self.reports.subscribe()
    }

    pub fn collapser(&self) -> &Arc<Collapser> {
        &self.collapser
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
