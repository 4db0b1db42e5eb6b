//! Makes chat messages on a host page collapsible.
//!
//! The host page owns the document and mutates it whenever it likes. This
//! crate finds message elements heuristically, wraps each one exactly once
//! in a collapse/expand control, and rescans (debounced) whenever the host
//! inserts elements. The document is the only record of what is wrapped, so
//! a scan can run any number of times.

use std::sync::Arc;

use dom::{Document, SharedDocument};
use serde::Serialize;
use tracing::debug;

pub mod augment;
pub mod classifier;
pub mod config;
pub mod global_toggle;
pub mod heuristics;
pub mod scheduler;
pub mod toggle;
pub mod watcher;
pub mod wrapper;

pub use config::{load_settings, Settings, SettingsError};
pub use global_toggle::{Activation, GlobalToggle, Installation};
pub use heuristics::Heuristics;
pub use scheduler::{ScanScheduler, ScheduleOutcome, SchedulerStats};
pub use watcher::MutationWatcher;
pub use wrapper::WrapperSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub candidates: usize,
    pub accepted: usize,
    pub already_wrapped: usize,
    pub too_short: usize,
    pub unstructured: usize,
    pub wrapped: usize,
    /// Accepted but left alone by the transform (vanished or nested).
    pub skipped: usize,
    pub global_toggle: Installation,
    /// Records generated by this scan's own insertions and dropped before
    /// they could trigger another scan.
    pub discarded_records: usize,
}

pub struct Collapser {
    document: SharedDocument,
    settings: Settings,
    heuristics: Heuristics,
    global_toggle: Arc<GlobalToggle>,
}

impl Collapser {
    pub fn new(document: SharedDocument, settings: Settings) -> Result<Self, SettingsError> {
        let heuristics = Heuristics::from_settings(&settings)?;
        Ok(Self {
            document,
            settings,
            heuristics,
            global_toggle: GlobalToggle::new(),
        })
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    pub fn global_toggle(&self) -> &Arc<GlobalToggle> {
        &self.global_toggle
    }

    pub fn scan(&self) -> ScanReport {
        self.document.with(|doc| self.scan_document(doc))
    }

    /// One classify-and-wrap pass over `doc`.
    pub fn scan_document(&self, doc: &mut Document) -> ScanReport {
        let global_toggle = self.global_toggle.ensure_installed(doc);
        let classification = classifier::classify(doc, &self.heuristics);

        let mut wrapped = 0;
        for element in &classification.accepted {
            if augment::augment(doc, *element, &self.heuristics).is_some() {
                wrapped += 1;
            }
        }

        // Host mutations buffered before this scan are already reflected in
        // the tree it just processed; what is left came from the scan itself.
        let discarded_records = doc.take_records().len();

        let report = ScanReport {
            candidates: classification.candidates,
            accepted: classification.accepted.len(),
            already_wrapped: classification.already_wrapped,
            too_short: classification.too_short,
            unstructured: classification.unstructured,
            wrapped,
            skipped: classification.accepted.len() - wrapped,
            global_toggle,
            discarded_records,
        };
        debug!(?report, nodes = doc.node_count(), "scan finished");
        report
    }

    pub fn toggle_all(&self) -> Activation {
        self.document.with(|doc| self.global_toggle.activate(doc))
    }

    pub fn summaries(&self) -> Vec<WrapperSummary> {
        self.document.with(|doc| wrapper::summaries(doc))
    }

    /// Subscribes to document mutations and schedules the deferred startup
    /// scan. Must be called from within a tokio runtime.
    pub fn start(self: Arc<Self>) -> CollapserHandle {
        let mutations = self.document.with(|doc| doc.subscribe());
        let scheduler = ScanScheduler::new(self);
        let watcher = MutationWatcher::spawn(mutations, Arc::clone(&scheduler));
        scheduler.schedule_startup();
        CollapserHandle { scheduler, watcher }
    }
}

pub struct CollapserHandle {
    scheduler: Arc<ScanScheduler>,
    watcher: MutationWatcher,
}

impl CollapserHandle {
    pub fn scheduler(&self) -> &Arc<ScanScheduler> {
        &self.scheduler
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn stop(self) {
        self.watcher.stop();
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
