use std::sync::Arc;

use shared::protocol::MutationBatch;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

use crate::scheduler::ScanScheduler;

/// Listens to the document's child-list mutation batches and asks the
/// scheduler for a scan whenever a batch inserted an element.
pub struct MutationWatcher {
    task: JoinHandle<()>,
}

impl MutationWatcher {
    pub fn spawn(
        mut mutations: broadcast::Receiver<MutationBatch>,
        scheduler: Arc<ScanScheduler>,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match mutations.recv().await {
                    Ok(batch) if batch.adds_elements() => {
                        trace!(
                            added = batch.added_element_count(),
                            records = batch.records.len(),
                            "elements added"
                        );
                        scheduler.request_scan();
                    }
                    Ok(batch) => {
                        trace!(records = batch.records.len(), "mutation batch ignored");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // The missed batches may have added elements.
                        warn!(skipped, "mutation watcher lagged");
                        scheduler.request_scan();
                    }
                    Err(RecvError::Closed) => {
                        debug!("document gone, mutation watcher stopping");
                        break;
                    }
                }
            }
        });
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/watcher_tests.rs"]
mod tests;
