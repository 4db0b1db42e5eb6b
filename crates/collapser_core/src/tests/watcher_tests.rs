use super::*;
use dom::SharedDocument;
use shared::{
    domain::{NodeId, NodeKind},
    protocol::{MutationRecord, NodeRef},
};

use crate::{test_support::chat_page, Collapser, Settings};

fn scheduler() -> Arc<ScanScheduler> {
    let collapser = Collapser::new(SharedDocument::new(chat_page().doc), Settings::default())
        .expect("collapser");
    ScanScheduler::new(Arc::new(collapser))
}

fn record(kind: NodeKind) -> MutationRecord {
    MutationRecord::added(NodeId(1), NodeRef { id: NodeId(2), kind })
}

async fn yield_to_watcher() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn only_element_insertions_request_scans() {
    let (sender, receiver) = broadcast::channel(8);
    let scheduler = scheduler();
    let watcher = MutationWatcher::spawn(receiver, Arc::clone(&scheduler));

    sender
        .send(MutationBatch::new(vec![record(NodeKind::Text)]))
        .expect("send");
    yield_to_watcher().await;
    assert_eq!(scheduler.stats().requested, 0);

    sender
        .send(MutationBatch::new(vec![
            record(NodeKind::Text),
            record(NodeKind::Element),
        ]))
        .expect("send");
    yield_to_watcher().await;
    assert_eq!(scheduler.stats().requested, 1);
    assert!(scheduler.is_pending());

    watcher.stop();
}

#[tokio::test(start_paused = true)]
async fn lagging_behind_still_requests_a_scan() {
    let (sender, receiver) = broadcast::channel(1);
    let scheduler = scheduler();

    // Overflow the channel before the watcher gets to run.
    for _ in 0..3 {
        sender
            .send(MutationBatch::new(vec![record(NodeKind::Text)]))
            .expect("send");
    }
    let watcher = MutationWatcher::spawn(receiver, Arc::clone(&scheduler));
    yield_to_watcher().await;

    assert_eq!(scheduler.stats().requested, 1);
    watcher.stop();
}

#[tokio::test(start_paused = true)]
async fn stops_when_the_document_goes_away() {
    let (sender, receiver) = broadcast::channel(8);
    let watcher = MutationWatcher::spawn(receiver, scheduler());

    drop(sender);
    yield_to_watcher().await;
    assert!(watcher.is_finished());
}
