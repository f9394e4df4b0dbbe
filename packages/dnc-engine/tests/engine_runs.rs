//! Integration tests driving full engine runs with mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use dnc_engine::testing::{MemorySnapshots, MockLookup};
use dnc_engine::{
    CheckOptions, DncStatus, Engine, EngineError, EngineEvent, PhoneNumber, PhoneQueue, RunState,
    RunTotals, Snapshot,
};

fn number(digits: &str) -> PhoneNumber {
    PhoneNumber::parse(digits).unwrap()
}

fn queue_of(numbers: &[&str]) -> PhoneQueue {
    PhoneQueue::from_numbers(numbers.iter().map(|d| number(d)))
}

fn fast_engine(lookup: Arc<MockLookup>, snapshots: Arc<MemorySnapshots>) -> Engine {
    Engine::builder(lookup)
        .with_snapshots(snapshots)
        .with_item_delay(Duration::from_millis(10))
        .with_snapshot_every(Duration::from_secs(60))
        .build()
}

/// Wait for the first event matching the predicate, with a test timeout.
async fn wait_for(
    rx: &mut broadcast::Receiver<EngineEvent>,
    pred: impl Fn(&EngineEvent) -> bool,
) -> EngineEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for engine event")
}

#[tokio::test]
async fn completed_run_records_every_number() {
    let lookup = Arc::new(
        MockLookup::new()
            .with_listed("2125550123")
            .with_name("2125550123", "Jane Doe"),
    );
    let snapshots = Arc::new(MemorySnapshots::new());
    let engine = fast_engine(lookup.clone(), snapshots.clone());
    let mut rx = engine.subscribe();

    engine
        .load_queue(queue_of(&["4045093823", "2125550123", "3125550199"]))
        .unwrap();
    engine.start().unwrap();

    let started = wait_for(&mut rx, |e| matches!(e, EngineEvent::RunStarted { .. })).await;
    if let EngineEvent::RunStarted { queued, .. } = started {
        assert_eq!(queued, 3);
    }

    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let status = engine.status();
    assert_eq!(status.state, RunState::Completed);
    assert!(status.export_ready);
    assert!(status.elapsed > Duration::ZERO);

    let records = engine.records();
    let digits: Vec<&str> = records.iter().map(|r| r.phone.digits()).collect();
    assert_eq!(digits, ["4045093823", "2125550123", "3125550199"]);

    // Unscripted numbers succeed with a clean "not listed, nobody found".
    assert_eq!(records[0].dnc_status, DncStatus::No);
    assert_eq!(records[0].name, "Not Found");
    assert!(!records[0].failed);
    assert_eq!(records[1].dnc_status, DncStatus::Yes);
    assert_eq!(records[1].name, "Jane Doe");

    // Completion wrote the final snapshot.
    let saved = snapshots.saved().expect("final snapshot present");
    assert_eq!(saved.results.len(), 3);
    assert_eq!(saved.identifiers.len(), 3);
    assert!(snapshots.save_count() >= 1);

    assert_eq!(lookup.call_count(), 3);
}

#[tokio::test]
async fn failed_lookup_does_not_halt_the_run() {
    let lookup = Arc::new(MockLookup::new().with_fault("4045093823"));
    let engine = fast_engine(lookup, Arc::new(MemorySnapshots::new()));
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let records = engine.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].failed);
    assert_eq!(records[0].dnc_status, DncStatus::Error);

    let totals = engine.status().totals;
    assert_eq!(totals.processed, 1);
    assert_eq!(totals.failed, 1);
    assert_eq!(totals.succeeded, 0);
}

#[tokio::test]
async fn counters_always_match_an_independent_fold() {
    let lookup = Arc::new(
        MockLookup::new()
            .with_listed("4045093823")
            .with_fault("2125550123")
            .with_name("3125550199", "Carol Smith"),
    );
    let engine = fast_engine(lookup, Arc::new(MemorySnapshots::new()));
    let mut rx = engine.subscribe();

    engine
        .load_queue(queue_of(&["4045093823", "2125550123", "3125550199"]))
        .unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let records = engine.records();
    let expected = RunTotals::tally(3, &records);
    assert_eq!(engine.status().totals, expected);
    assert_eq!(expected.flagged_dnc, 1);
    assert_eq!(expected.failed, 1);
    assert_eq!(expected.with_details, 1);
    // Recomputing is idempotent.
    assert_eq!(RunTotals::tally(3, &records), expected);
}

#[tokio::test]
async fn cancel_during_the_delay_freezes_everything() {
    let lookup = Arc::new(MockLookup::new());
    let engine = Engine::builder(lookup)
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(300))
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();

    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemFinished { index: 0, .. })).await;
    // The loop is now inside the inter-item delay.
    engine.cancel(true).unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Cancelled)).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    let status = engine.status();
    assert_eq!(status.state, RunState::Cancelled);
    assert_eq!(status.cursor, 1);
    assert_eq!(engine.records().len(), 1);
}

#[tokio::test]
async fn cancel_persists_what_was_already_checked() {
    let snapshots = Arc::new(MemorySnapshots::new());
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(snapshots.clone())
        .with_item_delay(Duration::from_millis(300))
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemFinished { index: 0, .. })).await;

    engine.cancel(true).unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::SnapshotSaved { .. })).await;

    let saved = snapshots.saved().expect("cancel snapshot present");
    assert_eq!(saved.results.len(), 1);
    assert_eq!(saved.identifiers.len(), 2);
}

#[tokio::test]
async fn unconfirmed_cancel_changes_nothing() {
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(200))
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemStarted { .. })).await;

    assert!(matches!(
        engine.cancel(false),
        Err(EngineError::ConfirmationRequired { .. })
    ));
    assert!(engine.status().state.is_active());

    engine.cancel(true).unwrap();
    assert_eq!(engine.status().state, RunState::Cancelled);
}

#[tokio::test]
async fn pause_holds_at_the_item_boundary() {
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(100))
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();

    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemFinished { index: 0, .. })).await;
    engine.pause();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Paused)).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = engine.status();
    assert_eq!(status.state, RunState::Paused);
    assert_eq!(status.totals.processed, 1);

    engine.resume();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Resumed)).await;
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;
    assert_eq!(engine.status().totals.processed, 2);
}

#[tokio::test]
async fn skip_abandons_an_inflight_lookup() {
    let lookup = Arc::new(MockLookup::new().with_latency(Duration::from_millis(400)));
    let snapshots = Arc::new(MemorySnapshots::new());
    let engine = fast_engine(lookup.clone(), snapshots);
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();

    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemStarted { index: 0, .. })).await;
    engine.skip();
    let skipped = wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemSkipped { .. })).await;
    if let EngineEvent::ItemSkipped { index, phone } = skipped {
        assert_eq!(index, 0);
        assert_eq!(phone.digits(), "4045093823");
    }

    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let records = engine.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phone.digits(), "2125550123");

    let status = engine.status();
    assert_eq!(status.skipped, 1);
    assert_eq!(records.len(), status.queued - status.skipped);
    // The abandoned number never produced a record, but the call did start.
    assert!(lookup.calls().contains(&"4045093823".to_string()));
}

#[tokio::test]
async fn skip_during_the_delay_takes_out_the_next_item() {
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(200))
        .build();
    let mut rx = engine.subscribe();

    engine
        .load_queue(queue_of(&["4045093823", "2125550123", "3125550199"]))
        .unwrap();
    engine.start().unwrap();

    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemFinished { index: 0, .. })).await;
    // Latched during the delay; consumed at the next item boundary.
    engine.skip();
    let skipped = wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemSkipped { .. })).await;
    if let EngineEvent::ItemSkipped { index, phone } = skipped {
        assert_eq!(index, 1);
        assert_eq!(phone.digits(), "2125550123");
    }

    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;
    let digits: Vec<String> = engine
        .records()
        .iter()
        .map(|r| r.phone.digits().to_string())
        .collect();
    assert_eq!(digits, ["4045093823", "3125550199"]);
}

#[tokio::test]
async fn restored_session_reproduces_records_and_counters() {
    let mut records = Vec::new();
    for digits in ["4045093823", "2125550123", "3125550199"] {
        let mut record = dnc_engine::CheckRecord::empty(number(digits));
        record.dnc_status = DncStatus::No;
        records.push(record);
    }
    let snapshots =
        Arc::new(MemorySnapshots::new().with_snapshot(Snapshot::new(Vec::new(), records.clone())));
    let engine = fast_engine(Arc::new(MockLookup::new()), snapshots);

    let (queued, restored) = engine.restore().await.unwrap();
    assert_eq!(queued, 0);
    assert_eq!(restored, 3);

    let status = engine.status();
    assert_eq!(status.state, RunState::Idle);
    assert_eq!(status.queued, 0);
    assert!(status.export_ready);
    assert_eq!(status.totals, RunTotals::tally(0, &records));
    assert_eq!(engine.records(), records);
}

#[tokio::test]
async fn restarting_resets_results_and_counters() {
    let engine = fast_engine(Arc::new(MockLookup::new()), Arc::new(MemorySnapshots::new()));
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;
    assert_eq!(engine.records().len(), 2);

    engine.start().unwrap();
    assert_eq!(engine.status().state, RunState::Running);
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    // Fresh records, not an accumulation across runs.
    assert_eq!(engine.records().len(), 2);
    assert_eq!(engine.status().totals.processed, 2);
}

#[tokio::test]
async fn periodic_snapshots_fire_while_running() {
    let snapshots = Arc::new(MemorySnapshots::new());
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(snapshots.clone())
        .with_item_delay(Duration::from_millis(30))
        .with_snapshot_every(Duration::from_millis(40))
        .build();
    let mut rx = engine.subscribe();

    engine
        .load_queue(queue_of(&[
            "4045093823",
            "2125550123",
            "3125550199",
            "7735550144",
        ]))
        .unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::SnapshotSaved { .. })).await;
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    // At least one periodic save plus the completion save.
    assert!(snapshots.save_count() >= 2);
    assert_eq!(snapshots.saved().expect("slot populated").results.len(), 4);
}

#[tokio::test]
async fn queue_cannot_be_replaced_mid_run() {
    let engine = Engine::builder(Arc::new(MockLookup::new()))
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(200))
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::ItemStarted { .. })).await;

    assert!(matches!(
        engine.load_queue(queue_of(&["3125550199"])),
        Err(EngineError::RunActive { .. })
    ));
    engine.cancel(true).unwrap();
}

#[tokio::test]
async fn confirmed_clear_wipes_results_and_the_slot() {
    let snapshots = Arc::new(MemorySnapshots::new());
    let engine = fast_engine(Arc::new(MockLookup::new()), snapshots.clone());
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;
    assert!(snapshots.saved().is_some());

    engine.clear_results(true).await.unwrap();
    let status = engine.status();
    assert_eq!(status.state, RunState::Idle);
    assert_eq!(status.queued, 0);
    assert!(engine.records().is_empty());
    assert!(!status.export_ready);
    assert!(snapshots.saved().is_none());
}

#[tokio::test]
async fn flags_off_still_produces_a_record_per_number() {
    let lookup = Arc::new(MockLookup::new());
    let engine = Engine::builder(lookup.clone())
        .with_snapshots(Arc::new(MemorySnapshots::new()))
        .with_item_delay(Duration::from_millis(10))
        .with_options(CheckOptions {
            registry_check: false,
            person_details: false,
        })
        .build();
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let records = engine.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].failed);
    assert_eq!(records[0].dnc_status, DncStatus::Unknown);
    assert_eq!(records[0].name, "Not Found");
}

#[tokio::test]
async fn probe_reflects_service_health() {
    let lookup = Arc::new(MockLookup::new());
    let engine = fast_engine(lookup.clone(), Arc::new(MemorySnapshots::new()));
    assert!(engine.probe().await);
    lookup.set_online(false);
    assert!(!engine.probe().await);
}

#[tokio::test]
async fn run_log_sees_the_whole_story() {
    let engine = fast_engine(
        Arc::new(MockLookup::new().with_fault("2125550123")),
        Arc::new(MemorySnapshots::new()),
    );
    let mut rx = engine.subscribe();

    engine.load_queue(queue_of(&["4045093823", "2125550123"])).unwrap();
    engine.start().unwrap();
    wait_for(&mut rx, |e| matches!(e, EngineEvent::Completed { .. })).await;

    let chronological = engine.log().chronological();
    let messages: Vec<&str> = chronological.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.starts_with("Loaded 2")));
    assert!(messages.iter().any(|m| m.starts_with("Starting check")));
    assert!(messages.iter().any(|m| m.contains("Check failed")));
    assert!(messages.iter().any(|m| m.starts_with("Processing complete")));

    // Newest-first read shows the summary line first.
    let recent = engine.log().recent(1);
    assert!(recent[0].message.starts_with("Processing complete"));

    // Clearing the log leaves results alone.
    engine.clear_log();
    assert!(engine.log().is_empty());
    assert_eq!(engine.records().len(), 2);
}
