//! The processing controller: one state machine, one item at a time.
//!
//! ```text
//!            start                 pause
//!   Idle ----------> Running <------------> Paused
//!    ^                  |   \                  |
//!    |         queue    |    \    cancel       |
//!    | re-start  ends   |     +----------------+---> Cancelled
//!    |                  v
//!    +============ Completed
//! ```
//!
//! The run loop is a single spawned task. Per item it performs exactly two
//! suspensions: the lookup round-trip and the fixed inter-item delay. Both
//! are cancellable; pause takes effect at item boundaries and never preempts
//! an in-flight lookup; skip does, and is the recovery path for a stuck
//! number.
//!
//! # Guarantees
//!
//! - At most one outstanding lookup at any time.
//! - One record per processed number, appended in processing order.
//! - The inter-item delay is enforced per item, including after failures
//!   and skips.
//! - Lookup failures never halt the loop; cancel and queue exhaustion are
//!   the only exits.
//! - Counters are always recomputed from the record sequence, never stored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::RunLog;
use crate::error::EngineError;
use crate::lookup::{CheckOptions, PhoneLookup};
use crate::phone::PhoneNumber;
use crate::projection::{self, ResultPage};
use crate::queue::PhoneQueue;
use crate::record::{CheckRecord, RunTotals};
use crate::snapshot::{JsonFileStore, Snapshot, SnapshotStore};
use crate::store::ResultStore;

/// Fixed wait between items. A deliberate rate limit on the relay.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(1000);

/// How often the periodic snapshot writer fires while a run is active.
pub const DEFAULT_SNAPSHOT_EVERY: Duration = Duration::from_secs(30);

/// Buffered events per subscriber before lagging.
const EVENT_CAPACITY: usize = 256;

// =============================================================================
// Run State
// =============================================================================

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl RunState {
    /// Whether a run loop currently owns the cursor.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Cancelled => "cancelled",
            RunState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Configuration, Events, Status
// =============================================================================

/// Tuning for a run. The defaults are the production values.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub item_delay: Duration,
    pub snapshot_every: Duration,
    pub options: CheckOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            item_delay: DEFAULT_ITEM_DELAY,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
            options: CheckOptions::default(),
        }
    }
}

/// Events published while the engine works. Subscribers get clones.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    RunStarted { run_id: Uuid, queued: usize },
    ItemStarted { index: usize, phone: PhoneNumber },
    ItemFinished { index: usize, record: CheckRecord },
    ItemSkipped { index: usize, phone: PhoneNumber },
    Paused,
    Resumed,
    Cancelled,
    Completed { totals: RunTotals, elapsed: Duration },
    SnapshotSaved { records: usize },
}

/// A cheap, cloneable view of where the run stands.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub state: RunState,
    /// Index of the next queue entry the loop will take.
    pub cursor: usize,
    pub queued: usize,
    pub skipped: usize,
    pub totals: RunTotals,
    pub elapsed: Duration,
    /// The number currently being processed, while a run is active.
    pub current: Option<PhoneNumber>,
    /// True once results exist and no run is touching them.
    pub export_ready: bool,
}

impl EngineStatus {
    pub fn percent(&self) -> f64 {
        if self.queued == 0 {
            0.0
        } else {
            self.cursor as f64 * 100.0 / self.queued as f64
        }
    }

    pub fn remaining(&self) -> usize {
        self.queued.saturating_sub(self.cursor)
    }

    /// Average checks per minute so far.
    pub fn per_minute(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.totals.processed as f64 * 60.0 / secs
        }
    }

    /// Rough time to finish at the observed rate.
    pub fn eta(&self) -> Option<Duration> {
        if self.totals.processed == 0 || self.remaining() == 0 {
            return None;
        }
        let per_item = self.elapsed.as_secs_f64() / self.totals.processed as f64;
        Some(Duration::from_secs_f64(per_item * self.remaining() as f64))
    }
}

// =============================================================================
// Engine
// =============================================================================

struct EngineCore {
    state: RunState,
    queue: PhoneQueue,
    cursor: usize,
    skipped: usize,
    results: ResultStore,
    started_at: Option<Instant>,
    finished_in: Option<Duration>,
    run_token: CancellationToken,
}

impl EngineCore {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            queue: PhoneQueue::new(),
            cursor: 0,
            skipped: 0,
            results: ResultStore::new(),
            started_at: None,
            finished_in: None,
            run_token: CancellationToken::new(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.finished_in
            .or_else(|| self.started_at.map(|t| t.elapsed()))
            .unwrap_or_default()
    }

    fn status(&self) -> EngineStatus {
        let state = self.state;
        EngineStatus {
            state,
            cursor: self.cursor,
            queued: self.queue.len(),
            skipped: self.skipped,
            totals: self.results.totals(self.queue.len()),
            elapsed: self.elapsed(),
            current: if state.is_active() {
                self.queue.get(self.cursor).cloned()
            } else {
                None
            },
            export_ready: !self.results.is_empty() && !state.is_active(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.queue.to_vec(), self.results.records().to_vec())
    }
}

struct Inner {
    core: Mutex<EngineCore>,
    log: RunLog,
    lookup: Arc<dyn PhoneLookup>,
    snapshots: Arc<dyn SnapshotStore>,
    config: EngineConfig,
    events: broadcast::Sender<EngineEvent>,
    paused: AtomicBool,
    resume: Notify,
    /// One-permit latch: a pending skip stays stored until the loop
    /// consumes it at the next opportunity.
    skip: Notify,
}

impl Inner {
    /// Acquire the core lock, recovering from poison if necessary.
    fn core(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

/// The batch-check engine. Clones share the same run.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Create a new engine builder around a lookup implementation.
    pub fn builder(lookup: Arc<dyn PhoneLookup>) -> EngineBuilder {
        EngineBuilder::new(lookup)
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Current status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.inner.core().status()
    }

    /// The operational run log.
    pub fn log(&self) -> &RunLog {
        &self.inner.log
    }

    /// Owned copy of every record so far, in processing order.
    pub fn records(&self) -> Vec<CheckRecord> {
        self.inner.core().results.records().to_vec()
    }

    /// Search and paginate the records for display.
    pub fn view(&self, query: Option<&str>, page: usize, page_size: usize) -> ResultPage {
        let core = self.inner.core();
        projection::project(core.results.records(), query, page, page_size)
    }

    /// Whether the lookup service currently answers.
    pub async fn probe(&self) -> bool {
        self.inner.lookup.probe().await
    }

    /// Replace the identifier queue. Refused while a run is active.
    pub fn load_queue(&self, queue: PhoneQueue) -> Result<usize, EngineError> {
        let mut core = self.inner.core();
        if core.state.is_active() {
            return Err(EngineError::RunActive { state: core.state });
        }
        let count = queue.len();
        core.queue = queue;
        core.cursor = 0;
        drop(core);
        self.inner.log.info(format!("Loaded {count} numbers"));
        info!(count, "queue loaded");
        Ok(count)
    }

    /// Rehydrate queue and results from the snapshot store.
    ///
    /// Always lands in `Idle` with the cursor reset; processing state is
    /// never part of a snapshot. Returns `(queued, records)` counts.
    pub async fn restore(&self) -> Result<(usize, usize), EngineError> {
        {
            let core = self.inner.core();
            if core.state.is_active() {
                return Err(EngineError::RunActive { state: core.state });
            }
        }
        let snapshot = self.inner.snapshots.load().await;
        let queued = snapshot.identifiers.len();
        let records = snapshot.results.len();

        let mut core = self.inner.core();
        if core.state.is_active() {
            return Err(EngineError::RunActive { state: core.state });
        }
        core.queue = PhoneQueue::from_numbers(snapshot.identifiers);
        core.results.replace(snapshot.results);
        core.state = RunState::Idle;
        core.cursor = 0;
        core.skipped = 0;
        core.started_at = None;
        core.finished_in = None;
        drop(core);

        if queued > 0 || records > 0 {
            self.inner
                .log
                .info(format!("Session restored: {queued} queued, {records} results"));
            info!(queued, records, "session restored from snapshot");
        }
        Ok((queued, records))
    }

    /// Start a run over the loaded queue.
    ///
    /// Resets the cursor, the counters, and the result store, then spawns
    /// the run loop and the periodic snapshot writer. A no-op while a run
    /// is already active; an error when the queue is empty.
    pub fn start(&self) -> Result<(), EngineError> {
        let run_id = Uuid::new_v4();
        let (token, queued) = {
            let mut core = self.inner.core();
            if core.state.is_active() {
                warn!("start requested while a run is active");
                return Ok(());
            }
            if core.queue.is_empty() {
                return Err(EngineError::EmptyQueue);
            }
            core.results.clear();
            core.cursor = 0;
            core.skipped = 0;
            core.state = RunState::Running;
            core.started_at = Some(Instant::now());
            core.finished_in = None;
            core.run_token = CancellationToken::new();
            (core.run_token.clone(), core.queue.len())
        };

        self.inner.paused.store(false, Ordering::SeqCst);
        // Drop any skip latched after the previous run ended.
        self.inner.skip.notified().now_or_never();

        self.inner.log.info(format!("Starting check of {queued} numbers"));
        info!(run_id = %run_id, queued, "run started");
        self.inner.publish(EngineEvent::RunStarted { run_id, queued });

        tokio::spawn(run_loop(self.inner.clone(), run_id, token.clone()));
        tokio::spawn(snapshot_loop(self.inner.clone(), token));
        Ok(())
    }

    /// Hold the loop at the next item boundary. No-op unless running.
    pub fn pause(&self) {
        let mut core = self.inner.core();
        if core.state != RunState::Running {
            return;
        }
        core.state = RunState::Paused;
        drop(core);
        self.inner.paused.store(true, Ordering::SeqCst);
        self.inner.log.warning("Processing paused");
        info!("run paused");
        self.inner.publish(EngineEvent::Paused);
    }

    /// Resume a paused run at the current cursor.
    pub fn resume(&self) {
        let mut core = self.inner.core();
        if core.state != RunState::Paused {
            return;
        }
        core.state = RunState::Running;
        drop(core);
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.resume.notify_one();
        self.inner.log.info("Processing resumed");
        info!("run resumed");
        self.inner.publish(EngineEvent::Resumed);
    }

    /// Skip the current number without recording an outcome.
    ///
    /// Latches until the loop can honor it; an in-flight lookup for the
    /// current number is abandoned. At most one skip is held at a time.
    pub fn skip(&self) {
        if !self.inner.core().state.is_active() {
            return;
        }
        self.inner.skip.notify_one();
    }

    /// Cancel the run. Requires `confirmed = true`; idempotent otherwise.
    ///
    /// The cursor stays where it was so the queue position is visible
    /// afterwards; no further records are appended.
    pub fn cancel(&self, confirmed: bool) -> Result<(), EngineError> {
        if !confirmed {
            return Err(EngineError::ConfirmationRequired {
                operation: "cancel",
            });
        }
        let token = {
            let mut core = self.inner.core();
            if !core.state.is_active() {
                return Ok(());
            }
            core.state = RunState::Cancelled;
            core.finished_in = Some(core.elapsed());
            core.run_token.clone()
        };
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.log.warning("Processing cancelled");
        warn!("run cancelled");
        self.inner.publish(EngineEvent::Cancelled);
        token.cancel();
        Ok(())
    }

    /// Clear results, queue, and the persisted snapshot slot.
    ///
    /// Requires `confirmed = true` and refuses while a run is active.
    pub async fn clear_results(&self, confirmed: bool) -> Result<(), EngineError> {
        if !confirmed {
            return Err(EngineError::ConfirmationRequired { operation: "clear" });
        }
        {
            let mut core = self.inner.core();
            if core.state.is_active() {
                return Err(EngineError::RunActive { state: core.state });
            }
            core.results.clear();
            core.queue = PhoneQueue::new();
            core.cursor = 0;
            core.skipped = 0;
            core.state = RunState::Idle;
            core.started_at = None;
            core.finished_in = None;
        }
        if let Err(e) = self.inner.snapshots.clear().await {
            warn!("failed to clear snapshot slot: {}", e);
        }
        self.inner.log.info("Results cleared");
        info!("results cleared");
        Ok(())
    }

    /// Clear the run log. Independent of results.
    pub fn clear_log(&self) {
        self.inner.log.clear();
    }
}

// =============================================================================
// Engine Builder
// =============================================================================

/// Builder for an [`Engine`].
///
/// The lookup implementation is required up front; the snapshot store
/// defaults to the JSON file in the platform data directory.
pub struct EngineBuilder {
    lookup: Arc<dyn PhoneLookup>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new(lookup: Arc<dyn PhoneLookup>) -> Self {
        Self {
            lookup,
            snapshots: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.config.item_delay = delay;
        self
    }

    pub fn with_snapshot_every(mut self, every: Duration) -> Self {
        self.config.snapshot_every = every;
        self
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn build(self) -> Engine {
        let snapshots = self
            .snapshots
            .unwrap_or_else(|| Arc::new(JsonFileStore::at_default_location()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Engine {
            inner: Arc::new(Inner {
                core: Mutex::new(EngineCore::new()),
                log: RunLog::new(),
                lookup: self.lookup,
                snapshots,
                config: self.config,
                events,
                paused: AtomicBool::new(false),
                resume: Notify::new(),
                skip: Notify::new(),
            }),
        }
    }
}

// =============================================================================
// Run Loop
// =============================================================================

/// What the run loop found at the cursor, resolved under the core lock.
enum NextItem {
    Ready(usize, PhoneNumber),
    Exhausted,
    Cancelled,
}

async fn run_loop(inner: Arc<Inner>, run_id: Uuid, token: CancellationToken) {
    loop {
        // Park at the item boundary while paused.
        while inner.paused.load(Ordering::SeqCst) {
            tokio::select! {
                _ = inner.resume.notified() => {}
                _ = token.cancelled() => {
                    debug!(run_id = %run_id, "run loop stopped while paused");
                    return persist_cancelled(&inner, run_id).await;
                }
            }
        }

        // Pick the next number, or finish. Resolved under the lock as a
        // plain value; a guard still in scope at the awaits below would make
        // this future non-Send.
        let next = {
            let core = inner.core();
            if core.state == RunState::Cancelled {
                NextItem::Cancelled
            } else {
                match core.queue.get(core.cursor) {
                    Some(phone) => NextItem::Ready(core.cursor, phone.clone()),
                    None => NextItem::Exhausted,
                }
            }
        };
        let (index, phone) = match next {
            NextItem::Ready(index, phone) => (index, phone),
            NextItem::Exhausted => return complete_run(&inner, run_id, &token).await,
            NextItem::Cancelled => return persist_cancelled(&inner, run_id).await,
        };

        // A skip latched before this item starts takes it out immediately.
        if inner.skip.notified().now_or_never().is_some() {
            skip_item(&inner, index, &phone);
        } else {
            inner.publish(EngineEvent::ItemStarted {
                index,
                phone: phone.clone(),
            });
            debug!(run_id = %run_id, phone = %phone, index, "checking number");

            let outcome = tokio::select! {
                record = inner.lookup.check(&phone, inner.config.options) => Some(record),
                _ = inner.skip.notified() => None,
                _ = token.cancelled() => {
                    debug!(run_id = %run_id, "run loop stopped mid-lookup");
                    return persist_cancelled(&inner, run_id).await;
                }
            };

            match outcome {
                Some(record) => {
                    {
                        let mut core = inner.core();
                        core.results.append(record.clone());
                        core.cursor += 1;
                    }
                    if record.failed {
                        inner
                            .log
                            .error(format!("Check failed for {}", phone.formatted()));
                    } else {
                        inner.log.success(format!(
                            "Checked {}: DNC {}",
                            phone.formatted(),
                            record.dnc_status
                        ));
                    }
                    inner.publish(EngineEvent::ItemFinished { index, record });
                }
                None => skip_item(&inner, index, &phone),
            }
        }

        // The fixed inter-item delay, enforced after every item.
        tokio::select! {
            _ = tokio::time::sleep(inner.config.item_delay) => {}
            _ = token.cancelled() => {
                debug!(run_id = %run_id, "run loop stopped during delay");
                return persist_cancelled(&inner, run_id).await;
            }
        }
    }
}

/// Write a last snapshot when a run is cancelled, so everything checked
/// before the stop survives a process exit.
///
/// Skipped when the results were already cleared, or when the state moved
/// past `Cancelled` before this ran.
async fn persist_cancelled(inner: &Inner, run_id: Uuid) {
    let snapshot = {
        let core = inner.core();
        if core.state != RunState::Cancelled || core.results.is_empty() {
            return;
        }
        core.snapshot()
    };
    match inner.snapshots.save(&snapshot).await {
        Ok(()) => inner.publish(EngineEvent::SnapshotSaved {
            records: snapshot.results.len(),
        }),
        Err(e) => warn!(run_id = %run_id, "cancel snapshot failed: {}", e),
    }
}

fn skip_item(inner: &Inner, index: usize, phone: &PhoneNumber) {
    {
        let mut core = inner.core();
        core.cursor += 1;
        core.skipped += 1;
    }
    inner.log.warning(format!("Skipped {}", phone.formatted()));
    info!(phone = %phone, index, "number skipped");
    inner.publish(EngineEvent::ItemSkipped {
        index,
        phone: phone.clone(),
    });
}

async fn complete_run(inner: &Inner, run_id: Uuid, token: &CancellationToken) {
    let (totals, elapsed, snapshot) = {
        let mut core = inner.core();
        core.state = RunState::Completed;
        core.finished_in = Some(core.elapsed());
        (
            core.results.totals(core.queue.len()),
            core.elapsed(),
            core.snapshot(),
        )
    };

    inner.log.success(format!(
        "Processing complete: {} checked, {} flagged DNC, {} failed in {:.1}s",
        totals.processed,
        totals.flagged_dnc,
        totals.failed,
        elapsed.as_secs_f64()
    ));
    info!(
        run_id = %run_id,
        processed = totals.processed,
        flagged = totals.flagged_dnc,
        failed = totals.failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "run complete"
    );
    inner.publish(EngineEvent::Completed { totals, elapsed });

    match inner.snapshots.save(&snapshot).await {
        Ok(()) => inner.publish(EngineEvent::SnapshotSaved {
            records: snapshot.results.len(),
        }),
        Err(e) => warn!("final snapshot failed: {}", e),
    }

    // Reap the periodic snapshot writer.
    token.cancel();
}

async fn snapshot_loop(inner: Arc<Inner>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.snapshot_every);
    ticker.tick().await; // First tick completes immediately
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let snapshot = {
            let core = inner.core();
            if core.results.is_empty() {
                continue;
            }
            core.snapshot()
        };
        match inner.snapshots.save(&snapshot).await {
            Ok(()) => {
                debug!(records = snapshot.results.len(), "periodic snapshot saved");
                inner.publish(EngineEvent::SnapshotSaved {
                    records: snapshot.results.len(),
                });
            }
            Err(e) => warn!("periodic snapshot failed: {}", e),
        }
    }
}
