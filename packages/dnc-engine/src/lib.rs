//! Sequential batch-check engine for DNC phone lookups.
//!
//! One number at a time, a fixed delay between items, and everything
//! observable while it runs:
//!
//! ```text
//!  raw text ──> PhoneQueue ──> Engine ──────> ResultStore ──> projection
//!                             (run loop)          │
//!                              │   │   │          └── RunTotals (derived)
//!                    PhoneLookup   │   RunLog (ring buffer)
//!                      │           │
//!              USPeopleSearch   SnapshotStore (one JSON slot)
//! ```
//!
//! The [`engine::Engine`] owns all run state and honors pause, resume,
//! cancel, and skip. Lookup failures become failed records, never stopped
//! runs. A session snapshot is written periodically and on completion, and
//! restoring it always lands in `Idle`.
//!
//! # Guarantees
//!
//! - The queue holds each number once, in first-seen order.
//! - One outstanding lookup at a time, one record per processed number.
//! - Counters are recomputed from records on demand; they cannot drift.
//! - Snapshot loading never fails; corrupt slots read as empty.

pub mod audit;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod phone;
pub mod projection;
pub mod queue;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod testing;

pub use audit::{LogEntry, RunLog, Severity};
pub use engine::{
    Engine, EngineBuilder, EngineConfig, EngineEvent, EngineStatus, RunState,
    DEFAULT_ITEM_DELAY, DEFAULT_SNAPSHOT_EVERY,
};
pub use error::EngineError;
pub use lookup::{CheckOptions, PeopleSearchLookup, PhoneLookup};
pub use phone::{PhoneNumber, PhoneParseError};
pub use projection::{ResultPage, DEFAULT_PAGE_SIZE};
pub use queue::PhoneQueue;
pub use record::{CheckRecord, DncStatus, RunTotals};
pub use snapshot::{JsonFileStore, Snapshot, SnapshotError, SnapshotStore};
pub use store::ResultStore;
