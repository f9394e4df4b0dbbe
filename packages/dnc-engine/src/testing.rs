//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that drive the engine without
//! making real network calls or touching the filesystem.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::lookup::{self, CheckOptions, PhoneLookup};
use crate::phone::PhoneNumber;
use crate::record::{CheckRecord, DncStatus};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotStore};

/// A scripted lookup for testing.
///
/// Returns deterministic records per number: every number succeeds with
/// `dnc_status = No` unless scripted otherwise. Tracks every call so tests
/// can assert on order and count.
#[derive(Default)]
pub struct MockLookup {
    /// Simulated round-trip time per check.
    latency: Duration,

    /// Numbers whose registry sub-call faults (transport-style failure).
    faulty: Arc<RwLock<HashSet<String>>>,

    /// Numbers reported as DNC-listed.
    listed: Arc<RwLock<HashSet<String>>>,

    /// Person names attached to numbers.
    names: Arc<RwLock<HashMap<String, String>>>,

    /// Digits of every checked number, in call order.
    calls: Arc<RwLock<Vec<String>>>,

    /// Whether the probe reports the service online.
    online: AtomicBool,
}

impl MockLookup {
    /// Mock where every check succeeds instantly.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// Add simulated latency to every check.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script a transport fault for a number.
    pub fn with_fault(self, digits: impl Into<String>) -> Self {
        self.faulty.write().unwrap().insert(digits.into());
        self
    }

    /// Script a DNC-listed verdict for a number.
    pub fn with_listed(self, digits: impl Into<String>) -> Self {
        self.listed.write().unwrap().insert(digits.into());
        self
    }

    /// Attach a person name to a number.
    pub fn with_name(self, digits: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.write().unwrap().insert(digits.into(), name.into());
        self
    }

    /// Control what the probe reports.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Digits checked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl PhoneLookup for MockLookup {
    async fn check(&self, phone: &PhoneNumber, options: CheckOptions) -> CheckRecord {
        self.calls.write().unwrap().push(phone.digits().to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut record = CheckRecord::empty(phone.clone());
        if options.is_noop() {
            return record;
        }

        if options.registry_check {
            if self.faulty.read().unwrap().contains(phone.digits()) {
                lookup::mark_registry_error(&mut record);
                record.failed = true;
                return record;
            }
            record.dnc_status = if self.listed.read().unwrap().contains(phone.digits()) {
                DncStatus::Yes
            } else {
                DncStatus::No
            };
        }

        if options.person_details {
            if let Some(name) = self.names.read().unwrap().get(phone.digits()) {
                record.name = name.clone();
                record.person_status = "Active".to_string();
            }
        }

        record
    }

    async fn probe(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// In-memory snapshot slot with save counting.
#[derive(Default)]
pub struct MemorySnapshots {
    slot: Arc<RwLock<Option<Snapshot>>>,
    saves: AtomicUsize,
}

impl MemorySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the slot, as if a previous session had saved.
    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        *self.slot.write().unwrap() = Some(snapshot);
        self
    }

    /// The current slot contents, if any.
    pub fn saved(&self) -> Option<Snapshot> {
        self.slot.read().unwrap().clone()
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshots {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        *self.slot.write().unwrap() = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Snapshot {
        self.slot.read().unwrap().clone().unwrap_or_default()
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        *self.slot.write().unwrap() = None;
        Ok(())
    }
}
