//! Durable session snapshots.
//!
//! One slot, last write wins. The snapshot carries the identifier queue and
//! the result sequence; processing state is deliberately not persisted, so a
//! restored session always comes back `Idle`. Loading never fails: a missing
//! or unreadable slot reads as an empty snapshot and the session simply
//! starts fresh.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::phone::PhoneNumber;
use crate::record::CheckRecord;

/// The persisted artifact: queue + results + when it was written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub identifiers: Vec<PhoneNumber>,
    pub results: Vec<CheckRecord>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(identifiers: Vec<PhoneNumber>, results: Vec<CheckRecord>) -> Self {
        Self {
            identifiers,
            results,
            saved_at: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.results.is_empty()
    }
}

/// Errors writing or clearing the snapshot slot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where snapshots live.
///
/// `load` is infallible by contract: corrupt or missing data comes back as
/// an empty snapshot rather than an error, so the restore path can never
/// crash a session.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist, replacing any earlier snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// The last saved snapshot, or an empty one.
    async fn load(&self) -> Snapshot;

    /// Remove the slot entirely.
    async fn clear(&self) -> Result<(), SnapshotError>;
}

/// Snapshot slot backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The fixed per-user location: `<data dir>/dnc-check/session.json`.
    pub fn at_default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("dnc-check").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, body).await?;
        debug!(path = %self.path.display(), records = snapshot.results.len(), "snapshot written");
        Ok(())
    }

    async fn load(&self) -> Snapshot {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::default(),
            Err(e) => {
                warn!(path = %self.path.display(), "snapshot unreadable, starting empty: {}", e);
                return Snapshot::default();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), "snapshot corrupt, starting empty: {}", e);
                Snapshot::default()
            }
        }
    }

    async fn clear(&self) -> Result<(), SnapshotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
