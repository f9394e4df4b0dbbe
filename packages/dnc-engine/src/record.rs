//! Outcome records and the counters derived from them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phone::PhoneNumber;

/// Sentinel for identity fields the lookup could not populate.
pub const NOT_FOUND: &str = "Not Found";
/// Sentinel for registry and status fields the lookup could not populate.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel written into the fields of a sub-call that faulted.
pub const ERROR_TEXT: &str = "Error";

/// Registry membership verdict for one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DncStatus {
    Yes,
    No,
    #[default]
    Unknown,
    Error,
}

impl DncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DncStatus::Yes => "Yes",
            DncStatus::No => "No",
            DncStatus::Unknown => UNKNOWN,
            DncStatus::Error => ERROR_TEXT,
        }
    }
}

impl fmt::Display for DncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed identifier's outcome.
///
/// Exactly one record exists per processed number, in processing order.
/// A record with `failed == true` still carries well-defined field values:
/// whatever was determined before the fault, the `Error` sentinel for the
/// faulted sub-call, and documented defaults for anything never attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub phone: PhoneNumber,
    pub dnc_status: DncStatus,
    pub ndnc: String,
    pub sdnc: String,
    pub region: String,
    pub name: String,
    pub address: String,
    pub person_status: String,
    pub failed: bool,
    pub checked_at: DateTime<Utc>,
}

impl CheckRecord {
    /// All-default record: nothing requested, nothing found, not failed.
    pub fn empty(phone: PhoneNumber) -> Self {
        Self {
            phone,
            dnc_status: DncStatus::Unknown,
            ndnc: UNKNOWN.to_string(),
            sdnc: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            name: NOT_FOUND.to_string(),
            address: NOT_FOUND.to_string(),
            person_status: UNKNOWN.to_string(),
            failed: false,
            checked_at: Utc::now(),
        }
    }

    /// Whether the details sub-call actually identified a person.
    pub fn has_details(&self) -> bool {
        self.name != NOT_FOUND && self.name != ERROR_TEXT
    }
}

/// Counters derived from a record sequence. Always recomputable; never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub queued: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub flagged_dnc: usize,
    pub with_details: usize,
}

impl RunTotals {
    /// Single O(n) fold over the records.
    pub fn tally(queued: usize, records: &[CheckRecord]) -> Self {
        let mut totals = Self {
            queued,
            ..Self::default()
        };
        for record in records {
            totals.processed += 1;
            if record.failed {
                totals.failed += 1;
            } else {
                totals.succeeded += 1;
            }
            if record.dnc_status == DncStatus::Yes {
                totals.flagged_dnc += 1;
            }
            if record.has_details() {
                totals.with_details += 1;
            }
        }
        totals
    }
}
