//! The identifier queue: an ordered, deduplicated set of numbers to process.
//!
//! Set semantics with insertion order preserved. The first appearance of a
//! number wins; later duplicates are dropped silently, so processing order
//! always matches first-seen order in the input.

use indexmap::IndexSet;
use regex::Regex;

use crate::phone::PhoneNumber;

/// Ordered set of phone numbers awaiting processing.
#[derive(Debug, Clone, Default)]
pub struct PhoneQueue {
    numbers: IndexSet<PhoneNumber>,
}

impl PhoneQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract numbers from raw text, one or more per line.
    ///
    /// Each line is first normalized by stripping non-digits; if exactly ten
    /// digits remain, that is the number. Otherwise the raw line is scanned
    /// for non-overlapping ten-digit runs and each run is taken. This is how
    /// comma-separated lines holding several numbers come in.
    pub fn from_text(raw: &str) -> Self {
        let digit_run = Regex::new(r"\d{10}").unwrap();
        let mut queue = Self::new();
        for line in raw.lines() {
            match PhoneNumber::parse(line) {
                Ok(number) => {
                    queue.push(number);
                }
                Err(_) => {
                    for run in digit_run.find_iter(line) {
                        if let Ok(number) = PhoneNumber::parse(run.as_str()) {
                            queue.push(number);
                        }
                    }
                }
            }
        }
        queue
    }

    /// Rebuild a queue from already-validated numbers, dropping duplicates.
    pub fn from_numbers(numbers: impl IntoIterator<Item = PhoneNumber>) -> Self {
        Self {
            numbers: numbers.into_iter().collect(),
        }
    }

    /// Append a number. Returns false if it was already queued.
    pub fn push(&mut self, number: PhoneNumber) -> bool {
        self.numbers.insert(number)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Number at a cursor position, in first-seen order.
    pub fn get(&self, index: usize) -> Option<&PhoneNumber> {
        self.numbers.get_index(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhoneNumber> {
        self.numbers.iter()
    }

    /// Owned copy of the queue contents, for snapshotting.
    pub fn to_vec(&self) -> Vec<PhoneNumber> {
        self.numbers.iter().cloned().collect()
    }
}
