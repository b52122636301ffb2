//! Target issue numbering.
//!
//! JIRA issue numbers are assigned so that ticket numbers above the configured
//! offset survive unchanged. Everything else, tickets at or below the offset
//! and every milestone, takes the lowest positive number still free at the
//! time it is processed:
//!
//! 1. tickets with `number > offset` keep `number`
//! 2. other tickets, ascending by number, take the lowest free number
//! 3. milestones, in stored order, take the lowest free number

use crate::model::{Milestone, Ticket};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A record that receives a target issue number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "lowercase")]
pub enum RecordKey {
    Milestone(String),
    Ticket(u64),
}

impl RecordKey {
    #[must_use]
    pub fn milestone(milestone: &Milestone) -> Self {
        Self::Milestone(milestone.id.clone())
    }

    #[must_use]
    pub const fn ticket(ticket: &Ticket) -> Self {
        Self::Ticket(ticket.number)
    }
}

/// One allocated number, in allocation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub record: RecordKey,
    pub number: u64,
    /// True when the original ticket number was kept.
    pub preserved: bool,
}

/// Read-only mapping from records to target issue numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierAssignment {
    allocations: Vec<Allocation>,
    index: HashMap<RecordKey, usize>,
}

impl IdentifierAssignment {
    /// Target number of `record`, if it was part of the allocation.
    #[must_use]
    pub fn get(&self, record: &RecordKey) -> Option<u64> {
        self.index
            .get(record)
            .map(|&position| self.allocations[position].number)
    }

    #[must_use]
    pub fn ticket(&self, number: u64) -> Option<u64> {
        self.get(&RecordKey::Ticket(number))
    }

    #[must_use]
    pub fn milestone(&self, id: &str) -> Option<u64> {
        self.get(&RecordKey::Milestone(id.to_string()))
    }

    /// Allocations in the order they were made.
    #[must_use]
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    fn push(&mut self, record: RecordKey, number: u64, preserved: bool) {
        self.index.insert(record.clone(), self.allocations.len());
        self.allocations.push(Allocation {
            record,
            number,
            preserved,
        });
    }
}

/// Taken target numbers with a lowest-free cursor.
///
/// Numbers are only ever added, so the lowest free number never decreases and
/// the cursor only moves forward.
#[derive(Debug, Clone)]
pub struct FreeNumbers {
    used: BTreeSet<u64>,
    cursor: u64,
}

impl Default for FreeNumbers {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeNumbers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            used: BTreeSet::new(),
            cursor: 1,
        }
    }

    /// Mark `number` as taken.
    pub fn reserve(&mut self, number: u64) {
        self.used.insert(number);
    }

    /// Lowest positive integer not yet taken.
    pub fn lowest_free(&mut self) -> u64 {
        while self.used.contains(&self.cursor) {
            self.cursor += 1;
        }
        self.cursor
    }

    /// Take and return the lowest free number.
    pub fn take_lowest(&mut self) -> u64 {
        let number = self.lowest_free();
        self.used.insert(number);
        number
    }
}

/// Assign target numbers to every ticket and milestone.
///
/// Tickets may be given in any order; the gap-filling pass sorts them by
/// number. Milestones are processed in the given order.
#[must_use]
pub fn allocate(tickets: &[Ticket], milestones: &[Milestone], offset: u64) -> IdentifierAssignment {
    let mut assignment = IdentifierAssignment::default();
    let mut free = FreeNumbers::new();

    let mut numbers: Vec<u64> = tickets.iter().map(|ticket| ticket.number).collect();
    numbers.sort_unstable();
    numbers.dedup();

    let (kept, renumbered): (Vec<u64>, Vec<u64>) =
        numbers.into_iter().partition(|&number| number > offset);

    for number in kept {
        free.reserve(number);
        assignment.push(RecordKey::Ticket(number), number, true);
    }

    for number in renumbered {
        let target = free.take_lowest();
        debug!(ticket = number, assigned = target, "Renumbered ticket at or below offset");
        assignment.push(RecordKey::Ticket(number), target, false);
    }

    for milestone in milestones {
        let target = free.take_lowest();
        assignment.push(RecordKey::milestone(milestone), target, false);
    }

    assignment
}
