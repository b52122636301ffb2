//! Collapse bidirectional ticket links into one direction.
//!
//! The backup records an association on both tickets it joins. The importer
//! would create two links for that, so each undirected relationship is kept
//! only on the ticket that comes first in scan order (ascending ticket number
//! after loading).

use crate::model::Ticket;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Summary of a deduplication pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeReport {
    /// Back-references removed because the other endpoint keeps the link.
    pub back_references: usize,
    /// Links from a ticket to itself.
    pub self_references: usize,
    /// Repeated links to the same ticket within one ticket.
    pub repeats: usize,
    /// Links to ticket numbers missing from the project (kept as-is).
    pub dangling: usize,
}

/// Remove reciprocal links in place, returning what was removed.
///
/// For tickets in the given order, a link `B -> A` is dropped when `A` comes
/// before `B` and `A` links to `B`. The removal set is computed from the input
/// before anything is modified, so the outcome never depends on mutation
/// order. Running it again on its own output removes nothing.
pub fn dedupe_links(tickets: &mut [Ticket]) -> DedupeReport {
    let position: HashMap<u64, usize> = tickets
        .iter()
        .enumerate()
        .map(|(index, ticket)| (ticket.number, index))
        .collect();
    let outgoing: Vec<HashSet<u64>> = tickets
        .iter()
        .map(|ticket| ticket.linked_numbers().collect())
        .collect();

    let mut report = DedupeReport::default();
    let mut removals: Vec<HashSet<u64>> = vec![HashSet::new(); tickets.len()];

    for (index, ticket) in tickets.iter().enumerate() {
        for target in ticket.linked_numbers() {
            if target == ticket.number {
                continue;
            }
            match position.get(&target) {
                Some(&other) if other < index && outgoing[other].contains(&ticket.number) => {
                    removals[index].insert(target);
                }
                Some(_) => {}
                None => {
                    report.dangling += 1;
                    warn!(
                        ticket = ticket.number,
                        linked = target,
                        "Associated ticket is not part of the project"
                    );
                }
            }
        }
    }

    for (ticket, remove) in tickets.iter_mut().zip(removals) {
        let number = ticket.number;
        let mut seen = HashSet::new();
        ticket.associated_tickets.retain(|link| {
            if link.number == number {
                report.self_references += 1;
                false
            } else if remove.contains(&link.number) {
                report.back_references += 1;
                false
            } else if !seen.insert(link.number) {
                report.repeats += 1;
                false
            } else {
                true
            }
        });
    }

    debug!(?report, "Deduplicated ticket links");
    report
}
