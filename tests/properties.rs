//! Property tests for issue number allocation and link deduplication.

use proptest::prelude::*;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use unfuddle_jira::migrate::{RecordKey, allocate, dedupe_links};
use unfuddle_jira::model::{Milestone, Ticket};

fn ticket(number: u64, links: &[u64]) -> Ticket {
    let links: Vec<_> = links
        .iter()
        .map(|n| json!({"number": n.to_string()}))
        .collect();
    serde_json::from_value(json!({"number": number.to_string(), "associated_tickets": links}))
        .unwrap()
}

fn milestone(index: usize) -> Milestone {
    serde_json::from_value(json!({"id": format!("m{index}")})).unwrap()
}

/// Tickets with unique numbers in ascending order, linking to arbitrary
/// numbers (including themselves and numbers outside the project).
fn ticket_set() -> impl Strategy<Value = Vec<Ticket>> {
    prop::collection::btree_set(0u64..40, 0..15).prop_flat_map(|numbers| {
        let count = numbers.len();
        prop::collection::vec(prop::collection::vec(0u64..45, 0..6), count).prop_map(
            move |links| {
                numbers
                    .iter()
                    .zip(links)
                    .map(|(&number, links)| ticket(number, &links))
                    .collect()
            },
        )
    })
}

/// Undirected relationships between distinct tickets.
fn edges(tickets: &[Ticket]) -> BTreeSet<(u64, u64)> {
    tickets
        .iter()
        .flat_map(|t| t.linked_numbers().map(move |n| (t.number, n)))
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect()
}

proptest! {
    #[test]
    fn allocation_is_injective_and_keeps_high_numbers(
        numbers in prop::collection::btree_set(0u64..200, 0..40),
        milestone_count in 0usize..10,
        offset in 0u64..120,
    ) {
        let tickets: Vec<Ticket> = numbers.iter().map(|&n| ticket(n, &[])).collect();
        let milestones: Vec<Milestone> = (0..milestone_count).map(milestone).collect();
        let assignment = allocate(&tickets, &milestones, offset);

        prop_assert_eq!(assignment.len(), tickets.len() + milestones.len());

        let mut seen = HashSet::new();
        for allocation in assignment.allocations() {
            prop_assert!(allocation.number >= 1);
            prop_assert!(seen.insert(allocation.number), "duplicate {}", allocation.number);
        }

        for &number in &numbers {
            let target = assignment.ticket(number).unwrap();
            if number > offset {
                prop_assert_eq!(target, number);
            }
        }
        for m in &milestones {
            prop_assert!(assignment.get(&RecordKey::milestone(m)).is_some());
        }
    }

    #[test]
    fn gap_filled_numbers_are_dense(
        numbers in prop::collection::btree_set(1u64..30, 0..20),
        milestone_count in 0usize..5,
    ) {
        // With every ticket renumbered, targets are exactly 1..=n.
        let tickets: Vec<Ticket> = numbers.iter().map(|&n| ticket(n, &[])).collect();
        let milestones: Vec<Milestone> = (0..milestone_count).map(milestone).collect();
        let assignment = allocate(&tickets, &milestones, 30);

        let targets: BTreeSet<u64> = assignment.allocations().iter().map(|a| a.number).collect();
        let expected: BTreeSet<u64> = (1..=assignment.len() as u64).collect();
        prop_assert_eq!(targets, expected);
    }

    #[test]
    fn dedupe_keeps_each_relationship_once(mut tickets in ticket_set()) {
        let before = edges(&tickets);
        dedupe_links(&mut tickets);

        prop_assert_eq!(edges(&tickets), before);

        let directed: HashSet<(u64, u64)> = tickets
            .iter()
            .flat_map(|t| t.linked_numbers().map(move |n| (t.number, n)))
            .collect();
        for &(a, b) in &directed {
            prop_assert!(a != b, "self link on {}", a);
            prop_assert!(!directed.contains(&(b, a)), "{} and {} both keep the link", a, b);
        }
        for t in &tickets {
            let unique: HashSet<u64> = t.linked_numbers().collect();
            prop_assert_eq!(unique.len(), t.associated_tickets.len());
        }
    }

    #[test]
    fn dedupe_is_idempotent(mut tickets in ticket_set()) {
        dedupe_links(&mut tickets);
        let once = tickets.clone();
        let report = dedupe_links(&mut tickets);

        prop_assert_eq!(&tickets, &once);
        prop_assert_eq!(report.back_references + report.self_references + report.repeats, 0);
    }
}
