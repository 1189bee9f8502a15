//! Priority ordering for distribution candidates.
//!
//! Candidates are sorted by declared capacity, largest first. The sort is
//! stable, so recipients with equal capacity keep the order the pool source
//! returned them in. No other tie-break is applied; the resulting sequence is
//! reproducible and easy to follow in logs.

use std::collections::HashSet;

use crate::domain::Recipient;

/// Order eligible recipients for one session.
///
/// Duplicate ids are dropped (first occurrence wins) so a recipient appears
/// at most once in a session's ordered list.
pub fn order_candidates(eligible: Vec<Recipient>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<Recipient> = eligible
        .into_iter()
        .filter(|r| {
            let first = seen.insert(r.id.clone());
            if !first {
                log::debug!("Dropping duplicate recipient {}", r.id);
            }
            first
        })
        .collect();

    // Vec::sort_by is stable
    ordered.sort_by(|a, b| b.capacity.cmp(&a.capacity));
    ordered
}
