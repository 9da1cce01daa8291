//! Merging fresh harvests into the persisted snapshot
//!
//! The snapshot is a rolling window: every run overlays its records onto the
//! previous snapshot by identifier, drops anything published before the
//! retention cutoff, and orders the rest newest first.

use crate::record::Record;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info};

/// Record counts reported by [`reconcile`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records in the fresh batch
    pub fetched: usize,
    /// Distinct identifiers after merging, before pruning
    pub before_prune: usize,
    /// Records kept
    pub after_prune: usize,
}

impl ReconcileStats {
    /// Records removed by the retention cutoff
    pub fn pruned(&self) -> usize {
        self.before_prune - self.after_prune
    }
}

/// Merge `fresh` into `existing`, prune by `retention_cutoff`, sort by date
///
/// - A fresh record replaces an existing one with the same identifier and
///   takes over its position in the merge order.
/// - Records dated strictly before the cutoff are dropped. A record whose
///   date cannot be read is kept.
/// - The result is sorted by date, newest first, with undated records last.
///   Equal dates keep merge order (existing records first, then new
///   identifiers in harvest order).
pub fn reconcile(
    existing: Vec<Record>,
    fresh: Vec<Record>,
    retention_cutoff: NaiveDate,
) -> (Vec<Record>, ReconcileStats) {
    let fetched = fresh.len();
    let mut merged: Vec<Record> = Vec::with_capacity(existing.len() + fresh.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in existing.into_iter().chain(fresh) {
        match slots.entry(record.identifier.clone()) {
            Entry::Occupied(slot) => merged[*slot.get()] = record,
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(record);
            }
        }
    }
    let before_prune = merged.len();

    // An unreadable date is never older than the cutoff
    merged.retain(|record| match record.published_on() {
        Some(published) => published >= retention_cutoff,
        None => {
            debug!(identifier = %record.identifier, date = %record.date, "Keeping record with unreadable date");
            true
        }
    });
    let after_prune = merged.len();

    // Newest first, undated last; stable sort keeps merge order among equal dates
    merged.sort_by(|a, b| b.published_on().cmp(&a.published_on()));

    let stats = ReconcileStats {
        fetched,
        before_prune,
        after_prune,
    };
    info!(
        fetched,
        before_prune,
        after_prune,
        cutoff = %retention_cutoff,
        "Reconciled snapshot"
    );

    (merged, stats)
}

/// Latest announcement date in a snapshot, used to resume harvesting
pub fn latest_announcement(records: &[Record]) -> Option<NaiveDate> {
    records.iter().filter_map(Record::announced_on).max()
}
