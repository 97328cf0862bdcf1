//! Reconciliation of server records with records kept offline.
//!
//! Given the records the server returned and the records in local fallback
//! storage, this module produces the single list the console displays.
//!
//! # Algorithm
//!
//! 1. Tag server records remote, in server order
//! 2. Walk local records in storage order; a local record keeps its id
//!    unless the id is legacy, belongs to a server record (or a reserved
//!    id), or repeats an earlier local id
//! 3. Renumber the rest sequentially above every id kept so far
//! 4. Return remote records followed by local records
//!
//! No deduplication by content is attempted: two records with the same name
//! and different ids are both shown.

use crate::{ids::is_legacy_local_id, IdAllocator, Origin, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A local record that was given a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Renumbered {
    pub from: RecordId,
    pub to: RecordId,
}

/// Result of reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Remote records first, then local records
    pub view: Vec<Record>,
    /// Local records as they should now be stored
    pub local: Vec<Record>,
    /// Exactly the ids of `local`
    pub local_ids: BTreeSet<RecordId>,
    /// Local records whose id changed
    pub renumbered: Vec<Renumbered>,
}

impl ReconcileResult {
    /// Whether local storage has to be rewritten to match this result.
    pub fn is_repaired(&self) -> bool {
        !self.renumbered.is_empty()
    }
}

/// Merge remote and local records into one view.
///
/// `reserved` holds ids that local records must avoid in addition to those
/// of `remote`, such as server ids remembered from an earlier listing while
/// the server is unreachable.
pub fn reconcile(
    remote: Vec<Record>,
    local: Vec<Record>,
    reserved: &BTreeSet<RecordId>,
) -> ReconcileResult {
    let remote: Vec<Record> = remote
        .into_iter()
        .map(|r| r.with_origin(Origin::Remote))
        .collect();

    let mut taken: BTreeSet<RecordId> = remote
        .iter()
        .map(|r| r.id)
        .chain(reserved.iter().copied())
        .collect();

    let remote_high_water = taken.iter().next_back().copied().unwrap_or(0);
    let mut allocator = IdAllocator::with_high_water(remote_high_water);

    // Decide which local ids survive before allocating any new ones, so
    // renumbered records land above every surviving id.
    let keep: Vec<bool> = local
        .iter()
        .map(|r| {
            let kept = !is_legacy_local_id(r.id, remote_high_water) && taken.insert(r.id);
            if kept {
                allocator.observe(r.id);
            }
            kept
        })
        .collect();

    let mut renumbered = Vec::new();
    let local: Vec<Record> = local
        .into_iter()
        .zip(keep)
        .map(|(mut record, kept)| {
            if !kept {
                let to = allocator.allocate();
                renumbered.push(Renumbered {
                    from: record.id,
                    to,
                });
                record.id = to;
            }
            record.with_origin(Origin::Local)
        })
        .collect();

    let local_ids = local.iter().map(|r| r.id).collect();
    let view = remote.into_iter().chain(local.iter().cloned()).collect();

    ReconcileResult {
        view,
        local,
        local_ids,
        renumbered,
    }
}
