//! Sequential identifiers for records created offline.
//!
//! Local ids continue the server's sequence: one past the highest id known
//! from either source. An earlier scheme used millisecond timestamps, which
//! sorted inconsistently with server ids and could land in their range; ids
//! of that magnitude are recognized as legacy and renumbered during
//! reconciliation.

use crate::RecordId;
use serde::{Deserialize, Serialize};

/// Ids at or above this value are millisecond timestamps from the retired
/// timestamp-based scheme (10^12 ms is September 2001).
pub const LEGACY_ID_THRESHOLD: RecordId = 1_000_000_000_000;

/// Check if an id was minted by the timestamp-based scheme.
pub fn is_legacy_id(id: RecordId) -> bool {
    id >= LEGACY_ID_THRESHOLD
}

/// Check if a local id is a timestamp leftover, given the highest server id.
///
/// Once the server's own ids reach the legacy range, ids minted above them
/// look the same as timestamps, so nothing is treated as legacy.
pub fn is_legacy_local_id(id: RecordId, remote_high_water: RecordId) -> bool {
    !is_legacy_id(remote_high_water) && is_legacy_id(id)
}

/// The next local id: `max(ids, 0) + 1`.
pub fn next_local_id(ids: impl IntoIterator<Item = RecordId>) -> RecordId {
    let mut allocator = IdAllocator::new();
    allocator.observe_all(ids);
    allocator.allocate()
}

/// Allocates sequential ids above every id it has observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdAllocator {
    /// Highest id observed or allocated so far, never below zero
    pub high_water: RecordId,
}

impl IdAllocator {
    /// Create an allocator that has observed nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator with a specific high-water mark.
    pub fn with_high_water(high_water: RecordId) -> Self {
        Self {
            high_water: high_water.max(0),
        }
    }

    /// Raise the high-water mark to cover an existing id.
    pub fn observe(&mut self, id: RecordId) {
        self.high_water = self.high_water.max(id);
    }

    /// Observe many ids.
    pub fn observe_all(&mut self, ids: impl IntoIterator<Item = RecordId>) {
        for id in ids {
            self.observe(id);
        }
    }

    /// Allocate the next id.
    pub fn allocate(&mut self) -> RecordId {
        self.high_water += 1;
        self.high_water
    }
}
