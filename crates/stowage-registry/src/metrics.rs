//! Per-type storage metrics.

/// Snapshot of one type's storage counters.
///
/// Counts are cumulative since registration; `live`, `capacity`, and
/// `memory_bytes` reflect the moment of the snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageMetrics {
    /// Entities currently alive.
    pub live: usize,
    /// Record slots currently allocated for the type.
    pub capacity: usize,
    /// Highest `live` value observed.
    pub high_water: usize,
    /// Successful creates.
    pub creates: u64,
    /// Successful deletes, including those done by `clear` and
    /// `delete_subtree`.
    pub deletes: u64,
    /// Creates rejected because a pool was exhausted.
    pub failed_creates: u64,
    /// Reparent requests rejected because they would create a cycle.
    pub rejected_reparents: u64,
    /// Update callback invocations.
    pub update_calls: u64,
    /// Bytes held by the record and node pools.
    pub memory_bytes: usize,
}
