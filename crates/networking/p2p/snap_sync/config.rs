//! Tunable constants (`spec.md` §6), collected into one struct instead of scattered
//! module-level constants so a node operator can override them from the CLI config layer the
//! same way the teacher's `SyncManager` takes a `SyncMode` at construction time.

/// Snap-sync tunables. `Default` reproduces the recognised values from `spec.md` §6 exactly;
/// override individual fields for tests that want a tiny key space or a fast heal trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapConfig {
    /// Minimum block-number gap before a new pivot is appended on top of the LRU.
    pub pivot_block_distance_min: u64,
    /// Gap required instead of `pivot_block_distance_min` while the current pivot is healing.
    pub pivot_block_distance_throttled_pivot_change_min: u64,
    /// Max number of pivots kept in the LRU before the oldest is evicted.
    pub pivot_table_lru_entries_max: usize,
    /// Fraction of `coveredAccounts` that must be full before account healing starts.
    pub heal_accounts_coverage_trigger: f64,
    /// Same trigger, for storage-slot healing.
    pub heal_storage_slots_trigger: f64,
    /// Nodes visited per `hexaryInspectTrie` batch before yielding.
    pub heal_inspection_batch: usize,
    /// Max items drained from `missingNodes` per healer fetch round.
    pub max_trie_node_fetch: usize,
    /// Max accounts drained into one `fetchStorageFull`/`fetchStoragePart` batch.
    pub snap_storages_slots_fetch_max: usize,
    /// Max accounts healed per storage-healing round.
    pub max_storages_heal: usize,
    /// Soft byte cap advertised on outgoing requests (`bytesLimit`).
    pub fetch_request_bytes_limit: u64,
    /// Consecutive bad responses before a buddy is zombied.
    pub fetch_headers_req_threshold_count: u32,
    /// Response latency, in milliseconds, counted as an error even if data arrived.
    pub fetch_headers_req_threshold_zombie_ms: u64,
    /// Minimum percentage (0-100) of requested items a response must carry to count as "good".
    pub fetch_headers_req_min_response_pc: u8,
    /// Storage queue depth above which a buddy drains storage before accounts.
    pub storage_slots_qu_prio_thresh: usize,
    /// Max concurrent peer workers; also the divisor for `accountRangeMax`.
    pub buddies_max: u64,
    /// Consecutive timeouts from the same peer before it's zombied.
    pub max_timeout_errors: u32,
    /// Max `(min,max)` chunks a checkpoint's `processed` set may serialize.
    pub accounts_save_processed_chunks_max: usize,
    /// Max slot accounts a checkpoint may serialize.
    pub accounts_save_storage_slots_max: usize,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            pivot_block_distance_min: 128,
            pivot_block_distance_throttled_pivot_change_min: 256,
            pivot_table_lru_entries_max: 64,
            heal_accounts_coverage_trigger: 0.70,
            heal_storage_slots_trigger: 0.70,
            heal_inspection_batch: 10_000,
            max_trie_node_fetch: 1024,
            snap_storages_slots_fetch_max: 128,
            max_storages_heal: 32,
            fetch_request_bytes_limit: 2 * 1024 * 1024,
            fetch_headers_req_threshold_count: 2,
            fetch_headers_req_threshold_zombie_ms: 2_000,
            fetch_headers_req_min_response_pc: 10,
            storage_slots_qu_prio_thresh: 5_000,
            buddies_max: 32,
            max_timeout_errors: 3,
            accounts_save_processed_chunks_max: 1_000,
            accounts_save_storage_slots_max: 20_000,
        }
    }
}

impl SnapConfig {
    /// `accountRangeMax = (2^256-1) / buddiesMax`, the per-claim cap the scheduler enforces so
    /// that a single worker can never be handed the entire key space.
    pub fn account_range_max(&self) -> ethereum_types::U256 {
        ethereum_types::U256::MAX / self.buddies_max
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn account_range_max_shrinks_as_buddies_grow() {
        let mut cfg = SnapConfig::default();
        cfg.buddies_max = 1;
        let one_buddy = cfg.account_range_max();
        cfg.buddies_max = 32;
        let many_buddies = cfg.account_range_max();
        assert!(many_buddies < one_buddy);
    }
}
