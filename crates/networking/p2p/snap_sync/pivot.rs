//! Pivot registry (`spec.md` §4.D, data model in §3): an LRU-ordered table of [`SnapPivot`]s
//! keyed by the block header that defines their state root.
//!
//! Only the coordinator ever mutates the table (append/mothball/evict); workers only ever read
//! a snapshot of [`PivotTable::last_value`], matching the teacher's single-writer/many-reader
//! discipline for `SyncManager`'s peer table.

use std::collections::{BTreeMap, HashSet, VecDeque};

use ethereum_rust_core::types::BlockHeader;
use ethereum_types::H256;
use ethereum_rust_trie::NodeTagRangeSet;

use crate::snap_sync::node_db::AccountSlotsHeader;

/// Per-pivot, per-kind batch of scheduling state (`spec.md` §3 `SnapRangeBatch`).
///
/// Invariant: `unprocessed.0 ∪ unprocessed.1 ∪ processed` partitions `[0, 2^256)` modulo
/// whatever ranges are currently claimed by an in-flight worker.
#[derive(Debug, Clone, Default)]
pub struct SnapRangeBatch {
    /// Primary and secondary unprocessed range sets. `.1` receives ranges returned after
    /// failures, or ranges already seen before (see `spec.md` §4.E tie-breaks).
    pub unprocessed: (NodeTagRangeSet, NodeTagRangeSet),
    pub processed: NodeTagRangeSet,
    /// Partial paths still to inspect for dangling children.
    pub check_nodes: Vec<Vec<u8>>,
    /// Known-dangling nodes, queued for single-node fetch.
    pub sick_sub_tries: Vec<ethereum_rust_trie::NodeSpecs>,
    pub resume_ctx: Option<ethereum_rust_trie::ResumeCtx>,
    /// Guards long healer inspection runs from concurrent restart (Open Question 1: RAII-scoped
    /// via [`crate::snap_sync::healer::TriePerusalGuard`], not a raw bool toggled by hand).
    pub lock_trie_perusal: bool,
}

impl SnapRangeBatch {
    /// A batch whose `unprocessed.0` covers the entire key space — the starting point for a
    /// freshly created pivot's account batch.
    pub fn covering_everything() -> Self {
        Self {
            unprocessed: (NodeTagRangeSet::full(), NodeTagRangeSet::new()),
            ..Default::default()
        }
    }
}

/// One account's full-storage-trie work item, keyed by storage root in `storageAccounts`.
#[derive(Debug, Clone)]
pub struct StorageFullEntry {
    pub acc_key: H256,
}

/// One account's partial-storage-trie work item (a truncated reply being resumed).
#[derive(Debug, Clone)]
pub struct StoragePartEntry {
    pub acc_key: H256,
    pub slots: SnapRangeBatch,
}

/// `spec.md` §3 `SnapPivot`.
#[derive(Debug, Clone)]
pub struct SnapPivot {
    pub state_header: BlockHeader,
    pub fetch_accounts: SnapRangeBatch,
    pub fetch_storage_full: BTreeMap<H256, StorageFullEntry>,
    pub fetch_storage_part: BTreeMap<H256, StoragePartEntry>,
    /// Accounts currently claimed by some other worker (in-flight elsewhere).
    pub parked_storage: HashSet<H256>,
    /// Index from account key to storage root, for swap-in reconciliation.
    pub storage_accounts: BTreeMap<H256, H256>,
    pub n_accounts: u64,
    pub n_slot_lists: u64,
    /// True once mothballed: only `storage_accounts`/`fetch_storage_full` are kept for swap-in.
    pub archived: bool,
    /// `(accKey, storageRoot)` pairs whose root the node DB already had in full when drained
    /// from `fetch_storage_full` (component H's `inherit=true` marking) — left for the healer's
    /// `accept_work_item_as_is` short-circuit instead of a network fetch.
    pub storage_heal_queue: Vec<(H256, H256)>,
}

impl SnapPivot {
    pub fn new(state_header: BlockHeader) -> Self {
        Self {
            state_header,
            fetch_accounts: SnapRangeBatch::covering_everything(),
            fetch_storage_full: BTreeMap::new(),
            fetch_storage_part: BTreeMap::new(),
            parked_storage: HashSet::new(),
            storage_accounts: BTreeMap::new(),
            n_accounts: 0,
            n_slot_lists: 0,
            archived: false,
            storage_heal_queue: Vec::new(),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.state_header.number
    }

    pub fn state_root(&self) -> H256 {
        self.state_header.state_root
    }

    /// Drops everything but `storage_accounts`/`fetch_storage_full`, per §3's mothball rule:
    /// a mothballed pivot is kept alive only as a swap-in donor for newer pivots.
    pub fn mothball(&mut self) {
        self.archived = true;
        self.fetch_accounts = SnapRangeBatch::default();
        self.fetch_storage_part.clear();
        self.parked_storage.clear();
    }
}

/// LRU-ordered table of pivots, front = newest/current. At most
/// `SnapConfig::pivot_table_lru_entries_max` entries; eviction drops the *second* entry first
/// (per §4.D: "the first may be needed by in-flight workers").
#[derive(Debug, Default)]
pub struct PivotTable {
    /// Front = current (`lastValue`), back = oldest.
    entries: VecDeque<SnapPivot>,
    lru_entries_max: usize,
    /// Smallest gap required to append a pivot while the current one is still healing.
    throttled_pivot_change_min: u64,
    pivot_block_distance_min: u64,
}

impl PivotTable {
    pub fn new(pivot_block_distance_min: u64, throttled_pivot_change_min: u64, lru_entries_max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            lru_entries_max,
            throttled_pivot_change_min,
            pivot_block_distance_min,
        }
    }

    /// Current (top) pivot, if any.
    pub fn last_value(&self) -> Option<&SnapPivot> {
        self.entries.front()
    }

    pub fn last_value_mut(&mut self) -> Option<&mut SnapPivot> {
        self.entries.front_mut()
    }

    /// The pivot just below the current one, if any.
    pub fn before_last_value(&self) -> Option<&SnapPivot> {
        self.entries.get(1)
    }

    /// Appends a new pivot on top if the header is far enough ahead of the current top, using
    /// the throttled (larger) threshold instead when the current top is still healing
    /// (`!processed.isEmpty` is this module's proxy for "healing in progress", mirroring
    /// `healingOk`'s own `processed` check in §4.F). Returns whether a pivot was appended.
    pub fn update(&mut self, header: BlockHeader) -> bool {
        let threshold = match self.last_value() {
            Some(top) if !top.fetch_accounts.processed.is_empty() => {
                self.throttled_pivot_change_min
            }
            _ => self.pivot_block_distance_min,
        };
        let should_append = match self.last_value() {
            None => true,
            Some(top) => top.block_number() + threshold < header.number,
        };
        if !should_append {
            return false;
        }
        self.entries.push_front(SnapPivot::new(header));
        self.evict_overflow();
        true
    }

    /// Prepends a pivot (used only during checkpoint recovery, per §4.D).
    pub fn reverse_update(&mut self, header: BlockHeader) {
        self.entries.push_back(SnapPivot::new(header));
        self.evict_overflow();
    }

    /// Mothballs `beforeLastValue` if the current pivot has made enough progress that the
    /// previous one's full sub-tries are no longer needed for fast-path fetches (callers decide
    /// the "mostly clean" predicate; this just performs the mothball).
    pub fn before_top_mostly_clean(&mut self) {
        if let Some(prev) = self.entries.get_mut(1) {
            prev.mothball();
        }
    }

    /// All pivots, current first — used by the swap-in reconciler to search donor pivots.
    pub fn iter(&self) -> impl Iterator<Item = &SnapPivot> {
        self.entries.iter()
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.lru_entries_max {
            // The *second* entry is evicted first: the front may still be needed by in-flight
            // workers even once the table is over capacity.
            if self.entries.len() >= 2 {
                self.entries.remove(1);
            } else {
                self.entries.pop_back();
            }
        }
    }
}

/// Converts a [`StoragePartEntry`]/[`StorageFullEntry`] pair plus a known storage root into the
/// wire-facing header type `importStorages` expects.
pub fn account_slots_header(acc_key: H256, storage_root: H256) -> AccountSlotsHeader {
    AccountSlotsHeader {
        acc_key,
        storage_root,
        sub_range: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header(number: u64) -> BlockHeader {
        BlockHeader {
            number,
            state_root: H256::from_low_u64_be(number),
            ..Default::default()
        }
    }

    #[test]
    fn update_rejects_headers_too_close_to_the_top() {
        let mut table = PivotTable::new(128, 256, 64);
        assert!(table.update(header(1000)));
        assert!(!table.update(header(1050)));
        assert!(table.update(header(1200)));
        assert_eq!(table.last_value().unwrap().block_number(), 1200);
    }

    #[test]
    fn update_uses_throttled_threshold_while_healing() {
        let mut table = PivotTable::new(128, 256, 64);
        table.update(header(1000));
        table
            .last_value_mut()
            .unwrap()
            .fetch_accounts
            .processed
            .merge(ethereum_rust_trie::NodeTagRange::single(
                ethereum_rust_trie::NodeTag::zero(),
            ));
        // 1000 + 150 < 1150 normally, but the throttled threshold of 256 blocks it.
        assert!(!table.update(header(1150)));
        assert!(table.update(header(1300)));
    }

    #[test]
    fn eviction_drops_the_second_entry_first() {
        let mut table = PivotTable::new(1, 1, 2);
        table.update(header(100));
        table.update(header(300));
        table.update(header(500));
        assert_eq!(table.entries.len(), 2);
        let numbers: Vec<_> = table.iter().map(SnapPivot::block_number).collect();
        assert_eq!(numbers, vec![500, 100]);
    }
}
