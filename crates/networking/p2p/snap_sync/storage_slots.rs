//! Storage-slots sub-engine (`spec.md` §4.E, storage half): two-tier scheduling between
//! `fetchStoragePart` (an account whose storage was truncated mid-fetch) and `fetchStorageFull`
//! (accounts never touched yet), batched up to `snapStoragesSlotsFetchMax` per request.
//!
//! A peer worker always drains `fetchStoragePart` before touching `fetchStorageFull` (spec.md
//! §4.E): a truncated account gets back-pressure priority over starting new ones. Entries popped
//! out of `fetchStorageFull` whose root the node DB already holds in full are never requested at
//! all — they're marked `inherit=true` and handed to the healer's `accept_work_item_as_is`
//! (component G) instead, since a sibling account already paid for that fetch.

use std::collections::BTreeMap;

use ethereum_types::H256;

use crate::protocol::{GetStorageRanges, PeerId, StorageRanges};
use crate::snap_sync::node_db::{NodeDb, SlotReport};
use crate::snap_sync::pivot::{account_slots_header, SnapPivot, SnapRangeBatch, StorageFullEntry, StoragePartEntry};

/// One unit of storage-fetch work handed to a peer worker: which accounts it covers and the
/// request to send for them.
#[derive(Debug, Clone)]
pub enum StorageDrainRequest {
    /// A single account resumed out of `fetchStoragePart`.
    Part {
        storage_root: H256,
        acc_key: H256,
        request: GetStorageRanges,
    },
    /// A batch of never-touched accounts drained out of `fetchStorageFull`.
    Full {
        accounts: Vec<(H256, H256)>,
        request: GetStorageRanges,
    },
}

fn pop_first<V>(map: &mut BTreeMap<H256, V>) -> Option<(H256, V)> {
    let key = *map.keys().next()?;
    map.remove(&key).map(|v| (key, v))
}

fn full_range_request(state_root: H256, account_hashes: Vec<H256>, bytes_limit: u64) -> GetStorageRanges {
    GetStorageRanges {
        state_root,
        account_hashes,
        start_hash: H256::zero(),
        limit_hash: H256::repeat_byte(0xff),
        bytes_limit,
    }
}

/// Drains up to `max_batch` entries out of `fetchStorageFull`, splitting out any whose root the
/// node DB already has in full into `pivot.storage_heal_queue` (the `inherit=true` case) rather
/// than fetching them again. Returns the accounts still worth requesting, in drain order.
fn next_storage_full_batch(
    pivot: &mut SnapPivot,
    db: &NodeDb,
    peer: PeerId,
    max_batch: usize,
) -> Vec<(H256, H256)> {
    let mut to_fetch = Vec::new();
    let roots: Vec<H256> = pivot.fetch_storage_full.keys().take(max_batch).copied().collect();
    for storage_root in roots {
        let Some(StorageFullEntry { acc_key }) = pivot.fetch_storage_full.remove(&storage_root) else {
            continue;
        };
        if db.have_storage_slots_data(peer, acc_key, storage_root) {
            pivot.storage_heal_queue.push((acc_key, storage_root));
        } else {
            to_fetch.push((acc_key, storage_root));
        }
    }
    to_fetch
}

/// Picks the next thing a peer worker should request, honoring the part-before-full tier order.
/// Returns `None` once both tiers are empty (or every drained full entry turned out to be
/// inherited already, in which case the caller should just try again next cycle).
pub fn next_drain_request(
    pivot: &mut SnapPivot,
    db: &NodeDb,
    peer: PeerId,
    state_root: H256,
    bytes_limit: u64,
    max_batch: usize,
) -> Option<StorageDrainRequest> {
    if let Some((storage_root, entry)) = pop_first(&mut pivot.fetch_storage_part) {
        let request = full_range_request(state_root, vec![entry.acc_key], bytes_limit);
        return Some(StorageDrainRequest::Part {
            storage_root,
            acc_key: entry.acc_key,
            request,
        });
    }

    let accounts = next_storage_full_batch(pivot, db, peer, max_batch);
    if accounts.is_empty() {
        return None;
    }
    let account_hashes = accounts.iter().map(|(acc_key, _)| *acc_key).collect();
    let request = full_range_request(state_root, account_hashes, bytes_limit);
    Some(StorageDrainRequest::Full { accounts, request })
}

/// Applies the response to a `Part` drain request. A non-truncated (no boundary proof) import
/// finishes the account; anything else — truncated or rejected — restarts the account from
/// scratch in `fetchStoragePart` next round (Open Question 3: `firstSlot` is never preserved).
pub fn apply_part_response(
    pivot: &mut SnapPivot,
    db: &NodeDb,
    peer: PeerId,
    storage_root: H256,
    acc_key: H256,
    resp: &StorageRanges,
) -> SlotReport {
    let header = account_slots_header(acc_key, storage_root);
    let slots = resp.slots.first().cloned().unwrap_or_default();
    let report = db
        .import_storages(peer, &[header], std::slice::from_ref(&slots))
        .remove(0);
    match &report {
        SlotReport::Imported { .. } if resp.proof.is_empty() => {
            pivot.n_slot_lists += 1;
        }
        _ => {
            pivot.fetch_storage_part.insert(
                storage_root,
                StoragePartEntry {
                    acc_key,
                    slots: SnapRangeBatch::covering_everything(),
                },
            );
        }
    }
    report
}

/// Applies the response to a `Full` drain request. Accounts the response never got to (fewer
/// slot lists than requested) go straight back into `fetchStorageFull`; the last account covered
/// by the response moves to `fetchStoragePart` if its reply carried a boundary proof (truncated),
/// otherwise it's done. A rejected import is retried in full rather than escalated to `part`,
/// since nothing about it was ever confirmed complete.
pub fn apply_full_response(
    pivot: &mut SnapPivot,
    db: &NodeDb,
    peer: PeerId,
    accounts: &[(H256, H256)],
    resp: &StorageRanges,
) -> Vec<SlotReport> {
    let n = resp.slots.len();
    let headers: Vec<_> = accounts[..n.min(accounts.len())]
        .iter()
        .map(|(acc_key, storage_root)| account_slots_header(*acc_key, *storage_root))
        .collect();
    let reports = db.import_storages(peer, &headers, &resp.slots[..headers.len()]);

    for (acc_key, storage_root) in accounts.iter().skip(headers.len()) {
        pivot
            .fetch_storage_full
            .insert(*storage_root, StorageFullEntry { acc_key: *acc_key });
    }

    let last_truncated = !headers.is_empty() && !resp.proof.is_empty();
    for (i, (acc_key, storage_root)) in accounts[..headers.len()].iter().enumerate() {
        let imported = matches!(reports.get(i), Some(SlotReport::Imported { .. }));
        if !imported {
            pivot
                .fetch_storage_full
                .insert(*storage_root, StorageFullEntry { acc_key: *acc_key });
            continue;
        }
        if last_truncated && i == headers.len() - 1 {
            pivot.fetch_storage_part.insert(
                *storage_root,
                StoragePartEntry {
                    acc_key: *acc_key,
                    slots: SnapRangeBatch::covering_everything(),
                },
            );
        } else {
            pivot.n_slot_lists += 1;
        }
    }
    reports
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_rust_core::types::BlockHeader;
    use ethereum_rust_storage::Store;
    use ethereum_rust_trie::EMPTY_TRIE_HASH;

    fn peer() -> PeerId {
        PeerId::zero()
    }

    fn pivot() -> SnapPivot {
        SnapPivot::new(BlockHeader::default())
    }

    #[test]
    fn part_is_drained_before_full() {
        let mut p = pivot();
        let full_root = H256::repeat_byte(1);
        let part_root = H256::repeat_byte(2);
        p.fetch_storage_full.insert(
            full_root,
            StorageFullEntry {
                acc_key: H256::repeat_byte(0xaa),
            },
        );
        p.fetch_storage_part.insert(
            part_root,
            StoragePartEntry {
                acc_key: H256::repeat_byte(0xbb),
                slots: SnapRangeBatch::covering_everything(),
            },
        );
        let db = NodeDb::new(Store::new());

        let job = next_drain_request(&mut p, &db, peer(), H256::zero(), 1024, 128).unwrap();
        match job {
            StorageDrainRequest::Part { storage_root, .. } => assert_eq!(storage_root, part_root),
            StorageDrainRequest::Full { .. } => panic!("expected the part entry to drain first"),
        }
        assert!(p.fetch_storage_part.is_empty());
        assert!(p.fetch_storage_full.contains_key(&full_root));
    }

    #[test]
    fn full_entry_with_data_already_present_is_marked_for_inheritance() {
        let mut p = pivot();
        let store = Store::new();
        let acc_key = H256::repeat_byte(0xaa);
        let storage_root = H256::repeat_byte(3);
        // Seed the node DB so `have_storage_slots_data` reports true for this account.
        let address = ethereum_types::Address::from_slice(&acc_key.0[..20]);
        let mut trie = store.open_storage_trie(address, *EMPTY_TRIE_HASH);
        trie.insert(H256::repeat_byte(9).0.to_vec(), vec![1]).unwrap();
        trie.hash().unwrap();

        p.fetch_storage_full
            .insert(storage_root, StorageFullEntry { acc_key });
        let db = NodeDb::new(store);

        let job = next_drain_request(&mut p, &db, peer(), H256::zero(), 1024, 128);
        assert!(job.is_none());
        assert_eq!(p.storage_heal_queue, vec![(acc_key, storage_root)]);
        assert!(p.fetch_storage_full.is_empty());
    }

    #[test]
    fn truncated_full_response_moves_the_last_account_to_part() {
        let mut p = pivot();
        let store = Store::new();
        let acc_a = H256::repeat_byte(0xaa);
        let acc_b = H256::repeat_byte(0xbb);
        let root_a = *EMPTY_TRIE_HASH;
        let root_b = H256::repeat_byte(7);
        let accounts = vec![(acc_a, root_a), (acc_b, root_b)];
        let db = NodeDb::new(store);

        let resp = StorageRanges {
            slots: vec![vec![], vec![]],
            proof: vec![vec![0xde, 0xad]],
        };
        let reports = apply_full_response(&mut p, &db, peer(), &accounts, &resp);
        assert_eq!(reports.len(), 2);
        // The first account finished cleanly; the second (last, under the boundary proof)
        // gets resumed as a part entry instead of being marked done.
        assert_eq!(p.n_slot_lists, 1);
        assert!(p.fetch_storage_part.contains_key(&root_b));
        assert!(!p.fetch_storage_part.contains_key(&root_a));
    }

    #[test]
    fn apply_part_response_finishes_a_clean_reply() {
        let mut p = pivot();
        let db = NodeDb::new(Store::new());
        let acc_key = H256::repeat_byte(0xaa);
        let storage_root = *EMPTY_TRIE_HASH;
        let resp = StorageRanges {
            slots: vec![vec![]],
            proof: vec![],
        };
        let report = apply_part_response(&mut p, &db, peer(), storage_root, acc_key, &resp);
        assert!(matches!(report, SlotReport::Imported { .. }));
        assert_eq!(p.n_slot_lists, 1);
        assert!(p.fetch_storage_part.is_empty());
    }

    #[test]
    fn apply_part_response_restarts_on_truncation() {
        let mut p = pivot();
        let db = NodeDb::new(Store::new());
        let acc_key = H256::repeat_byte(0xaa);
        let storage_root = *EMPTY_TRIE_HASH;
        let resp = StorageRanges {
            slots: vec![vec![]],
            proof: vec![vec![1, 2, 3]],
        };
        apply_part_response(&mut p, &db, peer(), storage_root, acc_key, &resp);
        assert_eq!(p.n_slot_lists, 0);
        assert!(p.fetch_storage_part.contains_key(&storage_root));
    }
}
