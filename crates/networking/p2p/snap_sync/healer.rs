//! Trie healer (`spec.md` §4.G): the half of snap-sync that catches whatever bulk range fetch
//! (§4.E) left dangling by walking the trie directly from its root and fetching single missing
//! nodes instead of whole ranges.
//!
//! Account and storage healing run the identical five-step loop — update missing, inspect,
//! exit-if-complete, fetch, import — so [`heal_round`] is written once against a [`NodeScope`]
//! and a root hash, and [`heal_accounts_round`]/[`heal_storage_round`] are thin wrappers that
//! supply the leaf-specific bookkeeping. This mirrors the teacher's own split between a shared
//! `rebuild_state_trie` core and its two call sites.

use ethereum_rust_core::types::AccountState;
use ethereum_rust_rlp::decode::RLPDecode;
use ethereum_rust_trie::{
    hexary_inspect_trie, NodeHash, NodeSpecs, NodeTagRange, NodeTagRangeSet, Nibbles, Node, Trie,
    EMPTY_TRIE_HASH,
};
use ethereum_types::{Address, H256};

use crate::protocol::PeerId;
use crate::snap_sync::error::SnapSyncError;
use crate::snap_sync::node_db::{NodeDb, NodeReport, NodeScope};
use crate::snap_sync::pivot::SnapRangeBatch;

/// RAII guard over a pivot's `lock_trie_perusal` flag (Open Question 1 resolution): a long
/// `hexary_inspect_trie` batch holds this for its duration, so a second concurrent heal attempt
/// on the same trie observes the flag and backs off with [`SnapSyncError::TrieIsLockedForPerusal`]
/// instead of racing the resumable cursor.
pub struct TriePerusalGuard<'a> {
    lock: &'a mut bool,
}

impl<'a> TriePerusalGuard<'a> {
    pub fn acquire(lock: &'a mut bool) -> Option<Self> {
        if *lock {
            return None;
        }
        *lock = true;
        Some(Self { lock })
    }
}

impl Drop for TriePerusalGuard<'_> {
    fn drop(&mut self) {
        *self.lock = false;
    }
}

pub(crate) fn open_trie(db: &NodeDb, scope: NodeScope, root: H256) -> Trie {
    match scope {
        NodeScope::State => db.store().open_state_trie(root),
        NodeScope::Storage(address) => db.store().open_storage_trie(address, root),
    }
}

/// One round of the five-step healing loop against whichever trie `scope`/`root` name. Returns
/// `Ok(true)` once `missingNodes`/`checkNodes` are both empty (the trie is fully healed),
/// `Ok(false)` if there's more work to do next round.
///
/// `fetch` stands in for `getTrieNodes`: it's given the batch of [`NodeSpecs`] drained from
/// `missingNodes` (capped at `max_trie_node_fetch`) and must return one blob per spec, in order.
/// `on_leaf` is handed the full 32-byte key and raw value of every leaf imported this round, for
/// callers that need to interpret the value (an [`AccountState`] for accounts, a raw slot value
/// for storage).
#[allow(clippy::too_many_arguments)]
pub fn heal_round(
    batch: &mut SnapRangeBatch,
    covered: &mut NodeTagRangeSet,
    counter: &mut u64,
    db: &NodeDb,
    scope: NodeScope,
    root: H256,
    peer: PeerId,
    inspection_batch: usize,
    max_trie_node_fetch: usize,
    fetch: &mut dyn FnMut(&[NodeSpecs]) -> Result<Vec<Vec<u8>>, SnapSyncError>,
    mut on_leaf: impl FnMut(H256, &[u8]),
) -> Result<bool, SnapSyncError> {
    // 1. Update missing: a sibling worker may have imported one of our dangling refs already.
    let mut still_missing = Vec::with_capacity(batch.sick_sub_tries.len());
    for w in batch.sick_sub_tries.drain(..) {
        let present = match scope {
            NodeScope::State => !db.get_fn_state(&w.node_hash).is_empty(),
            NodeScope::Storage(address) => !db.get_fn_storage(address, &w.node_hash).is_empty(),
        };
        if present {
            batch.check_nodes.push(w.partial_path.as_ref().to_vec());
        } else {
            still_missing.push(w);
        }
    }
    batch.sick_sub_tries = still_missing;

    // 2. Inspect: re-walk from whatever's queued in `check_nodes`, resuming the prior cursor.
    if !batch.check_nodes.is_empty() || batch.sick_sub_tries.is_empty() {
        let guard = TriePerusalGuard::acquire(&mut batch.lock_trie_perusal)
            .ok_or(SnapSyncError::TrieIsLockedForPerusal)?;
        let paths: Vec<Nibbles> = batch.check_nodes.drain(..).map(Nibbles::from_hex).collect();
        let trie = open_trie(db, scope, root);
        let inspect = hexary_inspect_trie(
            trie.state(),
            Some(NodeHash::from(root)),
            &paths,
            batch.resume_ctx.take(),
            inspection_batch,
        )?;
        drop(guard);
        batch.sick_sub_tries.extend(inspect.dangling);
        batch.resume_ctx = inspect.resume_ctx;
    }

    // 3. Exit if complete.
    if batch.sick_sub_tries.is_empty() && batch.check_nodes.is_empty() {
        return Ok(true);
    }

    // 4. Fetch, capped at `max_trie_node_fetch`.
    let take = batch.sick_sub_tries.len().min(max_trie_node_fetch);
    if take == 0 {
        return Ok(false);
    }
    let specs: Vec<NodeSpecs> = batch.sick_sub_tries.drain(..take).collect();
    let blobs = match fetch(&specs) {
        Ok(blobs) => blobs,
        Err(e) => {
            batch.sick_sub_tries.extend(specs);
            return Err(e);
        }
    };

    // 5. Import, classifying each report.
    let reports = db.import_raw_nodes(peer, scope, &specs, &blobs);
    for (spec, report) in specs.iter().zip(reports.iter()) {
        match report {
            NodeReport::Rejected { .. } => batch.sick_sub_tries.push(spec.clone()),
            NodeReport::Imported { node, .. } => match node {
                Node::Leaf(leaf) => {
                    let full_path = spec.partial_path.concat(leaf.partial.clone());
                    let key_bytes = full_path.to_bytes();
                    if key_bytes.len() == 32 {
                        let key = H256::from_slice(&key_bytes);
                        let tag = NodeTagRange::from_hash(key);
                        let single = NodeTagRange::single(tag);
                        batch.unprocessed.0.reduce(single);
                        batch.unprocessed.1.reduce(single);
                        covered.merge(single);
                        *counter += 1;
                        on_leaf(key, &leaf.value);
                    }
                }
                Node::Branch(_) | Node::Extension(_) => {
                    batch.check_nodes.push(spec.partial_path.as_ref().to_vec());
                }
            },
        }
    }

    Ok(batch.sick_sub_tries.is_empty() && batch.check_nodes.is_empty())
}

/// Account healing: wraps [`heal_round`] scoped to the state trie, decoding every found leaf
/// back into an [`AccountState`] and, when its storage root isn't the empty trie, handing
/// `(acc_key, storage_root)` to `needs_storage` so the caller can turn it into a
/// `fetchStorageFull`/`fetchStoragePart` work item.
#[allow(clippy::too_many_arguments)]
pub fn heal_accounts_round(
    batch: &mut SnapRangeBatch,
    covered_accounts: &mut NodeTagRangeSet,
    n_accounts: &mut u64,
    db: &NodeDb,
    state_root: H256,
    peer: PeerId,
    inspection_batch: usize,
    max_trie_node_fetch: usize,
    fetch: &mut dyn FnMut(&[NodeSpecs]) -> Result<Vec<Vec<u8>>, SnapSyncError>,
    mut needs_storage: impl FnMut(H256, H256),
) -> Result<bool, SnapSyncError> {
    heal_round(
        batch,
        covered_accounts,
        n_accounts,
        db,
        NodeScope::State,
        state_root,
        peer,
        inspection_batch,
        max_trie_node_fetch,
        fetch,
        |key, value| {
            if let Ok((account, _)) = AccountState::decode_unfinished(value) {
                if account.storage_root != *EMPTY_TRIE_HASH {
                    needs_storage(key, account.storage_root);
                }
            }
        },
    )
}

/// Storage healing: identical loop scoped to one account's storage trie. Slot values are raw
/// bytes; there's nothing further to decode or enqueue once a leaf lands.
#[allow(clippy::too_many_arguments)]
pub fn heal_storage_round(
    batch: &mut SnapRangeBatch,
    covered_slots: &mut NodeTagRangeSet,
    n_slot_lists: &mut u64,
    db: &NodeDb,
    address: Address,
    storage_root: H256,
    peer: PeerId,
    inspection_batch: usize,
    max_trie_node_fetch: usize,
    fetch: &mut dyn FnMut(&[NodeSpecs]) -> Result<Vec<Vec<u8>>, SnapSyncError>,
) -> Result<bool, SnapSyncError> {
    heal_round(
        batch,
        covered_slots,
        n_slot_lists,
        db,
        NodeScope::Storage(address),
        storage_root,
        peer,
        inspection_batch,
        max_trie_node_fetch,
        fetch,
        |_key, _value| {},
    )
}

/// `spec.md` §4.G storage edge case: a `fetchStorageFull` entry marked `inherit=true` (its root
/// was already fetched in full for a sibling account) is accepted without any network I/O the
/// moment a single inspect pass over the already-present trie turns up zero dangling children.
pub fn accept_work_item_as_is(
    db: &NodeDb,
    address: Address,
    storage_root: H256,
    inspection_batch: usize,
) -> Result<bool, SnapSyncError> {
    if storage_root == *EMPTY_TRIE_HASH {
        return Ok(true);
    }
    let trie = db.store().open_storage_trie(address, storage_root);
    let result = hexary_inspect_trie(
        trie.state(),
        Some(NodeHash::from(storage_root)),
        &[],
        None,
        inspection_batch,
    )?;
    Ok(!result.stopped && result.dangling.is_empty())
}
