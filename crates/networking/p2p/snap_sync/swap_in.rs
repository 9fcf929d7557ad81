//! Swap-in reconciler (`spec.md` §4.I): when a new pivot becomes top, stretches of its trie may
//! be byte-identical to an older, mothballed pivot's already-`processed` sub-tries (an unchanged
//! account or contract storage slot). Recognising that lets the new pivot credit the range
//! without a single network fetch.
//!
//! Grounded on `hexary.rs`'s own `hexary_envelope_decompose` (component B): this module is just
//! the scheduling glue around it — decompose, classify by presence in the node DB, then compare
//! envelopes against donor pivots' `processed` sets.

use ethereum_rust_trie::{
    hexary_envelope, hexary_envelope_decompose, NodeHash, NodeTagRangeSet, Nibbles, TrieError,
};
use ethereum_types::H256;

use crate::snap_sync::healer::open_trie;
use crate::snap_sync::node_db::{NodeDb, NodeScope};
use crate::snap_sync::pivot::SnapRangeBatch;

/// Upper bound on reconciliation passes per call to [`reconcile`] (`spec.md` §4.I step 4:
/// "repeat until no new ranges are merged, or `loopMax` iterations elapse").
pub const LOOP_MAX: u32 = 16;

/// One donor: another pivot's trie root and the `processed` ranges confirmed against it, scoped
/// identically to the batch being reconciled (both state, or the same account's storage).
pub struct Donor {
    pub processed: NodeTagRangeSet,
}

/// Single pass of the reconciler over `batch.check_nodes`: decomposes each against `batch.processed`,
/// classifies the disjoint fragments as missing (→ `sick_sub_tries`) or allocated (kept for
/// swap-in), and for each allocated fragment, credits any donor's overlapping `processed` range
/// into this batch's `processed`/out of `unprocessed`. Returns how many ranges were merged.
fn swap_in_once(
    batch: &mut SnapRangeBatch,
    db: &NodeDb,
    scope: NodeScope,
    root: H256,
    donors: &[Donor],
) -> Result<u64, TrieError> {
    let trie = open_trie(db, scope, root);
    let paths: Vec<Nibbles> = batch.check_nodes.drain(..).map(Nibbles::from_hex).collect();
    let mut merged = 0u64;
    let mut still_check = Vec::new();

    for path in paths {
        let specs =
            hexary_envelope_decompose(trie.state(), NodeHash::from(root), &path, &batch.processed)?;
        for spec in specs {
            let present = match scope {
                NodeScope::State => !db.get_fn_state(&spec.node_hash).is_empty(),
                NodeScope::Storage(address) => !db.get_fn_storage(address, &spec.node_hash).is_empty(),
            };
            if !present {
                batch.sick_sub_tries.push(spec);
                continue;
            }

            let env = hexary_envelope(&spec.partial_path);
            let mut credited = false;
            for donor in donors {
                for donor_range in donor.processed.ranges() {
                    if let Some(iv) = donor_range.intersection(&env) {
                        batch.processed.merge(iv);
                        batch.unprocessed.0.reduce(iv);
                        batch.unprocessed.1.reduce(iv);
                        merged += 1;
                        credited = true;
                    }
                }
            }
            if !credited {
                still_check.push(spec.partial_path.as_ref().to_vec());
            }
        }
    }

    batch.check_nodes = still_check;
    Ok(merged)
}

/// Runs [`swap_in_once`] repeatedly until a pass merges nothing new or [`LOOP_MAX`] passes have
/// run, whichever comes first. Returns the total ranges merged across all passes.
pub fn reconcile(
    batch: &mut SnapRangeBatch,
    db: &NodeDb,
    scope: NodeScope,
    root: H256,
    donors: &[Donor],
) -> Result<u64, TrieError> {
    let mut total = 0u64;
    for _ in 0..LOOP_MAX {
        if batch.check_nodes.is_empty() {
            break;
        }
        let merged = swap_in_once(batch, db, scope, root, donors)?;
        total += merged;
        if merged == 0 {
            break;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_rust_core::types::AccountState;
    use ethereum_rust_rlp::encode::RLPEncode;
    use ethereum_rust_storage::Store;
    use ethereum_rust_trie::{NodeTag, NodeTagRange};

    fn seeded_root(store: &Store, n: u8) -> H256 {
        let mut trie = store.open_state_trie(*ethereum_rust_trie::EMPTY_TRIE_HASH);
        for i in 0..n {
            let key = H256::repeat_byte(i);
            let account = AccountState {
                nonce: i as u64,
                ..Default::default()
            };
            trie.insert(key.0.to_vec(), account.encode_to_vec()).unwrap();
        }
        trie.hash().unwrap()
    }

    #[test]
    fn reconcile_merges_nothing_when_there_are_no_donors() {
        let store = Store::new();
        let root = seeded_root(&store, 4);
        let db = NodeDb::new(store);
        let mut batch = SnapRangeBatch::covering_everything();
        batch.check_nodes.push(vec![]);

        let merged = reconcile(&mut batch, &db, NodeScope::State, root, &[]).unwrap();
        assert_eq!(merged, 0);
    }

    #[test]
    fn reconcile_credits_a_donors_processed_range_for_an_identical_sub_trie() {
        let store = Store::new();
        // Both "pivots" share the very same root here (an unchanged trie across pivots is
        // exactly the case this reconciler is meant to recognise).
        let root = seeded_root(&store, 4);
        let db = NodeDb::new(store);

        let mut donor_processed = NodeTagRangeSet::new();
        donor_processed.merge(NodeTagRange::full());
        let donors = vec![Donor {
            processed: donor_processed,
        }];

        let mut batch = SnapRangeBatch::covering_everything();
        batch.check_nodes.push(vec![]);

        let merged = reconcile(&mut batch, &db, NodeScope::State, root, &donors).unwrap();
        assert!(merged > 0);
        assert!(!batch.processed.is_empty());
    }

    #[test]
    fn reconcile_sends_genuinely_missing_nodes_to_sick_sub_tries() {
        let store = Store::new();
        let root = seeded_root(&store, 4);
        // A bogus root the node DB has nothing for: the very first lookup is a miss.
        let bogus_root = H256::repeat_byte(0xee);
        let _ = root;
        let db = NodeDb::new(store);
        let mut batch = SnapRangeBatch::covering_everything();
        batch.check_nodes.push(vec![]);

        reconcile(&mut batch, &db, NodeScope::State, bogus_root, &[]).unwrap();
        assert!(!batch.sick_sub_tries.is_empty());
    }
}
