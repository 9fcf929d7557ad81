//! Checkpoint/recovery (`spec.md` §4.J): the persisted schema a pivot's progress is serialized
//! into, and the rehydration path that turns a saved record back into a `SnapPivot`.
//!
//! `{header, nAccounts, nSlotLists, processed, slotAccounts}` is RLP-encoded the same way every
//! other wire/storage record in this workspace is (`Encoder`/`Decoder`, one field per line, no
//! serde) and handed to `NodeDb::save_pivot`/`load_pivot` as an opaque blob — this module owns
//! the schema, not the byte storage.

use ethereum_rust_core::types::BlockHeader;
use ethereum_rust_rlp::decode::RLPDecode;
use ethereum_rust_rlp::encode::RLPEncode;
use ethereum_rust_rlp::error::RLPDecodeError;
use ethereum_rust_rlp::structs::{Decoder, Encoder};
use ethereum_rust_trie::{NodeTag, NodeTagRange, NodeTagRangeSet};
use ethereum_types::H256;

use crate::snap_sync::config::SnapConfig;
use crate::snap_sync::error::SnapSyncError;
use crate::snap_sync::node_db::NodeDb;
use crate::snap_sync::pivot::{SnapPivot, SnapRangeBatch};

/// `spec.md` §6's persisted checkpoint schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub header: BlockHeader,
    pub n_accounts: u64,
    pub n_slot_lists: u64,
    pub processed: Vec<(H256, H256)>,
    pub slot_accounts: Vec<H256>,
}

impl RLPEncode for CheckpointRecord {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.header)
            .encode_field(&self.n_accounts)
            .encode_field(&self.n_slot_lists)
            .encode_field(&self.processed)
            .encode_field(&self.slot_accounts)
            .finish();
    }
}

impl RLPDecode for CheckpointRecord {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (header, decoder) = decoder.decode_field("header")?;
        let (n_accounts, decoder) = decoder.decode_field("n_accounts")?;
        let (n_slot_lists, decoder) = decoder.decode_field("n_slot_lists")?;
        let (processed, decoder) = decoder.decode_field("processed")?;
        let (slot_accounts, decoder) = decoder.decode_field("slot_accounts")?;
        let record = CheckpointRecord {
            header,
            n_accounts,
            n_slot_lists,
            processed,
            slot_accounts,
        };
        Ok((record, decoder.finish()?))
    }
}

/// Builds a [`CheckpointRecord`] out of a live pivot, per `spec.md` §4.J:
/// `slotAccounts` is the union of `fetch_storage_full`/`fetch_storage_part`/`parked_storage`
/// keys. Fails with `NoAccountsYet` if the pivot has made no progress at all, or with
/// `TooManyProcessedChunks`/`TooManySlotAccounts` once either collection would overflow its
/// configured limit — better to refuse a checkpoint than to write one recovery can't load back.
pub fn save_checkpoint(
    pivot: &SnapPivot,
    db: &NodeDb,
    config: &SnapConfig,
) -> Result<(), SnapSyncError> {
    if pivot.n_accounts == 0 {
        return Err(SnapSyncError::NoAccountsYet);
    }

    let processed: Vec<(H256, H256)> = pivot
        .fetch_accounts
        .processed
        .ranges()
        .iter()
        .map(|r| (NodeTagRange::to_hash(r.start), NodeTagRange::to_hash(r.end)))
        .collect();
    if processed.len() > config.accounts_save_processed_chunks_max {
        return Err(SnapSyncError::TooManyProcessedChunks);
    }

    let mut slot_accounts: Vec<H256> = pivot
        .fetch_storage_full
        .values()
        .map(|e| e.acc_key)
        .chain(pivot.fetch_storage_part.values().map(|e| e.acc_key))
        .chain(pivot.parked_storage.iter().copied())
        .collect();
    slot_accounts.sort();
    slot_accounts.dedup();
    if slot_accounts.len() > config.accounts_save_storage_slots_max {
        return Err(SnapSyncError::TooManySlotAccounts);
    }

    let record = CheckpointRecord {
        header: pivot.state_header.clone(),
        n_accounts: pivot.n_accounts,
        n_slot_lists: pivot.n_slot_lists,
        processed,
        slot_accounts,
    };
    db.save_pivot(record.encode_to_vec());
    Ok(())
}

/// Rehydrates a [`SnapPivot`] out of the last saved checkpoint, per `spec.md` §4.J.
/// `processed` is restored as intervals and subtracted from a fresh `unprocessed[0]`. For each
/// `slotAccounts` entry: if its tag lands inside the restored `processed` set, its account is
/// re-read from the node DB and, if its storage root isn't empty, a storage work item is
/// enqueued; accounts that have since vanished from the node DB are instead dropped back into
/// `unprocessed` (their account data was never actually committed).
pub fn recover_pivot_from_checkpoint(
    record: &CheckpointRecord,
    db: &NodeDb,
) -> SnapPivot {
    let mut pivot = SnapPivot::new(record.header.clone());
    pivot.n_accounts = record.n_accounts;
    pivot.n_slot_lists = record.n_slot_lists;

    let mut processed = NodeTagRangeSet::new();
    for (start, end) in &record.processed {
        processed.merge(NodeTagRange::new(
            NodeTagRange::from_hash(*start),
            NodeTagRange::from_hash(*end),
        ));
    }

    let mut unprocessed = NodeTagRangeSet::full();
    for r in processed.ranges() {
        unprocessed.reduce(*r);
    }
    pivot.fetch_accounts = SnapRangeBatch {
        unprocessed: (unprocessed, NodeTagRangeSet::new()),
        processed: processed.clone(),
        ..SnapRangeBatch::default()
    };

    for &acc_key in &record.slot_accounts {
        let tag = NodeTagRange::from_hash(acc_key);
        let inside_processed = processed.covered(NodeTagRange::single(tag)) > NodeTag::zero();
        if !inside_processed {
            pivot
                .fetch_accounts
                .unprocessed
                .1
                .merge(NodeTagRange::single(tag));
            continue;
        }
        match read_account_storage_root(db, record.header.state_root, acc_key) {
            Some(storage_root) if storage_root != *ethereum_rust_trie::EMPTY_TRIE_HASH => {
                pivot.fetch_storage_full.insert(
                    storage_root,
                    crate::snap_sync::pivot::StorageFullEntry { acc_key },
                );
                pivot.storage_accounts.insert(acc_key, storage_root);
            }
            Some(_) => {}
            None => {
                pivot
                    .fetch_accounts
                    .unprocessed
                    .1
                    .merge(NodeTagRange::single(tag));
            }
        }
    }

    pivot
}

fn read_account_storage_root(db: &NodeDb, state_root: H256, acc_key: H256) -> Option<H256> {
    use ethereum_rust_core::types::AccountState;

    let trie = db.store().open_state_trie(state_root);
    let value = trie.get(&acc_key.0.to_vec()).ok().flatten()?;
    let (account, _) = AccountState::decode_unfinished(&value).ok()?;
    Some(account.storage_root)
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_rust_core::types::AccountState;
    use ethereum_rust_rlp::encode::RLPEncode as _;
    use ethereum_rust_storage::Store;
    use ethereum_rust_trie::EMPTY_TRIE_HASH;

    fn header() -> BlockHeader {
        BlockHeader {
            number: 100,
            ..Default::default()
        }
    }

    #[test]
    fn checkpoint_record_round_trips_through_rlp() {
        let record = CheckpointRecord {
            header: header(),
            n_accounts: 42,
            n_slot_lists: 7,
            processed: vec![(H256::zero(), H256::repeat_byte(1))],
            slot_accounts: vec![H256::repeat_byte(2)],
        };
        let bytes = record.encode_to_vec();
        let decoded = CheckpointRecord::decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn save_checkpoint_refuses_a_pivot_with_no_progress() {
        let db = NodeDb::new(Store::new());
        let config = SnapConfig::default();
        let pivot = SnapPivot::new(header());
        let err = save_checkpoint(&pivot, &db, &config).unwrap_err();
        assert!(matches!(err, SnapSyncError::NoAccountsYet));
    }

    #[test]
    fn save_checkpoint_then_recover_restores_progress_counters() {
        let store = Store::new();
        let mut pivot = SnapPivot::new(header());
        pivot.n_accounts = 5;
        pivot.n_slot_lists = 2;
        pivot
            .fetch_accounts
            .processed
            .merge(NodeTagRange::new(NodeTag::zero(), NodeTag::from(99u64)));

        let db = NodeDb::new(store);
        let config = SnapConfig::default();
        save_checkpoint(&pivot, &db, &config).unwrap();

        let bytes = db.load_pivot().unwrap();
        let record = CheckpointRecord::decode(&bytes).unwrap();
        let recovered = recover_pivot_from_checkpoint(&record, &db);
        assert_eq!(recovered.n_accounts, 5);
        assert_eq!(recovered.n_slot_lists, 2);
        assert!(!recovered.fetch_accounts.processed.is_empty());
    }

    #[test]
    fn recover_enqueues_storage_work_for_a_slot_account_with_nonempty_root() {
        let store = Store::new();
        let acc_key = H256::repeat_byte(5);
        let storage_root = H256::repeat_byte(9);

        let mut trie = store.open_state_trie(*EMPTY_TRIE_HASH);
        let account = AccountState {
            storage_root,
            ..Default::default()
        };
        trie.insert(acc_key.0.to_vec(), account.encode_to_vec()).unwrap();
        let state_root = trie.hash().unwrap();

        let mut record = CheckpointRecord {
            header: BlockHeader {
                number: 1,
                state_root,
                ..Default::default()
            },
            n_accounts: 1,
            n_slot_lists: 0,
            processed: vec![(H256::zero(), NodeTagRange::to_hash(NodeTag::MAX))],
            slot_accounts: vec![acc_key],
        };
        record.header.state_root = state_root;

        let db = NodeDb::new(store);
        let recovered = recover_pivot_from_checkpoint(&record, &db);
        assert!(recovered.fetch_storage_full.contains_key(&storage_root));
    }
}
