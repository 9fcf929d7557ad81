//! Plain data shapes for the four `snap/1` request/response pairs snap-sync drives, plus the
//! response validation rules from the wire contract.
//!
//! Wire framing (RLPx message ids, snappy compression) is out of scope here: that's the
//! transport codec's job. This module only shapes the data `PeerChannels` sends and receives,
//! and checks a response against what was asked for before anything downstream trusts it.

use ethereum_rust_core::types::AccountState;
use ethereum_types::{H256, H512};
use sha3::{Digest, Keccak256};

use crate::snap_sync::error::SnapSyncError;

/// Opaque remote-peer identifier (the peer's node id). The discovery/connection-pool
/// collaborator hands these out; snap-sync only ever uses them as a lookup key.
pub type PeerId = H512;

#[derive(Debug, Clone)]
pub struct GetAccountRange {
    pub state_root: H256,
    pub start_hash: H256,
    pub limit_hash: H256,
    pub bytes_limit: u64,
}

#[derive(Debug, Clone)]
pub struct PackedAccount {
    pub acc_key: H256,
    pub acc_blob: AccountState,
}

#[derive(Debug, Clone, Default)]
pub struct AccountRange {
    pub accounts: Vec<PackedAccount>,
    pub proof: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct GetStorageRanges {
    pub state_root: H256,
    pub account_hashes: Vec<H256>,
    pub start_hash: H256,
    pub limit_hash: H256,
    pub bytes_limit: u64,
}

/// One account's worth of storage slots, as returned in a `StorageRanges` response.
pub type StorageSlotList = Vec<(H256, Vec<u8>)>;

#[derive(Debug, Clone, Default)]
pub struct StorageRanges {
    pub slots: Vec<StorageSlotList>,
    pub proof: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct GetByteCodes {
    pub hashes: Vec<H256>,
    pub bytes_limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ByteCodes {
    pub codes: Vec<Vec<u8>>,
}

/// One element of a `GetTrieNodes` request: an account path plus, if this request also wants
/// nodes out of that account's storage trie, the sub-paths within it.
#[derive(Debug, Clone)]
pub struct TrieNodePaths {
    pub account_path: Vec<u8>,
    pub slot_paths: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct GetTrieNodes {
    pub state_root: H256,
    pub paths: Vec<TrieNodePaths>,
    pub bytes_limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrieNodes {
    pub nodes: Vec<Vec<u8>>,
}

/// `0 accounts, 0 proof` is rejected outright; otherwise the first account must not undercut
/// `startHash` and only the single largest account may overshoot `limitHash` (that one carries
/// the terminal boundary proof).
pub fn validate_account_range(
    req: &GetAccountRange,
    resp: &AccountRange,
) -> Result<(), SnapSyncError> {
    if resp.accounts.is_empty() && resp.proof.is_empty() {
        return Err(SnapSyncError::NoAccountsForStateRoot);
    }
    if let Some(first) = resp.accounts.first() {
        if first.acc_key < req.start_hash {
            return Err(SnapSyncError::AccountsMinTooSmall);
        }
    }
    if resp.accounts.len() >= 2 {
        let second_largest = &resp.accounts[resp.accounts.len() - 2];
        if second_largest.acc_key > req.limit_hash {
            return Err(SnapSyncError::AccountsMaxTooLarge);
        }
    }
    Ok(())
}

pub fn validate_storage_ranges(
    req: &GetStorageRanges,
    resp: &StorageRanges,
) -> Result<(), SnapSyncError> {
    if resp.slots.len() > req.account_hashes.len() {
        return Err(SnapSyncError::TooManyStorageSlots);
    }
    if resp.slots.is_empty() {
        return Err(SnapSyncError::NoStorageForAccounts);
    }
    Ok(())
}

/// Result of checking a `ByteCodes` response against what was requested: codes that hashed to
/// a requested hash (`kv_pairs`), codes that didn't match anything we asked for (`extra`), and
/// hashes we asked for but never got a code back for (`left_over`).
pub struct ByteCodeReport {
    pub kv_pairs: Vec<(H256, Vec<u8>)>,
    pub extra: Vec<Vec<u8>>,
    pub left_over: Vec<H256>,
}

pub fn validate_byte_codes(
    req: &GetByteCodes,
    resp: &ByteCodes,
) -> Result<ByteCodeReport, SnapSyncError> {
    if resp.codes.is_empty() {
        return Err(SnapSyncError::NoByteCodesAvailable);
    }
    if resp.codes.len() > req.hashes.len() {
        return Err(SnapSyncError::TooManyByteCodes);
    }
    let mut left_over = req.hashes.clone();
    let mut kv_pairs = Vec::with_capacity(resp.codes.len());
    let mut extra = Vec::new();
    for code in &resp.codes {
        let hash = H256::from_slice(Keccak256::digest(code).as_slice());
        if let Some(pos) = left_over.iter().position(|h| *h == hash) {
            left_over.remove(pos);
            kv_pairs.push((hash, code.clone()));
        } else {
            extra.push(code.clone());
        }
    }
    Ok(ByteCodeReport {
        kv_pairs,
        extra,
        left_over,
    })
}

pub fn validate_trie_nodes(req: &GetTrieNodes, resp: &TrieNodes) -> Result<(), SnapSyncError> {
    if resp.nodes.is_empty() {
        return Err(SnapSyncError::NoTrieNodesAvailable);
    }
    let max: usize = req.paths.iter().map(|p| p.slot_paths.len().max(1)).sum();
    if resp.nodes.len() > max {
        return Err(SnapSyncError::TooManyTrieNodes);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn account(key: H256) -> PackedAccount {
        PackedAccount {
            acc_key: key,
            acc_blob: AccountState::default(),
        }
    }

    #[test]
    fn empty_response_is_no_accounts_for_state_root() {
        let req = GetAccountRange {
            state_root: H256::zero(),
            start_hash: H256::zero(),
            limit_hash: H256::repeat_byte(0xff),
            bytes_limit: 1024,
        };
        let resp = AccountRange::default();
        assert!(matches!(
            validate_account_range(&req, &resp),
            Err(SnapSyncError::NoAccountsForStateRoot)
        ));
    }

    #[test]
    fn first_account_below_start_hash_is_rejected() {
        let req = GetAccountRange {
            state_root: H256::zero(),
            start_hash: H256::repeat_byte(0x10),
            limit_hash: H256::repeat_byte(0xff),
            bytes_limit: 1024,
        };
        let resp = AccountRange {
            accounts: vec![account(H256::repeat_byte(0x01))],
            proof: vec![vec![1]],
        };
        assert!(matches!(
            validate_account_range(&req, &resp),
            Err(SnapSyncError::AccountsMinTooSmall)
        ));
    }

    #[test]
    fn only_the_largest_account_may_exceed_limit_hash() {
        let req = GetAccountRange {
            state_root: H256::zero(),
            start_hash: H256::zero(),
            limit_hash: H256::repeat_byte(0x50),
            bytes_limit: 1024,
        };
        let resp = AccountRange {
            accounts: vec![
                account(H256::repeat_byte(0x10)),
                account(H256::repeat_byte(0x40)),
                account(H256::repeat_byte(0x99)),
            ],
            proof: vec![vec![1]],
        };
        assert!(validate_account_range(&req, &resp).is_ok());
    }

    #[test]
    fn second_largest_past_limit_hash_is_rejected() {
        let req = GetAccountRange {
            state_root: H256::zero(),
            start_hash: H256::zero(),
            limit_hash: H256::repeat_byte(0x50),
            bytes_limit: 1024,
        };
        let resp = AccountRange {
            accounts: vec![
                account(H256::repeat_byte(0x10)),
                account(H256::repeat_byte(0x60)),
                account(H256::repeat_byte(0x99)),
            ],
            proof: vec![vec![1]],
        };
        assert!(matches!(
            validate_account_range(&req, &resp),
            Err(SnapSyncError::AccountsMaxTooLarge)
        ));
    }

    #[test]
    fn byte_codes_partition_matching_and_extra() {
        let wanted = H256::from_slice(Keccak256::digest(b"code-a").as_slice());
        let req = GetByteCodes {
            hashes: vec![wanted, H256::repeat_byte(0xAB)],
            bytes_limit: 1024,
        };
        let resp = ByteCodes {
            codes: vec![b"code-a".to_vec(), b"unrelated".to_vec()],
        };
        let report = validate_byte_codes(&req, &resp).unwrap();
        assert_eq!(report.kv_pairs, vec![(wanted, b"code-a".to_vec())]);
        assert_eq!(report.extra, vec![b"unrelated".to_vec()]);
        assert_eq!(report.left_over, vec![H256::repeat_byte(0xAB)]);
    }
}
