mod error;

pub use error::StoreError;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use ethereum_types::{Address, H256};

use ethereum_rust_trie::{InMemoryTrieDB, Trie};

pub type NodeMap = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

/// Flat node storage backing the world state trie and every account's storage trie.
///
/// Snap-sync only ever needs two things out of persistence: a place to stash trie nodes as
/// they're fetched and proven, and a place to stash bytecode by its hash. Block/receipt/chain
/// bookkeeping lives outside this crate's scope.
#[derive(Default, Clone)]
pub struct Store(Arc<Mutex<StoreInner>>);

#[derive(Default)]
struct StoreInner {
    account_codes: HashMap<H256, Bytes>,
    state_trie_nodes: NodeMap,
    storage_trie_nodes: HashMap<Address, NodeMap>,
    pivot_checkpoint: Option<Vec<u8>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.0.lock().unwrap()
    }

    /// Opens the global state trie rooted at `state_root`, creating the backing node map on
    /// first use. Reopening the same store later with a different root reuses whatever nodes
    /// were already committed under it.
    pub fn open_state_trie(&self, state_root: H256) -> Trie {
        let backend = self.inner().state_trie_nodes.clone();
        Trie::open(Box::new(InMemoryTrieDB::new(backend)), state_root)
    }

    /// Opens the storage trie for `address`, rooted at `storage_root`. Each account gets its
    /// own node map so healing one account's storage never touches another's.
    pub fn open_storage_trie(&self, address: Address, storage_root: H256) -> Trie {
        let mut inner = self.inner();
        let backend = inner.storage_trie_nodes.entry(address).or_default().clone();
        Trie::open(Box::new(InMemoryTrieDB::new(backend)), storage_root)
    }

    /// Returns whether a raw node is already present for the given account's storage trie,
    /// without decoding it. Used by the healer to skip re-requesting nodes it already has.
    pub fn contains_storage_node(&self, address: Address, node_hash: Vec<u8>) -> bool {
        let mut inner = self.inner();
        let backend = inner.storage_trie_nodes.entry(address).or_default();
        backend.lock().unwrap().contains_key(&node_hash)
    }

    /// Returns whether a raw node is already present in the state trie's backing map.
    pub fn contains_state_node(&self, node_hash: Vec<u8>) -> bool {
        self.inner()
            .state_trie_nodes
            .lock()
            .unwrap()
            .contains_key(&node_hash)
    }

    pub fn add_account_code(&self, code_hash: H256, code: Bytes) -> Result<(), StoreError> {
        self.inner().account_codes.insert(code_hash, code);
        Ok(())
    }

    pub fn get_account_code(&self, code_hash: H256) -> Result<Option<Bytes>, StoreError> {
        Ok(self.inner().account_codes.get(&code_hash).cloned())
    }

    /// Flat `key -> blob` lookup into the state trie's node map, bypassing any particular
    /// trie's root. This is the `getFn` the healer and scheduler use to probe for a node by
    /// hash alone.
    pub fn get_state_node_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner()
            .state_trie_nodes
            .lock()
            .unwrap()
            .get(key)
            .cloned()
    }

    /// Writes a hash-verified node blob straight into the state trie's node map.
    pub fn put_state_node_raw(&self, key: Vec<u8>, blob: Vec<u8>) {
        self.inner()
            .state_trie_nodes
            .lock()
            .unwrap()
            .insert(key, blob);
    }

    /// Same as [`Store::get_state_node_raw`] but scoped to one account's storage trie.
    pub fn get_storage_node_raw(&self, address: Address, key: &[u8]) -> Option<Vec<u8>> {
        let mut inner = self.inner();
        let backend = inner.storage_trie_nodes.entry(address).or_default();
        backend.lock().unwrap().get(key).cloned()
    }

    /// Same as [`Store::put_state_node_raw`] but scoped to one account's storage trie.
    pub fn put_storage_node_raw(&self, address: Address, key: Vec<u8>, blob: Vec<u8>) {
        let mut inner = self.inner();
        let backend = inner.storage_trie_nodes.entry(address).or_default();
        backend.lock().unwrap().insert(key, blob);
    }

    /// Whether anything at all has been stored for this account's storage trie yet. Used by
    /// the scheduler to tell "freshly seen storage root" apart from "in progress or complete".
    pub fn have_storage_slots_data(&self, address: Address) -> bool {
        let mut inner = self.inner();
        let backend = inner.storage_trie_nodes.entry(address).or_default();
        !backend.lock().unwrap().is_empty()
    }

    /// Persists an opaque checkpoint blob (the encoded pivot batch state). Only the latest
    /// checkpoint is kept; callers decide cadence and schema.
    pub fn save_pivot_checkpoint(&self, blob: Vec<u8>) {
        self.inner().pivot_checkpoint = Some(blob);
    }

    /// Reads back the last checkpoint blob saved via [`Store::save_pivot_checkpoint`], if any.
    pub fn load_pivot_checkpoint(&self) -> Option<Vec<u8>> {
        self.inner().pivot_checkpoint.clone()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_rust_trie::EMPTY_TRIE_HASH;

    #[test]
    fn account_code_roundtrip() {
        let store = Store::new();
        let hash = H256::random();
        let code = Bytes::from_static(b"\x60\x00\x60\x00");
        store.add_account_code(hash, code.clone()).unwrap();
        assert_eq!(store.get_account_code(hash).unwrap(), Some(code));
        assert_eq!(store.get_account_code(H256::zero()).unwrap(), None);
    }

    #[test]
    fn state_and_storage_tries_are_independent() {
        let store = Store::new();
        let mut state_trie = store.open_state_trie(*EMPTY_TRIE_HASH);
        state_trie.insert(b"key".to_vec(), b"value".to_vec()).unwrap();
        let state_root = state_trie.hash().unwrap();

        let address = Address::random();
        let storage_trie = store.open_storage_trie(address, *EMPTY_TRIE_HASH);
        assert_eq!(storage_trie.hash_no_commit(), *EMPTY_TRIE_HASH);
        assert_ne!(state_root, *EMPTY_TRIE_HASH);
    }
}
