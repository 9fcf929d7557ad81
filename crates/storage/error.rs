use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Trie(#[from] ethereum_rust_trie::TrieError),
    #[error(transparent)]
    RLPDecode(#[from] ethereum_rust_rlp::error::RLPDecodeError),
}
