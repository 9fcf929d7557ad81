use ethereum_rust_rlp::error::RLPDecodeError;
#[cfg(feature = "redb")]
use redb::{CommitError, StorageError, TableError, TransactionError};
use thiserror::Error;

/// Alias kept for the flat node-DB backends, which predate the `TrieError` rename.
pub type StoreError = TrieError;

#[derive(Debug, Error)]
pub enum TrieError {
    #[cfg(feature = "libmdbx")]
    #[error("Libmdbx error: {0}")]
    LibmdbxError(anyhow::Error),
    #[cfg(feature = "redb")]
    #[error("Redb Storage error: {0}")]
    RedbStorageError(#[from] StorageError),
    #[cfg(feature = "redb")]
    #[error("Redb Table error: {0}")]
    #[cfg(feature = "redb")]
    RedbTableError(#[from] TableError),
    #[error("Redb Commit error: {0}")]
    #[cfg(feature = "redb")]
    RedbCommitError(#[from] CommitError),
    #[error("Redb Transaction error: {0}")]
    #[cfg(feature = "redb")]
    RedbTransactionError(#[from] TransactionError),
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error("Verification Error: {0}")]
    Verify(String),
    #[error("Tried to traverse a trie node that should exist but is missing from the DB")]
    InconsistentTree,
    #[error("Trie traversal exceeded the maximum key depth, the node graph likely contains a cycle")]
    TrieLoopAlert,
}
