//! Error kinds for the snap-sync core, partitioned the way `spec.md` §7 describes: transient
//! peer errors that just return the claim and retry, protocol violations and proof failures that
//! zombie the peer, and local-fatal errors that abort healing for the current pivot.

use ethereum_rust_rlp::error::RLPDecodeError;
use ethereum_rust_trie::TrieError;

/// Every fallible operation in the snap-sync core returns `Result<T, SnapSyncError>` (or a
/// narrower component error that converts into this one via `#[from]`), mirroring the teacher's
/// `SyncError`/`StoreError` pattern of one crate-wide error enum composed from component errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapSyncError {
    // --- Transient peer errors (§7: return the claim, sleep ~5s, retry) ---
    #[error("peer response timed out")]
    ResponseTimeout,
    #[error("network problem talking to peer: {0}")]
    NetworkProblem(String),
    #[error("request had no arguments to send")]
    EmptyRequestArguments,

    // --- Protocol violations (§6 wire-rule list: peer is zombied immediately) ---
    #[error("account range response had no accounts for this state root")]
    NoAccountsForStateRoot,
    #[error("account range response's first account undercuts the requested start hash")]
    AccountsMinTooSmall,
    #[error("account range response's second-largest account exceeds the requested limit hash")]
    AccountsMaxTooLarge,
    #[error("storage ranges response had more slot lists than accounts requested")]
    TooManyStorageSlots,
    #[error("storage ranges response was empty")]
    NoStorageForAccounts,
    #[error("byte codes response was empty")]
    NoByteCodesAvailable,
    #[error("byte codes response had more codes than hashes requested")]
    TooManyByteCodes,
    #[error("trie nodes response was empty")]
    NoTrieNodesAvailable,
    #[error("trie nodes response had more nodes than paths requested")]
    TooManyTrieNodes,
    #[error("account ranges overlap with a previously accepted range")]
    AccountRangesOverlap,
    #[error("import of a verified fragment failed: {0}")]
    ImportFailed(String),

    // --- Proof / hash mismatch (peer zombied, claim released) ---
    #[error(transparent)]
    RlpEncoding(#[from] RLPDecodeError),
    #[error("proof was missing where one was required")]
    MissingProof,
    #[error("proof root node did not match the expected state root")]
    RootNodeMismatch,
    #[error("right boundary proof failed verification")]
    RightBoundaryProofFailed,

    // --- Local fatal (surfaced upward, healing aborted for this pivot) ---
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error("trie perusal is locked by another task")]
    TrieIsLockedForPerusal,

    // --- Checkpoint/recovery (§6) ---
    #[error("checkpoint has more processed chunks than accountsSaveProcessedChunksMax allows")]
    TooManyProcessedChunks,
    #[error("checkpoint has more slot accounts than accountsSaveStorageSlotsMax allows")]
    TooManySlotAccounts,
    #[error("nothing has been downloaded yet, there is no checkpoint to save")]
    NoAccountsYet,

    // --- Benign (logged only, not escalated) ---
    #[error("nothing serious")]
    NothingSerious,
    #[error("trie is empty")]
    TrieIsEmpty,
}

impl SnapSyncError {
    /// Whether this error should zombie the peer that produced it, per `spec.md` §7's
    /// transient-vs-protocol-violation-vs-proof-failure partition. Transient errors and local
    /// fatal errors do not zombie the peer; everything else does.
    pub fn zombies_peer(&self) -> bool {
        !matches!(
            self,
            SnapSyncError::ResponseTimeout
                | SnapSyncError::NetworkProblem(_)
                | SnapSyncError::EmptyRequestArguments
                | SnapSyncError::Trie(_)
                | SnapSyncError::TrieIsLockedForPerusal
                | SnapSyncError::TooManyProcessedChunks
                | SnapSyncError::TooManySlotAccounts
                | SnapSyncError::NoAccountsYet
                | SnapSyncError::NothingSerious
                | SnapSyncError::TrieIsEmpty
        )
    }

    /// Whether this is a `ResponseTimeout`, the only error kind that counts towards
    /// `maxTimeoutErrors` consecutive-timeout zombie promotion (as opposed to zombying
    /// immediately on the first occurrence, as protocol violations do).
    pub fn is_timeout(&self) -> bool {
        matches!(self, SnapSyncError::ResponseTimeout)
    }
}
