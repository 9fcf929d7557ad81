//! Per-peer transport for the four `snap/1` request/response pairs (`spec.md` §6, as restated
//! in `protocol.rs`).
//!
//! The RLPx connection itself — framing, snappy compression, message ids — is an external
//! collaborator; this module only multiplexes one connected peer's request/response cycle on
//! top of whatever carries [`Message`] over that connection, the same way the teacher's own
//! `PeerChannels` wraps a single `mpsc` pair per peer and matches replies back to requests by id.

use std::{sync::Arc, time::Duration};

use ethereum_rust_rlp::encode::RLPEncode;
use ethereum_types::H256;
use tokio::sync::{mpsc, Mutex};

use crate::protocol::{
    validate_account_range, validate_byte_codes, validate_storage_ranges, validate_trie_nodes,
    AccountRange, ByteCodeReport, ByteCodes, GetAccountRange, GetByteCodes, GetStorageRanges,
    GetTrieNodes, PeerId, StorageRanges, TrieNodes,
};
use crate::snap_sync::error::SnapSyncError;

/// How long a peer worker waits for a reply before giving up (`spec.md` §7: a
/// [`SnapSyncError::ResponseTimeout`] is transient — the claim is returned and retried elsewhere).
pub const PEER_REPLY_TIMEOUT: Duration = Duration::from_secs(45);

/// Matches the teacher's own generously-sized message channels: deep enough that a worker's next
/// request doesn't block on the previous response being drained.
pub const PEER_CHANNEL_BUFFER: usize = 25;

/// One multiplexed request or response, carrying the request id a peer worker uses to match a
/// reply back to the request that triggered it (replies on the same connection may interleave
/// out of order, same as the teacher's RLPx request ids).
#[derive(Debug, Clone)]
pub enum Message {
    GetAccountRange(u64, GetAccountRange),
    AccountRange(u64, AccountRange),
    GetStorageRanges(u64, GetStorageRanges),
    StorageRanges(u64, StorageRanges),
    GetByteCodes(u64, GetByteCodes),
    ByteCodes(u64, ByteCodes),
    GetTrieNodes(u64, GetTrieNodes),
    TrieNodes(u64, TrieNodes),
}

/// The snap-sync core's handle onto one connected peer. `sender` carries outbound requests to
/// whatever drives the actual connection; `receiver` carries inbound replies back.
#[derive(Debug, Clone)]
pub struct PeerChannels {
    peer_id: PeerId,
    sender: mpsc::Sender<Message>,
    receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl PeerChannels {
    /// Builds a fresh channel pair for `peer_id`. Returns this struct (the snap-sync core's side)
    /// plus the `(sender, receiver)` pair the connection driver uses to feed replies in and drain
    /// requests out — mirroring the teacher's `PeerChannels::create` split.
    pub fn create(peer_id: PeerId) -> (Self, mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        let (core_to_conn, conn_from_core) = mpsc::channel::<Message>(PEER_CHANNEL_BUFFER);
        let (conn_to_core, core_from_conn) = mpsc::channel::<Message>(PEER_CHANNEL_BUFFER);
        (
            Self {
                peer_id,
                sender: core_to_conn,
                receiver: Arc::new(Mutex::new(core_from_conn)),
            },
            conn_to_core,
            conn_from_core,
        )
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// `GetAccountRange`/`AccountRange` (`spec.md` §6): validates the reply's shape, then its
    /// Merkle range proof against `req.state_root`, before handing it back.
    #[tracing::instrument(skip(self), fields(peer = %self.peer_id))]
    pub async fn request_account_range(
        &self,
        req: GetAccountRange,
    ) -> Result<AccountRange, SnapSyncError> {
        let id = rand::random();
        self.send(Message::GetAccountRange(id, req.clone())).await?;
        let resp = self
            .await_reply(id, |msg| match msg {
                Message::AccountRange(rid, resp) if rid == id => Some(resp),
                _ => None,
            })
            .await?;
        validate_account_range(&req, &resp)?;

        let keys: Vec<H256> = resp.accounts.iter().map(|a| a.acc_key).collect();
        let values: Vec<Vec<u8>> = resp
            .accounts
            .iter()
            .map(|a| a.acc_blob.encode_to_vec())
            .collect();
        ethereum_rust_trie::verify_range(req.state_root, &req.start_hash, &keys, &values, &resp.proof)?;
        Ok(resp)
    }

    /// `GetStorageRanges`/`StorageRanges`. Proof verification for the (possibly truncated) last
    /// account is left to the caller (`storage_slots.rs`/the healer), which already knows which
    /// account a truncated reply belongs to; this method only checks the response's own shape.
    #[tracing::instrument(skip(self), fields(peer = %self.peer_id))]
    pub async fn request_storage_ranges(
        &self,
        req: GetStorageRanges,
    ) -> Result<StorageRanges, SnapSyncError> {
        let id = rand::random();
        self.send(Message::GetStorageRanges(id, req.clone())).await?;
        let resp = self
            .await_reply(id, |msg| match msg {
                Message::StorageRanges(rid, resp) if rid == id => Some(resp),
                _ => None,
            })
            .await?;
        validate_storage_ranges(&req, &resp)?;
        Ok(resp)
    }

    /// `GetByteCodes`/`ByteCodes`. Returns the partitioned [`ByteCodeReport`] rather than the raw
    /// response, since every caller immediately needs the requested-hash/code pairing.
    #[tracing::instrument(skip(self), fields(peer = %self.peer_id))]
    pub async fn request_byte_codes(
        &self,
        req: GetByteCodes,
    ) -> Result<ByteCodeReport, SnapSyncError> {
        if req.hashes.is_empty() {
            return Err(SnapSyncError::EmptyRequestArguments);
        }
        let id = rand::random();
        self.send(Message::GetByteCodes(id, req.clone())).await?;
        let resp = self
            .await_reply(id, |msg| match msg {
                Message::ByteCodes(rid, resp) if rid == id => Some(resp),
                _ => None,
            })
            .await?;
        validate_byte_codes(&req, &resp)
    }

    /// `GetTrieNodes`/`TrieNodes`, the healer's single-node fetch path.
    #[tracing::instrument(skip(self), fields(peer = %self.peer_id))]
    pub async fn request_trie_nodes(&self, req: GetTrieNodes) -> Result<TrieNodes, SnapSyncError> {
        if req.paths.is_empty() {
            return Err(SnapSyncError::EmptyRequestArguments);
        }
        let id = rand::random();
        self.send(Message::GetTrieNodes(id, req.clone())).await?;
        let resp = self
            .await_reply(id, |msg| match msg {
                Message::TrieNodes(rid, resp) if rid == id => Some(resp),
                _ => None,
            })
            .await?;
        validate_trie_nodes(&req, &resp)?;
        Ok(resp)
    }

    async fn send(&self, msg: Message) -> Result<(), SnapSyncError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SnapSyncError::NetworkProblem("peer channel closed".into()))
    }

    async fn await_reply<T>(
        &self,
        id: u64,
        matches: impl Fn(Message) -> Option<T>,
    ) -> Result<T, SnapSyncError> {
        let mut receiver = self.receiver.lock().await;
        let wait = async {
            loop {
                match receiver.recv().await {
                    Some(msg) => {
                        if let Some(value) = matches(msg) {
                            return Ok(value);
                        }
                    }
                    None => return Err(SnapSyncError::NetworkProblem("peer disconnected".into())),
                }
            }
        };
        match tokio::time::timeout(PEER_REPLY_TIMEOUT, wait).await {
            Ok(result) => result,
            Err(_) => {
                let _ = id;
                Err(SnapSyncError::ResponseTimeout)
            }
        }
    }
}
