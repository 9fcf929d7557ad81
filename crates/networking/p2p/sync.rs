//! Sync coordinator: wires the pivot registry (D), scheduler (E), peer workers (F), healer (G),
//! storage-slots sub-engine (H), swap-in reconciler (I) and checkpoint/recovery (J) together
//! against a set of connected peers, and drives the ticker (K).
//!
//! Block-header acquisition, peer discovery/connection pooling, and the EVM/blockchain execution
//! path are external collaborators (`spec.md` §1): this module only consumes headers handed to it
//! by [`SyncCoordinator::consider_pivot`] and peers handed to it by [`SyncCoordinator::attach_peer`]
//! — it never dials a connection or walks a discv4 table itself, the same separation the teacher
//! draws between "what to do once peers and headers exist" and "how peers and headers get there".
//!
//! Concurrency follows `spec.md` §5: every peer worker is a `tokio` task, and the shared pivot
//! state they read/write is behind one [`Mutex`] taken only around synchronous
//! scheduler/healer/storage-slots calls, never across an `.await` — so two workers' claims on
//! the same pivot never interleave mid-update, the same guarantee the cooperative single-threaded
//! model describes, just enforced with a lock instead of relying on there being only one thread.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ethereum_rust_core::types::BlockHeader;
use ethereum_rust_rlp::decode::RLPDecode;
use ethereum_rust_rlp::encode::RLPEncode;
use ethereum_rust_storage::Store;
use ethereum_rust_trie::{NodeSpecs, NodeTagRange, NodeTagRangeSet, Nibbles};
use ethereum_types::{Address, H256};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::peer_channels::PeerChannels;
use crate::protocol::{GetAccountRange, GetTrieNodes, PeerId, TrieNodePaths};
use crate::snap_sync::checkpoint::{recover_pivot_from_checkpoint, save_checkpoint, CheckpointRecord};
use crate::snap_sync::config::SnapConfig;
use crate::snap_sync::error::SnapSyncError;
use crate::snap_sync::healer::{accept_work_item_as_is, heal_accounts_round, heal_storage_round};
use crate::snap_sync::node_db::{NodeDb, NodeScope};
use crate::snap_sync::pivot::{PivotTable, SnapRangeBatch, StorageFullEntry, StoragePartEntry};
use crate::snap_sync::scheduler::{get_unprocessed, release_failure, release_success, seed_fresh_pivot};
use crate::snap_sync::storage_slots::{apply_full_response, apply_part_response, next_drain_request, StorageDrainRequest};
use crate::snap_sync::swap_in::{reconcile, Donor};
use crate::snap_sync::ticker::{sample, TickerSnapshot};
use crate::snap_sync::worker::{healing_ok, is_good_response, Buddy};

/// State every buddy task reads and writes, guarded by one lock (`spec.md` §5).
struct SharedState {
    pivots: PivotTable,
    covered_accounts: NodeTagRangeSet,
    cov_acc_times_full: u64,
}

/// Drives snap-sync across however many peers are currently attached. Construct one per sync
/// session; `attach_peer` can be called again for newly connected peers while workers for
/// already-attached ones keep running.
pub struct SyncCoordinator {
    db: NodeDb,
    config: SnapConfig,
    state: Arc<Mutex<SharedState>>,
    shutdown: Arc<Notify>,
}

impl SyncCoordinator {
    pub fn new(store: Store, config: SnapConfig) -> Self {
        let pivots = PivotTable::new(
            config.pivot_block_distance_min,
            config.pivot_block_distance_throttled_pivot_change_min,
            config.pivot_table_lru_entries_max,
        );
        Self {
            db: NodeDb::new(store),
            config,
            state: Arc::new(Mutex::new(SharedState {
                pivots,
                covered_accounts: NodeTagRangeSet::new(),
                cov_acc_times_full: 0,
            })),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Recovers the last saved checkpoint into a fresh pivot (`spec.md` §4.J). Returns `false` if
    /// nothing was ever checkpointed or the saved blob no longer decodes.
    pub fn recover_from_checkpoint(&self) -> bool {
        let Some(bytes) = self.db.load_pivot() else {
            return false;
        };
        let record = match CheckpointRecord::decode(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("checkpoint blob failed to decode: {e}");
                return false;
            }
        };
        let pivot = recover_pivot_from_checkpoint(&record, &self.db);
        let header = pivot.state_header.clone();
        let mut state = self.state.lock().unwrap();
        state.pivots.reverse_update(header);
        if let Some(top) = state.pivots.last_value_mut() {
            *top = pivot;
        }
        info!("recovered pivot from checkpoint at block {}", record.header.number);
        true
    }

    /// Hands a newly observed block header to the pivot registry. Header acquisition itself is
    /// an external collaborator's job (`spec.md` §1); this is the one seam it calls into. Runs
    /// swap-in reconciliation against the table's other pivots when a new top is created, and
    /// returns whether a new pivot was actually appended.
    pub fn consider_pivot(&self, header: BlockHeader) -> bool {
        let mut state = self.state.lock().unwrap();
        let appended = state.pivots.update(header);
        if appended {
            let SharedState {
                pivots,
                covered_accounts,
                cov_acc_times_full,
            } = &mut *state;
            if let Some(top) = pivots.last_value_mut() {
                seed_fresh_pivot(&mut top.fetch_accounts, covered_accounts, cov_acc_times_full);
            }
            let donors: Vec<Donor> = pivots
                .iter()
                .map(|p| Donor {
                    processed: p.fetch_accounts.processed.clone(),
                })
                .collect();
            if let Some(top) = pivots.last_value_mut() {
                let root = top.state_root();
                if let Err(e) = reconcile(&mut top.fetch_accounts, &self.db, NodeScope::State, root, &donors) {
                    debug!("swap-in reconciliation skipped: {e}");
                }
            }
            pivots.before_top_mostly_clean();
        }
        appended
    }

    /// Persists the current top pivot's progress (`spec.md` §4.J). A refusal
    /// (`NoAccountsYet`/too-many-chunks) is logged, not escalated — checkpointing is best effort.
    pub fn checkpoint(&self) {
        let state = self.state.lock().unwrap();
        let Some(pivot) = state.pivots.last_value() else {
            return;
        };
        if let Err(e) = save_checkpoint(pivot, &self.db, &self.config) {
            debug!("checkpoint skipped: {e}");
        }
    }

    /// Builds a ticker snapshot (component K) over the current pivot table.
    pub fn tick(&self, beacon_block: u64, storage_queue_len: usize) -> TickerSnapshot {
        let state = self.state.lock().unwrap();
        sample(
            &state.pivots,
            &state.covered_accounts,
            state.cov_acc_times_full,
            beacon_block,
            storage_queue_len,
        )
    }

    /// Signals every running buddy task to stop after its current cycle.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Spawns a buddy task for `channels` and runs it until stopped, zombied, or shut down.
    /// Returns the join handle so the caller can await completion or abort it directly.
    pub fn attach_peer(&self, channels: PeerChannels) -> tokio::task::JoinHandle<()> {
        let db = self.db.clone();
        let config = self.config.clone();
        let state = self.state.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            run_buddy(state, db, config, channels, shutdown).await;
        })
    }
}

/// One peer worker's whole lifetime: loop [`run_cycle`] until it reports the buddy should stop,
/// the peer zombies, or a shutdown notification arrives.
async fn run_buddy(
    state: Arc<Mutex<SharedState>>,
    db: NodeDb,
    config: SnapConfig,
    channels: PeerChannels,
    shutdown: Arc<Notify>,
) {
    let mut buddy = Buddy::new(channels.peer_id());
    loop {
        if buddy.ctrl.zombie {
            info!(peer = %channels.peer_id(), "buddy zombied, tearing down");
            return;
        }
        if timeout_immediate(shutdown.notified()).await.is_ok() {
            buddy.ctrl.request_stop();
        }
        let keep_going = run_cycle(&state, &db, &config, &channels, &mut buddy).await;
        if !keep_going {
            buddy.ctrl.finish_stop();
            info!(peer = %channels.peer_id(), "buddy stopped");
            return;
        }
    }
}

/// Polls a future once without blocking the cycle on it — used to pick up a pending shutdown
/// notification between cycles without stalling a buddy that has no notification waiting.
async fn timeout_immediate<F: std::future::Future<Output = ()>>(fut: F) -> Result<(), ()> {
    match tokio::time::timeout(Duration::from_millis(0), fut).await {
        Ok(()) => Ok(()),
        Err(_) => Err(()),
    }
}

/// Follows the exact ordering `worker::exec_snap_sync_action` encodes (storage backlog jumps the
/// line, then accounts/storage/heal, then a final storage drain and heal pass) but with real
/// async network stages instead of injected closures — a `dyn FnMut` can't carry an `.await`
/// point, so the gating/ordering contract is kept as the tested reference in `worker.rs` and
/// reproduced here directly, the same sequence, against live peers.
async fn run_cycle(
    state: &Mutex<SharedState>,
    db: &NodeDb,
    config: &SnapConfig,
    channels: &PeerChannels,
    buddy: &mut Buddy<PeerId>,
) -> bool {
    let snapshot = {
        let s = state.lock().unwrap();
        s.pivots.last_value().map(|p| {
            (
                p.archived,
                p.fetch_accounts.unprocessed.0.is_empty() && p.fetch_accounts.unprocessed.1.is_empty(),
                p.fetch_storage_full.len() + p.fetch_storage_part.len(),
            )
        })
    };
    let Some((archived, accounts_processed_is_full, storage_queue_len)) = snapshot else {
        return !buddy.ctrl.stopped();
    };
    if archived || buddy.ctrl.stopped() {
        return false;
    }

    let healing_gate = {
        let s = state.lock().unwrap();
        match s.pivots.last_value() {
            Some(top) => healing_ok(
                top.fetch_accounts.processed.is_empty(),
                s.covered_accounts.full_factor(),
                config.heal_accounts_coverage_trigger,
            ),
            None => false,
        }
    };

    if storage_queue_len > config.storage_slots_qu_prio_thresh {
        storage_drain(state, db, config, channels, buddy).await;
        if buddy.ctrl.stopped() || archived {
            return false;
        }
    }

    if !accounts_processed_is_full {
        account_range_fetch(state, db, config, channels, buddy).await;
        if buddy.ctrl.stopped() {
            return false;
        }
        storage_drain(state, db, config, channels, buddy).await;
        if buddy.ctrl.stopped() {
            return false;
        }
        if healing_gate {
            account_heal(state, db, config, channels, buddy).await;
            if buddy.ctrl.stopped() {
                return false;
            }
        }
    }

    storage_drain(state, db, config, channels, buddy).await;
    if buddy.ctrl.stopped() {
        return false;
    }
    if healing_gate {
        storage_heal(state, db, config, channels, buddy).await;
        if buddy.ctrl.stopped() {
            return false;
        }
    }

    !buddy.ctrl.stopped()
}

/// Component E over the account key space: claims a range, fetches it, imports the proven
/// accounts, and folds progress back into the shared scheduler state.
async fn account_range_fetch(
    state: &Mutex<SharedState>,
    db: &NodeDb,
    config: &SnapConfig,
    channels: &PeerChannels,
    buddy: &mut Buddy<PeerId>,
) {
    let claimed = {
        let mut s = state.lock().unwrap();
        let Some(pivot) = s.pivots.last_value_mut() else {
            return;
        };
        let claim = get_unprocessed(&mut pivot.fetch_accounts, config.account_range_max());
        claim.map(|c| (pivot.state_root(), c))
    };
    let Some((state_root, claim)) = claimed else {
        return;
    };

    let req = GetAccountRange {
        state_root,
        start_hash: NodeTagRange::to_hash(claim.0.start),
        limit_hash: NodeTagRange::to_hash(claim.0.end),
        bytes_limit: config.fetch_request_bytes_limit,
    };
    let started = Instant::now();
    match channels.request_account_range(req).await {
        Ok(resp) => {
            let n_received = resp.accounts.len();
            if let Err(e) =
                db.import_accounts(channels.peer_id(), state_root, claim.0.start.into(), &resp.accounts)
            {
                buddy.record_error(&e, config.max_timeout_errors);
                let mut s = state.lock().unwrap();
                if let Some(pivot) = s.pivots.last_value_mut() {
                    release_failure(&mut pivot.fetch_accounts, claim);
                }
                return;
            }
            let good = is_good_response(
                1,
                n_received.max(1),
                started.elapsed(),
                Duration::from_millis(config.fetch_headers_req_threshold_zombie_ms),
                config.fetch_headers_req_min_response_pc,
            );
            let mut s = state.lock().unwrap();
            let SharedState {
                pivots,
                covered_accounts,
                ..
            } = &mut *s;
            let Some(pivot) = pivots.last_value_mut() else {
                return;
            };
            let consumed_end = resp
                .accounts
                .last()
                .map(|a| NodeTagRange::from_hash(a.acc_key))
                .unwrap_or(claim.0.start);
            let consumed = NodeTagRange::new(claim.0.start, consumed_end);
            release_success(&mut pivot.fetch_accounts, covered_accounts, claim, consumed);
            pivot.n_accounts += n_received as u64;
            for account in &resp.accounts {
                if account.acc_blob.storage_root != *ethereum_rust_trie::EMPTY_TRIE_HASH {
                    pivot.fetch_storage_full.insert(
                        account.acc_blob.storage_root,
                        StorageFullEntry { acc_key: account.acc_key },
                    );
                    pivot
                        .storage_accounts
                        .insert(account.acc_key, account.acc_blob.storage_root);
                }
            }
            drop(s);
            if good {
                buddy.record_good_response();
            } else {
                buddy.record_slow_or_short(config.fetch_headers_req_threshold_count);
            }
        }
        Err(e) => {
            buddy.record_error(&e, config.max_timeout_errors);
            let mut s = state.lock().unwrap();
            if let Some(pivot) = s.pivots.last_value_mut() {
                release_failure(&mut pivot.fetch_accounts, claim);
            }
        }
    }
}

/// Component H: drains one storage-fetch unit (part-before-full) and applies the response,
/// short-circuiting inherited entries straight through `next_drain_request`'s own
/// `accept_work_item_as_is` check with no network round trip.
async fn storage_drain(
    state: &Mutex<SharedState>,
    db: &NodeDb,
    config: &SnapConfig,
    channels: &PeerChannels,
    buddy: &mut Buddy<PeerId>,
) {
    let job = {
        let mut s = state.lock().unwrap();
        let Some(pivot) = s.pivots.last_value_mut() else {
            return;
        };
        let state_root = pivot.state_root();
        next_drain_request(
            pivot,
            db,
            channels.peer_id(),
            state_root,
            config.fetch_request_bytes_limit,
            config.snap_storages_slots_fetch_max,
        )
    };
    let Some(job) = job else {
        return;
    };

    let req = match &job {
        StorageDrainRequest::Part { request, .. } => request.clone(),
        StorageDrainRequest::Full { request, .. } => request.clone(),
    };
    match channels.request_storage_ranges(req).await {
        Ok(resp) => {
            buddy.record_good_response();
            let mut s = state.lock().unwrap();
            let Some(pivot) = s.pivots.last_value_mut() else {
                return;
            };
            match job {
                StorageDrainRequest::Part { storage_root, acc_key, .. } => {
                    apply_part_response(pivot, db, channels.peer_id(), storage_root, acc_key, &resp);
                }
                StorageDrainRequest::Full { accounts, .. } => {
                    apply_full_response(pivot, db, channels.peer_id(), &accounts, &resp);
                }
            }
        }
        Err(e) => {
            buddy.record_error(&e, config.max_timeout_errors);
            let mut s = state.lock().unwrap();
            let Some(pivot) = s.pivots.last_value_mut() else {
                return;
            };
            match job {
                StorageDrainRequest::Part { storage_root, acc_key, .. } => {
                    pivot.fetch_storage_part.insert(
                        storage_root,
                        StoragePartEntry {
                            acc_key,
                            slots: SnapRangeBatch::covering_everything(),
                        },
                    );
                }
                StorageDrainRequest::Full { accounts, .. } => {
                    for (acc_key, storage_root) in accounts {
                        pivot.fetch_storage_full.insert(storage_root, StorageFullEntry { acc_key });
                    }
                }
            }
        }
    }
}

/// Component G over the state trie: one `heal_accounts_round`, fetching any dangling nodes via
/// `GetTrieNodes` through `block_in_place`/`block_on`. Like `storage_drain`'s claim/release shape,
/// the pivot's account batch is checked out under the lock, healed against the live network with
/// no lock held, then checked back in — `heal_round`'s fetch callback runs a real request/response
/// round trip and must never run while `state` is locked, or every other buddy stalls behind it.
async fn account_heal(
    state: &Mutex<SharedState>,
    db: &NodeDb,
    config: &SnapConfig,
    channels: &PeerChannels,
    buddy: &mut Buddy<PeerId>,
) {
    let (state_root, mut batch) = {
        let mut s = state.lock().unwrap();
        let Some(pivot) = s.pivots.last_value_mut() else {
            return;
        };
        (pivot.state_root(), std::mem::take(&mut pivot.fetch_accounts))
    };

    let mut covered = NodeTagRangeSet::new();
    let mut n_accounts_delta = 0u64;
    let mut storage_jobs = Vec::new();
    let mut fetch = fetch_trie_nodes_sync_state(channels, config, state_root);
    let outcome = heal_accounts_round(
        &mut batch,
        &mut covered,
        &mut n_accounts_delta,
        db,
        state_root,
        channels.peer_id(),
        config.heal_inspection_batch,
        config.max_trie_node_fetch,
        &mut fetch,
        |acc_key, storage_root| storage_jobs.push((acc_key, storage_root)),
    );

    {
        let mut s = state.lock().unwrap();
        if let Some(pivot) = s.pivots.last_value_mut() {
            pivot.fetch_accounts = batch;
            pivot.n_accounts += n_accounts_delta;
            for (acc_key, storage_root) in storage_jobs {
                pivot.fetch_storage_full.insert(storage_root, StorageFullEntry { acc_key });
                pivot.storage_accounts.insert(acc_key, storage_root);
            }
        }
        for range in covered.ranges() {
            s.covered_accounts.merge(*range);
        }
    }

    match outcome {
        Ok(_) => buddy.record_good_response(),
        Err(SnapSyncError::TrieIsLockedForPerusal) => {}
        Err(e) => buddy.record_error(&e, config.max_timeout_errors),
    }
}

/// Component G over storage tries: heals whatever's at the front of `storage_heal_queue`
/// (entries the scheduler already decided to inherit wholesale, via [`accept_work_item_as_is`]).
async fn storage_heal(
    state: &Mutex<SharedState>,
    db: &NodeDb,
    config: &SnapConfig,
    channels: &PeerChannels,
    buddy: &mut Buddy<PeerId>,
) {
    let job = {
        let mut s = state.lock().unwrap();
        let Some(pivot) = s.pivots.last_value_mut() else {
            return;
        };
        let state_root = pivot.state_root();
        pivot
            .storage_heal_queue
            .pop()
            .map(|(acc_key, storage_root)| (acc_key, storage_root, state_root))
    };
    let Some((acc_key, storage_root, state_root)) = job else {
        return;
    };
    let address = Address::from_slice(&acc_key.0[..20]);

    if let Ok(true) = accept_work_item_as_is(db, address, storage_root, config.heal_inspection_batch) {
        return;
    }

    let outcome = {
        let mut slots = SnapRangeBatch::covering_everything();
        let mut n_slot_lists = 0u64;
        let mut covered_slots = NodeTagRangeSet::new();
        let mut fetch = fetch_trie_nodes_sync_storage(channels, config, state_root, acc_key);
        heal_storage_round(
            &mut slots,
            &mut covered_slots,
            &mut n_slot_lists,
            db,
            address,
            storage_root,
            channels.peer_id(),
            config.heal_inspection_batch,
            config.max_trie_node_fetch,
            &mut fetch,
        )
        .map(|done| {
            let mut s = state.lock().unwrap();
            if let Some(pivot) = s.pivots.last_value_mut() {
                pivot.n_slot_lists += n_slot_lists;
                if !done {
                    pivot.storage_heal_queue.push((acc_key, storage_root));
                }
            }
            done
        })
    };

    match outcome {
        Ok(_) => buddy.record_good_response(),
        Err(SnapSyncError::TrieIsLockedForPerusal) => {
            let mut s = state.lock().unwrap();
            if let Some(pivot) = s.pivots.last_value_mut() {
                pivot.storage_heal_queue.push((acc_key, storage_root));
            }
        }
        Err(e) => {
            buddy.record_error(&e, config.max_timeout_errors);
            let mut s = state.lock().unwrap();
            if let Some(pivot) = s.pivots.last_value_mut() {
                pivot.storage_heal_queue.push((acc_key, storage_root));
            }
        }
    }
}

/// Builds the synchronous `fetch` callback `heal_round` expects when healing the state trie
/// directly, bridging to the real `GetTrieNodes` request via `block_in_place` + `Handle::block_on`
/// (requires a multi-thread tokio runtime, same as the rest of this coordinator). Each spec's own
/// partial path *is* its `account_path`: a state-trie heal walks the state trie itself, one node
/// per path, with no nested `slot_paths`.
fn fetch_trie_nodes_sync_state<'a>(
    channels: &'a PeerChannels,
    config: &'a SnapConfig,
    state_root: H256,
) -> impl FnMut(&[NodeSpecs]) -> Result<Vec<Vec<u8>>, SnapSyncError> + 'a {
    move |specs: &[NodeSpecs]| {
        let paths = specs
            .iter()
            .map(|spec| TrieNodePaths {
                account_path: spec.partial_path.as_ref().to_vec(),
                slot_paths: vec![],
            })
            .collect();
        let req = GetTrieNodes {
            state_root,
            paths,
            bytes_limit: config.fetch_request_bytes_limit,
        };
        let resp = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(channels.request_trie_nodes(req))
        })?;
        Ok(resp.nodes)
    }
}

/// Builds the synchronous `fetch` callback `heal_round` expects when healing one account's
/// storage trie. Per `spec.md` §6, `GetTrieNodes` always carries the pivot's *state* root — never
/// a storage root — and locates a storage node by nesting every requested `slot_paths` entry
/// under a single `account_path`, the owning account's full 32-byte key in the state trie. Both
/// `state_root` and `acc_key` must be the real pivot values, not the storage root being healed:
/// a [`crate::snap_sync::node_db::NodeScope::Storage`] only carries the truncated 20-byte
/// [`Address`], which can't be turned back into the account's own trie path.
fn fetch_trie_nodes_sync_storage<'a>(
    channels: &'a PeerChannels,
    config: &'a SnapConfig,
    state_root: H256,
    acc_key: H256,
) -> impl FnMut(&[NodeSpecs]) -> Result<Vec<Vec<u8>>, SnapSyncError> + 'a {
    move |specs: &[NodeSpecs]| {
        let account_path = Nibbles::from_bytes(acc_key.as_bytes()).as_ref().to_vec();
        let paths = vec![TrieNodePaths {
            account_path,
            slot_paths: specs.iter().map(|s| s.partial_path.as_ref().to_vec()).collect(),
        }];
        let req = GetTrieNodes {
            state_root,
            paths,
            bytes_limit: config.fetch_request_bytes_limit,
        };
        let resp = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(channels.request_trie_nodes(req))
        })?;
        Ok(resp.nodes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::peer_channels::Message;
    use crate::protocol::{AccountRange, PackedAccount};
    use ethereum_rust_core::types::AccountState;

    fn header(number: u64, state_root: H256) -> BlockHeader {
        BlockHeader {
            number,
            state_root,
            ..Default::default()
        }
    }

    #[test]
    fn consider_pivot_seeds_the_scheduler_on_first_pivot() {
        let coordinator = SyncCoordinator::new(Store::new(), SnapConfig::default());
        assert!(coordinator.consider_pivot(header(1000, H256::zero())));
        let state = coordinator.state.lock().unwrap();
        let top = state.pivots.last_value().unwrap();
        assert!(!top.fetch_accounts.unprocessed.0.is_empty());
    }

    #[test]
    fn checkpoint_is_a_no_op_before_any_progress() {
        let coordinator = SyncCoordinator::new(Store::new(), SnapConfig::default());
        coordinator.consider_pivot(header(1000, H256::zero()));
        coordinator.checkpoint();
        assert!(coordinator.db.load_pivot().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn account_range_fetch_imports_accounts_and_advances_the_scheduler() {
        let store = Store::new();
        let acc_key = H256::repeat_byte(0x05);
        let account = PackedAccount {
            acc_key,
            acc_blob: AccountState::default(),
        };
        let value = account.acc_blob.encode_to_vec();
        let root = {
            let mut trie = store.open_state_trie(*ethereum_rust_trie::EMPTY_TRIE_HASH);
            trie.insert(acc_key.0.to_vec(), value).unwrap();
            trie.hash().unwrap()
        };

        let config = SnapConfig::default();
        let coordinator = SyncCoordinator::new(store, config.clone());
        coordinator.consider_pivot(header(1000, root));

        let (channels, conn_to_core, mut conn_from_core) = PeerChannels::create(PeerId::repeat_byte(0x02));
        let responder = tokio::spawn(async move {
            let Message::GetAccountRange(id, _req) = conn_from_core.recv().await.unwrap() else {
                panic!("expected an account range request");
            };
            conn_to_core
                .send(Message::AccountRange(
                    id,
                    AccountRange {
                        accounts: vec![account],
                        proof: Vec::new(),
                    },
                ))
                .await
                .unwrap();
        });

        let mut buddy = Buddy::new(channels.peer_id());
        account_range_fetch(&coordinator.state, &coordinator.db, &config, &channels, &mut buddy).await;
        responder.await.unwrap();

        let state = coordinator.state.lock().unwrap();
        let top = state.pivots.last_value().unwrap();
        assert_eq!(top.n_accounts, 1);
        assert!(!top.fetch_accounts.processed.is_empty());
    }
}
