//! Peer worker / "buddy" state machine (`spec.md` §4.F).
//!
//! A buddy is attached to exactly one connected peer and loops `exec_snap_sync_action` until
//! stopped or zombied. The cycle itself is expressed here against small stage traits rather than
//! calling into the scheduler/healer modules directly, so the state machine can be exercised
//! with fake stages in tests; `sync.rs` wires the real account-range, storage-drain and healing
//! stages in.

use std::time::Duration;

use crate::snap_sync::error::SnapSyncError;

/// `runState` from `spec.md` §4.F. `Zombie` is an orthogonal flag, not a fourth state, because a
/// zombie can be discovered mid-`Running` and must still finish unwinding to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    StopRequested,
    Stopped,
}

/// Per-peer error counters feeding the zombie-promotion rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuddyErrors {
    pub n_timeouts: u32,
    pub n_network_err: u32,
    pub n_no_data: u32,
    pub com_error: u32,
    /// Consecutive errors of *any* kind since the last good response; this is what
    /// `fetch_headers_req_threshold_count` compares against.
    pub consecutive: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BuddyCtrl {
    pub run_state: RunState,
    pub zombie: bool,
}

impl Default for BuddyCtrl {
    fn default() -> Self {
        Self {
            run_state: RunState::Running,
            zombie: false,
        }
    }
}

impl BuddyCtrl {
    pub fn stopped(&self) -> bool {
        matches!(self.run_state, RunState::Stopped)
    }

    pub fn request_stop(&mut self) {
        if matches!(self.run_state, RunState::Running) {
            self.run_state = RunState::StopRequested;
        }
    }

    pub fn finish_stop(&mut self) {
        self.run_state = RunState::Stopped;
    }
}

/// A per-connected-peer worker. `peer_id` is whatever opaque handle the discovery/connection
/// pool collaborator hands out (out of scope here; this module never dereferences it).
#[derive(Debug, Clone)]
pub struct Buddy<P> {
    pub peer: P,
    pub ctrl: BuddyCtrl,
    pub errors: BuddyErrors,
}

impl<P> Buddy<P> {
    pub fn new(peer: P) -> Self {
        Self {
            peer,
            ctrl: BuddyCtrl::default(),
            errors: BuddyErrors::default(),
        }
    }

    /// Every `{NetworkProblem, MissingProof, AccountsMinTooSmall, AccountsMaxTooLarge,
    /// NoAccountsForStateRoot, NoStorageForAccounts, NoByteCodesAvailable, NoTrieNodesAvailable,
    /// TooManyByteCodes, TooManyStorageSlots, TooManyTrieNodes, ImportFailed}` zombies
    /// immediately; `ResponseTimeout` only zombies after `max_timeout_errors` consecutive hits.
    pub fn record_error(&mut self, err: &SnapSyncError, max_timeout_errors: u32) {
        self.errors.consecutive += 1;
        match err {
            SnapSyncError::ResponseTimeout => {
                self.errors.n_timeouts += 1;
                if self.errors.n_timeouts >= max_timeout_errors {
                    self.ctrl.zombie = true;
                }
            }
            SnapSyncError::NetworkProblem(_) => self.errors.n_network_err += 1,
            _ if err.zombies_peer() => {
                self.errors.com_error += 1;
                self.ctrl.zombie = true;
            }
            _ => {}
        }
    }

    /// A "good" response (per §4.F's response-size/latency accounting) resets the consecutive
    /// counter and the timeout streak, but not the lifetime totals.
    pub fn record_good_response(&mut self) {
        self.errors.consecutive = 0;
        self.errors.n_timeouts = 0;
    }

    /// A short reply (`< fetch_headers_req_min_response_pc`% of requested items) or a reply
    /// that took longer than `fetch_headers_req_threshold_zombie` counts as an error even
    /// though it's not an `Err` — tracked by the caller via [`Buddy::record_slow_or_short`].
    pub fn record_slow_or_short(&mut self, threshold_count: u32) {
        self.errors.consecutive += 1;
        if self.errors.consecutive >= threshold_count {
            self.ctrl.zombie = true;
        }
    }
}

/// Whether a response counts as "good" under §4.F's per-peer error accounting: a response is
/// bad if it came back short (fewer than `min_response_pc`% of `requested`) or took longer than
/// `threshold`.
pub fn is_good_response(requested: usize, received: usize, elapsed: Duration, threshold: Duration, min_response_pc: u8) -> bool {
    if elapsed > threshold {
        return false;
    }
    if requested == 0 {
        return true;
    }
    received * 100 >= requested * min_response_pc as usize
}

/// `healingOk(env) = !processed.isEmpty ∧ coveredAccounts.fullFactor ≥ healAccountsCoverageTrigger`
/// (Open Question 1 resolution): healing only starts once bulk range download has produced a
/// usable skeleton, so a pivot that just started (empty `processed`) never heals prematurely.
pub fn healing_ok(processed_is_empty: bool, covered_accounts_full_factor: f64, trigger: f64) -> bool {
    !processed_is_empty && covered_accounts_full_factor >= trigger
}

/// One `exec_snap_sync_action` cycle (`spec.md` §4.F numbered steps), expressed against small
/// stage closures so the ordering/gating logic is testable without a live network or trie.
/// Each stage returns `Ok(())` on success (even "nothing to do") and `Err` only for local
/// failures that should bubble up without aborting the cycle (the individual stages are
/// themselves responsible for recording peer errors via [`Buddy::record_error`]).
pub struct ActionStages<'a> {
    pub storage_queue_len: usize,
    pub storage_slots_qu_prio_thresh: usize,
    pub fetch_accounts_processed_is_full: bool,
    pub healing_ok: bool,
    pub account_range_fetch: &'a mut dyn FnMut() -> bool,
    pub storage_drain: &'a mut dyn FnMut() -> bool,
    pub account_heal: &'a mut dyn FnMut(),
    pub storage_heal: &'a mut dyn FnMut(),
}

/// Returns `true` if the buddy should keep looping (stop flag not observed), `false` if the
/// caller should tear the buddy down.
pub fn exec_snap_sync_action(ctrl: &BuddyCtrl, archived: bool, stages: ActionStages<'_>) -> bool {
    let ActionStages {
        storage_queue_len,
        storage_slots_qu_prio_thresh,
        fetch_accounts_processed_is_full,
        healing_ok,
        account_range_fetch,
        storage_drain,
        account_heal,
        storage_heal,
    } = stages;

    let should_return = |ctrl: &BuddyCtrl| ctrl.stopped() || archived;

    // 1. Storage queue pressure jumps the line.
    if storage_queue_len > storage_slots_qu_prio_thresh {
        storage_drain();
        if should_return(ctrl) {
            return false;
        }
    }

    // 2. Bulk account range-fetch, then a storage drain, then (maybe) account healing.
    if !fetch_accounts_processed_is_full {
        account_range_fetch();
        if should_return(ctrl) {
            return false;
        }
        storage_drain();
        if should_return(ctrl) {
            return false;
        }
        if healing_ok {
            account_heal();
            if should_return(ctrl) {
                return false;
            }
        }
    }

    // 3. Another storage drain regardless of step 2's outcome.
    storage_drain();
    if should_return(ctrl) {
        return false;
    }

    // 4. Storage healing, gated the same way account healing is.
    if healing_ok {
        storage_heal();
        if should_return(ctrl) {
            return false;
        }
    }

    !ctrl.stopped()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zombies_immediately_on_protocol_violation() {
        let mut buddy = Buddy::new(());
        buddy.record_error(&SnapSyncError::NoAccountsForStateRoot, 3);
        assert!(buddy.ctrl.zombie);
    }

    #[test]
    fn timeout_zombies_only_after_threshold() {
        let mut buddy = Buddy::new(());
        buddy.record_error(&SnapSyncError::ResponseTimeout, 3);
        assert!(!buddy.ctrl.zombie);
        buddy.record_error(&SnapSyncError::ResponseTimeout, 3);
        assert!(!buddy.ctrl.zombie);
        buddy.record_error(&SnapSyncError::ResponseTimeout, 3);
        assert!(buddy.ctrl.zombie);
    }

    #[test]
    fn good_response_resets_timeout_streak() {
        let mut buddy = Buddy::new(());
        buddy.record_error(&SnapSyncError::ResponseTimeout, 3);
        buddy.record_good_response();
        buddy.record_error(&SnapSyncError::ResponseTimeout, 3);
        assert_eq!(buddy.errors.n_timeouts, 1);
    }

    #[test]
    fn transient_errors_never_zombie_on_their_own() {
        let mut buddy = Buddy::new(());
        buddy.record_error(&SnapSyncError::NetworkProblem("down".into()), 3);
        assert!(!buddy.ctrl.zombie);
    }

    #[test]
    fn healing_ok_requires_nonempty_processed_and_coverage_trigger() {
        assert!(!healing_ok(true, 0.9, 0.7));
        assert!(!healing_ok(false, 0.5, 0.7));
        assert!(healing_ok(false, 0.7, 0.7));
    }

    #[test]
    fn exec_cycle_runs_storage_first_when_queue_is_backed_up() {
        let mut order = Vec::new();
        let mut account_range_fetch = || {
            order.push("accounts");
            true
        };
        let mut storage_drain = || {
            order.push("storage");
            true
        };
        let mut account_heal = || order.push("heal_accounts");
        let mut storage_heal = || order.push("heal_storage");
        let ctrl = BuddyCtrl::default();
        exec_snap_sync_action(
            &ctrl,
            false,
            ActionStages {
                storage_queue_len: 10_000,
                storage_slots_qu_prio_thresh: 5_000,
                fetch_accounts_processed_is_full: false,
                healing_ok: true,
                account_range_fetch: &mut account_range_fetch,
                storage_drain: &mut storage_drain,
                account_heal: &mut account_heal,
                storage_heal: &mut storage_heal,
            },
        );
        assert_eq!(
            order,
            vec!["storage", "accounts", "storage", "heal_accounts", "storage", "heal_storage"]
        );
    }

    #[test]
    fn exec_cycle_skips_healing_when_not_ok() {
        let mut healed = false;
        let mut account_range_fetch = || true;
        let mut storage_drain = || true;
        let mut account_heal = || healed = true;
        let mut storage_heal = || {};
        let ctrl = BuddyCtrl::default();
        exec_snap_sync_action(
            &ctrl,
            false,
            ActionStages {
                storage_queue_len: 0,
                storage_slots_qu_prio_thresh: 5_000,
                fetch_accounts_processed_is_full: false,
                healing_ok: false,
                account_range_fetch: &mut account_range_fetch,
                storage_drain: &mut storage_drain,
                account_heal: &mut account_heal,
                storage_heal: &mut storage_heal,
            },
        );
        assert!(!healed);
    }

    #[test]
    fn exec_cycle_returns_false_once_archived() {
        let mut account_range_fetch = || true;
        let mut storage_drain = || true;
        let mut account_heal = || {};
        let mut storage_heal = || {};
        let ctrl = BuddyCtrl::default();
        let keep_going = exec_snap_sync_action(
            &ctrl,
            true,
            ActionStages {
                storage_queue_len: 0,
                storage_slots_qu_prio_thresh: 5_000,
                fetch_accounts_processed_is_full: false,
                healing_ok: false,
                account_range_fetch: &mut account_range_fetch,
                storage_drain: &mut storage_drain,
                account_heal: &mut account_heal,
                storage_heal: &mut storage_heal,
            },
        );
        assert!(!keep_going);
    }
}
