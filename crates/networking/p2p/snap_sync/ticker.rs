//! Ticker (component K, `spec.md` §2/§7): periodic progress synthesis over the pivot table and
//! the scheduler/healer counters it carries, for external observation only — this module never
//! feeds scheduling decisions back, it just summarizes them.
//!
//! No metrics/exporter sink is wired up here (out of scope per `spec.md` §1); `sample` produces
//! the `{beaconBlock, pivotBlock, nAccounts(mean,σ), accountsFill(mean,σ,coverage), nStorageQueue,
//! nQueues}` snapshot and the coordinator logs it via `tracing::info` at whatever cadence it
//! drives this from, the same way the teacher's own `sync_cycle` logs progress lines inline
//! rather than through a dedicated metrics crate.

use ethereum_rust_trie::NodeTagRangeSet;

use crate::snap_sync::pivot::PivotTable;

/// One tick's worth of progress, as described by `spec.md` §7's user-visible failure behavior:
/// a sync that's stuck shows up here as flat `accounts_fill` and a monotonically growing
/// `n_queues` rather than any single counter going to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerSnapshot {
    /// Head block number reported by the external beacon-sync collaborator (`spec.md` §1) —
    /// carried through unchanged, this module never derives it.
    pub beacon_block: u64,
    /// Block number of the current top pivot, or `0` if no pivot has been created yet.
    pub pivot_block: u64,
    /// Mean of `nAccounts` across every pivot still held in the table (mothballed pivots keep
    /// contributing until evicted, since their accounts were genuinely imported).
    pub n_accounts_mean: f64,
    pub n_accounts_stddev: f64,
    /// Mean/σ of each pivot's own account-batch `fullFactor` (how much of that pivot's key space
    /// has been claimed as `processed`), plus the ticker-global `covered_accounts.full_factor()`
    /// the scheduler actually gates healing and pivot-seeding decisions on.
    pub accounts_fill_mean: f64,
    pub accounts_fill_stddev: f64,
    pub accounts_fill_coverage: f64,
    /// Depth of the storage-slot work queue across `fetchStorageFull`/`fetchStoragePart` for the
    /// current pivot — what `storage_slots_qu_prio_thresh` compares against.
    pub n_storage_queue: usize,
    /// How many times `covered_accounts` has filled and been reset (`seed_fresh_pivot`'s
    /// `cov_acc_times_full`) — a sync that never finishes sees this climb without bound.
    pub n_queues: u64,
}

fn mean_stddev(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Builds a [`TickerSnapshot`] out of the pivot table and the scheduler's global coverage
/// tracker. `storage_queue_len` and `cov_acc_times_full` are threaded in by the coordinator,
/// which is the only thing holding both the table and those two scheduler-owned counters.
pub fn sample(
    table: &PivotTable,
    covered_accounts: &NodeTagRangeSet,
    cov_acc_times_full: u64,
    beacon_block: u64,
    storage_queue_len: usize,
) -> TickerSnapshot {
    let n_accounts_samples: Vec<f64> = table.iter().map(|p| p.n_accounts as f64).collect();
    let fill_samples: Vec<f64> = table
        .iter()
        .map(|p| p.fetch_accounts.processed.full_factor())
        .collect();
    let (n_accounts_mean, n_accounts_stddev) = mean_stddev(&n_accounts_samples);
    let (accounts_fill_mean, accounts_fill_stddev) = mean_stddev(&fill_samples);

    TickerSnapshot {
        beacon_block,
        pivot_block: table.last_value().map(|p| p.block_number()).unwrap_or(0),
        n_accounts_mean,
        n_accounts_stddev,
        accounts_fill_mean,
        accounts_fill_stddev,
        accounts_fill_coverage: covered_accounts.full_factor(),
        n_storage_queue: storage_queue_len,
        n_queues: cov_acc_times_full,
    }
}

/// Logs `snapshot` at `info` level, matching the teacher's inline `info!`/`debug!` progress
/// lines in `sync.rs` rather than routing through a separate metrics sink.
pub fn log(snapshot: &TickerSnapshot) {
    tracing::info!(
        beacon_block = snapshot.beacon_block,
        pivot_block = snapshot.pivot_block,
        n_accounts_mean = snapshot.n_accounts_mean,
        n_accounts_stddev = snapshot.n_accounts_stddev,
        accounts_fill_mean = snapshot.accounts_fill_mean,
        accounts_fill_stddev = snapshot.accounts_fill_stddev,
        accounts_fill_coverage = snapshot.accounts_fill_coverage,
        n_storage_queue = snapshot.n_storage_queue,
        n_queues = snapshot.n_queues,
        "snap-sync progress",
    );
}
