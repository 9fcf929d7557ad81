//! Range batch scheduler (`spec.md` §4.E): hands out disjoint sub-ranges of the account (or one
//! account's storage-slot) key space to peer workers, and takes them back on failure.
//!
//! Concurrency note: under the cooperative single-threaded model (§5) `get_unprocessed` and
//! `release_success`/`release_failure` are never interleaved with each other for the same
//! pivot — a worker's read-modify-write of `unprocessed` is atomic with respect to other tasks
//! simply because nothing suspends in between.

use ethereum_rust_trie::{NodeTag, NodeTagRange, NodeTagRangeSet};
use rand::Rng;

use crate::snap_sync::pivot::SnapRangeBatch;

/// A claim handed to a worker by [`get_unprocessed`]. Dropping it without calling
/// [`release_success`]/[`release_failure`] would leak the range out of the partition — callers
/// must always resolve one or the other, typically in a `finally`-style guard at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim(pub NodeTagRange);

/// Draws the next work claim from `batch`, capped at `account_range_max`. Returns `None` when
/// both `unprocessed` sets are empty (nothing left to do for this pivot/kind right now).
pub fn get_unprocessed(batch: &mut SnapRangeBatch, account_range_max: NodeTag) -> Option<Claim> {
    if batch.unprocessed.0.is_empty() && !batch.unprocessed.1.is_empty() {
        std::mem::swap(&mut batch.unprocessed.0, &mut batch.unprocessed.1);
    }
    let picked = batch
        .unprocessed
        .0
        .ge(NodeTag::zero())
        .or_else(|| batch.unprocessed.1.ge(NodeTag::zero()))?;

    let capped_end = if picked.len() > account_range_max {
        picked.start + account_range_max - NodeTag::one()
    } else {
        picked.end
    };
    let claimed = NodeTagRange::new(picked.start, capped_end);

    batch.unprocessed.0.reduce(claimed);
    batch.unprocessed.1.reduce(claimed);
    Some(Claim(claimed))
}

/// Registers the interval a peer actually covered (which may be a prefix of the claim) as
/// `processed`, folds it into the global `covered_accounts` tracker, and releases whatever of
/// the claim went unconsumed back to `unprocessed[1]`.
pub fn release_success(
    batch: &mut SnapRangeBatch,
    covered_accounts: &mut NodeTagRangeSet,
    claim: Claim,
    consumed: NodeTagRange,
) {
    batch.processed.merge(consumed);
    covered_accounts.merge(consumed);
    if consumed.end < claim.0.end {
        batch
            .unprocessed
            .1
            .merge(NodeTagRange::new(consumed.end + NodeTag::one(), claim.0.end));
    }
}

/// Returns the entire claim to `unprocessed[1]` after a failed fetch.
pub fn release_failure(batch: &mut SnapRangeBatch, claim: Claim) {
    batch.unprocessed.1.merge(claim.0);
}

/// Tie-break reset run when a new pivot is built (`spec.md` §4.E edge cases): if the global
/// `covered_accounts` tracker has already filled the whole key space, reset it, bump
/// `cov_acc_times_full`, and random-split `[0, 2^256)` between `unprocessed[0]`/`[1]` so
/// different pivots explore different regions first. Otherwise seed `unprocessed[0]` with the
/// complement of `covered_accounts` and `unprocessed[1]` with `covered_accounts` itself
/// (already-seen keys are deprioritised, not excluded).
pub fn seed_fresh_pivot(
    batch: &mut SnapRangeBatch,
    covered_accounts: &mut NodeTagRangeSet,
    cov_acc_times_full: &mut u64,
) {
    if covered_accounts.is_full() {
        *covered_accounts = NodeTagRangeSet::new();
        *cov_acc_times_full += 1;
        let split = random_split_point();
        batch.unprocessed.0 = NodeTagRangeSet::new();
        batch.unprocessed.0.merge(NodeTagRange::new(NodeTag::zero(), split));
        batch.unprocessed.1 = NodeTagRangeSet::new();
        if split < NodeTag::MAX {
            batch
                .unprocessed
                .1
                .merge(NodeTagRange::new(split + NodeTag::one(), NodeTag::MAX));
        }
        return;
    }
    let mut complement = NodeTagRangeSet::full();
    for r in covered_accounts.ranges() {
        complement.reduce(*r);
    }
    batch.unprocessed.0 = complement;
    batch.unprocessed.1 = covered_accounts.clone();
}

/// A random point strictly inside `(0, 2^256-1)`, retried until non-degenerate (neither `0` nor
/// `2^256-1`, which would make one half of the split empty).
fn random_split_point() -> NodeTag {
    loop {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        let candidate = NodeTag::from_big_endian(&bytes);
        if !candidate.is_zero() && candidate != NodeTag::MAX {
            return candidate;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag(n: u64) -> NodeTag {
        NodeTag::from(n)
    }

    #[test]
    fn get_unprocessed_caps_at_range_max() {
        let mut batch = SnapRangeBatch::covering_everything();
        let claim = get_unprocessed(&mut batch, tag(100)).unwrap();
        assert_eq!(claim.0.len(), tag(100));
        assert_eq!(claim.0.start, NodeTag::zero());
    }

    #[test]
    fn swaps_to_secondary_when_primary_drained() {
        let mut batch = SnapRangeBatch::default();
        batch.unprocessed.1.merge(NodeTagRange::new(tag(0), tag(9)));
        let claim = get_unprocessed(&mut batch, tag(1000)).unwrap();
        assert_eq!(claim.0, NodeTagRange::new(tag(0), tag(9)));
    }

    #[test]
    fn release_success_splits_consumed_from_unconsumed_tail() {
        let mut batch = SnapRangeBatch::covering_everything();
        let claim = get_unprocessed(&mut batch, tag(100)).unwrap();
        let mut covered = NodeTagRangeSet::new();
        let consumed = NodeTagRange::new(claim.0.start, tag(40));
        release_success(&mut batch, &mut covered, claim, consumed);
        assert_eq!(batch.processed.covered(consumed), consumed.len());
        assert_eq!(covered.covered(consumed), consumed.len());
        assert!(batch.unprocessed.1.covered(NodeTagRange::new(tag(41), tag(99))) > tag(0));
    }

    #[test]
    fn release_failure_returns_whole_claim_to_secondary() {
        let mut batch = SnapRangeBatch::covering_everything();
        let claim = get_unprocessed(&mut batch, tag(50)).unwrap();
        release_failure(&mut batch, claim);
        assert_eq!(batch.unprocessed.1.covered(claim.0), claim.0.len());
    }

    #[test]
    fn seed_fresh_pivot_deprioritises_covered_keys_when_not_full() {
        let mut batch = SnapRangeBatch::default();
        let mut covered = NodeTagRangeSet::new();
        covered.merge(NodeTagRange::new(tag(0), tag(10)));
        let mut times_full = 0;
        seed_fresh_pivot(&mut batch, &mut covered, &mut times_full);
        assert_eq!(times_full, 0);
        assert_eq!(batch.unprocessed.1.covered(NodeTagRange::new(tag(0), tag(10))), tag(11));
        assert_eq!(batch.unprocessed.0.covered(NodeTagRange::new(tag(0), tag(10))), tag(0));
    }

    #[test]
    fn seed_fresh_pivot_resets_and_splits_when_covered_accounts_is_full() {
        let mut batch = SnapRangeBatch::default();
        let mut covered = NodeTagRangeSet::full();
        let mut times_full = 0;
        seed_fresh_pivot(&mut batch, &mut covered, &mut times_full);
        assert_eq!(times_full, 1);
        assert!(covered.is_empty());
        assert!(!batch.unprocessed.0.is_empty());
        assert!(!batch.unprocessed.1.is_empty());
    }
}
