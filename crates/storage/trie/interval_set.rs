//! Disjoint, ordered sets of ranges over the trie's 256-bit leaf-key space.
//!
//! A [`NodeTagRangeSet`] is the scheduling currency for snap-sync: the account key space and
//! every account's storage key space are each partitioned into "already processed", "still to
//! fetch" and "in flight" subsets of `[0, 2^256)`, and those subsets are sets of ranges, not
//! individual keys, so that a single bulk leaf-range response can be folded in with one
//! `merge` call instead of 10,000 individual insertions.

use ethereum_types::{H256, U256};

/// A point in the 256-bit leaf-key space (the numeric value of a 32-byte hash).
pub type NodeTag = U256;

/// An inclusive range `[start, end]` of leaf keys, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeTagRange {
    pub start: NodeTag,
    pub end: NodeTag,
}

impl NodeTagRange {
    pub fn new(start: NodeTag, end: NodeTag) -> Self {
        assert!(start <= end, "NodeTagRange must be non-empty");
        Self { start, end }
    }

    /// `[0, 2^256 - 1]`, the entire key space.
    pub fn full() -> Self {
        Self {
            start: NodeTag::zero(),
            end: NodeTag::MAX,
        }
    }

    pub fn single(tag: NodeTag) -> Self {
        Self {
            start: tag,
            end: tag,
        }
    }

    /// Number of keys covered, saturating at `2^256` (represented as `U256::MAX` since the true
    /// count doesn't fit in 256 bits for the full range).
    pub fn len(&self) -> U256 {
        self.end
            .saturating_sub(self.start)
            .saturating_add(U256::one())
    }

    pub fn contains(&self, tag: NodeTag) -> bool {
        tag >= self.start && tag <= self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if the two ranges touch with no gap (so they could merge into one range).
    pub fn is_adjacent(&self, other: &Self) -> bool {
        (self.end != NodeTag::MAX && self.end + 1 == other.start)
            || (other.end != NodeTag::MAX && other.end + 1 == self.start)
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }

    pub fn from_hash(key: H256) -> NodeTag {
        U256::from_big_endian(key.as_bytes())
    }

    pub fn to_hash(tag: NodeTag) -> H256 {
        let mut buf = [0u8; 32];
        tag.to_big_endian(&mut buf);
        H256(buf)
    }
}

/// A set of pairwise-disjoint, non-adjacent ranges, kept sorted by `start`.
///
/// Every mutating operation restores the disjoint/non-adjacent/sorted invariant before
/// returning, so callers never need to normalise the set themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTagRangeSet {
    ranges: Vec<NodeTagRange>,
}

impl NodeTagRangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn full() -> Self {
        Self {
            ranges: vec![NodeTagRange::full()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0] == NodeTagRange::full()
    }

    pub fn ranges(&self) -> &[NodeTagRange] {
        &self.ranges
    }

    /// Total number of keys covered, saturating at `U256::MAX`.
    pub fn len(&self) -> U256 {
        self.ranges
            .iter()
            .fold(U256::zero(), |acc, r| acc.saturating_add(r.len()))
    }

    /// Fraction of the full `2^256` key space covered by this set, as an `f64` in `[0, 1]`.
    /// Only the top 64 bits of each range's length are used, which is more than enough
    /// precision for a coverage ratio.
    pub fn full_factor(&self) -> f64 {
        if self.is_full() {
            return 1.0;
        }
        let mut total = 0f64;
        for r in &self.ranges {
            let len = r.len();
            // 2^256 doesn't fit any native float exactly; approximate via the leading limbs.
            let words = len.0;
            let hi = words[3] as f64 * 2f64.powi(192)
                + words[2] as f64 * 2f64.powi(128)
                + words[1] as f64 * 2f64.powi(64)
                + words[0] as f64;
            total += hi;
        }
        // 2^256 as f64
        let full = 2f64.powi(256);
        (total / full).min(1.0)
    }

    /// Inserts `iv`, merging with adjacent/overlapping ranges. Returns the number of *new*
    /// points added (points in `iv` not already covered).
    pub fn merge(&mut self, iv: NodeTagRange) -> U256 {
        let before = self.covered(iv);
        let mut start = iv.start;
        let mut end = iv.end;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.overlaps(&NodeTagRange::new(start, end)) || r.is_adjacent(&NodeTagRange::new(start, end)) {
                start = start.min(r.start);
                end = end.max(r.end);
            } else {
                kept.push(r);
            }
        }
        kept.push(NodeTagRange::new(start, end));
        kept.sort_by_key(|r| r.start);
        self.ranges = kept;
        iv.len().saturating_sub(before)
    }

    /// Removes `iv` from the set. Returns the number of points actually removed.
    pub fn reduce(&mut self, iv: NodeTagRange) -> U256 {
        let removed = self.covered(iv);
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if !r.overlaps(&iv) {
                kept.push(r);
                continue;
            }
            // Left remainder
            if r.start < iv.start {
                kept.push(NodeTagRange::new(r.start, iv.start - 1));
            }
            // Right remainder
            if r.end > iv.end {
                kept.push(NodeTagRange::new(iv.end + 1, r.end));
            }
        }
        kept.sort_by_key(|r| r.start);
        self.ranges = kept;
        removed
    }

    /// Number of points in `self` that fall within `iv`.
    pub fn covered(&self, iv: NodeTagRange) -> U256 {
        self.ranges
            .iter()
            .filter_map(|r| r.intersection(&iv))
            .fold(U256::zero(), |acc, r| acc.saturating_add(r.len()))
    }

    /// Smallest range in the set whose start is `>= pt`, if any.
    pub fn ge(&self, pt: NodeTag) -> Option<NodeTagRange> {
        self.ranges
            .iter()
            .find(|r| r.end >= pt)
            .map(|r| NodeTagRange::new(r.start.max(pt), r.end))
    }

    /// Largest range in the set whose end is `<= pt`, if any.
    pub fn le(&self, pt: NodeTag) -> Option<NodeTagRange> {
        self.ranges
            .iter()
            .rev()
            .find(|r| r.start <= pt)
            .map(|r| NodeTagRange::new(r.start, r.end.min(pt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tag(n: u64) -> NodeTag {
        NodeTag::from(n)
    }

    #[test]
    fn merge_disjoint_ranges_stay_sorted() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::new(tag(10), tag(20)));
        s.merge(NodeTagRange::new(tag(0), tag(5)));
        assert_eq!(s.ranges().len(), 2);
        assert_eq!(s.ranges()[0], NodeTagRange::new(tag(0), tag(5)));
        assert_eq!(s.ranges()[1], NodeTagRange::new(tag(10), tag(20)));
    }

    #[test]
    fn merge_adjacent_ranges_coalesce() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::new(tag(0), tag(5)));
        s.merge(NodeTagRange::new(tag(6), tag(10)));
        assert_eq!(s.ranges(), &[NodeTagRange::new(tag(0), tag(10))]);
    }

    #[test]
    fn merge_overlapping_ranges_coalesce() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::new(tag(0), tag(10)));
        let added = s.merge(NodeTagRange::new(tag(5), tag(15)));
        assert_eq!(s.ranges(), &[NodeTagRange::new(tag(0), tag(15))]);
        assert_eq!(added, tag(5)); // 11..=15 is new
    }

    #[test]
    fn reduce_splits_range() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::new(tag(0), tag(20)));
        s.reduce(NodeTagRange::new(tag(5), tag(10)));
        assert_eq!(
            s.ranges(),
            &[
                NodeTagRange::new(tag(0), tag(4)),
                NodeTagRange::new(tag(11), tag(20))
            ]
        );
    }

    #[test]
    fn singleton_round_trip() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::single(tag(42)));
        assert!(!s.is_empty());
        assert_eq!(s.covered(NodeTagRange::single(tag(42))), tag(1));
        s.reduce(NodeTagRange::single(tag(42)));
        assert!(s.is_empty());
    }

    #[test]
    fn full_range_round_trips() {
        let mut s = NodeTagRangeSet::new();
        s.merge(NodeTagRange::full());
        assert!(s.is_full());
        assert_eq!(s.full_factor(), 1.0);
    }

    proptest! {
        #[test]
        fn merge_then_reduce_is_identity(a in 0u64..1000, b in 0u64..1000, c in 0u64..1000, d in 0u64..1000) {
            let (lo1, hi1) = (a.min(b), a.max(b));
            let iv = NodeTagRange::new(tag(lo1), tag(hi1));
            let (lo2, hi2) = (c.min(d), c.max(d));
            let mut s = NodeTagRangeSet::new();
            s.merge(NodeTagRange::new(tag(lo2), tag(hi2)));
            let before = s.clone();
            s.merge(iv);
            s.reduce(iv);
            // merge(iv).reduce(iv) restores everything that was covered before merging iv,
            // minus whatever part of iv fell inside the pre-existing set (that part survives
            // reduce too, so we only compare outside of iv).
            for r in before.ranges() {
                if let Some(outside) = r.intersection(&NodeTagRange::new(NodeTag::zero(), iv.start.saturating_sub(NodeTag::one()))) {
                    prop_assert_eq!(s.covered(outside), before.covered(outside));
                }
            }
        }

        #[test]
        fn covered_is_subadditive(a in 0u64..500, b in 0u64..500, q in 0u64..500, r in 0u64..500) {
            let (lo1, hi1) = (a.min(b), a.max(b));
            let (lo2, hi2) = (q.min(r), q.max(r));
            let mut s = NodeTagRangeSet::new();
            s.merge(NodeTagRange::new(tag(lo1), tag(hi1)));
            let iv = NodeTagRange::new(tag(lo2), tag(hi2));
            prop_assert!(s.covered(iv) <= iv.len());
        }
    }
}
