//! Bucket-count ladder for [`ChainedTable`](crate::ChainedTable).
//!
//! Each rung is a prime roughly twice the previous one; the table only ever
//! moves one rung at a time.

pub(crate) const LADDER: [u64; 27] = [
    37, 79, 181, 359, 743, 1511, 3023, 6037, 12073, 24001, 48017, 96001, 192007, 384001, 768013,
    1536011, 3072001, 6144001, 12288011, 24576001, 49152001, 98304053, 196608007, 393216007,
    786432001, 1572864001, 3145728023,
];

/// Bucket count at `rung`, or `None` past either end or when the count does
/// not fit the address space.
pub(crate) fn buckets_at(rung: usize) -> Option<usize> {
    LADDER.get(rung).and_then(|&n| usize::try_from(n).ok())
}
