//! Error types for the tree and the table.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors raised by [`ChainedTable`](crate::ChainedTable) construction and
/// mutation. A missing key is never an error; lookups report it as `None`.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("no hash function configured")]
    MissingHash,

    #[error("no key comparator configured")]
    MissingCompare,

    #[error("unusable load thresholds: shrink_at={shrink_at}, grow_at={grow_at}")]
    InvalidThresholds { shrink_at: f64, grow_at: f64 },

    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    #[error("visitor reported failure")]
    VisitorFailed,
}

/// Errors raised by [`AvlTree::traverse`](crate::AvlTree::traverse).
#[derive(Debug, Error)]
pub enum TraverseError {
    #[error("unknown traversal order {0}")]
    UnknownOrder(u8),

    #[error("visitor reported failure after {visited} nodes")]
    VisitorFailed { visited: usize },

    #[error("breadth-first queue allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}
