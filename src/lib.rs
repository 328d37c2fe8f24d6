//! treehash: two general-purpose, single-threaded containers with
//! caller-supplied ordering and hashing.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an ordered index and a hashed index that never dictate how
//!   records are compared, hashed or owned. The caller supplies those as
//!   callbacks and policies.
//! - Containers:
//!   - AvlTree<T, C>: height-balanced binary search tree over an arena of
//!     records addressed by stable `NodeId` handles. Duplicates are
//!     allowed. Seven traversal orders with early stop.
//!   - ChainedTable<'a, K, V>: separate-chaining hash table whose bucket
//!     count steps along a fixed ladder of primes, with per-field
//!     ownership policies for keys and values.
//! - Support:
//!   - traverse: step-table driven depth-first walker plus breadth-first
//!     over a `WorkQueue`.
//!   - ownership / hash: storage policies and ready-made callbacks.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (both containers embed a
//!   marker through their reentrancy guard).
//! - Handles are generational; a removed record's handle never resolves
//!   again, and rotations or swaps never invalidate any other handle.
//! - Allocation failure is reported where Rust exposes fallible
//!   allocation (breadth-first queue, bucket arrays, text copies).
//!
//! Reentrancy policy
//! - Mutating entry points that run user callbacks (comparator, hash,
//!   equality, table visitor) hold a debug-only reentrancy guard; nesting
//!   one inside another panics in debug builds.
//! - Shared lookups take no guard. A callback may query the container
//!   while `find_equal`, `get` or `contains` is running.
//! - Visitors run while the container is consistent. A table visitor can
//!   only delete the entry it is looking at, through its cursor.
//!
//! Hashing and rehashing invariants
//! - Each table entry stores its full `u64` hash. Probing checks it before
//!   calling the equality callback, and resizing relinks by stored hash;
//!   the hash callback is never invoked after insertion.
//!
//! Notes and non-goals
//! - No persistence and no iteration order guarantees for the table.
//! - Key/value ownership for the table is fixed at construction.
//!
//! Logging
//! - With the `tracing` feature, table resizes log at `debug`, skipped
//!   resizes at `warn`, rotations and queue failures at `trace`.

pub mod avl;
mod avl_proptest;
pub mod chained_table;
mod chained_table_proptest;
mod error;
pub mod hash;
mod ladder;
mod ownership;
mod queue;
mod reentrancy;
mod traverse;

// Public surface
pub use avl::{AvlTree, NodeId};
pub use chained_table::{
    ChainedTable, Iter, SetOutcome, TableBuilder, TableConfig, ValueSlot, Visiting,
};
pub use error::{TableError, TraverseError};
pub use ownership::Ownership;
pub use traverse::{TraversalOrder, Visit};
