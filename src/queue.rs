//! FIFO work queue used by the breadth-first walk.
//!
//! The walk only needs three primitives: start empty, append at the back,
//! and take the front element. Appending reserves first so that running
//! out of memory surfaces as an error instead of an abort.

use std::collections::{TryReserveError, VecDeque};

pub(crate) struct WorkQueue<T> {
    items: VecDeque<T>,
}

impl<T> WorkQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, item: T) -> Result<(), TryReserveError> {
        self.items.try_reserve(1)?;
        self.items.push_back(item);
        Ok(())
    }

    /// Removes the front element; the caller owns it from here on.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }
}
