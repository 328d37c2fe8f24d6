//! Ownership policies for keys and values held by a
//! [`ChainedTable`](crate::ChainedTable).
//!
//! A policy is picked once per field when the table is built and decides
//! two things: what gets stored when the caller hands over a reference,
//! and how an owned copy is released when the entry goes away. Stored
//! data is a `Cow`: `Borrowed` for passthrough, `Owned` for copies.

use crate::error::TableError;
use core::fmt;
use std::borrow::Cow;

pub enum Ownership<T: ?Sized + ToOwned> {
    /// Store the caller's reference verbatim; the table owns nothing.
    Borrowed,
    /// Store a plain duplicate (`ToOwned`), released by dropping it.
    FixedCopy,
    /// Store what `copy` produces; release it through `free`.
    CopyWith {
        copy: fn(&T) -> Result<T::Owned, TableError>,
        free: fn(T::Owned),
    },
}

impl<T: ?Sized + ToOwned> Ownership<T> {
    pub fn copy_with(copy: fn(&T) -> Result<T::Owned, TableError>, free: fn(T::Owned)) -> Self {
        Ownership::CopyWith { copy, free }
    }

    /// Whether stored data is an independent copy.
    pub fn is_owning(&self) -> bool {
        !matches!(self, Ownership::Borrowed)
    }

    pub(crate) fn store<'a>(&self, src: &'a T) -> Result<Cow<'a, T>, TableError> {
        match self {
            Ownership::Borrowed => Ok(Cow::Borrowed(src)),
            Ownership::FixedCopy => Ok(Cow::Owned(src.to_owned())),
            Ownership::CopyWith { copy, .. } => copy(src).map(Cow::Owned),
        }
    }

    pub(crate) fn release(&self, held: Cow<'_, T>) {
        match (self, held) {
            (Ownership::CopyWith { free, .. }, Cow::Owned(owned)) => free(owned),
            (_, held) => drop(held),
        }
    }
}

impl<T: ?Sized + ToOwned> Clone for Ownership<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized + ToOwned> Copy for Ownership<T> {}

impl<T: ?Sized + ToOwned> fmt::Debug for Ownership<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Borrowed => f.write_str("Borrowed"),
            Ownership::FixedCopy => f.write_str("FixedCopy"),
            Ownership::CopyWith { .. } => f.write_str("CopyWith"),
        }
    }
}
