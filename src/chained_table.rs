//! ChainedTable: separate-chaining hash table sized from a prime ladder.
//!
//! Buckets hold the head of a singly linked chain; chain links are
//! [`slotmap`] keys into one entry arena, so relinking never moves keys or
//! values. Every entry caches its full hash. Probing compares the cached
//! hash before calling the equality callback, and resizing relinks entries
//! against the new bucket count without rehashing a single key.
//!
//! The bucket count always sits on a rung of a fixed prime ladder. After an
//! insert or removal the table steps at most one rung: down when the load
//! factor falls to `shrink_at`, up when it reaches `grow_at`.
//!
//! Keys and values are stored according to an [`Ownership`] policy per
//! field. Passthrough storage keeps the caller's `&'a` reference, which is
//! what the table's lifetime parameter tracks; copying policies store an
//! owned value and release it when the entry goes away.

use crate::error::TableError;
use crate::hash::{self, DefaultHashBuilder};
use crate::ladder::{self, LADDER};
use crate::ownership::Ownership;
use crate::reentrancy::DebugReentrancy;
use crate::traverse::Visit;
use core::hash::{BuildHasher, Hash};
use slotmap::{new_key_type, SlotMap};
use std::borrow::Cow;

new_key_type! {
    struct EntryKey;
}

// One rung moves the load by roughly 2x; the thresholds must be further apart.
const MIN_THRESHOLD_SPREAD: f64 = 2.5;

/// Load-factor thresholds that drive ladder steps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableConfig {
    /// Step up one rung once `len / buckets` reaches this.
    pub grow_at: f64,
    /// Step down one rung once `len / buckets` falls to this.
    pub shrink_at: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            grow_at: 2.0,
            shrink_at: 0.25,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        let usable = self.grow_at.is_finite()
            && self.shrink_at.is_finite()
            && self.shrink_at >= 0.0
            && self.shrink_at * MIN_THRESHOLD_SPREAD < self.grow_at;
        if usable {
            Ok(())
        } else {
            Err(TableError::InvalidThresholds {
                shrink_at: self.shrink_at,
                grow_at: self.grow_at,
            })
        }
    }
}

/// Result of [`ChainedTable::set`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SetOutcome {
    /// A new entry was created.
    Inserted,
    /// The key was present; its value was replaced and the stored key kept.
    Updated,
}

struct Entry<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> {
    key: Cow<'a, K>,
    value: Option<Cow<'a, V>>,
    hash: u64,
    next: Option<EntryKey>,
}

impl<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> Entry<'a, K, V> {
    fn release(self, keys: &Ownership<K>, values: &Ownership<V>) {
        keys.release(self.key);
        if let Some(value) = self.value {
            values.release(value);
        }
    }
}

/// Where a probe ended: the chain, the link before the match (or the tail
/// when nothing matched) and the match itself.
struct Spot {
    bucket: usize,
    prev: Option<EntryKey>,
    found: Option<EntryKey>,
}

/// Bucket heads plus the entry arena, split from the callbacks and the
/// reentrancy guard: those stay borrowed while chains are rewritten.
struct Chains<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> {
    heads: Vec<Option<EntryKey>>,
    entries: SlotMap<EntryKey, Entry<'a, K, V>>,
    rung: usize,
}

impl<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> Chains<'a, K, V> {
    fn new() -> Result<Self, TableError> {
        let buckets = LADDER[0] as usize;
        let mut heads = Vec::new();
        heads.try_reserve_exact(buckets)?;
        heads.resize(buckets, None);
        Ok(Self {
            heads,
            entries: SlotMap::with_key(),
            rung: 0,
        })
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    fn load_factor(&self) -> f64 {
        self.entries.len() as f64 / self.heads.len() as f64
    }

    fn locate(&self, hash: u64, key: &K, eq: &dyn Fn(&K, &K) -> bool) -> Spot {
        let bucket = self.bucket_of(hash);
        let mut prev = None;
        let mut cur = self.heads[bucket];
        while let Some(k) = cur {
            let entry = &self.entries[k];
            if entry.hash == hash && eq(&*entry.key, key) {
                return Spot {
                    bucket,
                    prev,
                    found: Some(k),
                };
            }
            prev = cur;
            cur = entry.next;
        }
        Spot {
            bucket,
            prev,
            found: None,
        }
    }

    /// Appends `entry` after the tail recorded in a missed probe.
    fn link(&mut self, spot: &Spot, entry: Entry<'a, K, V>) -> EntryKey {
        let k = self.entries.insert(entry);
        match spot.prev {
            Some(tail) => self.entries[tail].next = Some(k),
            None => self.heads[spot.bucket] = Some(k),
        }
        k
    }

    fn unlink(&mut self, spot: &Spot) -> Option<Entry<'a, K, V>> {
        let entry = self.entries.remove(spot.found?)?;
        match spot.prev {
            Some(prev) => self.entries[prev].next = entry.next,
            None => self.heads[spot.bucket] = entry.next,
        }
        Some(entry)
    }

    /// Steps one rung if the load factor crossed a threshold and reports
    /// whether it did. A bucket array that cannot be allocated leaves the
    /// table as it was.
    fn adjust_by_load(&mut self, config: &TableConfig) -> bool {
        let load = self.load_factor();
        let target = if self.rung > 0 && load <= config.shrink_at {
            self.rung - 1
        } else if self.rung + 1 < LADDER.len() && load >= config.grow_at {
            self.rung + 1
        } else {
            return false;
        };
        let Some(buckets) = ladder::buckets_at(target) else {
            return false;
        };
        let mut heads: Vec<Option<EntryKey>> = Vec::new();
        if let Err(_err) = heads.try_reserve_exact(buckets) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                error = %_err,
                from = self.heads.len(),
                to = buckets,
                "bucket array allocation failed; resize skipped"
            );
            return false;
        }
        heads.resize(buckets, None);

        for head in core::mem::take(&mut self.heads) {
            let mut cur = head;
            while let Some(k) = cur {
                let entry = &mut self.entries[k];
                cur = entry.next;
                let b = (entry.hash % buckets as u64) as usize;
                entry.next = heads[b];
                heads[b] = Some(k);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            from_rung = self.rung,
            to_rung = target,
            buckets,
            len = self.entries.len(),
            "chained table resized"
        );
        self.heads = heads;
        self.rung = target;
        true
    }
}

/// Separate-chaining hash table. See the module docs for sizing and
/// ownership rules.
pub struct ChainedTable<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> {
    hash: Box<dyn Fn(&K) -> u64 + 'a>,
    eq: Box<dyn Fn(&K, &K) -> bool + 'a>,
    keys: Ownership<K>,
    values: Ownership<V>,
    config: TableConfig,
    chains: Chains<'a, K, V>,
    reentrancy: DebugReentrancy,
}

impl<'a, V: ?Sized + ToOwned + 'a> ChainedTable<'a, u64, V> {
    /// Integer keys: splitmix hash, keys copied by value.
    pub fn with_int_keys(values: Ownership<V>) -> Result<Self, TableError> {
        Self::new(hash::int_hash, hash::int_eq, Ownership::FixedCopy, values)
    }
}

impl<'a, V: ?Sized + ToOwned + 'a> ChainedTable<'a, str, V> {
    /// Text keys: djb2 hash, keys copied through [`hash::str_copy`].
    pub fn with_str_keys(values: Ownership<V>) -> Result<Self, TableError> {
        Self::new(
            hash::str_hash,
            hash::str_eq,
            Ownership::copy_with(hash::str_copy, hash::str_free),
            values,
        )
    }
}

impl<'a, K, V> ChainedTable<'a, K, V>
where
    K: ?Sized + ToOwned + 'a,
    V: ?Sized + ToOwned + 'a,
{
    pub fn new<H, E>(
        hash: H,
        eq: E,
        keys: Ownership<K>,
        values: Ownership<V>,
    ) -> Result<Self, TableError>
    where
        H: Fn(&K) -> u64 + 'a,
        E: Fn(&K, &K) -> bool + 'a,
    {
        TableBuilder::new()
            .hash_with(hash)
            .compare_with(eq)
            .keys(keys)
            .values(values)
            .build()
    }

    pub fn builder() -> TableBuilder<'a, K, V> {
        TableBuilder::new()
    }

    /// Keys hashed by hashbrown's default hasher and compared with `Eq`.
    pub fn with_default_hasher(
        keys: Ownership<K>,
        values: Ownership<V>,
    ) -> Result<Self, TableError>
    where
        K: Hash + Eq,
    {
        TableBuilder::new()
            .hasher(DefaultHashBuilder::default())
            .compare_eq()
            .keys(keys)
            .values(values)
            .build()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chains.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chains.entries.is_empty()
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.chains.heads.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.chains.load_factor()
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn probe(&self, key: &K) -> (u64, Spot) {
        let hash = (self.hash)(key);
        let spot = self.chains.locate(hash, key, &*self.eq);
        (hash, spot)
    }

    /// Inserts or updates `key`. On update the previous value is released
    /// and the stored key is kept. A value or key copy that fails leaves
    /// the table unchanged.
    pub fn set(&mut self, key: &'a K, value: &'a V) -> Result<SetOutcome, TableError> {
        let _g = self.reentrancy.enter();
        let (hash, spot) = self.probe(key);
        let value = self.values.store(value)?;
        if let Some(k) = spot.found {
            if let Some(old) = self.chains.entries[k].value.replace(value) {
                self.values.release(old);
            }
            return Ok(SetOutcome::Updated);
        }
        let key = match self.keys.store(key) {
            Ok(key) => key,
            Err(err) => {
                self.values.release(value);
                return Err(err);
            }
        };
        self.chains.link(
            &spot,
            Entry {
                key,
                value: Some(value),
                hash,
                next: None,
            },
        );
        self.chains.adjust_by_load(&self.config);
        Ok(SetOutcome::Inserted)
    }

    /// Finds or creates the entry for `key` and hands back its value slot.
    /// A new entry starts with an empty slot; an existing one keeps its
    /// value until the caller stores something else.
    pub fn emplace(&mut self, key: &'a K) -> Result<ValueSlot<'_, 'a, V>, TableError> {
        let _g = self.reentrancy.enter();
        let (hash, spot) = self.probe(key);
        let k = match spot.found {
            Some(k) => k,
            None => {
                let key = self.keys.store(key)?;
                let k = self.chains.link(
                    &spot,
                    Entry {
                        key,
                        value: None,
                        hash,
                        next: None,
                    },
                );
                self.chains.adjust_by_load(&self.config);
                k
            }
        };
        Ok(ValueSlot {
            value: &mut self.chains.entries[k].value,
            policy: &self.values,
        })
    }

    /// Value stored under `key`. An emplaced entry whose slot was never
    /// filled reads as `None`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let (_, spot) = self.probe(key);
        self.chains.entries[spot.found?].value.as_deref()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.probe(key).1.found.is_some()
    }

    /// Removes the entry and hands its value to the caller unreleased. The
    /// stored key is released.
    pub fn take(&mut self, key: &K) -> Option<Cow<'a, V>> {
        let _g = self.reentrancy.enter();
        let (_, spot) = self.probe(key);
        let entry = self.chains.unlink(&spot)?;
        self.keys.release(entry.key);
        self.chains.adjust_by_load(&self.config);
        entry.value
    }

    /// Removes the entry and releases both key and value. Returns `false`
    /// when the key was absent.
    pub fn delete(&mut self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        let (_, spot) = self.probe(key);
        let Some(entry) = self.chains.unlink(&spot) else {
            return false;
        };
        entry.release(&self.keys, &self.values);
        self.chains.adjust_by_load(&self.config);
        true
    }

    /// Visits every entry, bucket by bucket. The visitor may delete the
    /// entry it is looking at through [`Visiting::delete`]. Once the walk is
    /// over the table shrinks as many rungs as those deletions call for.
    pub fn foreach<F>(&mut self, mut visit: F) -> Result<(), TableError>
    where
        F: FnMut(&mut Visiting<'_, K, V>) -> Visit,
    {
        let _g = self.reentrancy.enter();
        let mut removed = false;
        let mut outcome = Ok(());
        'walk: for bucket in 0..self.chains.heads.len() {
            let mut prev = None;
            let mut cur = self.chains.heads[bucket];
            while let Some(k) = cur {
                let entry = &self.chains.entries[k];
                cur = entry.next;
                let mut cursor = Visiting {
                    key: &*entry.key,
                    value: entry.value.as_deref(),
                    delete: false,
                };
                let flow = visit(&mut cursor);
                if cursor.delete {
                    let spot = Spot {
                        bucket,
                        prev,
                        found: Some(k),
                    };
                    if let Some(entry) = self.chains.unlink(&spot) {
                        entry.release(&self.keys, &self.values);
                    }
                    removed = true;
                } else {
                    prev = Some(k);
                }
                match flow {
                    Visit::Continue => {}
                    Visit::Stop => break 'walk,
                    Visit::Fail => {
                        outcome = Err(TableError::VisitorFailed);
                        break 'walk;
                    }
                }
            }
        }
        if removed {
            while self.chains.adjust_by_load(&self.config) {}
        }
        outcome
    }

    /// Releases every entry. The bucket array keeps its current size.
    pub fn purge(&mut self) {
        self.chains.heads.fill(None);
        for (_, entry) in self.chains.entries.drain() {
            entry.release(&self.keys, &self.values);
        }
    }

    /// Read-only view of all entries in arena order.
    pub fn iter(&self) -> Iter<'_, 'a, K, V> {
        Iter {
            inner: self.chains.entries.values(),
        }
    }

    #[cfg(test)]
    pub(crate) fn rung(&self) -> usize {
        self.chains.rung
    }

    /// Test-only: every entry sits in the chain its cached hash selects,
    /// every chain is acyclic, and the chains cover the arena exactly.
    #[cfg(test)]
    pub(crate) fn check_chains(&self) {
        let mut seen = 0usize;
        for (b, head) in self.chains.heads.iter().enumerate() {
            let mut cur = *head;
            while let Some(k) = cur {
                let entry = &self.chains.entries[k];
                assert_eq!(self.chains.bucket_of(entry.hash), b, "entry in wrong bucket");
                assert_eq!((self.hash)(&*entry.key), entry.hash, "stale cached hash");
                seen += 1;
                assert!(seen <= self.len(), "chain cycle");
                cur = entry.next;
            }
        }
        assert_eq!(seen, self.len(), "unlinked entries in arena");
        assert_eq!(Some(self.bucket_count()), ladder::buckets_at(self.chains.rung));
    }
}

impl<'a, K, V> Drop for ChainedTable<'a, K, V>
where
    K: ?Sized + ToOwned + 'a,
    V: ?Sized + ToOwned + 'a,
{
    fn drop(&mut self) {
        self.purge();
    }
}

/// Handle to the value slot of one entry, returned by
/// [`ChainedTable::emplace`]. Stored values follow the table's value policy.
pub struct ValueSlot<'t, 'a, V: ?Sized + ToOwned + 'a> {
    value: &'t mut Option<Cow<'a, V>>,
    policy: &'t Ownership<V>,
}

impl<'t, 'a, V: ?Sized + ToOwned + 'a> ValueSlot<'t, 'a, V> {
    pub fn get(&self) -> Option<&V> {
        self.value.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Stores `value` per the value policy, releasing whatever was there.
    pub fn store(&mut self, value: &'a V) -> Result<(), TableError> {
        let held = self.policy.store(value)?;
        self.put(held);
        Ok(())
    }

    /// Hands an already owned value to the table.
    pub fn store_owned(&mut self, value: V::Owned) {
        self.put(Cow::Owned(value));
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.value.take() {
            self.policy.release(old);
        }
    }

    fn put(&mut self, held: Cow<'a, V>) {
        if let Some(old) = self.value.replace(held) {
            self.policy.release(old);
        }
    }
}

/// Cursor handed to a [`ChainedTable::foreach`] visitor.
pub struct Visiting<'e, K: ?Sized, V: ?Sized> {
    key: &'e K,
    value: Option<&'e V>,
    delete: bool,
}

impl<'e, K: ?Sized, V: ?Sized> Visiting<'e, K, V> {
    pub fn key(&self) -> &'e K {
        self.key
    }

    pub fn value(&self) -> Option<&'e V> {
        self.value
    }

    /// Removes the visited entry once the visitor returns.
    pub fn delete(&mut self) {
        self.delete = true;
    }
}

/// Iterator returned by [`ChainedTable::iter`].
pub struct Iter<'t, 'a: 't, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> {
    inner: slotmap::basic::Values<'t, EntryKey, Entry<'a, K, V>>,
}

impl<'t, 'a: 't, K, V> Iterator for Iter<'t, 'a, K, V>
where
    K: ?Sized + ToOwned + 'a,
    V: ?Sized + ToOwned + 'a,
{
    type Item = (&'t K, Option<&'t V>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|entry| (&*entry.key, entry.value.as_deref()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Builder for [`ChainedTable`]. Both callbacks are required; ownership
/// policies default to [`Ownership::Borrowed`].
pub struct TableBuilder<'a, K: ?Sized + ToOwned + 'a, V: ?Sized + ToOwned + 'a> {
    hash: Option<Box<dyn Fn(&K) -> u64 + 'a>>,
    eq: Option<Box<dyn Fn(&K, &K) -> bool + 'a>>,
    keys: Ownership<K>,
    values: Ownership<V>,
    config: TableConfig,
}

impl<'a, K, V> Default for TableBuilder<'a, K, V>
where
    K: ?Sized + ToOwned + 'a,
    V: ?Sized + ToOwned + 'a,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K, V> TableBuilder<'a, K, V>
where
    K: ?Sized + ToOwned + 'a,
    V: ?Sized + ToOwned + 'a,
{
    pub fn new() -> Self {
        Self {
            hash: None,
            eq: None,
            keys: Ownership::Borrowed,
            values: Ownership::Borrowed,
            config: TableConfig::default(),
        }
    }

    pub fn hash_with<H>(mut self, hash: H) -> Self
    where
        H: Fn(&K) -> u64 + 'a,
    {
        self.hash = Some(Box::new(hash));
        self
    }

    /// Hashes keys through a `BuildHasher`.
    pub fn hasher<S>(self, hasher: S) -> Self
    where
        S: BuildHasher + 'a,
        K: Hash,
    {
        self.hash_with(move |key: &K| hash::build_hash(&hasher, key))
    }

    pub fn compare_with<E>(mut self, eq: E) -> Self
    where
        E: Fn(&K, &K) -> bool + 'a,
    {
        self.eq = Some(Box::new(eq));
        self
    }

    pub fn compare_eq(self) -> Self
    where
        K: Eq,
    {
        self.compare_with(|a: &K, b: &K| a == b)
    }

    pub fn keys(mut self, keys: Ownership<K>) -> Self {
        self.keys = keys;
        self
    }

    pub fn values(mut self, values: Ownership<V>) -> Self {
        self.values = values;
        self
    }

    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ChainedTable<'a, K, V>, TableError> {
        let hash = self.hash.ok_or(TableError::MissingHash)?;
        let eq = self.eq.ok_or(TableError::MissingCompare)?;
        self.config.validate()?;
        Ok(ChainedTable {
            hash,
            eq,
            keys: self.keys,
            values: self.values,
            config: self.config,
            chains: Chains::new()?,
            reentrancy: DebugReentrancy::new(),
        })
    }
}
