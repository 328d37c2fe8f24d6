// ChainedTable integration suite.
//
// Each test states what behavior is verified. Invariants exercised:
// - Lookup parity: every stored pair is retrievable until removed.
// - Overwrite: updating a key keeps `len` and the stored key, replaces the value.
// - Removal: `take` hands the value back unreleased, `delete` releases it.
// - Ownership: copies are released exactly once, borrowed data never.
// - Iteration: `foreach` tolerates deleting the visited entry.
mod common;

use std::borrow::Cow;
use std::cell::Cell;
use treehash::{hash, ChainedTable, Ownership, SetOutcome, TableConfig, TableError, Visit};

thread_local! {
    static COPIES: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
}

fn counting_copy(s: &str) -> Result<String, TableError> {
    COPIES.with(|c| c.set(c.get() + 1));
    hash::str_copy(s)
}

fn counting_free(s: String) {
    FREES.with(|c| c.set(c.get() + 1));
    hash::str_free(s);
}

fn reset_counters() {
    COPIES.with(|c| c.set(0));
    FREES.with(|c| c.set(0));
}

fn copies() -> usize {
    COPIES.with(Cell::get)
}

fn frees() -> usize {
    FREES.with(Cell::get)
}

// Test: text keys with integer values.
// Verifies: every pair is retrievable and the count matches.
#[test]
fn text_keys_small_set() {
    common::init_tracing();
    let keys: Vec<String> = (1..=9).map(|i| format!("key{}", i)).collect();
    let values: Vec<i64> = (11..=19).collect();
    let mut t = ChainedTable::with_str_keys(Ownership::FixedCopy).unwrap();
    for (k, v) in keys.iter().zip(&values) {
        assert_eq!(t.set(k, v).unwrap(), SetOutcome::Inserted);
    }
    assert_eq!(t.len(), 9);
    for (k, v) in keys.iter().zip(&values) {
        assert_eq!(t.get(k), Some(v));
    }
    assert_eq!(t.get("key10"), None);
}

// Test: a large integer population grows through several rungs and drains
// back down.
// Verifies: len tracks inserts and deletes; deleted keys are gone while the
// rest stay reachable.
#[test]
fn integer_keys_grow_and_drain() {
    common::init_tracing();
    const N: u64 = 100_000;
    let keys: Vec<u64> = (0..N).collect();
    let squares: Vec<u64> = keys.iter().map(|k| k * k).collect();
    let mut t = ChainedTable::with_int_keys(Ownership::FixedCopy).unwrap();
    for (k, v) in keys.iter().zip(&squares) {
        t.set(k, v).unwrap();
    }
    assert_eq!(t.len(), N as usize);
    assert!(t.load_factor() < t.config().grow_at);
    assert!(t.bucket_count() > 37);
    for k in &keys {
        assert_eq!(t.get(k), Some(&(k * k)));
    }

    for (i, k) in keys.iter().enumerate() {
        assert!(t.delete(k));
        assert!(!t.contains(k));
        if i % 9973 == 0 {
            if let Some(next) = keys.get(i + 1) {
                assert_eq!(t.get(next), Some(&(next * next)));
            }
        }
    }
    assert_eq!(t.len(), 0);
    assert_eq!(t.bucket_count(), 37, "a drained table returns to the bottom rung");
}

// Test: overwriting a key.
// Verifies: len unchanged, latest value wins, original stored key kept.
#[test]
fn overwrite_keeps_len_and_key() {
    reset_counters();
    let mut t: ChainedTable<str, str> = ChainedTable::builder()
        .hash_with(hash::str_hash)
        .compare_with(hash::str_eq)
        .keys(Ownership::copy_with(counting_copy, counting_free))
        .values(Ownership::FixedCopy)
        .build()
        .unwrap();
    assert_eq!(t.set("k", "v1").unwrap(), SetOutcome::Inserted);
    assert_eq!(t.set("k", "v2").unwrap(), SetOutcome::Updated);
    assert_eq!(t.len(), 1);
    assert_eq!(t.get("k"), Some("v2"));
    assert_eq!(copies(), 1, "the key is copied once, on insert");
    drop(t);
    assert_eq!(frees(), 1);
}

// Test: value release accounting across update, take, delete and drop.
// Verifies: each stored copy is released exactly once, except the value
// handed out by `take`.
#[test]
fn value_copies_released_exactly_once() {
    reset_counters();
    let mut t = ChainedTable::with_str_keys(Ownership::copy_with(counting_copy, counting_free))
        .unwrap();
    t.set("a", "1").unwrap();
    t.set("b", "2").unwrap();
    t.set("c", "3").unwrap();
    assert_eq!((copies(), frees()), (3, 0));

    t.set("a", "10").unwrap();
    assert_eq!((copies(), frees()), (4, 1), "update releases the old value");

    let taken = t.take("b").unwrap();
    assert_eq!(&*taken, "2");
    assert_eq!(frees(), 1, "take hands the value back unreleased");

    assert!(t.delete("c"));
    assert_eq!(frees(), 2);
    assert!(!t.delete("c"));
    assert_eq!(frees(), 2);

    drop(t);
    assert_eq!(frees(), 3, "drop releases what is left");
}

// Test: a copy that fails during update.
// Verifies: the table keeps the previous value.
#[test]
fn failed_copy_leaves_table_unchanged() {
    fn refuse_long(s: &str) -> Result<String, TableError> {
        if s.len() > 3 {
            Err(TableError::VisitorFailed)
        } else {
            hash::str_copy(s)
        }
    }
    let mut t = ChainedTable::with_str_keys(Ownership::copy_with(refuse_long, hash::str_free))
        .unwrap();
    t.set("k", "ok").unwrap();
    assert!(t.set("k", "too long").is_err());
    assert!(t.set("j", "too long").is_err());
    assert_eq!(t.get("k"), Some("ok"));
    assert!(!t.contains("j"));
    assert_eq!(t.len(), 1);
}

// Test: borrowed values.
// Verifies: the table hands back the caller's own data without copying.
#[test]
fn borrowed_values_are_passthrough() {
    let payload = String::from("payload");
    let mut t = ChainedTable::with_str_keys(Ownership::Borrowed).unwrap();
    t.set("p", payload.as_str()).unwrap();
    let got = t.get("p").unwrap();
    assert!(std::ptr::eq(got, payload.as_str()));
    match t.take("p").unwrap() {
        Cow::Borrowed(s) => assert!(std::ptr::eq(s, payload.as_str())),
        Cow::Owned(_) => panic!("borrowed policy must not copy"),
    }
}

// Test: emplace as an in-place upsert.
// Verifies: new entries start empty, stores release the previous value.
#[test]
fn emplace_counts_words() {
    let text = "the cat and the hat and the bat";
    let words: Vec<&str> = text.split(' ').collect();
    let mut t: ChainedTable<str, u32> =
        ChainedTable::with_str_keys(Ownership::FixedCopy).unwrap();
    for w in &words {
        let mut slot = t.emplace(w).unwrap();
        let next = slot.get().copied().unwrap_or(0) + 1;
        slot.store_owned(next);
    }
    assert_eq!(t.len(), 5);
    assert_eq!(t.get("the"), Some(&3));
    assert_eq!(t.get("and"), Some(&2));
    assert_eq!(t.get("cat"), Some(&1));
}

// Test: foreach deleting every visited entry.
// Verifies: the walk visits everything, empties the table, and the shrink
// after the walk goes all the way back to the bottom rung.
#[test]
fn foreach_deletes_everything() {
    common::init_tracing();
    let keys: Vec<u64> = (0..1_000).collect();
    let mut t = ChainedTable::with_int_keys(Ownership::FixedCopy).unwrap();
    for k in &keys {
        t.set(k, k).unwrap();
    }
    let grown = t.bucket_count();
    let mut sum = 0;
    t.foreach(|e| {
        sum += *e.key();
        assert_eq!(e.value(), Some(e.key()));
        e.delete();
        Visit::Continue
    })
    .unwrap();
    assert_eq!(sum, keys.iter().sum::<u64>());
    assert!(t.is_empty());
    assert!(grown > 37);
    assert_eq!(t.bucket_count(), 37);
}

// Test: purge then reuse.
// Verifies: every copy is released and the table accepts new entries.
#[test]
fn purge_releases_all() {
    reset_counters();
    let mut t = ChainedTable::with_str_keys(Ownership::copy_with(counting_copy, counting_free))
        .unwrap();
    for k in ["x", "y", "z"] {
        t.set(k, k).unwrap();
    }
    t.purge();
    assert_eq!(frees(), 3);
    assert!(t.is_empty());
    t.set("x", "again").unwrap();
    assert_eq!(t.get("x"), Some("again"));
}

// Test: custom thresholds.
// Verifies: a lower grow threshold grows sooner.
#[test]
fn custom_thresholds_take_effect() {
    let keys: Vec<u64> = (0..40).collect();
    let mut t: ChainedTable<u64, u64> = ChainedTable::builder()
        .hash_with(hash::int_hash)
        .compare_with(hash::int_eq)
        .keys(Ownership::FixedCopy)
        .values(Ownership::FixedCopy)
        .config(TableConfig {
            grow_at: 1.0,
            shrink_at: 0.1,
        })
        .build()
        .unwrap();
    for k in &keys[..36] {
        t.set(k, k).unwrap();
    }
    assert_eq!(t.bucket_count(), 37);
    t.set(&keys[36], &keys[36]).unwrap();
    assert_eq!(t.bucket_count(), 79);
}

// Test: keys hashed through a BuildHasher.
// Verifies: byte-slice keys work with hashbrown's default hasher and with
// the djb2-xor helper alike.
#[test]
fn byte_keys_with_either_hasher() {
    let keys: Vec<Vec<u8>> = (0u8..50).map(|i| vec![i, i.wrapping_mul(7), 1]).collect();
    let mut hashed: ChainedTable<[u8], u8> =
        ChainedTable::with_default_hasher(Ownership::FixedCopy, Ownership::FixedCopy).unwrap();
    let mut djb: ChainedTable<[u8], u8> = ChainedTable::new(
        hash::bytes_hash,
        hash::bytes_eq,
        Ownership::FixedCopy,
        Ownership::FixedCopy,
    )
    .unwrap();
    for k in &keys {
        hashed.set(k, &k[0]).unwrap();
        djb.set(k, &k[0]).unwrap();
    }
    for k in &keys {
        assert_eq!(hashed.get(k), Some(&k[0]));
        assert_eq!(djb.get(k), Some(&k[0]));
    }
    assert_eq!(hashed.len(), djb.len());
}
