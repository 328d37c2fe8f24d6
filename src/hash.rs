//! Ready-made hash, equality and copy callbacks for common key types.
//!
//! The integer mixer and the two djb2 variants produce the same values on
//! every platform, so bucket placement is reproducible across runs. When
//! keys already implement `Hash`, [`build_hash`] adapts any `BuildHasher`
//! instead (hashbrown's `DefaultHashBuilder` unless told otherwise).

use crate::error::TableError;
use core::hash::{BuildHasher, Hash};

pub use hashbrown::hash_map::DefaultHashBuilder;

const DJB2_SEED: u64 = 5381;

/// Splitmix-style finalizer for integer keys.
pub fn int_hash(key: &u64) -> u64 {
    let mut x = *key;
    x = (x ^ (x >> 31) ^ (x >> 62)).wrapping_mul(0x319642b2d24d8ec3);
    x = (x ^ (x >> 27) ^ (x >> 54)).wrapping_mul(0x96de1b173f119089);
    x ^ (x >> 30) ^ (x >> 60)
}

pub fn int_eq(a: &u64, b: &u64) -> bool {
    a == b
}

/// djb2 over the UTF-8 bytes: `h = h * 33 + byte`.
pub fn str_hash(key: &str) -> u64 {
    key.bytes()
        .fold(DJB2_SEED, |h, b| h.wrapping_mul(33).wrapping_add(u64::from(b)))
}

pub fn str_eq(a: &str, b: &str) -> bool {
    a == b
}

/// djb2 xor variant for arbitrary byte keys: `h = h * 33 ^ byte`.
pub fn bytes_hash(key: &[u8]) -> u64 {
    key.iter()
        .fold(DJB2_SEED, |h, &b| h.wrapping_mul(33) ^ u64::from(b))
}

pub fn bytes_eq(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Owned copy of a text key. Fails instead of aborting when the buffer
/// cannot be allocated.
pub fn str_copy(key: &str) -> Result<String, TableError> {
    let mut out = String::new();
    out.try_reserve_exact(key.len())?;
    out.push_str(key);
    Ok(out)
}

/// Releases a copy made by [`str_copy`].
pub fn str_free(key: String) {
    drop(key);
}

pub fn build_hash<S, K>(builder: &S, key: &K) -> u64
where
    S: BuildHasher,
    K: ?Sized + Hash,
{
    builder.hash_one(key)
}
