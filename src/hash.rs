//! Pluggable key-digest function.
//!
//! A `ByteTable` hashes opaque byte sequences, so the digest function is a
//! plain `fn(&[u8]) -> u64` chosen at construction time and immutable for
//! the table's lifetime. The digest is computed once per key and cached in
//! the slot; resizing reuses the cached digest and never calls the
//! function again.

/// Digest function signature. Replacements should have good avalanche
/// behavior: probe-length quality degrades directly with digest quality.
pub type HashFn = fn(&[u8]) -> u64;

const FNV_OFFSET_BASIS: u64 = 1469598103934665603;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a, 64-bit. The default digest function.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
