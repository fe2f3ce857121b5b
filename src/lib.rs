//! bytetable: a single-threaded, open-addressing hash table mapping
//! opaque byte-sequence keys to opaque byte-sequence values, storing
//! references into caller-owned memory rather than copies.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a fixed-key-size-agnostic associative store usable as a
//!   building block (resource registries, lookup caches, name tables),
//!   with collision resolution, deletion, and resizing implemented from
//!   scratch so worst-case probing stays bounded.
//! - Layers:
//!   - ByteTable<'a, A>: the probing engine: linear scans with
//!     wrap-around, cached 64-bit digests, tombstone deletion, and one
//!     rehash primitive behind three independent resize triggers
//!     (load-factor growth, load-factor shrink, probe-limit growth).
//!   - ProbeWindow: bounded ring of recent probe lengths whose rolling
//!     mean detects clustering the load factor cannot see.
//!   - BufferAlloc / Heap: the raw-allocator collaborator for the opt-in
//!     buffer-release paths; exhaustion is fatal, never an error value.
//!   - HashFn / fnv1a: pluggable digest, fixed per table at construction.
//!
//! Constraints
//! - Single-threaded: no internal locking; `&mut self` receivers provide
//!   the exclusion a shared table would need.
//! - Untyped: keys and values are `&[u8]`; no generic type system.
//! - Non-owning: the table never copies or frees key/value bytes unless a
//!   `*_free` operation is explicitly invoked.
//!
//! Digest and rehashing invariants
//! - Each entry caches its digest; resizing reinserts by the cached value
//!   and never re-invokes the digest function.
//! - A tombstone never terminates a scan that is still searching for a
//!   key; only an empty slot does. Tombstones are physically reclaimed
//!   only by a rehash.
//!
//! Failure semantics
//! - Not-found and table-full are ordinary returned values (`Option`,
//!   `Result`); allocator exhaustion aborts the process, matching the
//!   fail-fast allocation discipline of the system this table serves.
//!
//! Notes and non-goals
//! - No concurrent access support and no `Send`/`Sync` story beyond what
//!   the field types derive naturally.
//! - The positional `slot()` accessor leaks slot layout by design (bulk
//!   traversal escape hatch); `iter()` is the filtered alternative and
//!   rules out structural mutation mid-iteration by borrowing the table.
//! - Lookups take `&mut self` because they feed probe analytics and may
//!   trigger a resize; returned references borrow caller memory and
//!   survive resizes.

mod alloc;
mod config;
mod hash;
mod probe_stats;
mod table;
mod table_proptest;

// Public surface
pub use alloc::{BufferAlloc, Heap};
pub use config::TableConfig;
pub use hash::{fnv1a, HashFn};
pub use table::{ByteTable, InsertError, Iter, Slot, TableStats};
