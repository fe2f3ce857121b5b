//! ByteTable: open-addressing table core with tombstones and adaptive
//! resize triggers.

use crate::alloc::{BufferAlloc, Heap};
use crate::config::TableConfig;
use crate::hash::{fnv1a, HashFn};
use crate::probe_stats::ProbeWindow;
use core::fmt;
use core::ptr::NonNull;

/// One slot of the table.
///
/// Exposed for the positional [`ByteTable::slot`] accessor; external
/// traversals must skip `Empty` and `Tombstone` themselves. A tombstone
/// marks a deleted entry that still keeps probe sequences through it
/// alive; only a rehash reclaims tombstones physically.
#[derive(Clone, Copy, Debug)]
pub enum Slot<'a> {
    /// Never occupied, or reclaimed by a rehash. Terminates failed scans.
    Empty,
    /// Live entry. `hash` is the key's digest, computed exactly once.
    Occupied {
        key: &'a [u8],
        value: &'a [u8],
        hash: u64,
    },
    /// Logically deleted. Scans continue past it.
    Tombstone,
}

impl<'a> Slot<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone)
    }

    /// Key and value references when occupied.
    pub fn entry(&self) -> Option<(&'a [u8], &'a [u8])> {
        match *self {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        }
    }
}

/// Failure modes of [`ByteTable::set`].
#[derive(Debug, PartialEq, Eq)]
pub enum InsertError {
    /// The full probe cycle found neither the key nor a free slot. With a
    /// growth threshold below 1.0 this cannot happen (growth runs before
    /// every insertion); seeing it means the resize policy was configured
    /// out of action, so treat it as a logic-error signal, not a routine
    /// condition to swallow.
    TableFull,
}

/// Point-in-time counters for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableStats {
    pub len: usize,
    pub capacity: usize,
    pub tombstones: usize,
    pub load_factor: f64,
    /// Rolling mean probe length over the sample window.
    pub mean_probe: usize,
}

/// Open-addressing, linear-probing hash table mapping byte-sequence keys
/// to byte-sequence values.
///
/// The table stores *references* into caller-owned memory and never
/// copies key or value bytes; callers keep the referenced memory alive
/// for the table's lifetime `'a` and remain responsible for releasing it,
/// unless they opt into the [`remove_free`]/[`clear_free`] release paths.
///
/// Three independent triggers keep probing cheap, all funneled through
/// one rehash primitive:
/// - grow when the load factor reaches the growth threshold (checked in
///   `set` before the insertion lands);
/// - shrink toward the capacity floor when the load factor falls to the
///   shrink threshold (checked after `remove` and `clear`);
/// - grow when the rolling mean probe length exceeds the probe limit,
///   regardless of load factor (clustered or adversarial digests can
///   produce long chains in a near-empty table).
///
/// Lookups record probe statistics and may trigger that third resize,
/// which is why `get`/`contains_key` take `&mut self`. Returned
/// references borrow caller memory, not table storage, so they remain
/// valid across any rehash.
///
/// Single-threaded by design: no operation suspends or blocks, and the
/// `&mut self` receivers provide the external exclusion a shared table
/// would otherwise need.
///
/// Dropping the table releases only the slot array, never the referenced
/// key/value memory; call [`clear_free`] first for a sweep that does.
///
/// [`remove_free`]: ByteTable::remove_free
/// [`clear_free`]: ByteTable::clear_free
pub struct ByteTable<'a, A: BufferAlloc = Heap> {
    slots: Box<[Slot<'a>]>,
    len: usize,
    cfg: TableConfig,
    hash: HashFn,
    probes: ProbeWindow,
    alloc: A,
}

impl<'a> ByteTable<'a, Heap> {
    /// Table with default configuration and the FNV-1a digest.
    pub fn new() -> Self {
        Self::with_parts(TableConfig::default(), fnv1a, Heap)
    }

    pub fn with_config(cfg: TableConfig) -> Self {
        Self::with_parts(cfg, fnv1a, Heap)
    }

    /// Default configuration, custom digest function. The digest is fixed
    /// for the table's lifetime; entries cache their digest and rehashes
    /// never invoke the function again.
    pub fn with_hasher(hash: HashFn) -> Self {
        Self::with_parts(TableConfig::default(), hash, Heap)
    }
}

impl<'a> Default for ByteTable<'a, Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, A: BufferAlloc> ByteTable<'a, A> {
    /// Fully parameterized constructor. Degenerate config values are
    /// repaired (see [`TableConfig`]).
    pub fn with_parts(cfg: TableConfig, hash: HashFn, alloc: A) -> Self {
        let cfg = cfg.sanitized();
        Self {
            slots: vec![Slot::Empty; cfg.default_capacity].into_boxed_slice(),
            len: 0,
            probes: ProbeWindow::new(cfg.probe_window),
            cfg,
            hash,
            alloc,
        }
    }

    /// Number of occupied slots. Tombstones are not counted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Insert a key/value pair, or update the value if the key is already
    /// present (the stored key reference is retained on update and `len`
    /// does not change).
    ///
    /// An exact match wins over any tombstone passed earlier in the scan,
    /// so a key never occupies two slots. New entries land in the
    /// earliest free slot of the probe sequence, reusing tombstones.
    pub fn set(&mut self, key: &'a [u8], value: &'a [u8]) -> Result<(), InsertError> {
        // Both growth triggers run first so the insertion lands in a
        // table that is neither overloaded nor pathologically clustered.
        self.maybe_grow_on_probes();
        self.maybe_grow_on_load();

        let hash = (self.hash)(key);
        let cap = self.slots.len();
        let home = (hash % cap as u64) as usize;
        let mut first_free: Option<usize> = None;
        let mut examined = 0;

        for step in 0..cap {
            let idx = (home + step) % cap;
            examined += 1;
            match self.slots[idx] {
                Slot::Empty => {
                    let target = first_free.unwrap_or(idx);
                    self.slots[target] = Slot::Occupied { key, value, hash };
                    self.len += 1;
                    self.probes.record(examined);
                    return Ok(());
                }
                Slot::Tombstone => {
                    if first_free.is_none() {
                        first_free = Some(idx);
                    }
                }
                Slot::Occupied {
                    key: stored,
                    hash: stored_hash,
                    ..
                } => {
                    if stored_hash == hash && stored == key {
                        self.slots[idx] = Slot::Occupied {
                            key: stored,
                            value,
                            hash: stored_hash,
                        };
                        self.probes.record(examined);
                        return Ok(());
                    }
                }
            }
        }

        self.probes.record(examined);
        if let Some(target) = first_free {
            self.slots[target] = Slot::Occupied { key, value, hash };
            self.len += 1;
            return Ok(());
        }
        Err(InsertError::TableFull)
    }

    /// Look up a key and return the stored value reference.
    ///
    /// Takes `&mut self`: the lookup records its probe length and can
    /// force a probe-limit resize. The returned reference borrows caller
    /// memory and stays valid across resizes.
    pub fn get(&mut self, key: &[u8]) -> Option<&'a [u8]> {
        self.locate(key).map(|(_, _, value)| value)
    }

    pub fn contains_key(&mut self, key: &[u8]) -> bool {
        self.locate(key).is_some()
    }

    /// Remove a key, leaving a tombstone. Returns the evicted key/value
    /// references; the caller still owns that memory. Runs the shrink
    /// check on success.
    pub fn remove(&mut self, key: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
        let (idx, stored_key, value) = self.locate(key)?;
        self.slots[idx] = Slot::Tombstone;
        self.len -= 1;
        self.maybe_shrink();
        Some((stored_key, value))
    }

    /// Remove a key and release its buffers through the table's
    /// allocator. When the key and value references share an address the
    /// underlying buffer is released exactly once, using the longer of
    /// the two lengths. Zero-length references are never released.
    ///
    /// # Safety
    /// The entry's key and value buffers must have been allocated by this
    /// table's allocator with their reference lengths (for an aliased
    /// pair, the longer reference must span the whole allocation), and no
    /// other live borrows of those buffers may exist.
    pub unsafe fn remove_free(&mut self, key: &[u8]) -> bool {
        match self.remove(key) {
            Some((stored_key, value)) => {
                unsafe { self.release_pair(stored_key, value) };
                true
            }
            None => false,
        }
    }

    /// Reset every slot to empty and collapse capacity toward the floor.
    /// Stored references are forgotten, not released.
    pub fn clear(&mut self) {
        self.slots.fill(Slot::Empty);
        self.len = 0;
        self.maybe_shrink();
        self.probes.reset();
    }

    /// [`clear`](ByteTable::clear), releasing every occupied slot's
    /// buffers first (same alias rule as [`remove_free`]).
    ///
    /// # Safety
    /// Same contract as [`remove_free`], applied to every occupied slot.
    ///
    /// [`remove_free`]: ByteTable::remove_free
    pub unsafe fn clear_free(&mut self) {
        for i in 0..self.slots.len() {
            if let Slot::Occupied { key, value, .. } = self.slots[i] {
                unsafe { self.release_pair(key, value) };
            }
        }
        self.clear();
    }

    /// Positional raw-slot accessor for external traversal
    /// (`for idx in 0..capacity`). Callers must filter empty and
    /// tombstone slots themselves; prefer [`iter`](ByteTable::iter)
    /// unless slot indices matter.
    pub fn slot(&self, index: usize) -> Option<&Slot<'a>> {
        self.slots.get(index)
    }

    /// Iterator over occupied entries as `(key, value)` pairs. Borrowing
    /// the table shared rules out structural mutation mid-iteration.
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    pub fn stats(&self) -> TableStats {
        let tombstones = self.slots.iter().filter(|s| s.is_tombstone()).count();
        TableStats {
            len: self.len,
            capacity: self.slots.len(),
            tombstones,
            load_factor: self.load_factor(),
            mean_probe: self.probes.mean(),
        }
    }

    /// Write a human-readable dump: an overview line followed by one line
    /// per slot with hex-rendered key/value bytes.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        const RULE: &str = "------------------------------------------------";
        let cap = self.slots.len();
        writeln!(out, "{RULE}")?;
        writeln!(out, "Byte table overview:")?;
        writeln!(
            out,
            "Len: {} | Capacity: {} | Load: {:.1}% (max: {:.1}%).",
            self.len,
            cap,
            self.load_factor() * 100.0,
            self.cfg.growth_threshold * 100.0,
        )?;
        writeln!(out)?;
        for (idx, slot) in self.slots.iter().enumerate() {
            match *slot {
                Slot::Empty => writeln!(out, "[IDX {idx} | empty]")?,
                Slot::Tombstone => writeln!(out, "[IDX {idx} | tombstone]")?,
                Slot::Occupied { key, value, hash } => writeln!(
                    out,
                    "[IDX {idx} | HOME {} | K: <{}> ({}b) | V: <{}> ({}b)]",
                    hash % cap as u64,
                    HexBytes(key),
                    key.len(),
                    HexBytes(value),
                    value.len(),
                )?,
            }
        }
        writeln!(out, "{RULE}")
    }

    /// Locate a key: probe from its home index, skipping tombstones,
    /// until an exact match (hit) or an empty slot (sound miss, because
    /// insertion never leaves a gap inside a live probe run). Records the
    /// probe length and runs the probe-limit check first, like every
    /// probing operation.
    fn locate(&mut self, key: &[u8]) -> Option<(usize, &'a [u8], &'a [u8])> {
        self.maybe_grow_on_probes();

        let hash = (self.hash)(key);
        let cap = self.slots.len();
        let home = (hash % cap as u64) as usize;
        let mut examined = 0;
        let mut found = None;

        for step in 0..cap {
            let idx = (home + step) % cap;
            examined += 1;
            match self.slots[idx] {
                Slot::Tombstone => continue,
                Slot::Empty => break,
                Slot::Occupied {
                    key: stored,
                    value,
                    hash: stored_hash,
                } => {
                    if stored_hash == hash && stored == key {
                        found = Some((idx, stored, value));
                        break;
                    }
                }
            }
        }

        self.probes.record(examined);
        found
    }

    /// Rebuild the slot array at `new_capacity`, reinserting occupied
    /// slots by their cached digest and dropping tombstones. This is the
    /// only place tombstones become empty slots again. Probe history is
    /// meaningless across a resize, so the window is reset.
    fn rehash(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(self.cfg.min_capacity).max(self.len).max(1);
        let mut new_slots = vec![Slot::Empty; new_capacity].into_boxed_slice();
        let mut moved = 0;

        for slot in self.slots.iter() {
            if let Slot::Occupied { key, value, hash } = *slot {
                let home = (hash % new_capacity as u64) as usize;
                for step in 0..new_capacity {
                    let idx = (home + step) % new_capacity;
                    if new_slots[idx].is_empty() {
                        new_slots[idx] = Slot::Occupied { key, value, hash };
                        moved += 1;
                        break;
                    }
                }
            }
        }

        debug_assert_eq!(moved, self.len, "rehash must carry every live entry");
        self.slots = new_slots;
        self.len = moved;
        self.probes.reset();
    }

    fn grow(&mut self) {
        let cap = self.slots.len();
        let target = (cap as f64 * self.cfg.growth_factor) as usize;
        self.rehash(target.max(cap + 1));
    }

    fn maybe_grow_on_load(&mut self) {
        if self.load_factor() >= self.cfg.growth_threshold {
            self.grow();
        }
    }

    fn maybe_grow_on_probes(&mut self) {
        if self.probes.mean() > self.cfg.probe_limit {
            self.grow();
        }
    }

    fn maybe_shrink(&mut self) {
        if self.load_factor() <= self.cfg.shrink_threshold {
            let candidate = (self.len * self.cfg.shrink_factor).max(self.cfg.min_capacity);
            if candidate < self.slots.len() {
                self.rehash(candidate);
            }
        }
    }

    /// Release an evicted key/value pair, exactly once for aliased pairs.
    ///
    /// # Safety
    /// See [`remove_free`](ByteTable::remove_free).
    unsafe fn release_pair(&self, key: &[u8], value: &[u8]) {
        unsafe {
            if key.as_ptr() == value.as_ptr() {
                let len = key.len().max(value.len());
                if len > 0 {
                    self.alloc
                        .free(NonNull::new_unchecked(key.as_ptr() as *mut u8), len);
                }
            } else {
                if !key.is_empty() {
                    self.alloc
                        .free(NonNull::new_unchecked(key.as_ptr() as *mut u8), key.len());
                }
                if !value.is_empty() {
                    self.alloc.free(
                        NonNull::new_unchecked(value.as_ptr() as *mut u8),
                        value.len(),
                    );
                }
            }
        }
    }
}

impl<'a, A: BufferAlloc> fmt::Debug for ByteTable<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteTable")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .field("load_factor", &self.load_factor())
            .finish_non_exhaustive()
    }
}

/// Iterator over occupied entries, see [`ByteTable::iter`].
pub struct Iter<'s, 'a> {
    slots: core::slice::Iter<'s, Slot<'a>>,
}

impl<'s, 'a> Iterator for Iter<'s, 'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied { key, value, .. } = *slot {
                return Some((key, value));
            }
        }
        None
    }
}

/// Hex rendering for dump lines, truncated past 16 bytes.
struct HexBytes<'a>(&'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LIMIT: usize = 16;
        for b in self.0.iter().take(LIMIT) {
            write!(f, "{b:02X}")?;
        }
        if self.0.len() > LIMIT {
            write!(f, "..")?;
        }
        Ok(())
    }
}
