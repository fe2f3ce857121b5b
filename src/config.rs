//! Table tuning parameters.

/// Capacity, resize, and probe-analytics tunables for a [`ByteTable`].
///
/// The defaults match the engine the table was extracted for: a 4096-slot
/// default capacity with a 1024-slot floor, grow at 66% load, shrink at
/// 25% load, and force a growth whenever the rolling mean probe length
/// over the last 64 operations exceeds 32 slots.
///
/// [`ByteTable`]: crate::ByteTable
#[derive(Clone, Copy, Debug)]
pub struct TableConfig {
    /// Slot count of a freshly created table.
    pub default_capacity: usize,
    /// Capacity never drops below this, no matter how many removals occur.
    pub min_capacity: usize,
    /// Multiplier applied to capacity on growth. Must exceed 1.0.
    pub growth_factor: f64,
    /// Shrink rebuilds to `len * shrink_factor` slots (floored at
    /// `min_capacity`). Must be at least 1.
    pub shrink_factor: usize,
    /// Load factor at or above which `set` grows before inserting.
    pub growth_threshold: f64,
    /// Load factor at or below which `remove`/`clear` consider shrinking.
    pub shrink_threshold: f64,
    /// Number of recent probe-length samples kept for analytics.
    pub probe_window: usize,
    /// Mean probe length above which a growth is forced regardless of
    /// load factor.
    pub probe_limit: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_capacity: 4096,
            min_capacity: 1024,
            growth_factor: 2.0,
            shrink_factor: 2,
            growth_threshold: 0.66,
            shrink_threshold: 0.25,
            probe_window: 64,
            probe_limit: 32,
        }
    }
}

impl TableConfig {
    /// Replace degenerate values with workable ones. A factor that cannot
    /// enlarge (or a zero capacity/window) would wedge the resize policy.
    pub(crate) fn sanitized(mut self) -> Self {
        if !(self.growth_factor > 1.0) {
            self.growth_factor = 2.0;
        }
        self.shrink_factor = self.shrink_factor.max(1);
        self.min_capacity = self.min_capacity.max(1);
        self.default_capacity = self.default_capacity.max(self.min_capacity);
        self.probe_window = self.probe_window.max(1);
        self
    }
}
