//! Rolling window of probe-length samples.
//!
//! Each table operation records how many slots it examined. The window
//! keeps the last `W` samples in a ring and reports their mean; the table
//! compares that mean against its probe limit to detect clustering that
//! the load factor alone cannot see. A resize invalidates the history, so
//! the window is reset whenever the slot array is rebuilt.

#[derive(Debug)]
pub(crate) struct ProbeWindow {
    samples: Box<[usize]>,
    cursor: usize,
}

impl ProbeWindow {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            samples: vec![0; window.max(1)].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Record one operation's probe length, overwriting the oldest sample.
    pub(crate) fn record(&mut self, probes: usize) {
        let w = self.samples.len();
        self.samples[self.cursor % w] = probes;
        self.cursor = self.cursor.wrapping_add(1);
    }

    /// Integer mean over the full window. Slots not yet written count as
    /// zero, so the mean ramps up as the window fills.
    pub(crate) fn mean(&self) -> usize {
        let sum: usize = self.samples.iter().sum();
        sum / self.samples.len()
    }

    pub(crate) fn reset(&mut self) {
        self.samples.fill(0);
        self.cursor = 0;
    }
}
