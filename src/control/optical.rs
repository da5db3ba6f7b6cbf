//! Optical sampling cadence.
//!
//! A free-running counter against a divider of the 1 ms tick.  The 1 s
//! boundary presets the counter so the very next 1 ms tick samples, which
//! keeps the sampling phase locked to the shared clock epoch.

/// Divides the 1 ms tick down to the optical sampling rate.
#[derive(Debug, Clone)]
pub struct OpticalCadence {
    counter: u16,
    divider: u16,
}

impl OpticalCadence {
    /// A divider of 0 is treated as 1 (sample every tick).
    pub fn new(divider: u16) -> Self {
        Self {
            counter: 0,
            divider: divider.max(1),
        }
    }

    /// Advance by one 1 ms tick.  Returns `true` when a sample is due; the
    /// counter is reset in that case.
    pub fn tick(&mut self) -> bool {
        self.counter = self.counter.wrapping_add(1);
        if self.counter >= self.divider {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    /// Align to a 1 s boundary: the next [`tick`](Self::tick) samples.
    pub fn align_to_second(&mut self) {
        self.counter = self.divider - 1;
    }

    pub fn divider(&self) -> u16 {
        self.divider
    }

    pub fn set_divider(&mut self, divider: u16) {
        self.divider = divider.max(1);
        self.counter = 0;
    }
}
