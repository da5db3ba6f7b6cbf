//! Valve pulse controller.
//!
//! Each valve is a countdown in 500 µs ticks.  A trigger asserts the output
//! and loads the countdown; the countdown reaching zero deasserts it.
//! Re-triggering restarts the countdown (last write wins).
//!
//! ## Invariant
//!
//! `countdown > 0` ⇔ the valve output is asserted.  This driver only tracks
//! state; the owning service mirrors [`ValveBank::asserted_mask`] onto the
//! output port after every change.

use crate::config::VALVE_TICKS_PER_MS;

/// Number of valves on the board.
pub const VALVE_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveId {
    Valve0 = 0,
    Valve1 = 1,
}

impl ValveId {
    pub const ALL: [ValveId; VALVE_COUNT] = [ValveId::Valve0, ValveId::Valve1];

    /// Bit of this valve in the output mask.
    pub fn mask(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValveBank {
    countdown: [u16; VALVE_COUNT],
}

impl ValveBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `valve` for `duration_ms`.  A zero duration closes it.
    ///
    /// Durations are capped so the tick count fits the counter.
    pub fn trigger(&mut self, valve: ValveId, duration_ms: u16) {
        let ticks = u32::from(duration_ms) * VALVE_TICKS_PER_MS;
        self.countdown[valve as usize] = ticks.min(u32::from(u16::MAX)) as u16;
    }

    /// Close `valve` immediately.
    pub fn cancel(&mut self, valve: ValveId) {
        self.countdown[valve as usize] = 0;
    }

    pub fn close_all(&mut self) {
        self.countdown = [0; VALVE_COUNT];
    }

    /// Advance one 500 µs tick.  Returns the mask of valves that closed on
    /// this tick.
    pub fn tick(&mut self) -> u8 {
        let mut closed = 0;
        for valve in ValveId::ALL {
            let c = &mut self.countdown[valve as usize];
            if *c > 0 {
                *c -= 1;
                if *c == 0 {
                    closed |= valve.mask();
                }
            }
        }
        closed
    }

    pub fn is_open(&self, valve: ValveId) -> bool {
        self.countdown[valve as usize] > 0
    }

    pub fn remaining_ticks(&self, valve: ValveId) -> u16 {
        self.countdown[valve as usize]
    }

    /// Output bits for every valve currently open.
    pub fn asserted_mask(&self) -> u8 {
        ValveId::ALL
            .iter()
            .filter(|v| self.is_open(**v))
            .fold(0, |m, v| m | v.mask())
    }
}
