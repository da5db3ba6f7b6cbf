//! Tick scheduler.
//!
//! Divides the 500 µs base tick into the three cadences the control loop
//! runs on and notifies a [`TickDelegate`].  The main loop feeds it one
//! [`Event::BaseTick`](crate::events::Event::BaseTick) at a time.
//!
//! ```text
//!  Base timer (500 µs) ──▶ Event Queue ──▶ TickScheduler
//!                                              │
//!                      ┌───────────────────────┼──────────────────┐
//!                      ▼                       ▼                  ▼
//!            new_second (every 2000)   tick_500us (every)   tick_1ms (every 2)
//! ```
//!
//! When cadences coincide the order is fixed: `new_second`, `tick_500us`,
//! `tick_1ms`.  A second boundary always lands on a 1 ms tick.

use crate::app::ports::TickDelegate;
use crate::config::{BASE_TICKS_PER_MS, BASE_TICKS_PER_SECOND};

/// The scheduler engine.
///
/// Decoupled from the event system: it counts base ticks and calls the
/// delegate, nothing else.  This keeps it independently testable.
#[derive(Debug, Default)]
pub struct TickScheduler {
    /// Base ticks since the last second boundary.
    phase: u32,
    /// Total base ticks since start.
    base_ticks: u64,
    seconds: u32,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one 500 µs base tick.
    pub fn on_base_tick(&mut self, delegate: &mut dyn TickDelegate) {
        self.base_ticks = self.base_ticks.wrapping_add(1);
        self.phase += 1;

        if self.phase >= BASE_TICKS_PER_SECOND {
            self.phase = 0;
            self.seconds = self.seconds.wrapping_add(1);
            delegate.new_second();
        }

        delegate.tick_500us();

        if self.phase % BASE_TICKS_PER_MS == 0 {
            delegate.tick_1ms();
        }
    }

    pub fn base_ticks(&self) -> u64 {
        self.base_ticks
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
