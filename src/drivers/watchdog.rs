//! Main-loop watchdog.
//!
//! The loop checks in once per drain pass with the number of base ticks the
//! queue dropped since the previous pass.  Isolated drops are logged and
//! tolerated.  A loop that keeps losing ticks pass after pass can no longer
//! hold the 500 µs cadence, so the watchdog stops feeding the task
//! watchdog (TWDT) and lets it reset the board into its power-on safe state.
//!
//! [`TickHealth`] holds the accounting and runs on every target; the TWDT
//! calls are cfg-gated.

use log::{error, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// TWDT period.  Also the longest a wedged loop can hold the outputs.
pub const WATCHDOG_TIMEOUT_MS: u32 = 2_000;

/// Consecutive lossy passes after which the loop is considered overrun.
pub const OVERRUN_PASSES: u32 = 200;

// ───────────────────────────────────────────────────────────────
// Dropped-tick accounting
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep feeding.
    Healthy,
    /// Ticks were lost this pass; still within tolerance.
    Lossy,
    /// Sustained loss: stop feeding.
    Overrun,
}

#[derive(Debug, Default)]
pub struct TickHealth {
    lossy_streak: u32,
    dropped_total: u64,
    overrun: bool,
}

impl TickHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one drain pass.  Once overrun, stays overrun.
    pub fn record(&mut self, dropped: u32) -> Verdict {
        if self.overrun {
            return Verdict::Overrun;
        }
        if dropped == 0 {
            self.lossy_streak = 0;
            return Verdict::Healthy;
        }

        self.dropped_total += u64::from(dropped);
        self.lossy_streak += 1;
        if self.lossy_streak >= OVERRUN_PASSES {
            self.overrun = true;
            return Verdict::Overrun;
        }
        Verdict::Lossy
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}

// ───────────────────────────────────────────────────────────────
// TWDT binding
// ───────────────────────────────────────────────────────────────

pub struct LoopWatchdog {
    health: TickHealth,
    overrun_reported: bool,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl LoopWatchdog {
    /// Subscribe the calling task (the main loop) to the TWDT.
    pub fn arm() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task; a null handle means
            // the current task.
            let subscribed = unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: WATCHDOG_TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK as i32 {
                    warn!("watchdog: reconfigure rc={}, boot settings kept", ret);
                }
                esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK as i32
            };
            if !subscribed {
                warn!("watchdog: main loop not subscribed, overruns will not reset");
            }
            Self {
                health: TickHealth::new(),
                overrun_reported: false,
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            Self {
                health: TickHealth::new(),
                overrun_reported: false,
            }
        }
    }

    /// One drain pass finished with `dropped` ticks lost since the last one.
    pub fn check_in(&mut self, dropped: u32) {
        match self.health.record(dropped) {
            Verdict::Healthy => self.feed(),
            Verdict::Lossy => {
                warn!(
                    "event loop: {} base ticks dropped ({} total)",
                    dropped,
                    self.health.dropped_total()
                );
                self.feed();
            }
            Verdict::Overrun => {
                if !self.overrun_reported {
                    self.overrun_reported = true;
                    error!(
                        "event loop: overrun for {} passes, letting the watchdog reset",
                        OVERRUN_PASSES
                    );
                }
            }
        }
    }

    fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the current task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
