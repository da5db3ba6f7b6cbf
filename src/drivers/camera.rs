//! Camera trigger sequencer.
//!
//! Per camera: `Idle → Acquiring → StopPending → Idle`.
//!
//! - Starts are latched by the host and armed on the next 1 s boundary so
//!   the trigger phase is locked to the shared clock.
//! - Stops are observed on the next 1 ms tick, which latches
//!   `stop_when_possible`.  The PWM is disabled, and the channel returns to
//!   Idle, on the following 1 s boundary in a single step.
//!
//! The channel never touches the PWM peripheral itself; the service turns
//! the values returned here into [`ActuatorPort`](crate::app::ports::ActuatorPort)
//! calls.

use crate::config::{CameraDefaults, PWM_TIMER_CLOCK_HZ};
use crate::pins::CAM_PWM_RESOLUTION_BITS;

pub const CAMERA_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraId {
    Cam0 = 0,
    Cam1 = 1,
}

impl CameraId {
    pub const ALL: [CameraId; CAMERA_COUNT] = [CameraId::Cam0, CameraId::Cam1];

    pub fn mask(self) -> u8 {
        1 << self as u8
    }
}

// ───────────────────────────────────────────────────────────────
// PWM parameters
// ───────────────────────────────────────────────────────────────

/// Largest integer divider the LEDC timer accepts in front of its counter.
const LEDC_MAX_DIVIDER: u32 = 1_024;

/// Fastest trigger the LEDC timer can run at the camera duty resolution.
pub const MAX_TRIGGER_HZ: u16 = (PWM_TIMER_CLOCK_HZ >> CAM_PWM_RESOLUTION_BITS) as u16;

/// Slowest trigger the LEDC timer can run before its divider overflows.
pub const MIN_TRIGGER_HZ: u16 =
    (PWM_TIMER_CLOCK_HZ >> CAM_PWM_RESOLUTION_BITS).div_ceil(LEDC_MAX_DIVIDER) as u16;

/// Hardware counter settings for one trigger waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmParams {
    /// Counter clock divider (power of two, 1..=1024).
    pub prescaler: u16,
    /// Counter top; the period is `target_count + 1` counts.
    pub target_count: u16,
    /// Counts the trigger line stays high.
    pub duty_count: u16,
}

impl PwmParams {
    const PRESCALERS: [u16; 11] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

    /// Derive counter settings from a frequency and pulse width.
    ///
    /// Picks the finest prescaler whose period fits the 16-bit counter.
    /// Returns `None` when the frequency is outside
    /// [`MIN_TRIGGER_HZ`]..=[`MAX_TRIGGER_HZ`], or the pulse would be empty
    /// or at least as long as the period once mapped onto the LEDC duty.
    pub fn compute(frequency_hz: u16, duration_us: u16) -> Option<Self> {
        if !(MIN_TRIGGER_HZ..=MAX_TRIGGER_HZ).contains(&frequency_hz) || duration_us == 0 {
            return None;
        }
        let clock = u64::from(PWM_TIMER_CLOCK_HZ);

        for prescaler in Self::PRESCALERS {
            let counts = clock / (u64::from(prescaler) * u64::from(frequency_hz));
            if counts == 0 || counts - 1 > u64::from(u16::MAX) {
                continue;
            }
            let target = counts - 1;
            let duty = u64::from(duration_us) * (clock / u64::from(prescaler)) / 1_000_000;
            if duty == 0 || duty >= target {
                return None;
            }
            let params = Self {
                prescaler,
                target_count: target as u16,
                duty_count: duty as u16,
            };
            let (_, ledc_duty) = params.ledc_settings();
            if ledc_duty == 0 || ledc_duty >= 1 << CAM_PWM_RESOLUTION_BITS {
                return None;
            }
            return Some(params);
        }
        None
    }

    /// LEDC frequency and duty equivalent to this counter waveform.
    ///
    /// The counter runs at `PWM_TIMER_CLOCK_HZ / prescaler` with a period of
    /// `target_count + 1` counts; LEDC wants a frequency and a duty in units
    /// of `2^CAM_PWM_RESOLUTION_BITS`.
    pub fn ledc_settings(&self) -> (u32, u32) {
        let period = u64::from(self.target_count) + 1;
        let freq_hz = u64::from(PWM_TIMER_CLOCK_HZ) / (u64::from(self.prescaler) * period);
        let full_scale = 1u64 << CAM_PWM_RESOLUTION_BITS;
        let duty = u64::from(self.duty_count) * full_scale / period;
        (freq_hz as u32, duty as u32)
    }
}

// ───────────────────────────────────────────────────────────────
// Channel state machine
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Acquiring,
    /// Stop observed; PWM still running until the next 1 s boundary.
    StopPending,
}

#[derive(Debug, Clone)]
pub struct CameraChannel {
    state: CameraState,
    frequency_hz: u16,
    duration_us: u16,
    params: PwmParams,
    start_requested: bool,
    stop_requested: bool,
    stop_when_possible: bool,
}

impl CameraChannel {
    /// Build a channel from defaults.  Invalid defaults are a build-time
    /// mistake, so the caller gets `None` rather than a silent fallback.
    pub fn new(defaults: CameraDefaults) -> Option<Self> {
        let params = PwmParams::compute(defaults.frequency_hz, defaults.duration_us)?;
        Some(Self {
            state: CameraState::Idle,
            frequency_hz: defaults.frequency_hz,
            duration_us: defaults.duration_us,
            params,
            start_requested: false,
            stop_requested: false,
            stop_when_possible: false,
        })
    }

    // ── Configuration ─────────────────────────────────────────

    /// Set the trigger frequency.  Rejected (and nothing changes) when the
    /// resulting waveform is not programmable.
    pub fn set_frequency(&mut self, frequency_hz: u16) -> bool {
        self.configure(frequency_hz, self.duration_us)
    }

    /// Set the trigger pulse width, same rules as [`set_frequency`](Self::set_frequency).
    pub fn set_duration(&mut self, duration_us: u16) -> bool {
        self.configure(self.frequency_hz, duration_us)
    }

    /// Set both waveform values at once and recompute the PWM parameters.
    pub fn configure(&mut self, frequency_hz: u16, duration_us: u16) -> bool {
        match PwmParams::compute(frequency_hz, duration_us) {
            Some(params) => {
                self.frequency_hz = frequency_hz;
                self.duration_us = duration_us;
                self.params = params;
                true
            }
            None => false,
        }
    }

    pub fn frequency_hz(&self) -> u16 {
        self.frequency_hz
    }

    pub fn duration_us(&self) -> u16 {
        self.duration_us
    }

    pub fn params(&self) -> PwmParams {
        self.params
    }

    // ── Requests (host context) ───────────────────────────────

    /// Latch a start for the next 1 s boundary.  No-op while acquiring.
    pub fn request_start(&mut self) {
        if self.state != CameraState::Acquiring {
            self.start_requested = true;
        }
    }

    /// Latch a stop.  A start that has not been armed yet is dropped.
    pub fn request_stop(&mut self) {
        self.start_requested = false;
        if self.state == CameraState::Acquiring {
            self.stop_requested = true;
        }
    }

    // ── Tick handlers ─────────────────────────────────────────

    /// 1 ms tick.  Returns `true` when a pending stop was observed.
    pub fn observe_stop(&mut self) -> bool {
        if !self.stop_requested {
            return false;
        }
        self.stop_requested = false;
        self.stop_when_possible = true;
        self.state = CameraState::StopPending;
        true
    }

    /// 1 s boundary, first half: returns `true` if the PWM must be disabled
    /// now.  The channel is Idle on return in that case.
    pub fn finalize_stop(&mut self) -> bool {
        if !self.stop_when_possible {
            return false;
        }
        self.stop_when_possible = false;
        self.state = CameraState::Idle;
        true
    }

    /// 1 s boundary, second half: returns the waveform to program when a
    /// start was pending.
    pub fn arm_start(&mut self) -> Option<PwmParams> {
        if !self.start_requested {
            return None;
        }
        self.start_requested = false;
        self.state = CameraState::Acquiring;
        Some(self.params)
    }

    /// Drop every request and return to Idle.  The caller disables the PWM.
    pub fn reset(&mut self) {
        self.state = CameraState::Idle;
        self.start_requested = false;
        self.stop_requested = false;
        self.stop_when_possible = false;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// The trigger waveform is running (acquiring or waiting to stop).
    pub fn is_triggering(&self) -> bool {
        self.state != CameraState::Idle
    }

    pub fn start_pending(&self) -> bool {
        self.start_requested
    }

    pub fn stop_when_possible(&self) -> bool {
        self.stop_when_possible
    }
}
