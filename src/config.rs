//! Device configuration and fixed timing parameters.
//!
//! [`DeviceConfig`] holds the register defaults applied at boot and on every
//! host "reset registers" request.  Timing constants describe the tick
//! cadences the scheduler derives from the 500 µs hardware timer.

use serde::{Deserialize, Serialize};

use crate::control::motor_cue::SignalSelect;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Base hardware tick period.
pub const BASE_TICK_US: u32 = 500;
/// Base ticks per 1 ms tick.
pub const BASE_TICKS_PER_MS: u32 = 1_000 / BASE_TICK_US;
/// Base ticks per 1 s boundary.
pub const BASE_TICKS_PER_SECOND: u32 = 1_000_000 / BASE_TICK_US;

/// Valve countdown ticks per millisecond of pulse duration.
pub const VALVE_TICKS_PER_MS: u32 = BASE_TICKS_PER_MS;

/// Delay of the one-shot that paces each motor-cue byte.
pub const CUE_STROBE_US: u64 = 100;
/// Motor-cue side-channel UART baud rate (8N1, TX only).
pub const CUE_UART_BAUD: u32 = 100_000;

/// Clock feeding the camera trigger PWM counters.
pub const PWM_TIMER_CLOCK_HZ: u32 = 80_000_000;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity reported to the host runtime when the core starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub who_am_i: u16,
    pub hw_version: (u8, u8),
    pub fw_version: (u8, u8),
    pub assembly: u8,
    pub name: &'static str,
    pub clock_repeater_capable: bool,
    pub clock_generator_capable: bool,
}

pub const IDENTITY: DeviceIdentity = DeviceIdentity {
    who_am_i: 1224,
    hw_version: (1, 0),
    fw_version: (1, 1),
    assembly: 0,
    name: "VestibularH1",
    clock_repeater_capable: true,
    clock_generator_capable: false,
};

// ---------------------------------------------------------------------------
// Register defaults
// ---------------------------------------------------------------------------

/// Camera trigger defaults for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDefaults {
    /// Trigger frequency (Hz).
    pub frequency_hz: u16,
    /// Trigger pulse width (µs).
    pub duration_us: u16,
}

/// Motor-cue loop defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorCueDefaults {
    pub signal_select: SignalSelect,
    pub gain: f32,
    pub zero_threshold: f32,
    pub min_pulse_interval: i16,
    pub max_pulse_interval: i16,
}

/// Everything the host can reset back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub cameras: [CameraDefaults; 2],
    /// Valve pulse durations (ms).
    pub valve_pulse_ms: [u16; 2],
    pub motor_cue: MotorCueDefaults,
    /// Optical sampling runs once every `optical_divider` 1 ms ticks.
    pub optical_divider: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let camera = CameraDefaults {
            frequency_hz: 120,
            duration_us: 1_000,
        };
        Self {
            cameras: [camera, camera],
            valve_pulse_ms: [10, 10],
            motor_cue: MotorCueDefaults {
                signal_select: SignalSelect::Off,
                gain: 1.0,
                zero_threshold: 1.0,
                min_pulse_interval: 100,
                max_pulse_interval: i16::MAX,
            },
            optical_divider: 10, // 100 Hz
        }
    }
}
