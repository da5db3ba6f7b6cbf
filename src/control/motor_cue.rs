//! Velocity → pulse-interval transform for the motorized cue.
//!
//! The selected optical axis is treated as a velocity.  Its magnitude,
//! scaled by `gain`, is a pulse frequency; the cue driver wants the
//! interval between pulses in microseconds, signed by direction.
//!
//! Gating is exactly `signal < zero_threshold`; a negative threshold lets
//! a zero signal reach the division, which then saturates to the clamp
//! bounds through an infinite quotient instead of panicking.

use serde::{Deserialize, Serialize};

use crate::sensors::OpticalImage;

/// Which optical axis drives the cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalSelect {
    Off = 0,
    Flow0X = 1,
    Flow0Y = 2,
    Flow1X = 3,
    Flow1Y = 4,
}

impl SignalSelect {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Flow0X),
            2 => Some(Self::Flow0Y),
            3 => Some(Self::Flow1X),
            4 => Some(Self::Flow1Y),
            _ => None,
        }
    }

    /// Image field this selector reads, or `None` when the loop is off.
    pub fn image_index(self) -> Option<usize> {
        match self {
            Self::Off => None,
            Self::Flow0X => Some(0),
            Self::Flow0Y => Some(1),
            Self::Flow1X => Some(3),
            Self::Flow1Y => Some(4),
        }
    }
}

/// Host-writable motor-cue parameters, read every optical cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCueConfig {
    pub signal_select: SignalSelect,
    pub gain: f32,
    pub zero_threshold: f32,
    /// Lower clamp bound (µs).  `min <= max` is assumed, not enforced.
    pub min_pulse_interval: i16,
    /// Upper clamp bound (µs).
    pub max_pulse_interval: i16,
}

impl From<crate::config::MotorCueDefaults> for MotorCueConfig {
    fn from(d: crate::config::MotorCueDefaults) -> Self {
        Self {
            signal_select: d.signal_select,
            gain: d.gain,
            zero_threshold: d.zero_threshold,
            min_pulse_interval: d.min_pulse_interval,
            max_pulse_interval: d.max_pulse_interval,
        }
    }
}

/// One computed cue command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueCommand {
    /// Signed pulse interval (µs); 0 inside the deadband.
    pub pulse_interval: i16,
}

impl CueCommand {
    /// The byte actually shifted out on the cue UART.
    pub fn wire_byte(self) -> u8 {
        (self.pulse_interval & 0x00FF) as u8
    }
}

/// Compute the cue for this cycle, or `None` when the loop is off.
pub fn compute(image: &OpticalImage, cfg: &MotorCueConfig) -> Option<CueCommand> {
    let index = cfg.signal_select.image_index()?;
    Some(pulse_interval(image.fields()[index], cfg))
}

/// The transform itself, on one raw axis value.
pub fn pulse_interval(input: i16, cfg: &MotorCueConfig) -> CueCommand {
    let positive = input >= 0;
    // f32 keeps |i16::MIN| representable.
    let signal = f32::from(input).abs() * cfg.gain;

    if signal < cfg.zero_threshold {
        return CueCommand { pulse_interval: 0 };
    }

    // Clamp after the division: the quotient may be far outside i16.
    let mut interval = (1_000_000.0_f32 / signal).round();
    if interval > f32::from(cfg.max_pulse_interval) {
        interval = f32::from(cfg.max_pulse_interval);
    }
    if interval < f32::from(cfg.min_pulse_interval) {
        interval = f32::from(cfg.min_pulse_interval);
    }
    let magnitude = interval as i16;

    CueCommand {
        pulse_interval: if positive {
            magnitude
        } else {
            magnitude.saturating_neg()
        },
    }
}
