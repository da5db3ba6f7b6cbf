//! Application register table.
//!
//! The host addresses the device through a flat bank of typed registers.
//! Addresses below [`APP_START`] belong to the core runtime; this module
//! declares the application window and, for each address, its type,
//! element count, and [`Handler`].  The handler names both the behaviour
//! class and the field it acts on, so the service dispatches on it without
//! a second address lookup.  Structural checks
//! ([`check_read`], [`check_write`]) happen here, before any effect function runs, so a
//! rejected access never mutates device state.

pub mod value;

pub use value::{Payload, RegisterValue, MAX_PAYLOAD};

use crate::drivers::camera::CameraId;
use crate::drivers::valve::ValveId;
use crate::error::RegisterError;

/// First application register.
pub const APP_START: u8 = 32;
/// Last application register.
pub const APP_END: u8 = 51;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

pub mod address {
    pub const CAM0_TRIGGER_FREQUENCY: u8 = 32;
    pub const CAM0_TRIGGER_DURATION_US: u8 = 33;
    pub const CAM1_TRIGGER_FREQUENCY: u8 = 34;
    pub const CAM1_TRIGGER_DURATION_US: u8 = 35;
    pub const START_CAMERAS: u8 = 36;
    pub const STOP_CAMERAS: u8 = 37;
    pub const CAMERAS_STATE: u8 = 38;
    pub const IN_STATE: u8 = 39;
    pub const VALVE0_PULSE: u8 = 40;
    pub const VALVE1_PULSE: u8 = 41;
    pub const OUT_SET: u8 = 42;
    pub const OUT_CLEAR: u8 = 43;
    pub const OUT_TOGGLE: u8 = 44;
    pub const OUT_WRITE: u8 = 45;
    pub const OPTICAL_TRACKING_READ: u8 = 46;
    pub const MCA_SIGNAL_SELECT: u8 = 47;
    pub const MCA_SIGNAL_GAIN: u8 = 48;
    pub const MCA_ZERO_THRESHOLD: u8 = 49;
    pub const MCA_MIN_PULSE_INTERVAL: u8 = 50;
    pub const MCA_MAX_PULSE_INTERVAL: u8 = 51;
}

// ---------------------------------------------------------------------------
// Bit masks
// ---------------------------------------------------------------------------

/// Output register bits (OUT_SET / OUT_CLEAR / OUT_TOGGLE / OUT_WRITE).
pub mod out_bits {
    pub const VALVE0: u8 = 1 << 0;
    pub const VALVE1: u8 = 1 << 1;
    pub const OUT0: u8 = 1 << 2;
    pub const OUT1: u8 = 1 << 3;
    pub const VALVES: u8 = VALVE0 | VALVE1;
    pub const ALL: u8 = VALVE0 | VALVE1 | OUT0 | OUT1;
}

/// IN_STATE bits.
pub mod in_bits {
    pub const IN0: u8 = 1 << 0;
    pub const IN1: u8 = 1 << 1;
    pub const ALL: u8 = IN0 | IN1;
}

/// START_CAMERAS / STOP_CAMERAS / CAMERAS_STATE bits.
pub mod cam_bits {
    pub const CAM0: u8 = 1 << 0;
    pub const CAM1: u8 = 1 << 1;
    pub const ALL: u8 = CAM0 | CAM1;
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Register element type, encoded with the host protocol's type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegisterType {
    U8 = 1,
    S8 = 129,
    U16 = 2,
    S16 = 130,
    U32 = 4,
    S32 = 132,
    U64 = 8,
    S64 = 136,
    Float = 68,
}

impl RegisterType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::U8,
            129 => Self::S8,
            2 => Self::U16,
            130 => Self::S16,
            4 => Self::U32,
            132 => Self::S32,
            8 => Self::U64,
            136 => Self::S64,
            68 => Self::Float,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::Float => 4,
            Self::U64 | Self::S64 => 8,
        }
    }
}

/// Fields stored exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plain {
    MinPulseInterval,
    MaxPulseInterval,
}

/// Fields whose write effect may refuse the value.  Reads return the
/// stored setting, or the last written mask for command registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    TriggerFrequency(CameraId),
    TriggerDuration(CameraId),
    StartCameras,
    StopCameras,
    ValvePulse(ValveId),
    OutSet,
    OutClear,
    OutToggle,
    SignalSelect,
    SignalGain,
    ZeroThreshold,
}

/// Writable fields whose read recomputes from live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driven {
    /// OUT_WRITE: the full output mask, valve bits included.
    OutputMask,
}

/// Fields that only report live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Live {
    CamerasState,
    InState,
    OpticalTracking,
}

/// How an address's effects behave, and on which field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    PlainCopy(Plain),
    ValidatedWrite(Setting),
    ComputedRead(Driven),
    /// Writes are refused.
    ReadOnly(Live),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub address: u8,
    pub name: &'static str,
    pub ty: RegisterType,
    pub count: u8,
    pub handler: Handler,
}

const fn reg(address: u8, name: &'static str, ty: RegisterType, count: u8, handler: Handler) -> RegisterSpec {
    RegisterSpec {
        address,
        name,
        ty,
        count,
        handler,
    }
}

/// The application window, indexed by `address - APP_START`.
pub const TABLE: [RegisterSpec; (APP_END - APP_START + 1) as usize] = {
    use address::*;
    use CameraId::*;
    use Handler::*;
    use RegisterType::*;
    use ValveId::*;
    [
        reg(CAM0_TRIGGER_FREQUENCY, "CAM0_TRIGGER_FREQUENCY", U16, 1, ValidatedWrite(Setting::TriggerFrequency(Cam0))),
        reg(CAM0_TRIGGER_DURATION_US, "CAM0_TRIGGER_DURATION_US", U16, 1, ValidatedWrite(Setting::TriggerDuration(Cam0))),
        reg(CAM1_TRIGGER_FREQUENCY, "CAM1_TRIGGER_FREQUENCY", U16, 1, ValidatedWrite(Setting::TriggerFrequency(Cam1))),
        reg(CAM1_TRIGGER_DURATION_US, "CAM1_TRIGGER_DURATION_US", U16, 1, ValidatedWrite(Setting::TriggerDuration(Cam1))),
        reg(START_CAMERAS, "START_CAMERAS", U8, 1, ValidatedWrite(Setting::StartCameras)),
        reg(STOP_CAMERAS, "STOP_CAMERAS", U8, 1, ValidatedWrite(Setting::StopCameras)),
        reg(CAMERAS_STATE, "CAMERAS_STATE", U8, 1, ReadOnly(Live::CamerasState)),
        reg(IN_STATE, "IN_STATE", U8, 1, ReadOnly(Live::InState)),
        reg(VALVE0_PULSE, "VALVE0_PULSE", U16, 1, ValidatedWrite(Setting::ValvePulse(Valve0))),
        reg(VALVE1_PULSE, "VALVE1_PULSE", U16, 1, ValidatedWrite(Setting::ValvePulse(Valve1))),
        reg(OUT_SET, "OUT_SET", U8, 1, ValidatedWrite(Setting::OutSet)),
        reg(OUT_CLEAR, "OUT_CLEAR", U8, 1, ValidatedWrite(Setting::OutClear)),
        reg(OUT_TOGGLE, "OUT_TOGGLE", U8, 1, ValidatedWrite(Setting::OutToggle)),
        reg(OUT_WRITE, "OUT_WRITE", U8, 1, ComputedRead(Driven::OutputMask)),
        reg(OPTICAL_TRACKING_READ, "OPTICAL_TRACKING_READ", S16, 6, ReadOnly(Live::OpticalTracking)),
        reg(MCA_SIGNAL_SELECT, "MCA_SIGNAL_SELECT", U8, 1, ValidatedWrite(Setting::SignalSelect)),
        reg(MCA_SIGNAL_GAIN, "MCA_SIGNAL_GAIN", Float, 1, ValidatedWrite(Setting::SignalGain)),
        reg(MCA_ZERO_THRESHOLD, "MCA_ZERO_THRESHOLD", Float, 1, ValidatedWrite(Setting::ZeroThreshold)),
        reg(MCA_MIN_PULSE_INTERVAL, "MCA_MIN_PULSE_INTERVAL", S16, 1, PlainCopy(Plain::MinPulseInterval)),
        reg(MCA_MAX_PULSE_INTERVAL, "MCA_MAX_PULSE_INTERVAL", S16, 1, PlainCopy(Plain::MaxPulseInterval)),
    ]
};

/// Table entry for `address`.
pub fn spec_for(address: u8) -> Result<&'static RegisterSpec, RegisterError> {
    if !(APP_START..=APP_END).contains(&address) {
        return Err(RegisterError::OutOfRange);
    }
    Ok(&TABLE[usize::from(address - APP_START)])
}

/// Structural check for a read: range, then type.
pub fn check_read(address: u8, ty: RegisterType) -> Result<&'static RegisterSpec, RegisterError> {
    let spec = spec_for(address)?;
    if spec.ty != ty {
        return Err(RegisterError::TypeMismatch);
    }
    Ok(spec)
}

/// Structural check for a write of `bytes`: range, then type, then element
/// count.  A payload that is not a whole number of elements is an arity
/// error.
pub fn check_write(address: u8, ty: RegisterType, bytes: &[u8]) -> Result<&'static RegisterSpec, RegisterError> {
    let spec = check_read(address, ty)?;
    if bytes.len() % ty.size() != 0 || bytes.len() / ty.size() != usize::from(spec.count) {
        return Err(RegisterError::ArityMismatch);
    }
    Ok(spec)
}
