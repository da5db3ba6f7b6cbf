//! The device's owned state aggregate.
//!
//! `DeviceState` is the single struct every tick handler and register
//! effect reads from and writes to: camera channels, valve countdowns,
//! motor-cue configuration, the optical image, and latched output bits.
//! The service holds it exclusively; there is no other copy.

use crate::config::DeviceConfig;
use crate::control::motor_cue::MotorCueConfig;
use crate::control::optical::OpticalCadence;
use crate::drivers::camera::{CameraChannel, CameraId};
use crate::drivers::valve::ValveBank;
use crate::error::{Error, Result};
use crate::registers::out_bits;
use crate::sensors::{OpticalImage, SensorBinding};

// ---------------------------------------------------------------------------
// Command latch (write-only registers read back their last value)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandLatch {
    pub start_cameras: u8,
    pub stop_cameras: u8,
    pub out_set: u8,
    pub out_clear: u8,
    pub out_toggle: u8,
}

// ---------------------------------------------------------------------------
// DeviceState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub cameras: [CameraChannel; 2],
    pub valves: ValveBank,
    /// Pulse length applied on the next valve trigger (ms).
    pub valve_pulse_ms: [u16; 2],
    pub motor_cue: MotorCueConfig,
    pub optical: OpticalCadence,
    /// Last published optical image.
    pub image: OpticalImage,
    /// Latched general-purpose output bits.  Valve bits are derived from
    /// the valve countdowns and never stored here.
    pub outputs: u8,
    /// Last snapshot of the digital inputs.
    pub in_state: u8,
    pub latch: CommandLatch,
    /// Decided at boot, untouched by a register reset.
    pub bindings: [SensorBinding; 2],
}

impl DeviceState {
    /// Build the power-on state.  Fails when a camera default is not a
    /// programmable waveform.
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let cam = |id: CameraId| {
            CameraChannel::new(config.cameras[id as usize])
                .ok_or(Error::Init("camera trigger defaults not programmable"))
        };
        Ok(Self {
            cameras: [cam(CameraId::Cam0)?, cam(CameraId::Cam1)?],
            valves: ValveBank::new(),
            valve_pulse_ms: config.valve_pulse_ms,
            motor_cue: config.motor_cue.into(),
            optical: OpticalCadence::new(config.optical_divider),
            image: OpticalImage::default(),
            outputs: 0,
            in_state: 0,
            latch: CommandLatch::default(),
            bindings: [SensorBinding::None; 2],
        })
    }

    /// Restore register defaults in place.  Bindings are kept.  The caller
    /// re-applies hardware effects.
    pub fn restore_defaults(&mut self, config: &DeviceConfig) {
        for id in CameraId::ALL {
            let cam = &mut self.cameras[id as usize];
            cam.reset();
            let d = config.cameras[id as usize];
            // Validated when the service was built.
            cam.configure(d.frequency_hz, d.duration_us);
        }
        self.valves.close_all();
        self.valve_pulse_ms = config.valve_pulse_ms;
        self.motor_cue = config.motor_cue.into();
        self.optical.set_divider(config.optical_divider);
        self.image = OpticalImage::default();
        self.outputs = 0;
        self.latch = CommandLatch::default();
    }

    /// Full output mask: latched bits plus open valves.
    pub fn output_mask(&self) -> u8 {
        (self.outputs & !out_bits::VALVES) | self.valves.asserted_mask()
    }

    /// CAMERAS_STATE: bit set while a camera's trigger runs.
    pub fn cameras_state(&self) -> u8 {
        CameraId::ALL
            .iter()
            .filter(|id| self.cameras[**id as usize].is_triggering())
            .fold(0, |m, id| m | id.mask())
    }
}
