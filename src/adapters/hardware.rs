//! Hardware adapter that bridges real peripherals to the port traits.
//!
//! Owns the optical sensor port and drives GPIO, LEDC and the cue UART
//! through the `hw_init` helpers, exposing them as [`OpticalPort`],
//! [`ActuatorPort`] and [`InputPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets the helpers
//! are cfg-gated no-ops, so the adapter still tracks its own state.

use crate::app::ports::{ActuatorPort, InputPort, OpticalPort};
use crate::drivers::camera::{CameraId, PwmParams};
use crate::drivers::{hw_init, hw_timer};
use crate::pins;
use crate::sensors::{FlowSlot, MotionSample, SensorKind};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<O> {
    optical: O,
    /// Last mask written to the output pins.
    outputs: u8,
    strobe_high: bool,
}

impl<O: OpticalPort> HardwareAdapter<O> {
    pub fn new(optical: O) -> Self {
        Self {
            optical,
            outputs: 0,
            strobe_high: false,
        }
    }

    /// Drop the cue strobe line.  Called when the one-shot expires.
    pub fn end_cue_strobe(&mut self) {
        if self.strobe_high {
            hw_init::gpio_write(pins::CUE_STROBE_GPIO, false);
            self.strobe_high = false;
        }
    }

    pub fn outputs(&self) -> u8 {
        self.outputs
    }
}

fn ledc_channel(camera: CameraId) -> u32 {
    match camera {
        CameraId::Cam0 => hw_init::LEDC_CH_CAM0,
        CameraId::Cam1 => hw_init::LEDC_CH_CAM1,
    }
}

// ── OpticalPort implementation ────────────────────────────────

impl<O: OpticalPort> OpticalPort for HardwareAdapter<O> {
    fn probe(&mut self, slot: FlowSlot, kind: SensorKind) -> bool {
        self.optical.probe(slot, kind)
    }

    fn read_motion(&mut self, kind: SensorKind) -> [MotionSample; 2] {
        self.optical.read_motion(kind)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<O: OpticalPort> ActuatorPort for HardwareAdapter<O> {
    fn write_outputs(&mut self, mask: u8) {
        let changed = self.outputs ^ mask;
        for (bit, &pin) in pins::OUTPUT_GPIOS.iter().enumerate() {
            if changed & (1 << bit) != 0 {
                hw_init::gpio_write(pin, mask & (1 << bit) != 0);
            }
        }
        self.outputs = mask;
    }

    fn start_camera_pwm(&mut self, camera: CameraId, params: PwmParams) {
        hw_init::camera_pwm_start(ledc_channel(camera), params);
    }

    fn stop_camera_pwm(&mut self, camera: CameraId) {
        hw_init::camera_pwm_stop(ledc_channel(camera));
    }

    fn write_cue_byte(&mut self, byte: u8) {
        hw_init::cue_uart_write(byte);
    }

    fn arm_cue_strobe(&mut self) {
        hw_init::gpio_write(pins::CUE_STROBE_GPIO, true);
        self.strobe_high = true;
        hw_timer::arm_cue_oneshot();
    }
}

// ── InputPort implementation ──────────────────────────────────

impl<O: OpticalPort> InputPort for HardwareAdapter<O> {
    fn read_inputs(&mut self) -> u8 {
        pins::INPUT_GPIOS
            .iter()
            .enumerate()
            .filter(|(_, pin)| hw_init::gpio_read(**pin))
            .fold(0, |m, (bit, _)| m | (1 << bit))
    }
}
