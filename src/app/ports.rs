//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (optical sensors, outputs, PWM, cue UART, host core)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  Every method is synchronous and bounded-time: they are called
//! from tick context and must never block.

use super::commands::{HostReply, HostRequest};
use crate::drivers::camera::{CameraId, PwmParams};
use crate::sensors::{FlowSlot, MotionSample, SensorKind};

// ───────────────────────────────────────────────────────────────
// Optical port (driven adapter: sensors → domain)
// ───────────────────────────────────────────────────────────────

/// Abstract "read motion sample" capability for the two optical slots.
pub trait OpticalPort {
    /// Bus handshake for `kind` on `slot`.  Called only during bring-up.
    fn probe(&mut self, slot: FlowSlot, kind: SensorKind) -> bool;

    /// Read both slots with the driver for `kind`.  A slot that fails to
    /// answer reads as zero motion.
    fn read_motion(&mut self, kind: SensorKind) -> [MotionSample; 2];
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: digital outputs, camera PWM, motor-cue line.
pub trait ActuatorPort {
    /// Drive every output bit to the given mask (bit set = asserted).
    fn write_outputs(&mut self, mask: u8);

    /// Program and start the trigger PWM for one camera.
    fn start_camera_pwm(&mut self, camera: CameraId, params: PwmParams);

    /// Stop the trigger PWM for one camera, leaving the line low.
    fn stop_camera_pwm(&mut self, camera: CameraId);

    /// Shift one byte out on the motor-cue UART.
    fn write_cue_byte(&mut self, byte: u8);

    /// Arm the 100 µs one-shot that strobes the cue byte.
    fn arm_cue_strobe(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait InputPort {
    /// Snapshot of the digital inputs (bit set = high).
    fn read_inputs(&mut self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Host port (driving adapter: host core → domain)
// ───────────────────────────────────────────────────────────────

/// Register traffic decoded by the host-core adapter.
///
/// Polled from the main loop between tick batches.  Replies are returned
/// in request order.
pub trait HostPort {
    /// Next pending request, if any.  Never blocks.
    fn poll_request(&mut self) -> Option<HostRequest>;

    /// Answer the request most recently returned by `poll_request`.
    fn reply(&mut self, reply: HostReply);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → host core / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  The host-core adapter timestamps register events
/// and queues them for the host; the log adapter prints them.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Tick delegate (decouples the scheduler from the service)
// ───────────────────────────────────────────────────────────────

/// Callback trait the [`TickScheduler`](crate::scheduler::TickScheduler)
/// invokes for each named cadence.  Within one base tick the order is
/// always `new_second`, `tick_500us`, `tick_1ms`.
pub trait TickDelegate {
    fn new_second(&mut self);
    fn tick_500us(&mut self);
    fn tick_1ms(&mut self);
}

/// Everything the service drives, in one bound.  Blanket-implemented.
pub trait DevicePort: OpticalPort + ActuatorPort + InputPort {}

impl<T: OpticalPort + ActuatorPort + InputPort> DevicePort for T {}
