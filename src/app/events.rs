//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The host-core adapter turns
//! [`AppEvent::OpticalSample`] into a timestamped register event; every
//! adapter may log the rest.

use crate::control::motor_cue::CueCommand;
use crate::drivers::camera::CameraId;
use crate::drivers::valve::ValveId;
use crate::error::RegisterError;
use crate::sensors::{OpticalImage, SensorBinding};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started with these sensor bindings.
    Started([SensorBinding; 2]),

    /// The optical image was refreshed.  Raised once per sampling cycle,
    /// after the image is written; `cue` is the byte sent on the cue line,
    /// if the loop is enabled.
    OpticalSample {
        image: OpticalImage,
        cue: Option<CueCommand>,
    },

    /// Trigger PWM programmed at a 1 s boundary.
    CameraStarted(CameraId),

    /// Stop observed; the PWM runs until the next 1 s boundary.
    CameraStopPending(CameraId),

    /// Trigger PWM disabled, channel back to idle.
    CameraStopped(CameraId),

    /// A valve pulse ran out.
    ValveClosed(ValveId),

    /// A host write was refused.
    WriteRejected { address: u8, error: RegisterError },

    /// Registers restored to their defaults.
    RegistersReset,

    /// The device was driven to its safe state.
    SafeState,
}
