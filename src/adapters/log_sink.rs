//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production), stamped with the uptime in
//! microseconds.  Optical samples arrive every 10 ms and go out at debug
//! level so they stay quiet unless asked for.

use core::fmt;

use log::{debug, info, warn};

use super::time::UptimeClock;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::control::motor_cue::CueCommand;
use crate::sensors::OpticalImage;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink {
    clock: UptimeClock,
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { clock: UptimeClock::new() }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let t = self.clock.uptime_us();
        match event {
            AppEvent::Started(bindings) => {
                info!("START | t={} | flow0={:?} flow1={:?}", t, bindings[0], bindings[1]);
            }
            AppEvent::OpticalSample { image, cue } => {
                debug!("{}", OpticLine { t, image, cue: *cue });
            }
            AppEvent::CameraStarted(cam) => info!("CAM   | t={} | {:?} started", t, cam),
            AppEvent::CameraStopPending(cam) => info!("CAM   | t={} | {:?} stop pending", t, cam),
            AppEvent::CameraStopped(cam) => info!("CAM   | t={} | {:?} stopped", t, cam),
            AppEvent::ValveClosed(valve) => info!("VALVE | t={} | {:?} closed", t, valve),
            AppEvent::WriteRejected { address, error } => {
                warn!("REG   | t={} | write to {} rejected: {}", t, address, error);
            }
            AppEvent::RegistersReset => info!("REG   | t={} | defaults restored", t),
            AppEvent::SafeState => warn!("SAFE  | t={} | outputs low, triggers stopped", t),
        }
    }
}

/// One `OPTIC` line.  Formatted lazily so a filtered-out debug level costs
/// nothing on the 10 ms path.
struct OpticLine<'a> {
    t: u64,
    image: &'a OpticalImage,
    cue: Option<CueCommand>,
}

impl fmt::Display for OpticLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields 2 and 5 are padding.
        let v = self.image.fields();
        write!(
            f,
            "OPTIC | t={} | x0={} y0={} x1={} y1={} | cue={:?}",
            self.t,
            v[0],
            v[1],
            v[3],
            v[4],
            self.cue.map(CueCommand::wire_byte),
        )
    }
}
