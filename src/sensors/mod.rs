//! Optical flow sensing: slot bindings, motion samples, and the register
//! image published to the host.
//!
//! Two physical ports (flow0, flow1) each carry either a PAA5100JE (type A),
//! a PMW3360 (type B), or nothing.  The binding is decided once at boot by
//! [`probe_and_bind`] and never revisited.

pub mod paa5100je;
pub mod pmw3360;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Mode, SpiDevice, MODE_0, MODE_3};
use log::{debug, info, warn};

use crate::app::ports::OpticalPort;

/// Physical optical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSlot {
    Flow0 = 0,
    Flow1 = 1,
}

impl FlowSlot {
    pub const ALL: [FlowSlot; 2] = [FlowSlot::Flow0, FlowSlot::Flow1];
}

/// Sensor chip families the firmware can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Type A, probed first.
    Paa5100je,
    /// Type B, probed only where type A was absent.
    Pmw3360,
}

/// What was found on a slot at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorBinding {
    #[default]
    None,
    Paa5100je,
    Pmw3360,
}

impl SensorKind {
    /// SPI clock mode the chip family expects.
    pub fn spi_mode(self) -> Mode {
        match self {
            Self::Paa5100je => MODE_0,
            Self::Pmw3360 => MODE_3,
        }
    }
}

impl SensorBinding {
    pub fn kind(self) -> Option<SensorKind> {
        match self {
            Self::None => None,
            Self::Paa5100je => Some(SensorKind::Paa5100je),
            Self::Pmw3360 => Some(SensorKind::Pmw3360),
        }
    }
}

impl From<SensorKind> for SensorBinding {
    fn from(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Paa5100je => Self::Paa5100je,
            SensorKind::Pmw3360 => Self::Pmw3360,
        }
    }
}

/// Signed displacement since the previous read.  Overwritten every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSample {
    pub dx: i16,
    pub dy: i16,
}

/// Published optical register contents:
/// `[flow0.x, flow0.y, 0, flow1.x, flow1.y, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpticalImage([i16; 6]);

impl OpticalImage {
    pub const LEN: usize = 6;

    /// Build the image from one sample per slot.  The padding fields at 2
    /// and 5 are always zero.
    pub fn assemble(flow0: MotionSample, flow1: MotionSample) -> Self {
        Self([flow0.dx, flow0.dy, 0, flow1.dx, flow1.dy, 0])
    }

    pub fn fields(&self) -> &[i16; 6] {
        &self.0
    }
}

/// Probe both slots: type A everywhere first, then type B on whatever is
/// still unbound.  A successful A probe disqualifies B for that slot.
pub fn probe_and_bind(port: &mut impl OpticalPort) -> [SensorBinding; 2] {
    let mut bindings = [SensorBinding::None; 2];

    for kind in [SensorKind::Paa5100je, SensorKind::Pmw3360] {
        for slot in FlowSlot::ALL {
            if bindings[slot as usize] == SensorBinding::None && port.probe(slot, kind) {
                bindings[slot as usize] = kind.into();
            }
        }
    }

    for slot in FlowSlot::ALL {
        match bindings[slot as usize] {
            SensorBinding::None => warn!("{:?}: no optical sensor found", slot),
            b => info!("{:?}: bound to {:?}", slot, b),
        }
    }
    if bindings[0] != SensorBinding::None
        && bindings[1] != SensorBinding::None
        && bindings[0] != bindings[1]
    {
        warn!(
            "optical slots carry different sensors ({:?}/{:?}); both are read with the flow0 driver",
            bindings[0], bindings[1]
        );
    }
    bindings
}

// ---------------------------------------------------------------------------
// Bus-backed port
// ---------------------------------------------------------------------------

/// An SPI device whose clock mode can change between transactions.
///
/// Each port is probed in mode 0 for type A and, if still unbound, in mode
/// 3 for type B, so the port driver must be able to switch.
pub trait SpiModeSelect {
    fn select_mode(&mut self, mode: Mode);
}

/// Both optical ports behind one [`OpticalPort`].
///
/// A failed read on either device yields a zero sample for that slot; the
/// loop never stalls on a sensor.
pub struct FlowSensors<S0, S1, D> {
    flow0: S0,
    flow1: S1,
    delay: D,
}

impl<S0, S1, D> FlowSensors<S0, S1, D>
where
    S0: SpiDevice + SpiModeSelect,
    S1: SpiDevice + SpiModeSelect,
    D: DelayNs,
{
    pub fn new(flow0: S0, flow1: S1, delay: D) -> Self {
        Self {
            flow0,
            flow1,
            delay,
        }
    }

    fn read_one<SPI: SpiDevice + SpiModeSelect>(spi: &mut SPI, kind: SensorKind, slot: FlowSlot) -> MotionSample {
        spi.select_mode(kind.spi_mode());
        let result = match kind {
            SensorKind::Paa5100je => paa5100je::read_motion(spi),
            SensorKind::Pmw3360 => pmw3360::read_motion(spi),
        };
        result.unwrap_or_else(|e| {
            debug!("{:?}: motion read failed ({})", slot, e);
            MotionSample::default()
        })
    }
}

impl<S0, S1, D> OpticalPort for FlowSensors<S0, S1, D>
where
    S0: SpiDevice + SpiModeSelect,
    S1: SpiDevice + SpiModeSelect,
    D: DelayNs,
{
    fn probe(&mut self, slot: FlowSlot, kind: SensorKind) -> bool {
        match slot {
            FlowSlot::Flow0 => self.flow0.select_mode(kind.spi_mode()),
            FlowSlot::Flow1 => self.flow1.select_mode(kind.spi_mode()),
        }
        let result = match (slot, kind) {
            (FlowSlot::Flow0, SensorKind::Paa5100je) => paa5100je::probe(&mut self.flow0, &mut self.delay),
            (FlowSlot::Flow1, SensorKind::Paa5100je) => paa5100je::probe(&mut self.flow1, &mut self.delay),
            (FlowSlot::Flow0, SensorKind::Pmw3360) => pmw3360::probe(&mut self.flow0, &mut self.delay),
            (FlowSlot::Flow1, SensorKind::Pmw3360) => pmw3360::probe(&mut self.flow1, &mut self.delay),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("{:?}: {:?} probe failed ({})", slot, kind, e);
                false
            }
        }
    }

    fn read_motion(&mut self, kind: SensorKind) -> [MotionSample; 2] {
        [
            Self::read_one(&mut self.flow0, kind, FlowSlot::Flow0),
            Self::read_one(&mut self.flow1, kind, FlowSlot::Flow1),
        ]
    }
}
