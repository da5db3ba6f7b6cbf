//! Optical sensor port on the shared SPI2 bus.
//!
//! The two sensor families want different clock modes (PAA5100JE mode 0,
//! PMW3360 mode 3) and ESP-IDF fixes the mode when a device is added to the
//! bus.  Each port therefore registers one CS-less device per mode and
//! drives its own chip select around whichever device is active.

use embedded_hal::spi::{ErrorKind, ErrorType, Mode, Operation, SpiDevice, MODE_0};
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::spi::{SpiConfig, SpiDeviceDriver, SpiDriver};
use esp_idf_hal::sys::EspError;
use esp_idf_hal::units::Hertz;
use log::debug;

use crate::pins;
use crate::sensors::SpiModeSelect;

type Device<'d> = SpiDeviceDriver<'d, &'d SpiDriver<'d>>;

pub struct FlowPort<'d> {
    mode0: Device<'d>,
    mode3: Device<'d>,
    cs: PinDriver<'d, AnyOutputPin, Output>,
    mode: Mode,
}

impl<'d> FlowPort<'d> {
    /// Register both mode devices for the port selected by `cs`.  The port
    /// starts in mode 0, the first probe pass.
    pub fn new(bus: &'d SpiDriver<'d>, cs: AnyOutputPin) -> Result<Self, EspError> {
        let config = |mode: Mode| SpiConfig::new().baudrate(Hertz(pins::SPI_BAUD_HZ)).data_mode(mode);
        let mode0 = SpiDeviceDriver::new(bus, Option::<AnyOutputPin>::None, &config(MODE_0))?;
        let mode3 = SpiDeviceDriver::new(bus, Option::<AnyOutputPin>::None, &config(embedded_hal::spi::MODE_3))?;
        let mut cs = PinDriver::output(cs)?;
        cs.set_high()?;
        Ok(Self {
            mode0,
            mode3,
            cs,
            mode: MODE_0,
        })
    }
}

impl SpiModeSelect for FlowPort<'_> {
    fn select_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}

impl ErrorType for FlowPort<'_> {
    type Error = ErrorKind;
}

impl SpiDevice for FlowPort<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        self.cs.set_low().map_err(|_| ErrorKind::ChipSelectFault)?;
        let result = if self.mode == MODE_0 {
            self.mode0.transaction(operations)
        } else {
            self.mode3.transaction(operations)
        };
        self.cs.set_high().map_err(|_| ErrorKind::ChipSelectFault)?;
        result.map_err(|e| {
            debug!("flow port: SPI transaction failed ({:?})", e);
            ErrorKind::Other
        })
    }
}
