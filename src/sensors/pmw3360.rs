//! PMW3360 optical tracking sensor (sensor type B).
//!
//! Identity probe and motion burst only.  SROM upload and CPI setup are the
//! integrator's concern; the chip reports motion at its power-on CPI
//! without them.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use super::MotionSample;
use crate::error::SensorError;

mod register {
    pub const PRODUCT_ID: u8 = 0x00;
    pub const POWER_UP_RESET: u8 = 0x3A;
    pub const INVERSE_PRODUCT_ID: u8 = 0x3F;
    pub const MOTION_BURST: u8 = 0x50;
}

const PRODUCT_ID: u8 = 0x42;
const INVERSE_PRODUCT_ID: u8 = 0xBD;

const WRITE_BIT: u8 = 0x80;

/// tSRAD: address-to-data delay for register reads.
const T_SRAD_NS: u32 = 160_000;
/// tSRAD_MOTBR: address-to-data delay for the motion burst.
const T_SRAD_MOTBR_NS: u32 = 35_000;

pub fn probe<SPI: SpiDevice>(spi: &mut SPI, delay: &mut impl DelayNs) -> Result<(), SensorError> {
    spi.write(&[register::POWER_UP_RESET | WRITE_BIT, 0x5A])
        .map_err(|_| SensorError::Bus)?;
    delay.delay_ms(50);

    let product_id = read_register(spi, register::PRODUCT_ID)?;
    let inverse_id = read_register(spi, register::INVERSE_PRODUCT_ID)?;
    if product_id == PRODUCT_ID && inverse_id == INVERSE_PRODUCT_ID {
        Ok(())
    } else {
        Err(SensorError::InvalidId {
            product_id,
            inverse_id,
        })
    }
}

pub fn read_motion<SPI: SpiDevice>(spi: &mut SPI) -> Result<MotionSample, SensorError> {
    // Any write to Motion_Burst arms a fresh burst.
    spi.write(&[register::MOTION_BURST | WRITE_BIT, 0x00])
        .map_err(|_| SensorError::Bus)?;

    let mut burst = [0u8; 12];
    spi.transaction(&mut [
        Operation::Write(&[register::MOTION_BURST]),
        Operation::DelayNs(T_SRAD_MOTBR_NS),
        Operation::Read(&mut burst),
    ])
    .map_err(|_| SensorError::Bus)?;

    Ok(MotionSample {
        dx: i16::from_le_bytes([burst[2], burst[3]]),
        dy: i16::from_le_bytes([burst[4], burst[5]]),
    })
}

fn read_register<SPI: SpiDevice>(spi: &mut SPI, reg: u8) -> Result<u8, SensorError> {
    let mut value = [0u8; 1];
    spi.transaction(&mut [
        Operation::Write(&[reg & !WRITE_BIT]),
        Operation::DelayNs(T_SRAD_NS),
        Operation::Read(&mut value),
    ])
    .map_err(|_| SensorError::Bus)?;
    Ok(value[0])
}
