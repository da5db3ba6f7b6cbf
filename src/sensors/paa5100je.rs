//! PAA5100JE near-field optical flow sensor (sensor type A).
//!
//! Bring-up is a power-up reset, an identity check, then the vendor tuning
//! sequence (undocumented register writes across the banks selected via
//! `0x7F`).  Without the tuning the chip answers its id but reports no
//! usable motion.  After that the control loop only needs the motion burst.
//!
//! Runs in SPI mode 0.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use super::MotionSample;
use crate::error::SensorError;

mod register {
    pub const PRODUCT_ID: u8 = 0x00;
    pub const MOTION: u8 = 0x02;
    pub const MOTION_BURST: u8 = 0x16;
    pub const POWER_UP_RESET: u8 = 0x3A;
    pub const INVERSE_PRODUCT_ID: u8 = 0x5F;
    pub const BANK_SELECT: u8 = 0x7F;
}

const PRODUCT_ID: u8 = 0x49;
const INVERSE_PRODUCT_ID: u8 = 0xB6;

const WRITE_BIT: u8 = 0x80;

/// Power-up reset, check both id registers, then tune.
pub fn probe<SPI: SpiDevice>(spi: &mut SPI, delay: &mut impl DelayNs) -> Result<(), SensorError> {
    write_register(spi, register::POWER_UP_RESET, 0x5A)?;
    delay.delay_ms(20);

    // Reading the motion block once clears whatever the reset latched.
    for offset in 0..5 {
        read_register(spi, register::MOTION + offset)?;
    }

    let product_id = read_register(spi, register::PRODUCT_ID)?;
    let inverse_id = read_register(spi, register::INVERSE_PRODUCT_ID)?;
    if product_id != PRODUCT_ID || inverse_id != INVERSE_PRODUCT_ID {
        return Err(SensorError::InvalidId {
            product_id,
            inverse_id,
        });
    }

    tune(spi, delay)
}

// ── Vendor tuning ─────────────────────────────────────────────

const TUNE_ENTER: &[(u8, u8)] = &[(0x7F, 0x00), (0x55, 0x01), (0x50, 0x07), (0x7F, 0x0E), (0x43, 0x10)];

const TUNE_CALIBRATE: &[(u8, u8)] = &[(0x7F, 0x00), (0x51, 0x7B), (0x50, 0x00), (0x55, 0x00), (0x7F, 0x0E)];

const TUNE_MAIN: &[(u8, u8)] = &[
    (0x7F, 0x00), (0x61, 0xAD), (0x7F, 0x03), (0x40, 0x00), (0x7F, 0x05),
    (0x41, 0xB3), (0x43, 0xF1), (0x45, 0x14), (0x5B, 0x32), (0x5F, 0x34),
    (0x7B, 0x08), (0x7F, 0x06), (0x44, 0x1B), (0x40, 0xBF), (0x4E, 0x3F),
    (0x7F, 0x08), (0x65, 0x20), (0x6A, 0x18), (0x7F, 0x09), (0x4F, 0xAF),
    (0x5F, 0x40), (0x48, 0x80), (0x49, 0x80), (0x57, 0x77), (0x60, 0x78),
    (0x61, 0x78), (0x62, 0x08), (0x63, 0x50), (0x7F, 0x0A), (0x45, 0x60),
    (0x7F, 0x00), (0x4D, 0x11), (0x55, 0x80), (0x74, 0x21), (0x75, 0x1F),
    (0x4A, 0x78), (0x4B, 0x78), (0x44, 0x08), (0x45, 0x50), (0x64, 0xFF),
    (0x65, 0x1F), (0x7F, 0x14), (0x65, 0x67), (0x66, 0x08), (0x63, 0x70),
    (0x7F, 0x15), (0x48, 0x48), (0x7F, 0x07), (0x41, 0x0D), (0x43, 0x14),
    (0x4B, 0x0E), (0x45, 0x0F), (0x44, 0x42), (0x4C, 0x80), (0x7F, 0x10),
    (0x5B, 0x02), (0x7F, 0x07), (0x40, 0x41), (0x70, 0x00),
];

const TUNE_SETTLE: &[(u8, u8)] = &[
    (0x32, 0x44), (0x7F, 0x07), (0x40, 0x40), (0x7F, 0x06), (0x62, 0xF0),
    (0x63, 0x00), (0x7F, 0x0D), (0x48, 0xC0), (0x6F, 0xD5), (0x7F, 0x00),
    (0x5B, 0xA0), (0x4E, 0xA8), (0x5A, 0x50), (0x40, 0x80),
];

/// Bank 0x14 LED_N pulsing on, then back to bank 0.
pub(crate) const TUNE_LED_ON: &[(u8, u8)] = &[(register::BANK_SELECT, 0x14), (0x6F, 0x1C), (register::BANK_SELECT, 0x00)];

fn tune<SPI: SpiDevice>(spi: &mut SPI, delay: &mut impl DelayNs) -> Result<(), SensorError> {
    write_all(spi, TUNE_ENTER)?;
    let trim = if read_register(spi, 0x67)? & 0x80 != 0 { 0x04 } else { 0x02 };
    write_register(spi, 0x48, trim)?;

    write_all(spi, TUNE_CALIBRATE)?;
    if read_register(spi, 0x73)? == 0 {
        let (c1, c2) = calibration_offsets(read_register(spi, 0x70)?, read_register(spi, 0x71)?);
        write_all(
            spi,
            &[(0x7F, 0x00), (0x61, 0xAD), (0x51, 0x70), (0x7F, 0x0E), (0x70, c1), (0x71, c2)],
        )?;
    }

    write_all(spi, TUNE_MAIN)?;
    delay.delay_ms(10);
    write_all(spi, TUNE_SETTLE)?;
    delay.delay_ms(240);
    write_all(spi, TUNE_LED_ON)
}

/// Factory trim correction for registers 0x70/0x71 in bank 0x0E.
fn calibration_offsets(raw1: u8, raw2: u8) -> (u8, u8) {
    let mut c1 = raw1;
    if c1 <= 28 {
        c1 += 14;
    }
    if c1 > 28 {
        c1 = c1.saturating_add(11);
    }
    let c2 = (u16::from(raw2) * 45 / 100) as u8;
    (c1.min(0x3F), c2)
}

/// Motion burst.  Frames that fail the chip's own quality check read as
/// no motion.
pub fn read_motion<SPI: SpiDevice>(spi: &mut SPI) -> Result<MotionSample, SensorError> {
    let mut burst = [0u8; 12];
    spi.transaction(&mut [
        Operation::Write(&[register::MOTION_BURST]),
        Operation::Read(&mut burst),
    ])
    .map_err(|_| SensorError::Bus)?;

    let data_ready = burst[0] & 0x80 != 0;
    let quality = burst[6];
    let shutter_upper = burst[10];
    if !data_ready || (quality < 0x19 && shutter_upper == 0x1F) {
        return Ok(MotionSample::default());
    }

    Ok(MotionSample {
        dx: i16::from_le_bytes([burst[2], burst[3]]),
        dy: i16::from_le_bytes([burst[4], burst[5]]),
    })
}

fn write_register<SPI: SpiDevice>(spi: &mut SPI, reg: u8, value: u8) -> Result<(), SensorError> {
    spi.write(&[reg | WRITE_BIT, value]).map_err(|_| SensorError::Bus)
}

fn write_all<SPI: SpiDevice>(spi: &mut SPI, pairs: &[(u8, u8)]) -> Result<(), SensorError> {
    pairs.iter().try_for_each(|&(reg, value)| write_register(spi, reg, value))
}

fn read_register<SPI: SpiDevice>(spi: &mut SPI, reg: u8) -> Result<u8, SensorError> {
    let mut value = [0u8; 1];
    spi.transaction(&mut [
        Operation::Write(&[reg & !WRITE_BIT]),
        Operation::Read(&mut value),
    ])
    .map_err(|_| SensorError::Bus)?;
    Ok(value[0])
}
