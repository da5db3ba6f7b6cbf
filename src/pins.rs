//! GPIO / peripheral pin assignments for the VestibularH1 board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Optical flow sensors (shared SPI2 bus, one chip select per port)
// ---------------------------------------------------------------------------

pub const SPI_SCLK_GPIO: i32 = 12;
pub const SPI_MOSI_GPIO: i32 = 11;
pub const SPI_MISO_GPIO: i32 = 13;
/// Chip select, flow0 port.
pub const FLOW0_CS_GPIO: i32 = 10;
/// Chip select, flow1 port.
pub const FLOW1_CS_GPIO: i32 = 9;
/// Both sensor families accept 2 MHz.  The clock mode is per family
/// (PAA5100JE mode 0, PMW3360 mode 3) and switched by the port driver.
pub const SPI_BAUD_HZ: u32 = 2_000_000;

// ---------------------------------------------------------------------------
// Camera triggers (LEDC, one timer per camera)
// ---------------------------------------------------------------------------

pub const CAM0_TRIGGER_GPIO: i32 = 4;
pub const CAM1_TRIGGER_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Digital outputs (bit order of OUT_SET / OUT_CLEAR / OUT_WRITE)
// ---------------------------------------------------------------------------

pub const VALVE0_GPIO: i32 = 6;
pub const VALVE1_GPIO: i32 = 7;
pub const OUT0_GPIO: i32 = 15;
pub const OUT1_GPIO: i32 = 16;

/// Output pins indexed by register bit.
pub const OUTPUT_GPIOS: [i32; 4] = [VALVE0_GPIO, VALVE1_GPIO, OUT0_GPIO, OUT1_GPIO];

// ---------------------------------------------------------------------------
// Digital inputs (bit order of IN_STATE)
// ---------------------------------------------------------------------------

pub const IN0_GPIO: i32 = 1;
pub const IN1_GPIO: i32 = 2;

pub const INPUT_GPIOS: [i32; 2] = [IN0_GPIO, IN1_GPIO];

// ---------------------------------------------------------------------------
// Motor cue side channel (UART1 TX + strobe)
// ---------------------------------------------------------------------------

pub const CUE_UART_TX_GPIO: i32 = 17;
/// High while the 100 µs cue one-shot runs.
pub const CUE_STROBE_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC duty resolution for the camera triggers (bits).
pub const CAM_PWM_RESOLUTION_BITS: u32 = 14;
