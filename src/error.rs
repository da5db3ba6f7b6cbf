//! Unified error types for the VestibularH1 firmware.
//!
//! Every failure is a plain value returned to the caller and consumed
//! immediately; nothing unwinds and nothing retries on its own.  The next
//! tick is the retry policy.  All variants are `Copy` so they can be handed
//! back through the register dispatch without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A host register access was refused.
    Register(RegisterError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(e) => write!(f, "register: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Register errors
// ---------------------------------------------------------------------------

/// Why a host read or write of an application register was refused.
///
/// The first three are structural and are detected before any effect
/// function runs, so they never mutate device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// Address lies outside the application register window.
    OutOfRange,
    /// Requested type differs from the register's declared type.
    TypeMismatch,
    /// Element count differs from the register's declared count.
    ArityMismatch,
    /// The write effect refused the value (read-only or semantically invalid).
    WriteRejected,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "address out of range"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::ArityMismatch => write!(f, "element count mismatch"),
            Self::WriteRejected => write!(f, "write rejected"),
        }
    }
}

impl std::error::Error for Error {}

impl From<RegisterError> for Error {
    fn from(e: RegisterError) -> Self {
        Self::Register(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No chip was bound to the slot at boot.
    BindingAbsent,
    /// The SPI transaction itself failed.
    Bus,
    /// Product id / inverse id did not match the expected chip.
    InvalidId { product_id: u8, inverse_id: u8 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindingAbsent => write!(f, "no sensor bound"),
            Self::Bus => write!(f, "SPI transaction failed"),
            Self::InvalidId {
                product_id,
                inverse_id,
            } => write!(f, "unexpected id 0x{product_id:02x}/0x{inverse_id:02x}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
