//! Typed register payloads and their little-endian wire form.

use heapless::Vec;

use super::{RegisterSpec, RegisterType};
use crate::error::RegisterError;

/// Largest application payload: six S16 fields.
pub const MAX_PAYLOAD: usize = 12;

/// Raw register bytes as carried by a host message.
pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// A decoded application register value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    U8(u8),
    U16(u16),
    S16(i16),
    S16x6([i16; 6]),
    Float(f32),
}

impl RegisterValue {
    pub fn register_type(&self) -> RegisterType {
        match self {
            Self::U8(_) => RegisterType::U8,
            Self::U16(_) => RegisterType::U16,
            Self::S16(_) | Self::S16x6(_) => RegisterType::S16,
            Self::Float(_) => RegisterType::Float,
        }
    }

    /// Decode `bytes` against a table entry.  The caller has already
    /// checked type and element count.
    pub fn decode(spec: &RegisterSpec, bytes: &[u8]) -> Result<Self, RegisterError> {
        let want = spec.ty.size() * usize::from(spec.count);
        if bytes.len() != want {
            return Err(RegisterError::ArityMismatch);
        }
        let value = match (spec.ty, spec.count) {
            (RegisterType::U8, 1) => Self::U8(bytes[0]),
            (RegisterType::U16, 1) => Self::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            (RegisterType::S16, 1) => Self::S16(i16::from_le_bytes([bytes[0], bytes[1]])),
            (RegisterType::S16, 6) => {
                let mut fields = [0i16; 6];
                for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(2)) {
                    *field = i16::from_le_bytes([chunk[0], chunk[1]]);
                }
                Self::S16x6(fields)
            }
            (RegisterType::Float, 1) => {
                Self::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            _ => return Err(RegisterError::TypeMismatch),
        };
        Ok(value)
    }

    /// Little-endian wire bytes.
    pub fn encode(&self) -> Payload {
        let mut out = Payload::new();
        // Every variant fits MAX_PAYLOAD.
        let mut put = |bytes: &[u8]| {
            let _ = out.extend_from_slice(bytes);
        };
        match self {
            Self::U8(v) => put(&[*v]),
            Self::U16(v) => put(&v.to_le_bytes()),
            Self::S16(v) => put(&v.to_le_bytes()),
            Self::Float(v) => put(&v.to_le_bytes()),
            Self::S16x6(fields) => {
                for f in fields {
                    put(&f.to_le_bytes());
                }
            }
        }
        out
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::S16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}
