//! Inbound requests to the application service.
//!
//! The host-core adapter decodes register messages into these and queues
//! them on a [`HostPort`](super::ports::HostPort).  The main loop hands
//! them to [`AppService::serve_host`](super::service::AppService::serve_host)
//! between tick batches.

use crate::error::RegisterError;
use crate::registers::{Payload, RegisterType, RegisterValue};

/// Register access requested by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    /// Read one application register.
    Read { address: u8, ty: RegisterType },

    /// Write one application register.  The element count is implied by
    /// the payload length.
    Write {
        address: u8,
        ty: RegisterType,
        payload: Payload,
    },

    /// Restore every application register to its default.
    ResetRegisters,
}

/// Outcome of a [`HostRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostReply {
    Value(RegisterValue),
    Ack,
    Error(RegisterError),
}

impl From<Result<RegisterValue, RegisterError>> for HostReply {
    fn from(r: Result<RegisterValue, RegisterError>) -> Self {
        match r {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Error(e),
        }
    }
}

impl From<Result<(), RegisterError>> for HostReply {
    fn from(r: Result<(), RegisterError>) -> Self {
        match r {
            Ok(()) => Self::Ack,
            Err(e) => Self::Error(e),
        }
    }
}
