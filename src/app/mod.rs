//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the control loop of the VestibularH1 node: optical
//! sampling, the motor-cue transform, valve pulses, camera trigger
//! sequencing, and the register effects the host drives them with.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod state;
