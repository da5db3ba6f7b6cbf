//! VestibularH1 firmware library.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod registers;
pub mod scheduler;

// The hardware-facing modules build on every target; their peripheral
// access is cfg-gated inside.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
