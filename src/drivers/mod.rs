//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod camera;
#[cfg(target_os = "espidf")]
pub mod flow_bus;
pub mod hw_init;
pub mod hw_timer;
pub mod valve;
pub mod watchdog;
