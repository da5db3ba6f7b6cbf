//! Control-loop building blocks: sampling cadence and the motor-cue transform.

pub mod motor_cue;
pub mod optical;
