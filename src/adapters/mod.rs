//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                      |
//! |------------|---------------|----------------------------------|
//! | `hardware` | OpticalPort   | Flow sensors on SPI2             |
//! |            | ActuatorPort  | GPIO, LEDC triggers, cue UART    |
//! |            | InputPort     | GPIO                             |
//! | `host_link`| HostPort      | Host protocol core mailbox       |
//! | `log_sink` | EventSink     | Serial log output                |
//! | `time`     |               | ESP32 high-resolution timer      |

pub mod hardware;
pub mod host_link;
pub mod log_sink;
pub mod time;
