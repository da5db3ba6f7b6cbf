//! VestibularH1 Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by a 500 µs hardware tick.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter                    LogEventSink               │
//! │  (Optical+Actuator+Input)           (EventSink)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Optics · Motor cue · Valves · Cameras · Registers     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickScheduler (delegate-driven) · SPSC event queue            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::info;

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiDriver, SpiDriverConfig};

use vestibular_h1::adapters::hardware::HardwareAdapter;
use vestibular_h1::adapters::host_link::HostLink;
use vestibular_h1::adapters::log_sink::LogEventSink;
use vestibular_h1::app::service::{AppService, TickContext};
use vestibular_h1::config::{DeviceConfig, IDENTITY};
use vestibular_h1::drivers::{flow_bus::FlowPort, hw_init, hw_timer, watchdog::LoopWatchdog};
use vestibular_h1::events::{self, Event};
use vestibular_h1::pins;
use vestibular_h1::scheduler::TickScheduler;
use vestibular_h1::sensors::FlowSensors;

// The peripheral singletons below are picked by name; keep them in step
// with the pin map.
const _: () = assert!(
    pins::SPI_SCLK_GPIO == 12
        && pins::SPI_MOSI_GPIO == 11
        && pins::SPI_MISO_GPIO == 13
        && pins::FLOW0_CS_GPIO == 10
        && pins::FLOW1_CS_GPIO == 9
);

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  {} v{}                 ║", IDENTITY.name, env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!(
        "who_am_i={} hw={}.{} fw={}.{} assembly={}",
        IDENTITY.who_am_i,
        IDENTITY.hw_version.0,
        IDENTITY.hw_version.1,
        IDENTITY.fw_version.0,
        IDENTITY.fw_version.1,
        IDENTITY.assembly,
    );

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Nothing safe can run without the pins; the TWDT is not armed yet,
        // so the device sits here until power-cycled.
        log::error!("HAL init failed: {}; halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Optical sensor bus ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    let bus = SpiDriver::new(
        peripherals.spi2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio11,
        Some(peripherals.pins.gpio13),
        &SpiDriverConfig::new(),
    )?;
    let flow0 = FlowPort::new(&bus, peripherals.pins.gpio10.downgrade_output())?;
    let flow1 = FlowPort::new(&bus, peripherals.pins.gpio9.downgrade_output())?;

    // ── 4. Construct adapters and app service ─────────────────
    let mut hw = HardwareAdapter::new(FlowSensors::new(flow0, flow1, Ets));
    let mut host = HostLink::new();
    let mut log_sink = LogEventSink::new();
    let mut scheduler = TickScheduler::new();

    let mut app = AppService::new(DeviceConfig::default())?;
    app.start(&mut hw, &mut log_sink);

    if IDENTITY.clock_repeater_capable {
        info!("Clock: repeater mode, 1 s boundaries follow the host clock");
    }

    // ── 5. Timers ─────────────────────────────────────────────
    if let Err(e) = hw_timer::start_timers() {
        log::error!("Timer bring-up failed: {}; entering safe state", e);
        app.catastrophic_error(&mut hw, &mut log_sink);
        hw_timer::stop_timers();
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let mut watchdog = LoopWatchdog::arm();

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    // Ticks first, then at most a bounded batch of host requests, so a
    // host burst delays the next tick by a few register accesses only.
    loop {
        if events::queue_is_empty() && host.pending_requests() == 0 {
            core::hint::spin_loop();
            continue;
        }

        events::drain_events(|event| match event {
            Event::BaseTick => {
                let mut ctx = TickContext {
                    app: &mut app,
                    hw: &mut hw,
                    sink: &mut log_sink,
                };
                scheduler.on_base_tick(&mut ctx);
            }
            Event::CueStrobeExpired => hw.end_cue_strobe(),
        });

        app.serve_host(&mut host, &mut hw, &mut log_sink);

        watchdog.check_in(events::take_dropped());
    }
}
