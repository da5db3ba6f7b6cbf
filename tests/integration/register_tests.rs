//! Host register access through `AppService::handle_request`.
//!
//! Structural failures (range, type, arity) must leave the device
//! untouched; validated writes refuse bad values with an event.

use crate::mock_hw::{HwCall, Rig};

use vestibular_h1::app::commands::HostReply;
use vestibular_h1::app::events::AppEvent;
use vestibular_h1::error::RegisterError;
use vestibular_h1::registers::{address, RegisterType, RegisterValue, APP_END, APP_START, TABLE};

fn err(e: RegisterError) -> HostReply {
    HostReply::Error(e)
}

fn u8_value(v: u8) -> HostReply {
    HostReply::Value(RegisterValue::U8(v))
}

/// Snapshot of every readable register.
fn dump(rig: &mut Rig) -> Vec<HostReply> {
    TABLE.iter().map(|spec| rig.read(spec.address, spec.ty)).collect()
}

// ── Structural errors ─────────────────────────────────────────

#[test]
fn out_of_window_is_refused_without_effect() {
    let mut rig = Rig::with_paa();
    let before = dump(&mut rig);

    for addr in [0, APP_START - 1, APP_END + 1, 255] {
        assert_eq!(rig.read(addr, RegisterType::U8), err(RegisterError::OutOfRange));
        assert_eq!(rig.write_raw(addr, RegisterType::U8, &[0xFF]), err(RegisterError::OutOfRange));
    }

    assert!(rig.hw.calls.is_empty());
    assert!(rig.sink.events.is_empty());
    assert_eq!(dump(&mut rig), before);
}

#[test]
fn type_mismatch_leaves_state_unchanged() {
    let mut rig = Rig::with_paa();
    let before = dump(&mut rig);

    assert_eq!(
        rig.write_raw(address::VALVE0_PULSE, RegisterType::U8, &[5]),
        err(RegisterError::TypeMismatch)
    );
    assert_eq!(
        rig.write_raw(address::OUT_SET, RegisterType::U16, &[0x01, 0x00]),
        err(RegisterError::TypeMismatch)
    );
    assert_eq!(
        rig.read(address::MCA_SIGNAL_GAIN, RegisterType::S16),
        err(RegisterError::TypeMismatch)
    );

    assert!(rig.hw.calls.is_empty());
    assert!(rig.sink.events.is_empty());
    assert_eq!(dump(&mut rig), before);
}

#[test]
fn arity_mismatch_leaves_state_unchanged() {
    let mut rig = Rig::with_paa();
    let before = dump(&mut rig);

    // Two elements, and a ragged payload.
    assert_eq!(
        rig.write_raw(address::VALVE0_PULSE, RegisterType::U16, &[1, 0, 2, 0]),
        err(RegisterError::ArityMismatch)
    );
    assert_eq!(
        rig.write_raw(address::VALVE0_PULSE, RegisterType::U16, &[1, 0, 2]),
        err(RegisterError::ArityMismatch)
    );
    assert_eq!(
        rig.write_raw(address::OUT_SET, RegisterType::U8, &[]),
        err(RegisterError::ArityMismatch)
    );

    assert!(rig.hw.calls.is_empty());
    assert!(rig.sink.events.is_empty());
    assert_eq!(dump(&mut rig), before);
}

// ── Plain copy ────────────────────────────────────────────────

#[test]
fn pulse_interval_bounds_are_plain_copies() {
    let mut rig = Rig::with_paa();

    // Stored as written, even when min > max.
    assert_eq!(rig.write(address::MCA_MIN_PULSE_INTERVAL, RegisterValue::S16(-123)), HostReply::Ack);
    assert_eq!(rig.write(address::MCA_MAX_PULSE_INTERVAL, RegisterValue::S16(-500)), HostReply::Ack);

    assert_eq!(
        rig.read(address::MCA_MIN_PULSE_INTERVAL, RegisterType::S16),
        HostReply::Value(RegisterValue::S16(-123))
    );
    assert_eq!(
        rig.read(address::MCA_MAX_PULSE_INTERVAL, RegisterType::S16),
        HostReply::Value(RegisterValue::S16(-500))
    );
}

// ── Validated writes ──────────────────────────────────────────

#[test]
fn valve_pulse_range_is_enforced() {
    let mut rig = Rig::with_paa();

    for ms in [0u16, 32_768, u16::MAX] {
        assert_eq!(
            rig.write(address::VALVE1_PULSE, RegisterValue::U16(ms)),
            err(RegisterError::WriteRejected)
        );
    }
    assert_eq!(rig.write(address::VALVE1_PULSE, RegisterValue::U16(32_767)), HostReply::Ack);
    assert_eq!(
        rig.read(address::VALVE1_PULSE, RegisterType::U16),
        HostReply::Value(RegisterValue::U16(32_767))
    );
    assert_eq!(
        rig.sink.count(|e| *e
            == AppEvent::WriteRejected {
                address: address::VALVE1_PULSE,
                error: RegisterError::WriteRejected,
            }),
        3
    );
}

#[test]
fn unprogrammable_trigger_is_refused() {
    let mut rig = Rig::with_paa();

    // 0 Hz, below the counter range, and a pulse longer than the period.
    assert_eq!(rig.write(address::CAM0_TRIGGER_FREQUENCY, RegisterValue::U16(0)), err(RegisterError::WriteRejected));
    assert_eq!(rig.write(address::CAM0_TRIGGER_FREQUENCY, RegisterValue::U16(1)), err(RegisterError::WriteRejected));
    assert_eq!(rig.write(address::CAM0_TRIGGER_DURATION_US, RegisterValue::U16(0)), err(RegisterError::WriteRejected));
    assert_eq!(
        rig.write(address::CAM0_TRIGGER_DURATION_US, RegisterValue::U16(9_000)),
        err(RegisterError::WriteRejected)
    );

    assert_eq!(
        rig.read(address::CAM0_TRIGGER_FREQUENCY, RegisterType::U16),
        HostReply::Value(RegisterValue::U16(120))
    );
    assert_eq!(
        rig.read(address::CAM0_TRIGGER_DURATION_US, RegisterType::U16),
        HostReply::Value(RegisterValue::U16(1_000))
    );
}

#[test]
fn signal_select_and_gain_are_validated() {
    let mut rig = Rig::with_paa();

    assert_eq!(rig.write(address::MCA_SIGNAL_SELECT, RegisterValue::U8(5)), err(RegisterError::WriteRejected));
    assert_eq!(rig.read(address::MCA_SIGNAL_SELECT, RegisterType::U8), u8_value(0));
    assert_eq!(rig.write(address::MCA_SIGNAL_SELECT, RegisterValue::U8(3)), HostReply::Ack);
    assert_eq!(rig.read(address::MCA_SIGNAL_SELECT, RegisterType::U8), u8_value(3));

    assert_eq!(rig.write(address::MCA_SIGNAL_GAIN, RegisterValue::Float(f32::NAN)), err(RegisterError::WriteRejected));
    assert_eq!(
        rig.write(address::MCA_ZERO_THRESHOLD, RegisterValue::Float(f32::NAN)),
        err(RegisterError::WriteRejected)
    );
    assert_eq!(rig.write(address::MCA_ZERO_THRESHOLD, RegisterValue::Float(-1.0)), HostReply::Ack);
    assert_eq!(
        rig.read(address::MCA_SIGNAL_GAIN, RegisterType::Float),
        HostReply::Value(RegisterValue::Float(1.0))
    );
}

#[test]
fn read_only_registers_refuse_writes() {
    let mut rig = Rig::with_paa();

    assert_eq!(rig.write(address::CAMERAS_STATE, RegisterValue::U8(0x03)), err(RegisterError::WriteRejected));
    assert_eq!(rig.write(address::IN_STATE, RegisterValue::U8(0x03)), err(RegisterError::WriteRejected));
    assert_eq!(
        rig.write(address::OPTICAL_TRACKING_READ, RegisterValue::S16x6([1; 6])),
        err(RegisterError::WriteRejected)
    );

    assert!(rig.hw.calls.is_empty());
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), u8_value(0));
    assert_eq!(
        rig.read(address::OPTICAL_TRACKING_READ, RegisterType::S16),
        HostReply::Value(RegisterValue::S16x6([0; 6]))
    );
}

// ── Computed reads and command registers ──────────────────────

#[test]
fn in_state_snapshots_inputs() {
    let mut rig = Rig::with_paa();
    rig.hw.inputs = 0b01;
    assert_eq!(rig.read(address::IN_STATE, RegisterType::U8), u8_value(0b01));

    // Bits beyond IN0/IN1 are not reported.
    rig.hw.inputs = 0xFF;
    assert_eq!(rig.read(address::IN_STATE, RegisterType::U8), u8_value(0b11));
    assert_eq!(rig.app.state().in_state, 0b11);
}

#[test]
fn command_registers_read_back_last_write() {
    let mut rig = Rig::with_paa();
    rig.write(address::OUT_SET, RegisterValue::U8(0x08));
    rig.write(address::OUT_CLEAR, RegisterValue::U8(0x04));
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x02));

    assert_eq!(rig.read(address::OUT_SET, RegisterType::U8), u8_value(0x08));
    assert_eq!(rig.read(address::OUT_CLEAR, RegisterType::U8), u8_value(0x04));
    assert_eq!(rig.read(address::START_CAMERAS, RegisterType::U8), u8_value(0x02));
    assert_eq!(rig.read(address::STOP_CAMERAS, RegisterType::U8), u8_value(0x00));
}

#[test]
fn out_write_and_toggle_drive_the_live_mask() {
    let mut rig = Rig::with_paa();

    assert_eq!(rig.write(address::OUT_WRITE, RegisterValue::U8(0x0C)), HostReply::Ack);
    assert_eq!(rig.hw.outputs(), 0x0C);
    assert_eq!(rig.read(address::OUT_WRITE, RegisterType::U8), u8_value(0x0C));

    // Unset bits clear, the valve bit starts a pulse.
    rig.write(address::OUT_WRITE, RegisterValue::U8(0x01));
    assert_eq!(rig.hw.outputs(), 0x01);
    assert!(rig.app.state().valves.is_open(vestibular_h1::drivers::valve::ValveId::Valve0));

    rig.write(address::OUT_TOGGLE, RegisterValue::U8(0x05));
    assert_eq!(rig.hw.outputs(), 0x04);
    rig.write(address::OUT_TOGGLE, RegisterValue::U8(0x04));
    assert_eq!(rig.hw.outputs(), 0x00);
    assert_eq!(rig.read(address::OUT_TOGGLE, RegisterType::U8), u8_value(0x04));

    assert_eq!(
        rig.hw.calls,
        vec![
            HwCall::WriteOutputs(0x0C),
            HwCall::WriteOutputs(0x01),
            HwCall::WriteOutputs(0x04),
            HwCall::WriteOutputs(0x00),
        ]
    );
}
