//! Integration tests for the scheduler → AppService → ports pipeline.
//!
//! Ticks are fed through the real `TickScheduler`, so every test sees the
//! same instant ordering the firmware runs with.

use crate::mock_hw::{HwCall, Rig};

use vestibular_h1::adapters::host_link::{HostLink, MAILBOX_DEPTH};

use vestibular_h1::app::commands::{HostReply, HostRequest};
use vestibular_h1::app::events::AppEvent;
use vestibular_h1::app::service::HOST_REQUESTS_PER_PASS;
use vestibular_h1::control::motor_cue::CueCommand;
use vestibular_h1::drivers::camera::{CameraId, CameraState, PwmParams, MAX_TRIGGER_HZ};
use vestibular_h1::drivers::valve::ValveId;
use vestibular_h1::error::RegisterError;
use vestibular_h1::registers::{address, RegisterType, RegisterValue};
use vestibular_h1::sensors::{MotionSample, SensorBinding, SensorKind};

/// Base ticks in one second and in one optical period.
const SECOND: u32 = 2_000;
const OPTICAL_PERIOD: u32 = 20;

const DEFAULT_PWM: PwmParams = PwmParams {
    prescaler: 16,
    target_count: 41_665,
    duty_count: 5_000,
};

fn motion(dx: i16, dy: i16) -> MotionSample {
    MotionSample { dx, dy }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn start_binds_sensors_and_idles_outputs() {
    let mut rig = Rig::with_paa();
    assert_eq!(rig.app.bindings(), [SensorBinding::Paa5100je; 2]);

    // Boot again without discarding the start-up traffic.
    let mut hw = crate::mock_hw::MockDevice::new([Some(SensorKind::Pmw3360), None]);
    rig.sink.events.clear();
    rig.app.start(&mut hw, &mut rig.sink);
    assert_eq!(rig.app.bindings(), [SensorBinding::Pmw3360, SensorBinding::None]);
    assert!(hw.calls.contains(&HwCall::StopPwm(CameraId::Cam0)));
    assert!(hw.calls.contains(&HwCall::StopPwm(CameraId::Cam1)));
    assert_eq!(hw.outputs(), 0);
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::Started([SensorBinding::Pmw3360, SensorBinding::None])]
    );
}

// ── Valves ────────────────────────────────────────────────────

#[test]
fn valve_pulse_of_ten_ms_lasts_twenty_base_ticks() {
    let mut rig = Rig::with_paa();
    assert_eq!(rig.write(address::OUT_SET, RegisterValue::U8(0x01)), HostReply::Ack);
    assert_eq!(rig.hw.outputs(), 0x01);

    rig.run_base_ticks(19);
    assert_eq!(rig.hw.outputs(), 0x01);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveClosed(_))), 0);

    rig.run_base_ticks(1);
    assert_eq!(rig.hw.outputs(), 0x00);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ValveClosed(ValveId::Valve0)), 1);
}

#[test]
fn valve_duration_register_sets_next_pulse() {
    let mut rig = Rig::with_paa();
    rig.write(address::VALVE1_PULSE, RegisterValue::U16(3));
    rig.write(address::OUT_SET, RegisterValue::U8(0x02));

    rig.run_base_ticks(5);
    assert_eq!(rig.hw.outputs(), 0x02);
    rig.run_base_ticks(1);
    assert_eq!(rig.hw.outputs(), 0x00);
}

#[test]
fn out_clear_cancels_a_running_pulse() {
    let mut rig = Rig::with_paa();
    rig.write(address::OUT_SET, RegisterValue::U8(0x01 | 0x04));
    rig.run_base_ticks(4);
    rig.write(address::OUT_CLEAR, RegisterValue::U8(0x01));
    assert_eq!(rig.hw.outputs(), 0x04);

    rig.run_base_ticks(40);
    // Cancelled pulses do not report a close.
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveClosed(_))), 0);
    assert_eq!(rig.hw.outputs(), 0x04);
}

// ── Cameras ───────────────────────────────────────────────────

#[test]
fn camera_start_waits_for_second_boundary() {
    let mut rig = Rig::with_paa();
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));

    rig.run_base_ticks(SECOND - 1);
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::StartPwm(..))), 0);
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));

    rig.run_base_ticks(1);
    assert_eq!(rig.scheduler.seconds(), 1);
    assert_eq!(rig.hw.calls.iter().filter(|c| matches!(c, HwCall::StartPwm(..))).collect::<Vec<_>>(), vec![
        &HwCall::StartPwm(CameraId::Cam0, DEFAULT_PWM)
    ]);
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0x01)));

    // Programmed exactly once per start request.
    rig.run_base_ticks(2 * SECOND);
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::StartPwm(..))), 1);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::CameraStarted(CameraId::Cam0)), 1);
}

#[test]
fn camera_stop_is_observed_then_finalized_at_boundary() {
    let mut rig = Rig::with_paa();
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x03));
    rig.run_base_ticks(SECOND);
    rig.clear();

    rig.write(address::STOP_CAMERAS, RegisterValue::U8(0x02));
    rig.run_base_ticks(2);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::CameraStopPending(CameraId::Cam1)), 1);
    assert_eq!(rig.app.state().cameras[1].state(), CameraState::StopPending);
    // The trigger keeps running until the boundary.
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::StopPwm(_))), 0);
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0x03)));

    rig.run_base_ticks(SECOND - 2);
    assert_eq!(rig.hw.calls.iter().filter(|c| matches!(c, HwCall::StopPwm(_))).count(), 1);
    assert!(rig.hw.calls.contains(&HwCall::StopPwm(CameraId::Cam1)));
    assert_eq!(rig.app.state().cameras[1].state(), CameraState::Idle);
    assert_eq!(rig.app.state().cameras[0].state(), CameraState::Acquiring);
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0x01)));
}

#[test]
fn restart_during_stop_pending_finalizes_before_arming() {
    let mut rig = Rig::with_paa();
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(SECOND);
    rig.write(address::STOP_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(2);
    rig.clear();

    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(SECOND - 2);

    let pwm: Vec<&HwCall> = rig
        .hw
        .calls
        .iter()
        .filter(|c| matches!(c, HwCall::StartPwm(..) | HwCall::StopPwm(_)))
        .collect();
    assert_eq!(pwm, vec![
        &HwCall::StopPwm(CameraId::Cam0),
        &HwCall::StartPwm(CameraId::Cam0, DEFAULT_PWM),
    ]);
    assert_eq!(rig.app.state().cameras[0].state(), CameraState::Acquiring);
}

#[test]
fn stop_before_boundary_cancels_pending_start() {
    let mut rig = Rig::with_paa();
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(10);
    rig.write(address::STOP_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(SECOND);

    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::StartPwm(..) | HwCall::StopPwm(_))), 0);
    assert_eq!(rig.app.state().cameras[0].state(), CameraState::Idle);
}

#[test]
fn new_trigger_frequency_applies_on_next_start() {
    let mut rig = Rig::with_paa();
    // Shorten the pulse first: 1 ms does not fit a 250 µs period.
    assert_eq!(
        rig.write(address::CAM1_TRIGGER_FREQUENCY, RegisterValue::U16(4_000)),
        HostReply::Error(RegisterError::WriteRejected)
    );
    assert_eq!(rig.write(address::CAM1_TRIGGER_DURATION_US, RegisterValue::U16(10)), HostReply::Ack);
    assert_eq!(rig.write(address::CAM1_TRIGGER_FREQUENCY, RegisterValue::U16(4_000)), HostReply::Ack);
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x02));
    rig.run_base_ticks(SECOND);

    assert!(rig.hw.calls.contains(&HwCall::StartPwm(
        CameraId::Cam1,
        PwmParams {
            prescaler: 1,
            target_count: 19_999,
            duty_count: 800,
        }
    )));
}

#[test]
fn trigger_faster_than_ledc_is_refused() {
    let mut rig = Rig::with_paa();
    rig.write(address::CAM0_TRIGGER_DURATION_US, RegisterValue::U16(10));

    // The 80 MHz counter could express these; the 14-bit LEDC timer cannot.
    for hz in [MAX_TRIGGER_HZ + 1, 6_000, 10_000] {
        assert_eq!(
            rig.write(address::CAM0_TRIGGER_FREQUENCY, RegisterValue::U16(hz)),
            HostReply::Error(RegisterError::WriteRejected)
        );
    }
    assert_eq!(
        rig.read(address::CAM0_TRIGGER_FREQUENCY, RegisterType::U16),
        HostReply::Value(RegisterValue::U16(120))
    );

    // A start still runs the last accepted waveform.
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(SECOND);
    let started: Vec<_> = rig
        .hw
        .calls
        .iter()
        .filter_map(|c| match c {
            HwCall::StartPwm(CameraId::Cam0, p) => Some(p.ledc_settings().0),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![120]);
}

// ── Optical sampling ──────────────────────────────────────────

#[test]
fn optical_samples_every_ten_ms() {
    let mut rig = Rig::with_paa();
    rig.hw.motion = [motion(3, -4), motion(7, 8)];

    rig.run_base_ticks(OPTICAL_PERIOD - 1);
    assert_eq!(rig.app.optical_cycles(), 0);
    rig.run_base_ticks(1);
    assert_eq!(rig.app.optical_cycles(), 1);

    assert_eq!(
        rig.read(address::OPTICAL_TRACKING_READ, RegisterType::S16),
        HostReply::Value(RegisterValue::S16x6([3, -4, 0, 7, 8, 0]))
    );

    rig.run_base_ticks(SECOND - OPTICAL_PERIOD);
    assert_eq!(rig.app.optical_cycles(), 100);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::OpticalSample { .. })),
        100
    );
}

#[test]
fn second_boundary_realigns_sampling_phase() {
    let mut rig = Rig::with_paa();
    rig.run_base_ticks(SECOND);
    let cycles = rig.app.optical_cycles();

    // The boundary instant itself sampled; the next one is a full
    // optical period later.
    rig.run_base_ticks(OPTICAL_PERIOD - 1);
    assert_eq!(rig.app.optical_cycles(), cycles);
    rig.run_base_ticks(1);
    assert_eq!(rig.app.optical_cycles(), cycles + 1);
}

#[test]
fn padding_fields_stay_zero() {
    let mut rig = Rig::with_paa();
    rig.hw.motion = [motion(i16::MIN, i16::MAX), motion(-1, 1)];
    rig.run_base_ticks(OPTICAL_PERIOD);

    let f = *rig.app.image().fields();
    assert_eq!((f[2], f[5]), (0, 0));
    assert_eq!(f, [i16::MIN, i16::MAX, 0, -1, 1, 0]);
}

#[test]
fn both_slots_read_with_flow0_driver() {
    let mut rig = Rig::boot([Some(SensorKind::Pmw3360), Some(SensorKind::Paa5100je)]);
    assert_eq!(rig.app.bindings(), [SensorBinding::Pmw3360, SensorBinding::Paa5100je]);
    rig.hw.motion = [motion(1, 2), motion(3, 4)];

    rig.run_base_ticks(OPTICAL_PERIOD);
    assert_eq!(rig.hw.reads, vec![SensorKind::Pmw3360]);
    assert_eq!(*rig.app.image().fields(), [1, 2, 0, 3, 4, 0]);
}

#[test]
fn unbound_flow0_publishes_zero_image() {
    let mut rig = Rig::boot([None, Some(SensorKind::Pmw3360)]);
    rig.hw.motion = [motion(5, 5), motion(5, 5)];

    rig.run_base_ticks(OPTICAL_PERIOD);
    assert!(rig.hw.reads.is_empty());
    assert_eq!(rig.app.optical_cycles(), 1);
    assert_eq!(*rig.app.image().fields(), [0; 6]);
}

// ── Motor cue ─────────────────────────────────────────────────

fn enable_cue(rig: &mut Rig, select: u8, gain: f32, threshold: f32, min: i16, max: i16) {
    assert_eq!(rig.write(address::MCA_SIGNAL_SELECT, RegisterValue::U8(select)), HostReply::Ack);
    assert_eq!(rig.write(address::MCA_SIGNAL_GAIN, RegisterValue::Float(gain)), HostReply::Ack);
    assert_eq!(rig.write(address::MCA_ZERO_THRESHOLD, RegisterValue::Float(threshold)), HostReply::Ack);
    assert_eq!(rig.write(address::MCA_MIN_PULSE_INTERVAL, RegisterValue::S16(min)), HostReply::Ack);
    assert_eq!(rig.write(address::MCA_MAX_PULSE_INTERVAL, RegisterValue::S16(max)), HostReply::Ack);
}

#[test]
fn cue_interval_is_clamped_to_max() {
    let mut rig = Rig::with_paa();
    enable_cue(&mut rig, 1, 2.0, 5.0, 0, 30_000);
    rig.hw.motion = [motion(10, 0), motion(0, 0)];
    rig.clear();

    // signal 20 → 50 000 µs, clamped.
    rig.run_base_ticks(OPTICAL_PERIOD);
    assert_eq!(rig.hw.calls, vec![HwCall::CueByte((30_000 & 0xFF) as u8), HwCall::CueStrobe]);
    assert!(rig.sink.events.contains(&AppEvent::OpticalSample {
        image: rig.app.image(),
        cue: Some(CueCommand { pulse_interval: 30_000 }),
    }));
}

#[test]
fn negative_velocity_gives_negative_interval() {
    let mut rig = Rig::with_paa();
    enable_cue(&mut rig, 4, 1.0, 1.0, 100, 32_767);
    rig.hw.motion = [motion(0, 0), motion(0, -400)];
    rig.clear();

    rig.run_base_ticks(OPTICAL_PERIOD);
    let cue = rig.sink.events.iter().find_map(|e| match e {
        AppEvent::OpticalSample { cue, .. } => *cue,
        _ => None,
    });
    assert_eq!(cue, Some(CueCommand { pulse_interval: -2_500 }));
}

#[test]
fn signal_below_threshold_sends_zero() {
    let mut rig = Rig::with_paa();
    enable_cue(&mut rig, 1, 1.0, 5.0, 100, 32_767);
    rig.hw.motion = [motion(1, 0), motion(0, 0)];
    rig.clear();

    rig.run_base_ticks(OPTICAL_PERIOD);
    assert_eq!(rig.hw.cue_bytes(), vec![0]);
    assert_eq!(rig.hw.count(|c| *c == HwCall::CueStrobe), 1);
}

#[test]
fn cue_off_sends_nothing() {
    let mut rig = Rig::with_paa();
    rig.hw.motion = [motion(100, 100), motion(100, 100)];
    rig.run_base_ticks(SECOND);

    assert!(rig.hw.cue_bytes().is_empty());
    assert_eq!(rig.hw.count(|c| *c == HwCall::CueStrobe), 0);
}

// ── Reset and safe state ──────────────────────────────────────

#[test]
fn reset_registers_restores_defaults() {
    let mut rig = Rig::with_paa();
    rig.write(address::CAM0_TRIGGER_FREQUENCY, RegisterValue::U16(60));
    rig.write(address::VALVE0_PULSE, RegisterValue::U16(500));
    rig.write(address::MCA_SIGNAL_SELECT, RegisterValue::U8(2));
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x01));
    rig.run_base_ticks(SECOND);
    rig.write(address::OUT_SET, RegisterValue::U8(0x0D));
    rig.hw.inputs = 0b10;
    rig.clear();

    assert_eq!(rig.request(HostRequest::ResetRegisters), HostReply::Ack);

    assert!(rig.sink.events.contains(&AppEvent::RegistersReset));
    assert!(rig.hw.calls.contains(&HwCall::StopPwm(CameraId::Cam0)));
    assert_eq!(rig.hw.outputs(), 0);
    assert_eq!(rig.app.state().cameras[0].state(), CameraState::Idle);
    assert_eq!(rig.app.state().in_state, 0b10);
    assert_eq!(rig.app.bindings(), [SensorBinding::Paa5100je; 2]);

    assert_eq!(rig.read(address::CAM0_TRIGGER_FREQUENCY, RegisterType::U16), HostReply::Value(RegisterValue::U16(120)));
    assert_eq!(rig.read(address::VALVE0_PULSE, RegisterType::U16), HostReply::Value(RegisterValue::U16(10)));
    assert_eq!(rig.read(address::MCA_SIGNAL_SELECT, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));
    assert_eq!(rig.read(address::OUT_WRITE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));
    assert_eq!(rig.read(address::OUT_SET, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));

    // No trigger restarts at the next boundary.
    rig.run_base_ticks(SECOND);
    assert_eq!(rig.hw.count(|c| matches!(c, HwCall::StartPwm(..))), 0);
}

#[test]
fn catastrophic_error_drives_safe_state() {
    let mut rig = Rig::with_paa();
    rig.write(address::START_CAMERAS, RegisterValue::U8(0x03));
    rig.run_base_ticks(SECOND);
    rig.write(address::OUT_SET, RegisterValue::U8(0x05));
    rig.clear();

    rig.app.catastrophic_error(&mut rig.hw, &mut rig.sink);

    assert_eq!(rig.hw.calls.last(), Some(&HwCall::WriteOutputs(0)));
    assert!(rig.hw.calls.contains(&HwCall::StopPwm(CameraId::Cam0)));
    assert!(rig.hw.calls.contains(&HwCall::StopPwm(CameraId::Cam1)));
    assert_eq!(rig.sink.events, vec![AppEvent::SafeState]);
    assert_eq!(rig.read(address::CAMERAS_STATE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));
    assert_eq!(rig.read(address::OUT_WRITE, RegisterType::U8), HostReply::Value(RegisterValue::U8(0)));

    // The valve pulse was dropped with the rest.
    rig.run_base_ticks(40);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveClosed(_))), 0);
}

// ── Host mailbox ──────────────────────────────────────────────

#[test]
fn host_mailbox_requests_are_served_in_order() {
    let mut rig = Rig::with_paa();
    let mut link = HostLink::new();

    link.submit(HostRequest::Write {
        address: address::START_CAMERAS,
        ty: RegisterType::U8,
        payload: RegisterValue::U8(0x01).encode(),
    })
    .unwrap();
    link.submit(HostRequest::Read {
        address: address::START_CAMERAS,
        ty: RegisterType::U8,
    })
    .unwrap();
    link.submit(HostRequest::Read {
        address: 7,
        ty: RegisterType::U8,
    })
    .unwrap();

    assert_eq!(rig.app.serve_host(&mut link, &mut rig.hw, &mut rig.sink), 3);
    assert_eq!(link.take_reply(), Some(HostReply::Ack));
    assert_eq!(link.take_reply(), Some(HostReply::Value(RegisterValue::U8(0x01))));
    assert_eq!(link.take_reply(), Some(HostReply::Error(RegisterError::OutOfRange)));
    assert_eq!(link.take_reply(), None);

    // The start went through the same path a register write takes.
    rig.run_base_ticks(SECOND);
    assert!(rig.hw.calls.contains(&HwCall::StartPwm(CameraId::Cam0, DEFAULT_PWM)));
}

#[test]
fn host_burst_is_spread_over_passes() {
    let mut rig = Rig::with_paa();
    let mut link = HostLink::new();
    for _ in 0..MAILBOX_DEPTH {
        link.submit(HostRequest::Read {
            address: address::IN_STATE,
            ty: RegisterType::U8,
        })
        .unwrap();
    }

    let first = rig.app.serve_host(&mut link, &mut rig.hw, &mut rig.sink);
    assert_eq!(first, MAILBOX_DEPTH.min(HOST_REQUESTS_PER_PASS));
    let rest = rig.app.serve_host(&mut link, &mut rig.hw, &mut rig.sink);
    assert_eq!(first + rest, MAILBOX_DEPTH);
    assert_eq!(rig.app.serve_host(&mut link, &mut rig.hw, &mut rig.sink), 0);
    assert_eq!(link.pending_requests(), 0);
}
