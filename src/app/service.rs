//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the [`DeviceState`] and runs every tick handler and
//! register effect against it.  All I/O flows through port traits injected
//! at call sites, so the whole control loop is testable with mock adapters.
//!
//! ```text
//!  OpticalPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!    InputPort ──▶ │        AppService        │
//! ActuatorPort ◀── │ optics · cue · valves ·  │
//!                  │ cameras · registers      │
//!                  └──────────────────────────┘
//! ```
//!
//! Within one instant the scheduler calls `new_second`, `tick_500us`, then
//! `tick_1ms`.  Host requests run on the same loop between ticks.

use log::{debug, error, info, warn};

use crate::config::DeviceConfig;
use crate::control::motor_cue::{self, SignalSelect};
use crate::drivers::camera::CameraId;
use crate::drivers::valve::ValveId;
use crate::error::{RegisterError, Result, SensorError};
use crate::registers::{
    self, cam_bits, in_bits, out_bits, Driven, Handler, Live, Plain, RegisterType, RegisterValue, Setting,
};
use crate::sensors::{self, MotionSample, OpticalImage, SensorBinding, SensorKind};

use super::commands::{HostReply, HostRequest};
use super::events::AppEvent;
use super::ports::{ActuatorPort, DevicePort, EventSink, HostPort, InputPort, OpticalPort, TickDelegate};
use super::state::DeviceState;

/// Longest valve pulse the host may configure (ms).
const MAX_VALVE_PULSE_MS: u16 = 32_767;

/// Host requests served per main-loop pass, so a burst cannot starve the
/// tick queue.
pub const HOST_REQUESTS_PER_PASS: usize = 8;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: DeviceConfig,
    state: DeviceState,
    optical_cycles: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let state = DeviceState::new(&config)?;
        Ok(Self {
            config,
            state,
            optical_cycles: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bind the optical sensors and drive every output to its idle level.
    pub fn start(&mut self, hw: &mut impl DevicePort, sink: &mut impl EventSink) {
        self.state.bindings = sensors::probe_and_bind(hw);
        self.apply_idle_outputs(hw);
        sink.emit(&AppEvent::Started(self.state.bindings));
        info!(
            "AppService started: flow0={:?} flow1={:?}, optical divider {}",
            self.state.bindings[0],
            self.state.bindings[1],
            self.state.optical.divider()
        );
    }

    // ── Tick handlers ─────────────────────────────────────────

    /// 1 s boundary: realign sampling, finish pending stops, arm starts.
    pub fn new_second(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.state.optical.align_to_second();

        for id in CameraId::ALL {
            if self.state.cameras[id as usize].finalize_stop() {
                hw.stop_camera_pwm(id);
                info!("{:?}: trigger stopped", id);
                sink.emit(&AppEvent::CameraStopped(id));
            }
        }
        for id in CameraId::ALL {
            if let Some(params) = self.state.cameras[id as usize].arm_start() {
                hw.start_camera_pwm(id, params);
                info!("{:?}: trigger started ({:?})", id, params);
                sink.emit(&AppEvent::CameraStarted(id));
            }
        }
    }

    /// 500 µs tick: valve countdowns.
    pub fn tick_500us(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let closed = self.state.valves.tick();
        if closed == 0 {
            return;
        }
        hw.write_outputs(self.state.output_mask());
        for valve in ValveId::ALL {
            if closed & valve.mask() != 0 {
                sink.emit(&AppEvent::ValveClosed(valve));
            }
        }
    }

    /// 1 ms tick: optical sampling when due, then camera stop observation.
    pub fn tick_1ms(&mut self, hw: &mut (impl OpticalPort + ActuatorPort), sink: &mut impl EventSink) {
        if self.state.optical.tick() {
            self.sample_optical(hw, sink);
        }

        for id in CameraId::ALL {
            if self.state.cameras[id as usize].observe_stop() {
                info!("{:?}: stop requested, trigger ends at next second", id);
                sink.emit(&AppEvent::CameraStopPending(id));
            }
        }
    }

    /// One optical cycle: read, publish, drive the cue, raise the event.
    fn sample_optical(&mut self, hw: &mut (impl OpticalPort + ActuatorPort), sink: &mut impl EventSink) {
        let samples = match self.sampling_kind() {
            Ok(kind) => hw.read_motion(kind),
            Err(e) => {
                debug!("optical: {}", e);
                [MotionSample::default(); 2]
            }
        };

        let image = OpticalImage::assemble(samples[0], samples[1]);
        self.state.image = image;
        self.optical_cycles = self.optical_cycles.wrapping_add(1);

        let cue = motor_cue::compute(&image, &self.state.motor_cue);
        if let Some(cue) = cue {
            hw.write_cue_byte(cue.wire_byte());
            hw.arm_cue_strobe();
        }

        debug!("optical: {:?} cue={:?}", image.fields(), cue);
        sink.emit(&AppEvent::OpticalSample { image, cue });
    }

    /// Both slots are read with the driver bound to flow0.
    fn sampling_kind(&self) -> core::result::Result<SensorKind, SensorError> {
        self.state.bindings[0].kind().ok_or(SensorError::BindingAbsent)
    }

    // ── Host requests ─────────────────────────────────────────

    /// Drain up to [`HOST_REQUESTS_PER_PASS`] requests from the host port,
    /// replying to each in order.  Returns how many were served.
    pub fn serve_host(
        &mut self,
        host: &mut impl HostPort,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut served = 0;
        while served < HOST_REQUESTS_PER_PASS {
            let Some(request) = host.poll_request() else {
                break;
            };
            let reply = self.handle_request(&request, hw, sink);
            host.reply(reply);
            served += 1;
        }
        served
    }

    /// Dispatch one host request.
    pub fn handle_request(
        &mut self,
        request: &HostRequest,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) -> HostReply {
        match request {
            HostRequest::Read { address, ty } => self.read_register(*address, *ty, hw).into(),
            HostRequest::Write { address, ty, payload } => {
                self.write_register(*address, *ty, payload, hw, sink).into()
            }
            HostRequest::ResetRegisters => {
                self.reset_registers(hw, sink);
                HostReply::Ack
            }
        }
    }

    /// Read one application register.
    pub fn read_register(
        &mut self,
        address: u8,
        ty: RegisterType,
        hw: &mut impl InputPort,
    ) -> core::result::Result<RegisterValue, RegisterError> {
        let spec = registers::check_read(address, ty)?;
        Ok(match spec.handler {
            Handler::PlainCopy(field) => self.read_plain(field),
            Handler::ValidatedWrite(setting) => self.read_setting(setting),
            Handler::ComputedRead(driven) => self.read_driven(driven),
            Handler::ReadOnly(live) => self.read_live(live, hw),
        })
    }

    /// Write one application register from its raw payload.
    ///
    /// Structural errors are detected before any effect runs.  A refusal
    /// from the effect itself is reported as `WriteRejected` and raised as
    /// an event.
    pub fn write_register(
        &mut self,
        address: u8,
        ty: RegisterType,
        bytes: &[u8],
        hw: &mut (impl ActuatorPort + InputPort),
        sink: &mut impl EventSink,
    ) -> core::result::Result<(), RegisterError> {
        let spec = registers::check_write(address, ty, bytes)?;

        let result = match spec.handler {
            Handler::ReadOnly(_) => Err(RegisterError::WriteRejected),
            Handler::PlainCopy(field) => {
                let value = RegisterValue::decode(spec, bytes)?;
                self.write_plain(field, value)
            }
            Handler::ValidatedWrite(setting) => {
                let value = RegisterValue::decode(spec, bytes)?;
                self.write_setting(setting, value, hw)
            }
            Handler::ComputedRead(driven) => {
                let value = RegisterValue::decode(spec, bytes)?;
                self.write_driven(driven, value, hw)
            }
        };

        if let Err(error) = result {
            warn!("register {} ({}): {}", spec.name, address, error);
            sink.emit(&AppEvent::WriteRejected { address, error });
        }
        result
    }

    /// Restore every register default and re-apply its hardware effect.
    pub fn reset_registers(&mut self, hw: &mut (impl ActuatorPort + InputPort), sink: &mut impl EventSink) {
        self.state.restore_defaults(&self.config);
        self.apply_idle_outputs(hw);
        info!("registers reset to defaults");
        sink.emit(&AppEvent::RegistersReset);
    }

    /// Unrecoverable condition reported by the core runtime: drive every
    /// actuator to its safe level.
    pub fn catastrophic_error(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        error!("catastrophic error: forcing safe state");
        self.state.valves.close_all();
        self.state.outputs = 0;
        for id in CameraId::ALL {
            self.state.cameras[id as usize].reset();
            hw.stop_camera_pwm(id);
        }
        hw.write_outputs(0);
        sink.emit(&AppEvent::SafeState);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn bindings(&self) -> [SensorBinding; 2] {
        self.state.bindings
    }

    pub fn image(&self) -> OpticalImage {
        self.state.image
    }

    /// Optical cycles run since startup.
    pub fn optical_cycles(&self) -> u64 {
        self.optical_cycles
    }

    // ── Register effects ──────────────────────────────────────

    fn read_plain(&self, field: Plain) -> RegisterValue {
        let cue = &self.state.motor_cue;
        match field {
            Plain::MinPulseInterval => RegisterValue::S16(cue.min_pulse_interval),
            Plain::MaxPulseInterval => RegisterValue::S16(cue.max_pulse_interval),
        }
    }

    fn write_plain(&mut self, field: Plain, value: RegisterValue) -> core::result::Result<(), RegisterError> {
        let v = value.as_i16().ok_or(RegisterError::TypeMismatch)?;
        let cue = &mut self.state.motor_cue;
        match field {
            Plain::MinPulseInterval => cue.min_pulse_interval = v,
            Plain::MaxPulseInterval => cue.max_pulse_interval = v,
        }
        Ok(())
    }

    fn read_setting(&self, setting: Setting) -> RegisterValue {
        let s = &self.state;
        match setting {
            Setting::TriggerFrequency(cam) => RegisterValue::U16(s.cameras[cam as usize].frequency_hz()),
            Setting::TriggerDuration(cam) => RegisterValue::U16(s.cameras[cam as usize].duration_us()),
            Setting::StartCameras => RegisterValue::U8(s.latch.start_cameras),
            Setting::StopCameras => RegisterValue::U8(s.latch.stop_cameras),
            Setting::ValvePulse(valve) => RegisterValue::U16(s.valve_pulse_ms[valve as usize]),
            Setting::OutSet => RegisterValue::U8(s.latch.out_set),
            Setting::OutClear => RegisterValue::U8(s.latch.out_clear),
            Setting::OutToggle => RegisterValue::U8(s.latch.out_toggle),
            Setting::SignalSelect => RegisterValue::U8(s.motor_cue.signal_select as u8),
            Setting::SignalGain => RegisterValue::Float(s.motor_cue.gain),
            Setting::ZeroThreshold => RegisterValue::Float(s.motor_cue.zero_threshold),
        }
    }

    fn write_setting(
        &mut self,
        setting: Setting,
        value: RegisterValue,
        hw: &mut impl ActuatorPort,
    ) -> core::result::Result<(), RegisterError> {
        let u8_value = || value.as_u8().ok_or(RegisterError::TypeMismatch);
        let u16_value = || value.as_u16().ok_or(RegisterError::TypeMismatch);
        let f32_value = || value.as_f32().ok_or(RegisterError::TypeMismatch);

        match setting {
            Setting::TriggerFrequency(cam) => accept(self.state.cameras[cam as usize].set_frequency(u16_value()?)),
            Setting::TriggerDuration(cam) => accept(self.state.cameras[cam as usize].set_duration(u16_value()?)),
            Setting::StartCameras => {
                let mask = u8_value()?;
                self.state.latch.start_cameras = mask;
                for id in CameraId::ALL {
                    if mask & cam_bits::ALL & id.mask() != 0 {
                        self.state.cameras[id as usize].request_start();
                    }
                }
                Ok(())
            }
            Setting::StopCameras => {
                let mask = u8_value()?;
                self.state.latch.stop_cameras = mask;
                for id in CameraId::ALL {
                    if mask & cam_bits::ALL & id.mask() != 0 {
                        self.state.cameras[id as usize].request_stop();
                    }
                }
                Ok(())
            }
            Setting::ValvePulse(valve) => {
                let ms = u16_value()?;
                if !(1..=MAX_VALVE_PULSE_MS).contains(&ms) {
                    return Err(RegisterError::WriteRejected);
                }
                self.state.valve_pulse_ms[valve as usize] = ms;
                Ok(())
            }
            Setting::OutSet => {
                let mask = u8_value()?;
                self.state.latch.out_set = mask;
                self.set_outputs(mask);
                hw.write_outputs(self.state.output_mask());
                Ok(())
            }
            Setting::OutClear => {
                let mask = u8_value()?;
                self.state.latch.out_clear = mask;
                self.clear_outputs(mask);
                hw.write_outputs(self.state.output_mask());
                Ok(())
            }
            Setting::OutToggle => {
                let mask = u8_value()? & out_bits::ALL;
                self.state.latch.out_toggle = mask;
                let current = self.state.output_mask();
                self.clear_outputs(mask & current);
                self.set_outputs(mask & !current);
                hw.write_outputs(self.state.output_mask());
                Ok(())
            }
            Setting::SignalSelect => {
                let select = SignalSelect::from_u8(u8_value()?).ok_or(RegisterError::WriteRejected)?;
                self.state.motor_cue.signal_select = select;
                Ok(())
            }
            Setting::SignalGain => {
                self.state.motor_cue.gain = not_nan(f32_value()?)?;
                Ok(())
            }
            Setting::ZeroThreshold => {
                self.state.motor_cue.zero_threshold = not_nan(f32_value()?)?;
                Ok(())
            }
        }
    }

    fn read_driven(&self, driven: Driven) -> RegisterValue {
        match driven {
            Driven::OutputMask => RegisterValue::U8(self.state.output_mask()),
        }
    }

    fn write_driven(
        &mut self,
        driven: Driven,
        value: RegisterValue,
        hw: &mut impl ActuatorPort,
    ) -> core::result::Result<(), RegisterError> {
        match driven {
            Driven::OutputMask => {
                let mask = value.as_u8().ok_or(RegisterError::TypeMismatch)?;
                self.clear_outputs(out_bits::ALL & !mask);
                self.set_outputs(mask);
                hw.write_outputs(self.state.output_mask());
                Ok(())
            }
        }
    }

    fn read_live(&mut self, live: Live, hw: &mut impl InputPort) -> RegisterValue {
        let s = &mut self.state;
        match live {
            Live::CamerasState => RegisterValue::U8(s.cameras_state()),
            Live::InState => {
                s.in_state = hw.read_inputs() & in_bits::ALL;
                RegisterValue::U8(s.in_state)
            }
            Live::OpticalTracking => RegisterValue::S16x6(*s.image.fields()),
        }
    }

    // ── Outputs ───────────────────────────────────────────────

    /// Assert bits.  Valve bits start a pulse of the configured length.
    fn set_outputs(&mut self, mask: u8) {
        self.state.outputs |= mask & out_bits::ALL & !out_bits::VALVES;
        for valve in ValveId::ALL {
            if mask & valve.mask() != 0 {
                let ms = self.state.valve_pulse_ms[valve as usize];
                self.state.valves.trigger(valve, ms);
            }
        }
    }

    /// Deassert bits.  Valve bits cancel a running pulse.
    fn clear_outputs(&mut self, mask: u8) {
        self.state.outputs &= !mask;
        for valve in ValveId::ALL {
            if mask & valve.mask() != 0 {
                self.state.valves.cancel(valve);
            }
        }
    }

    /// Push the current (idle) state to hardware: outputs, camera PWM off,
    /// fresh input snapshot.
    fn apply_idle_outputs(&mut self, hw: &mut (impl ActuatorPort + InputPort)) {
        for id in CameraId::ALL {
            hw.stop_camera_pwm(id);
        }
        hw.write_outputs(self.state.output_mask());
        self.state.in_state = hw.read_inputs() & in_bits::ALL;
    }
}

fn accept(ok: bool) -> core::result::Result<(), RegisterError> {
    if ok { Ok(()) } else { Err(RegisterError::WriteRejected) }
}

fn not_nan(v: f32) -> core::result::Result<f32, RegisterError> {
    if v.is_nan() { Err(RegisterError::WriteRejected) } else { Ok(v) }
}

// ───────────────────────────────────────────────────────────────
// Tick delegate binding
// ───────────────────────────────────────────────────────────────

/// Binds the service to its adapters for one scheduler pass.
pub struct TickContext<'a, H, S> {
    pub app: &'a mut AppService,
    pub hw: &'a mut H,
    pub sink: &'a mut S,
}

impl<H: DevicePort, S: EventSink> TickDelegate for TickContext<'_, H, S> {
    fn new_second(&mut self) {
        self.app.new_second(self.hw, self.sink);
    }

    fn tick_500us(&mut self) {
        self.app.tick_500us(self.hw, self.sink);
    }

    fn tick_1ms(&mut self) {
        self.app.tick_1ms(self.hw, self.sink);
    }
}
