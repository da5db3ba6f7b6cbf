//! One-shot hardware peripheral initialization and raw register helpers.
//!
//! Configures GPIO directions, the LEDC timers/channels that generate the
//! camera triggers, and the motor-cue UART using raw ESP-IDF sys calls.
//! Called once from `main()` before the event loop starts.  On host targets
//! every helper is an in-memory no-op.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::drivers::camera::PwmParams;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
    TimerInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc)   => write!(f, "cue UART init failed (rc={})", rc),
            Self::TimerInitFailed(rc)  => write!(f, "base tick timer failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before event loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_camera_ledc()?;
        init_cue_uart()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    for &pin in &pins::INPUT_GPIOS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: GPIO inputs configured (IN0, IN1)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let strobe = [pins::CUE_STROBE_GPIO];
    for &pin in pins::OUTPUT_GPIOS.iter().chain(strobe.iter()) {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured (valves, OUT0/1, cue strobe)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Camera trigger PWM (LEDC) ────────────────────────────────

pub const LEDC_CH_CAM0: u32 = 0;
pub const LEDC_CH_CAM1: u32 = 1;

#[cfg(target_os = "espidf")]
unsafe fn init_camera_ledc() -> Result<(), HwInitError> {
    let cams = [
        (ledc_timer_t_LEDC_TIMER_0, LEDC_CH_CAM0, pins::CAM0_TRIGGER_GPIO),
        (ledc_timer_t_LEDC_TIMER_1, LEDC_CH_CAM1, pins::CAM1_TRIGGER_GPIO),
    ];

    for (timer, channel, gpio) in cams {
        // Placeholder frequency; each start reprograms the timer.
        let timer_cfg = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: timer,
            duty_resolution: pins::CAM_PWM_RESOLUTION_BITS,
            freq_hz: 100,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        let ret = unsafe { ledc_timer_config(&timer_cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: timer,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

        unsafe {
            ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
            ledc_timer_pause(ledc_mode_t_LEDC_LOW_SPEED_MODE, timer);
        }
    }

    info!("hw_init: LEDC configured (cam0=CH0/T0, cam1=CH1/T1), triggers idle");
    Ok(())
}

/// Program and start one camera trigger.  `channel` doubles as the LEDC
/// timer index.
#[cfg(target_os = "espidf")]
pub fn camera_pwm_start(channel: u32, params: PwmParams) {
    let (freq_hz, duty) = params.ledc_settings();
    // SAFETY: LEDC channels were configured in init_camera_ledc(); only the
    // main loop calls this.
    unsafe {
        let ret = ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, freq_hz);
        if ret != ESP_OK as i32 {
            log::error!("hw_init: LEDC CH{} cannot run at {} Hz (rc={})", channel, freq_hz, ret);
            return;
        }
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
        ledc_timer_rst(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
        ledc_timer_resume(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn camera_pwm_start(_channel: u32, _params: PwmParams) {}

/// Stop one camera trigger with the line held low.
#[cfg(target_os = "espidf")]
pub fn camera_pwm_stop(channel: u32) {
    // SAFETY: see camera_pwm_start().
    unsafe {
        ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
        ledc_timer_pause(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn camera_pwm_stop(_channel: u32) {}

// ── Motor cue UART ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const CUE_UART_PORT: uart_port_t = 1;

#[cfg(target_os = "espidf")]
unsafe fn init_cue_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: crate::config::CUE_UART_BAUD as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { uart_param_config(CUE_UART_PORT, &cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    let ret = unsafe { uart_set_pin(CUE_UART_PORT, pins::CUE_UART_TX_GPIO, -1, -1, -1) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    // TX only: the RX ring is the driver's minimum, no TX ring so writes
    // go straight to the hardware FIFO.
    let ret = unsafe { uart_driver_install(CUE_UART_PORT, 256, 0, 0, core::ptr::null_mut(), 0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    info!("hw_init: cue UART1 configured ({} baud, 8N1, TX only)", crate::config::CUE_UART_BAUD);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn cue_uart_write(byte: u8) {
    // SAFETY: the driver was installed in init_cue_uart(); one byte always
    // fits the FIFO, so this never blocks.
    unsafe {
        uart_write_bytes(CUE_UART_PORT, (&raw const byte).cast(), 1);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn cue_uart_write(_byte: u8) {}
