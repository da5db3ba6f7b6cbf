//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! - A 500 µs periodic timer pushes [`Event::BaseTick`] into the lock-free
//!   SPSC queue; the scheduler derives every other cadence from it.
//! - A 100 µs one-shot paces the motor-cue strobe and pushes
//!   [`Event::CueStrobeExpired`] when it runs out.
//!
//! Callbacks execute in the ESP timer task context (not ISR), so they can
//! safely call push_event() which uses atomics only.  On host targets the
//! main loop feeds the queue itself.

use crate::drivers::hw_init::HwInitError;
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut BASE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut CUE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: BASE_TIMER is written once in `start_timers()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn base_timer() -> esp_timer_handle_t { unsafe { BASE_TIMER } }

/// SAFETY: Same invariants as `base_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn cue_timer() -> esp_timer_handle_t { unsafe { CUE_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn base_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::BaseTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn cue_strobe_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::CueStrobeExpired);
}

/// Create both timers and start the 500 µs base tick.
///
/// A cue timer failure only disables the strobe; without the base tick
/// nothing runs, so that failure is returned.
#[cfg(target_os = "espidf")]
pub fn start_timers() -> Result<(), HwInitError> {
    // SAFETY: BASE_TIMER and CUE_TIMER are written here once at boot
    // from the single main-task context before any timer callbacks fire.
    // The callbacks themselves only call push_event(), which is lock-free.
    unsafe {
        let cue_args = esp_timer_create_args_t {
            callback: Some(cue_strobe_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"cue\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&cue_args, &raw mut CUE_TIMER);
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: cue timer create failed (rc={}); cue strobe disabled", ret);
        }

        let base_args = esp_timer_create_args_t {
            callback: Some(base_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"base\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&base_args, &raw mut BASE_TIMER);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerInitFailed(ret));
        }
        let ret = esp_timer_start_periodic(base_timer(), u64::from(crate::config::BASE_TICK_US));
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerInitFailed(ret));
        }

        info!("hw_timer: base tick @{} µs started", crate::config::BASE_TICK_US);
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers() -> Result<(), HwInitError> {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
    Ok(())
}

/// Arm the cue strobe one-shot.  Re-arming restarts it.
#[cfg(target_os = "espidf")]
pub fn arm_cue_oneshot() {
    // SAFETY: cue_timer() contract, main task only; null-check covers a
    // failed create.
    unsafe {
        let t = cue_timer();
        if t.is_null() {
            return;
        }
        esp_timer_stop(t);
        esp_timer_start_once(t, crate::config::CUE_STROBE_US);
    }
}

/// Host targets have no one-shot: the strobe expires immediately.
#[cfg(not(target_os = "espidf"))]
pub fn arm_cue_oneshot() {
    push_event(Event::CueStrobeExpired);
}

/// Stop all hardware timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; null-check
    // prevents stopping a timer that was never created.
    unsafe {
        let bt = base_timer();
        if !bt.is_null() { esp_timer_stop(bt); }
        let ct = cue_timer();
        if !ct.is_null() { esp_timer_stop(ct); }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
