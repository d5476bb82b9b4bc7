//! Transfer allocation, filling, submission, and the four completion
//! callbacks (`cb_xfr_in`, `cb_xfr_out`, `cb_xfr_in_midi`, `cb_xfr_out_midi`
//! in the device's own naming).
//!
//! `libusb_fill_interrupt_transfer`/`libusb_fill_bulk_transfer` are
//! `static inline` helpers in `libusb.h` and have no linkable symbol in the
//! sys crate, so we populate the `libusb_transfer` fields by hand.

use std::ffi::c_void;
use std::os::raw::c_int;

use libusb1_sys::{constants, libusb_transfer};

use crate::engine::EngineInner;

/// Timeout used on all four transfers: infinite, matching the device's own
/// choice (resubmission discipline, not timeouts, bounds staleness).
const TIMEOUT_INFINITE: std::os::raw::c_uint = 0;

/// Which of the four outstanding transfers a completion callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    AudioIn,
    AudioOut,
    MidiIn,
    MidiOut,
}

/// Allocate a libusb transfer with zero isochronous packets, matching
/// `libusb_alloc_transfer(0)`.
///
/// # Safety
/// The returned pointer must eventually be passed to `libusb_free_transfer`
/// exactly once.
pub unsafe fn alloc_transfer() -> Option<*mut libusb_transfer> {
    let ptr = unsafe { libusb1_sys::libusb_alloc_transfer(0) };
    if ptr.is_null() { None } else { Some(ptr) }
}

/// Populate an interrupt transfer's fields by hand (audio-in/audio-out).
///
/// # Safety
/// `transfer`, `handle`, and `buffer` must all outlive the transfer's next
/// submission, and `buffer`'s length must equal `length`.
pub unsafe fn fill_interrupt_transfer(
    transfer: *mut libusb_transfer,
    handle: *mut libusb1_sys::libusb_device_handle,
    endpoint: u8,
    buffer: *mut u8,
    length: c_int,
    callback: libusb1_sys::libusb_transfer_cb_fn,
    user_data: *mut c_void,
) {
    unsafe {
        let t = &mut *transfer;
        t.dev_handle = handle;
        t.endpoint = endpoint;
        t.transfer_type = constants::LIBUSB_TRANSFER_TYPE_INTERRUPT;
        t.timeout = TIMEOUT_INFINITE;
        t.buffer = buffer;
        t.length = length;
        t.callback = callback;
        t.user_data = user_data;
        t.num_iso_packets = 0;
    }
}

/// Populate a bulk transfer's fields by hand (midi-in/midi-out).
///
/// # Safety
/// Same obligations as [`fill_interrupt_transfer`].
pub unsafe fn fill_bulk_transfer(
    transfer: *mut libusb_transfer,
    handle: *mut libusb1_sys::libusb_device_handle,
    endpoint: u8,
    buffer: *mut u8,
    length: c_int,
    callback: libusb1_sys::libusb_transfer_cb_fn,
    user_data: *mut c_void,
) {
    unsafe {
        let t = &mut *transfer;
        t.dev_handle = handle;
        t.endpoint = endpoint;
        t.transfer_type = constants::LIBUSB_TRANSFER_TYPE_BULK;
        t.timeout = TIMEOUT_INFINITE;
        t.buffer = buffer;
        t.length = length;
        t.callback = callback;
        t.user_data = user_data;
        t.num_iso_packets = 0;
    }
}

/// Submit a previously-filled transfer. A non-zero return sets the engine's
/// status to `Error`, per the transfer-submit-error contract.
///
/// # Safety
/// `transfer` must have been filled by [`fill_interrupt_transfer`] or
/// [`fill_bulk_transfer`] and must not already be in flight.
pub unsafe fn submit(transfer: *mut libusb_transfer) -> Result<(), c_int> {
    let rc = unsafe { libusb1_sys::libusb_submit_transfer(transfer) };
    if rc == 0 { Ok(()) } else { Err(rc) }
}

/// # Safety
/// `xfr` must be a valid, in-flight transfer whose `user_data` points to a
/// live `EngineInner` for the lifetime of the callback invocation (the
/// engine's worker threads must be joined, not merely dropped, before the
/// backing memory is freed — the same informal contract the original
/// engine places on its own `engine` pointer).
pub extern "system" fn cb_xfr_in(xfr: *mut libusb_transfer) {
    unsafe {
        let engine = &*((*xfr).user_data as *const EngineInner);
        if (*xfr).status == constants::LIBUSB_TRANSFER_COMPLETED {
            let payload = std::slice::from_raw_parts((*xfr).buffer, (*xfr).actual_length as usize);
            engine.on_audio_in_complete(payload);
        } else {
            log::error!("o2p: error on USB audio transfer: {:?}", (*xfr).status);
        }
        if submit(xfr).is_err() {
            engine.shared.set_status(crate::status::EngineStatus::Error);
            log::error!("could not resubmit audio-in transfer");
        }
    }
}

/// # Safety
/// Same obligations as [`cb_xfr_in`].
pub extern "system" fn cb_xfr_out(xfr: *mut libusb_transfer) {
    unsafe {
        let engine = &*((*xfr).user_data as *const EngineInner);
        if (*xfr).status != constants::LIBUSB_TRANSFER_COMPLETED {
            log::error!("audio-out transfer error: {:?}", (*xfr).status);
        }
        let buffer = std::slice::from_raw_parts_mut((*xfr).buffer, (*xfr).length as usize);
        engine.on_audio_out_fill(buffer);
        // Resubmission happens strictly after the fill handler returns, to
        // avoid a documented race on slower hosts.
        if submit(xfr).is_err() {
            engine.shared.set_status(crate::status::EngineStatus::Error);
            log::error!("could not resubmit audio-out transfer");
        }
    }
}

/// # Safety
/// Same obligations as [`cb_xfr_in`].
pub extern "system" fn cb_xfr_in_midi(xfr: *mut libusb_transfer) {
    unsafe {
        let engine = &*((*xfr).user_data as *const EngineInner);
        if (*xfr).status == constants::LIBUSB_TRANSFER_COMPLETED {
            if engine.shared.status() >= crate::status::EngineStatus::Run {
                let payload = std::slice::from_raw_parts((*xfr).buffer, (*xfr).actual_length as usize);
                engine.on_midi_in_complete(payload);
            }
        } else if (*xfr).status != constants::LIBUSB_TRANSFER_TIMED_OUT {
            log::error!("o2p: error on USB MIDI transfer: {:?}", (*xfr).status);
        }
        // Resubmitted unconditionally, even on the early-exit path above —
        // this asymmetry with audio-out is deliberate, not a bug to normalize.
        if submit(xfr).is_err() {
            engine.shared.set_status(crate::status::EngineStatus::Error);
            log::error!("could not resubmit midi-in transfer");
        }
    }
}

/// # Safety
/// Same obligations as [`cb_xfr_in`].
pub extern "system" fn cb_xfr_out_midi(xfr: *mut libusb_transfer) {
    unsafe {
        let engine = &*((*xfr).user_data as *const EngineInner);
        if (*xfr).status != constants::LIBUSB_TRANSFER_COMPLETED {
            log::error!("midi-out transfer error: {:?}", (*xfr).status);
        }
        // No resubmission here: the p2o-MIDI pacing thread triggers the next
        // bulk-out once it observes `p2o_midi_ready`.
        engine.shared.set_p2o_midi_ready(true);
    }
}

/// Resolve the native callback function pointer for a given transfer kind.
pub fn callback_for(kind: TransferKind) -> libusb1_sys::libusb_transfer_cb_fn {
    match kind {
        TransferKind::AudioIn => cb_xfr_in,
        TransferKind::AudioOut => cb_xfr_out,
        TransferKind::MidiIn => cb_xfr_in_midi,
        TransferKind::MidiOut => cb_xfr_out_midi,
    }
}

/// # Safety
/// `transfer` must be a pointer previously returned by [`alloc_transfer`]
/// and not currently in flight.
pub unsafe fn free_transfer(transfer: *mut libusb_transfer) {
    unsafe { libusb1_sys::libusb_free_transfer(transfer) };
}
