//! The p2o-MIDI pacing worker (`T_midi`).
//!
//! Mirrors `run_p2o_midi`: accumulate ring events into the bulk-out buffer
//! until a forward time jump is seen or the buffer fills, submit, then sleep
//! either for the observed time jump or a `smallest_sleep` polling quantum
//! before checking `p2o_midi_ready` again. Uses polling throughout — no
//! condition variable, matching the spin-lock-guarded flag it waits on.

use std::sync::Arc;
use std::time::Duration;

use ow_midi::MidiEvent;

use crate::consts::{MIDI_OUT_EP, USB_BULK_MIDI_SIZE};
use crate::engine::EngineInner;
use crate::status::EngineStatus;
use crate::usb::transfer::{self, TransferKind};

const EVENT_BYTES: usize = 4;

pub fn run(inner: &Arc<EngineInner>) {
    let ctx = inner.context();
    let Some(p2o_midi) = ctx.p2o_midi.clone() else { return };

    let sample_time_ns = 1.0e9 / inner.device_desc.sample_rate;
    let smallest_sleep = Duration::from_nanos((sample_time_ns * 32.0 / 2.0) as u64);

    let mut pos = 0usize;
    let mut diff = 0.0f64;
    let mut last_time = ctx.now();
    let mut pending: Option<MidiEvent> = None;
    inner.shared.set_p2o_midi_ready(true);

    loop {
        while p2o_midi.read_space() >= 1 && pos < USB_BULK_MIDI_SIZE {
            if pos == 0 {
                // SAFETY: only this thread touches `midi_out` between
                // submissions; the USB event thread only reads its memory
                // while submitting, which it does strictly after this
                // worker clears `p2o_midi_ready` and before it sets it again.
                unsafe { inner.midi_out.as_mut_slice().fill(0) };
                diff = 0.0;
            }

            let event = match pending.take() {
                Some(e) => e,
                None => match p2o_midi.read() {
                    Some(e) => e,
                    None => break,
                },
            };

            if event.time > last_time {
                diff = event.time - last_time;
                last_time = event.time;
                pending = Some(event);
                break;
            }

            // SAFETY: see above.
            unsafe {
                inner.midi_out.as_mut_slice()[pos..pos + EVENT_BYTES].copy_from_slice(&event.bytes);
            }
            pos += EVENT_BYTES;
        }

        if pos > 0 {
            inner.shared.set_p2o_midi_ready(false);
            submit_midi_out(inner);
            pos = 0;
        }

        if diff > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(diff));
        } else {
            std::thread::sleep(smallest_sleep);
        }

        while !inner.shared.p2o_midi_ready() {
            std::thread::sleep(smallest_sleep);
        }

        if inner.shared.status().is_terminal() {
            break;
        }
    }
}

fn submit_midi_out(inner: &Arc<EngineInner>) {
    let user_data = Arc::as_ptr(inner) as *mut std::ffi::c_void;
    unsafe {
        transfer::fill_bulk_transfer(
            inner.usb.transfers.midi_out,
            inner.usb.device_handle,
            MIDI_OUT_EP,
            inner.midi_out.ptr(),
            USB_BULK_MIDI_SIZE as std::os::raw::c_int,
            transfer::callback_for(TransferKind::MidiOut),
            user_data,
        );
        if transfer::submit(inner.usb.transfers.midi_out).is_err() {
            inner.shared.set_status(EngineStatus::Error);
            log::error!("p2o-midi worker: failed to submit midi-out transfer");
        }
    }
}
