//! The audio/o2p-MIDI worker (`T_usb`/`T_audio` in the concurrency model):
//! owns the blocking libusb event call and, by extension, every completion
//! callback that fires from it.
//!
//! Outer-loop shape (§4.4): busy-spin until released from `Ready`, submit
//! the initial transfers, then repeatedly reset latency counters, bring the
//! DLL (if any) up for this pass, drive the inner event loop while status is
//! at least `Wait`, and on falling out of it either exit (status reached
//! `Error`/`Stop`) or resync the p2o ring to a block boundary and loop again.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::consts::{AUDIO_IN_EP, AUDIO_OUT_EP, MIDI_IN_EP};
use crate::engine::EngineInner;
use crate::options::EngineOptions;
use crate::status::EngineStatus;
use crate::usb::transfer::{self, TransferKind};

pub fn run(inner: &Arc<EngineInner>) {
    while inner.shared.status() == EngineStatus::Ready {
        std::hint::spin_loop();
    }
    if inner.shared.status().is_terminal() {
        return;
    }

    if submit_initial_transfers(inner).is_err() {
        inner.shared.set_status(EngineStatus::Error);
        log::error!("audio worker: failed to submit initial transfers");
        return;
    }

    loop {
        inner.shared.reset_latencies();

        let ctx = inner.context();
        match &ctx.dll {
            Some(dll) => {
                dll.init(inner.device_desc.sample_rate, inner.frames_per_transfer_u32(), ctx.now());
                inner.shared.set_status(EngineStatus::Wait);
            }
            None => inner.shared.set_status(EngineStatus::Run),
        }

        while inner.shared.status() >= EngineStatus::Wait {
            inner.usb.handle_events();
        }

        if inner.shared.status().is_terminal() {
            break;
        }

        // Falling below `Wait` without a terminal status means the DLL
        // boot sequence is restarting this pass; resync so the next
        // `Run` doesn't inherit a half-drained p2o ring.
        inner.reading_at_p2o_end.store(false, Ordering::Relaxed);
    }
}

fn submit_initial_transfers(inner: &Arc<EngineInner>) -> Result<(), ()> {
    let user_data = Arc::as_ptr(inner) as *mut std::ffi::c_void;
    let handle = inner.usb.device_handle;

    unsafe {
        transfer::fill_interrupt_transfer(
            inner.usb.transfers.audio_in,
            handle,
            AUDIO_IN_EP,
            inner.data_in.ptr(),
            inner.data_in.len() as std::os::raw::c_int,
            transfer::callback_for(TransferKind::AudioIn),
            user_data,
        );
        if transfer::submit(inner.usb.transfers.audio_in).is_err() {
            return Err(());
        }

        transfer::fill_interrupt_transfer(
            inner.usb.transfers.audio_out,
            handle,
            AUDIO_OUT_EP,
            inner.data_out.ptr(),
            inner.data_out.len() as std::os::raw::c_int,
            transfer::callback_for(TransferKind::AudioOut),
            user_data,
        );
        if transfer::submit(inner.usb.transfers.audio_out).is_err() {
            return Err(());
        }

        if inner.context().options.contains(EngineOptions::O2P_MIDI) {
            transfer::fill_bulk_transfer(
                inner.usb.transfers.midi_in,
                handle,
                MIDI_IN_EP,
                inner.midi_in.ptr(),
                inner.midi_in.len() as std::os::raw::c_int,
                transfer::callback_for(TransferKind::MidiIn),
                user_data,
            );
            if transfer::submit(inner.usb.transfers.midi_in).is_err() {
                return Err(());
            }
        }
    }

    Ok(())
}
