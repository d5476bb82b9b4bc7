//! Engine construction, activation, and shutdown.
//!
//! Two construction entry points, matching `ow_engine_init_from_libusb_device_descriptor`
//! and `ow_engine_init_from_bus_address`; `activate` validates the host
//! [`Context`] against the requested [`EngineOptions`] and spawns the
//! worker threads that own everything past this point.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use crate::codec;
use crate::consts::FRAMES_PER_BLOCK;
use crate::context::Context;
use crate::device::{BusAddress, DeviceDescriptor};
use crate::error::Result;
use crate::options::EngineOptions;
use crate::shared::Shared;
use crate::single_writer::SingleWriter;
use crate::status::EngineStatus;
use crate::usb::UsbSession;
use crate::worker;

/// A block of memory libusb DMAs directly into/out of; its address is
/// handed to `libusb_fill_*_transfer` once at initialization and must stay
/// fixed for the transfer's lifetime, so the backing `Vec` is never resized
/// after construction.
pub(crate) struct WireBuffer {
    storage: Vec<u8>,
    ptr: *mut u8,
}

// SAFETY: `ptr` aliases `storage`'s own heap allocation, which is never
// reallocated (no push/resize) after construction, and `storage` itself is
// never read or written directly again — all access goes through `ptr` from
// inside the completion callback that owns this buffer for a given cycle.
unsafe impl Send for WireBuffer {}
unsafe impl Sync for WireBuffer {}

impl WireBuffer {
    fn zeroed(len: usize) -> Self {
        let mut storage = vec![0u8; len];
        let ptr = storage.as_mut_ptr();
        Self { storage, ptr }
    }

    pub(crate) fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.storage.len()
    }

    /// # Safety
    /// The caller must uphold whatever single-writer discipline applies to
    /// this particular buffer (see the field doc comments on [`EngineInner`]).
    pub(crate) unsafe fn as_mut_slice(&self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.storage.len()) }
    }
}

/// All state reachable from a transfer completion callback. Lives behind an
/// `Arc` so the raw `user_data` pointer handed to libusb can be reconstituted
/// safely as long as the engine (and its worker threads) are still alive.
pub struct EngineInner {
    pub(crate) device_desc: DeviceDescriptor,
    pub(crate) usb: UsbSession,
    pub(crate) shared: Shared,
    pub(crate) context: OnceLock<Context>,

    pub(crate) blocks_per_transfer: usize,
    pub(crate) frames_per_transfer: usize,
    pub(crate) p2o_frame_size: usize,
    pub(crate) o2p_frame_size: usize,
    pub(crate) p2o_transfer_size: usize,
    pub(crate) o2p_transfer_size: usize,

    /// Running frame counter echoed into each outgoing block header. Only
    /// the audio-out completion callback advances it.
    pub(crate) usb_frames: AtomicU16,
    /// Set once the host ring has accumulated a full transfer's worth of
    /// p2o samples and been drained to that edge; cleared when p2o audio
    /// is disabled.
    pub(crate) reading_at_p2o_end: AtomicBool,

    /// Mutated only by the audio-in completion callback.
    pub(crate) o2p_transfer_buf: SingleWriter<Vec<f32>>,
    /// Mutated only by the audio-out completion callback.
    pub(crate) p2o_transfer_buf: SingleWriter<Vec<f32>>,
    /// Scratch input to the one-shot resampler; mutated only by the
    /// audio-out completion callback.
    pub(crate) p2o_resampler_buf: SingleWriter<Vec<f32>>,

    pub(crate) data_in: WireBuffer,
    pub(crate) data_out: WireBuffer,
    pub(crate) midi_in: WireBuffer,
    /// Mutated by the p2o-MIDI pacing thread; read by the USB event thread
    /// only while submitting the bulk-out transfer, which never overlaps
    /// with the pacing thread's next write (it waits on `p2o_midi_ready`
    /// first).
    pub(crate) midi_out: WireBuffer,
}

impl EngineInner {
    pub(crate) fn frames_per_transfer_u32(&self) -> u32 {
        self.frames_per_transfer as u32
    }

    pub(crate) fn context(&self) -> &Context {
        self.context.get().expect("context set at activate")
    }

    /// Audio-in completion handler (§4.4 "Input-callback processing").
    pub(crate) fn on_audio_in_complete(&self, usb_in: &[u8]) {
        let ctx = self.context();
        if let Some(dll) = &ctx.dll {
            dll.inc(self.frames_per_transfer_u32(), ctx.now());
        }
        let status = self.shared.status();

        codec::debug_dump_blocks(usb_in, &self.device_desc, self.blocks_per_transfer);
        // SAFETY: only this callback touches `o2p_transfer_buf`.
        unsafe {
            self.o2p_transfer_buf.with_mut(|buf| {
                codec::decode_input(usb_in, buf, &self.device_desc, self.blocks_per_transfer);
            });
        }

        if status < EngineStatus::Run {
            // DLL still warming up; don't pollute the ring.
            return;
        }

        let Some(o2p_audio) = &ctx.o2p_audio else { return };
        let read_space = o2p_audio.read_space();
        self.shared.record_o2p_latency(read_space);

        let write_space = o2p_audio.write_space();
        if write_space >= self.o2p_transfer_size {
            // SAFETY: exclusive to this callback.
            let wrote = unsafe {
                self.o2p_transfer_buf.with_mut(|buf| {
                    let bytes = f32_slice_to_ne_bytes(buf);
                    o2p_audio.write(&bytes)
                })
            };
            debug_assert_eq!(wrote, self.o2p_transfer_size);
        } else {
            log::error!("o2p: audio ring buffer overflow, discarding data");
        }
    }

    /// Audio-out completion handler (§4.4 "Output-callback processing").
    /// `usb_out` is the raw transfer buffer the caller is about to submit.
    pub(crate) fn on_audio_out_fill(&self, usb_out: &mut [u8]) {
        let ctx = self.context();
        let base_frame = self.usb_frames.load(Ordering::Relaxed);

        let p2o_audio = match ctx.options.contains(EngineOptions::P2O_AUDIO) {
            true => ctx.p2o_audio.as_ref(),
            false => None,
        };

        let Some(p2o_audio) = p2o_audio else {
            self.reading_at_p2o_end.store(false, Ordering::Relaxed);
            // SAFETY: exclusive to this callback.
            let next = unsafe {
                self.p2o_transfer_buf.with_mut(|buf| {
                    buf.iter_mut().for_each(|s| *s = 0.0);
                    codec::encode_output(buf, usb_out, &self.device_desc, self.blocks_per_transfer, base_frame)
                })
            };
            self.usb_frames.store(next, Ordering::Relaxed);
            return;
        };

        if !self.reading_at_p2o_end.load(Ordering::Relaxed) {
            if p2o_audio.read_space() >= self.p2o_transfer_size {
                let frame_bytes = self.p2o_frame_size;
                let aligned = (p2o_audio.read_space() / frame_bytes) * frame_bytes;
                p2o_audio.read(None, aligned);
                self.reading_at_p2o_end.store(true, Ordering::Relaxed);
            }
            // SAFETY: exclusive to this callback.
            let next = unsafe {
                self.p2o_transfer_buf.with_mut(|buf| {
                    codec::encode_output(buf, usb_out, &self.device_desc, self.blocks_per_transfer, base_frame)
                })
            };
            self.usb_frames.store(next, Ordering::Relaxed);
            return;
        }

        let read_space = p2o_audio.read_space();
        self.shared.record_p2o_latency(read_space);

        let next = if read_space >= self.p2o_transfer_size {
            let mut bytes = vec![0u8; self.p2o_transfer_size];
            p2o_audio.read(Some(&mut bytes), self.p2o_transfer_size);
            // SAFETY: exclusive to this callback.
            unsafe {
                self.p2o_transfer_buf.with_mut(|buf| {
                    ne_bytes_to_f32_slice(&bytes, buf);
                    codec::encode_output(buf, usb_out, &self.device_desc, self.blocks_per_transfer, base_frame)
                })
            }
        } else {
            let frames = read_space / self.p2o_frame_size;
            let channels = self.device_desc.inputs;
            let partial_bytes = frames * self.p2o_frame_size;
            let mut raw = vec![0u8; partial_bytes];
            p2o_audio.read(Some(&mut raw), partial_bytes);

            // SAFETY: exclusive to this callback.
            unsafe {
                self.p2o_resampler_buf.with_mut(|resampler_buf| {
                    ne_bytes_to_f32_slice(&raw, &mut resampler_buf[..frames * channels]);
                    let resampled = crate::resample::one_shot_resample(
                        &resampler_buf[..frames * channels],
                        frames,
                        channels,
                        self.frames_per_transfer,
                    );
                    self.p2o_transfer_buf.with_mut(|buf| {
                        buf.copy_from_slice(&resampled);
                        codec::encode_output(buf, usb_out, &self.device_desc, self.blocks_per_transfer, base_frame)
                    })
                })
            }
        };
        self.usb_frames.store(next, Ordering::Relaxed);
    }

    /// MIDI-in completion handler (§4.2 midi-in callback).
    pub(crate) fn on_midi_in_complete(&self, payload: &[u8]) {
        let ctx = self.context();
        let Some(o2p_midi) = &ctx.o2p_midi else { return };
        let now = ctx.now();
        for event in ow_midi::scan_midi_in_payload(payload, now) {
            if !o2p_midi.write(event) {
                log::error!("o2p: MIDI ring buffer overflow, discarding data");
            }
        }
    }
}

/// Host audio rings carry raw native-endian float bytes — a plain `memcpy`
/// of the scratch buffer on the original side, not a wire encoding. Only the
/// USB block codec in [`codec`] deals in big-endian words.
fn f32_slice_to_ne_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        out.extend_from_slice(&s.to_ne_bytes());
    }
    out
}

fn ne_bytes_to_f32_slice(bytes: &[u8], out: &mut [f32]) {
    for (chunk, slot) in bytes.chunks_exact(4).zip(out.iter_mut()) {
        *slot = f32::from_ne_bytes(chunk.try_into().unwrap());
    }
}

/// The public engine handle: construction, activation, status queries, and
/// coordinated shutdown.
pub struct Engine {
    inner: Arc<EngineInner>,
    audio_thread: Option<JoinHandle<()>>,
    p2o_midi_thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Build an engine from an already-open OS file descriptor, used when
    /// another process owns device enumeration.
    pub fn from_raw_fd(fd: c_int, device_desc: DeviceDescriptor, blocks_per_transfer: usize) -> Result<Self> {
        let usb = UsbSession::from_raw_fd(fd)?;
        Self::from_session(usb, device_desc, blocks_per_transfer)
    }

    /// Build an engine by enumerating and opening the device at `bus_address`.
    pub fn from_bus_address(
        bus_address: BusAddress,
        device_desc: DeviceDescriptor,
        blocks_per_transfer: usize,
    ) -> Result<Self> {
        let usb = UsbSession::from_bus_address(bus_address)?;
        Self::from_session(usb, device_desc, blocks_per_transfer)
    }

    fn from_session(usb: UsbSession, device_desc: DeviceDescriptor, blocks_per_transfer: usize) -> Result<Self> {
        let frames_per_transfer = blocks_per_transfer * FRAMES_PER_BLOCK as usize;
        let p2o_frame_size = codec::BYTES_PER_SAMPLE * device_desc.inputs;
        let o2p_frame_size = codec::BYTES_PER_SAMPLE * device_desc.outputs;
        let p2o_transfer_size = frames_per_transfer * p2o_frame_size;
        let o2p_transfer_size = frames_per_transfer * o2p_frame_size;

        let data_in_len = codec::input_block_len(&device_desc) * blocks_per_transfer;
        let data_out_len = codec::output_block_len(&device_desc) * blocks_per_transfer;
        let inputs = device_desc.inputs;
        let outputs = device_desc.outputs;

        let data_out = WireBuffer::zeroed(data_out_len);
        unsafe {
            codec::stamp_headers(data_out.as_mut_slice(), &device_desc, blocks_per_transfer);
        }

        let inner = Arc::new(EngineInner {
            device_desc,
            usb,
            shared: Shared::new(EngineStatus::Stop),
            context: OnceLock::new(),
            blocks_per_transfer,
            frames_per_transfer,
            p2o_frame_size,
            o2p_frame_size,
            p2o_transfer_size,
            o2p_transfer_size,
            usb_frames: AtomicU16::new(0),
            reading_at_p2o_end: AtomicBool::new(false),
            o2p_transfer_buf: SingleWriter::new(vec![0.0; frames_per_transfer * outputs]),
            p2o_transfer_buf: SingleWriter::new(vec![0.0; frames_per_transfer * inputs]),
            p2o_resampler_buf: SingleWriter::new(vec![0.0; frames_per_transfer * inputs]),
            data_in: WireBuffer::zeroed(data_in_len),
            data_out,
            midi_in: WireBuffer::zeroed(crate::consts::USB_BULK_MIDI_SIZE),
            midi_out: WireBuffer::zeroed(crate::consts::USB_BULK_MIDI_SIZE),
        });

        Ok(Self { inner, audio_thread: None, p2o_midi_thread: None })
    }

    /// Validate `context` against the engine's requested options, spawn the
    /// worker threads the options call for, and raise them to the
    /// configured realtime priority.
    pub fn activate(&mut self, context: Context) -> Result<()> {
        context.validate()?;

        let options = context.options;
        // With the DLL option, the worker waits in `Ready` for an external
        // `boot()` call. Without it, there's no boot gate to wait on — the
        // worker must fall straight through to its outer loop and reach
        // `Run` on its own, so the initial status must not be `Stop` (which
        // `is_terminal()` would make it exit before submitting a transfer).
        let initial_status = if options.contains(EngineOptions::DLL) { EngineStatus::Ready } else { EngineStatus::Boot };
        self.inner.shared.set_status(initial_status);

        let priority_hook = context.priority.clone();

        self.inner
            .context
            .set(context)
            .unwrap_or_else(|_| panic!("activate called twice"));

        if options.needs_p2o_midi_worker() {
            let inner = Arc::clone(&self.inner);
            let handle = std::thread::spawn(move || worker::midi::run(&inner));
            if let Some(hook) = &priority_hook {
                hook.set(handle.thread(), crate::context::DEFAULT_RT_PRIORITY);
            }
            self.p2o_midi_thread = Some(handle);
        }

        if options.needs_audio_worker() {
            let inner = Arc::clone(&self.inner);
            let handle = std::thread::spawn(move || worker::audio::run(&inner));
            if let Some(hook) = &priority_hook {
                hook.set(handle.thread(), crate::context::DEFAULT_RT_PRIORITY);
            }
            self.audio_thread = Some(handle);
        }

        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        self.inner.shared.status()
    }

    /// Display label combining the descriptor's model name with the bus and
    /// address the device was opened at.
    pub fn label(&self) -> String {
        crate::device::label(&self.inner.device_desc, Some(self.inner.usb.bus_address))
    }

    /// Request shutdown. Workers observe this on their next status check
    /// and exit their outer loops; does not forcibly cancel in-flight
    /// transfers.
    pub fn stop(&self) {
        self.inner.shared.set_status(EngineStatus::Stop);
    }

    /// Release an engine constructed with the DLL option out of `Ready`
    /// and into its boot sequence. A no-op if the DLL option wasn't set.
    pub fn boot(&self) {
        if self.inner.shared.status() == EngineStatus::Ready {
            self.inner.shared.set_status(EngineStatus::Boot);
        }
    }

    /// Join both workers in the fixed order the lifecycle API specifies:
    /// audio worker first, then the p2o-MIDI worker if it was started.
    pub fn wait(&mut self) {
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.p2o_midi_thread.take() {
            let _ = handle.join();
        }
    }

    pub fn o2p_max_latency(&self) -> usize {
        self.inner.shared.o2p_max_latency()
    }

    pub fn p2o_max_latency(&self) -> usize {
        self.inner.shared.p2o_max_latency()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDescriptor;

    fn desc() -> DeviceDescriptor {
        DeviceDescriptor::unit_scaled("test", 4, 10)
    }

    #[test]
    fn derived_sizes_match_worked_example() {
        // Exercises the same derivation `from_session` performs, without an
        // actual USB session (construction requires a real libusb handle).
        let d = desc();
        let blocks_per_transfer = 4usize;
        let frames_per_transfer = blocks_per_transfer * FRAMES_PER_BLOCK as usize;
        assert_eq!(frames_per_transfer, 28);
        let p2o_transfer_size = frames_per_transfer * codec::BYTES_PER_SAMPLE * d.inputs;
        let o2p_transfer_size = frames_per_transfer * codec::BYTES_PER_SAMPLE * d.outputs;
        assert_eq!(p2o_transfer_size, 448);
        assert_eq!(o2p_transfer_size, 1120);
    }
}
