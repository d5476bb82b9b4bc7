//! The host-supplied boundary: ring buffers, clock, DLL hooks, and the
//! realtime-priority setter.
//!
//! None of these traits are implemented by this crate — ring buffers, the
//! wall clock, and the DLL numerics are explicitly out of scope. This
//! module only defines the contract the engine calls against.

use std::sync::Arc;

use crate::options::EngineOptions;
use ow_midi::MidiEvent;

/// One MIDI ring record: a raw USB-MIDI packet plus the host time it was
/// observed. Identical layout to [`ow_midi::MidiEvent`]; re-exported here
/// under the name the ring contract uses.
pub type MidiRecord = MidiEvent;

/// A host-supplied single-producer/single-consumer byte-granular audio ring.
///
/// Audio writes/reads always carry exactly one transfer's worth of bytes
/// (`p2o_transfer_size` or `o2p_transfer_size`); the engine never partially
/// fills a ring operation.
pub trait AudioRing: Send + Sync {
    /// Bytes immediately available to read.
    fn read_space(&self) -> usize;
    /// Bytes immediately available to write.
    fn write_space(&self) -> usize;
    /// Read `len` bytes. When `out` is `Some`, the bytes are copied there;
    /// when `None`, the bytes are discarded — used to drain unaligned
    /// trailing bytes or flush the ring on resync.
    fn read(&self, out: Option<&mut [u8]>, len: usize) -> usize;
    /// Write `buf` in full. Returns the number of bytes actually written.
    fn write(&self, buf: &[u8]) -> usize;
}

/// A host-supplied single-producer/single-consumer MIDI event ring.
pub trait MidiRing: Send + Sync {
    /// Bytes immediately available to read, in units of `sizeof(MidiRecord)`.
    fn read_space(&self) -> usize;
    /// Bytes immediately available to write, in units of `sizeof(MidiRecord)`.
    fn write_space(&self) -> usize;
    /// Pop one record, if available.
    fn read(&self) -> Option<MidiRecord>;
    /// Push one record. Returns `false` if the ring was full.
    fn write(&self, record: MidiRecord) -> bool;
}

/// The host's delay-locked-loop clock-reconciliation object. Only its two
/// update hooks are consumed; the numerics live entirely on the host side.
pub trait Dll: Send + Sync {
    /// Called once per outer-loop pass, before the inner event loop starts.
    fn init(&self, sample_rate: f64, frames_per_transfer: u32, now: f64);
    /// Called from the audio-in completion callback, under `Shared`'s lock.
    fn inc(&self, frames_per_transfer: u32, now: f64);
}

/// Raises a worker thread to a host-defined realtime priority.
pub trait RtPriority: Send + Sync {
    fn set(&self, thread: &std::thread::Thread, priority: i32);
}

/// Default priority used when the host does not supply an [`RtPriority`].
pub const DEFAULT_RT_PRIORITY: i32 = 10;

/// Everything the host must supply at [`crate::engine::Engine::activate`].
///
/// Only the rings, `get_time`, and `dll` required by the caller's
/// [`EngineOptions`] need be present — `activate` validates this and
/// returns [`crate::error::Error`] variants named after the missing hook.
#[derive(Clone)]
pub struct Context {
    pub options: EngineOptions,
    pub p2o_audio: Option<Arc<dyn AudioRing>>,
    pub o2p_audio: Option<Arc<dyn AudioRing>>,
    pub p2o_midi: Option<Arc<dyn MidiRing>>,
    pub o2p_midi: Option<Arc<dyn MidiRing>>,
    pub get_time: Option<Arc<dyn Fn() -> f64 + Send + Sync>>,
    pub dll: Option<Arc<dyn Dll>>,
    pub priority: Option<Arc<dyn RtPriority>>,
}

impl Context {
    /// An empty context with no rings, clock, or DLL configured. Callers
    /// fill in the fields their [`EngineOptions`] require.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            p2o_audio: None,
            o2p_audio: None,
            p2o_midi: None,
            o2p_midi: None,
            get_time: None,
            dll: None,
            priority: None,
        }
    }

    pub(crate) fn now(&self) -> f64 {
        self.get_time.as_ref().expect("get_time validated at activate").as_ref()()
    }

    /// Validate that every hook the enabled options require is present.
    /// Mirrors `ow_engine_activate`'s per-option checks exactly, including
    /// their order (o2p audio, then p2o audio, then o2p midi, then p2o
    /// midi, then dll).
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        use crate::options::EngineOptions;

        if self.options.is_empty() {
            return Err(Error::Generic);
        }

        if self.options.contains(EngineOptions::O2P_AUDIO) {
            if self.o2p_audio.is_none() {
                return Err(Error::NoO2pAudioBuf);
            }
        }

        if self.options.contains(EngineOptions::P2O_AUDIO) {
            if self.p2o_audio.is_none() {
                return Err(Error::NoP2oAudioBuf);
            }
        }

        if self.options.contains(EngineOptions::O2P_MIDI) {
            if self.get_time.is_none() {
                return Err(Error::NoGetTime);
            }
            if self.o2p_midi.is_none() {
                return Err(Error::NoO2pMidiBuf);
            }
        }

        if self.options.contains(EngineOptions::P2O_MIDI) {
            if self.get_time.is_none() {
                return Err(Error::NoGetTime);
            }
            if self.p2o_midi.is_none() {
                return Err(Error::NoP2oMidiBuf);
            }
        }

        if self.options.contains(EngineOptions::DLL) {
            if self.get_time.is_none() {
                return Err(Error::NoGetTime);
            }
            if self.dll.is_none() {
                return Err(Error::NoDll);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::options::EngineOptions;

    #[test]
    fn empty_options_is_generic_error() {
        let ctx = Context::new(EngineOptions::empty());
        assert_eq!(ctx.validate(), Err(Error::Generic));
    }

    #[test]
    fn o2p_audio_without_buffer_is_rejected() {
        let ctx = Context::new(EngineOptions::O2P_AUDIO);
        assert_eq!(ctx.validate(), Err(Error::NoO2pAudioBuf));
    }

    #[test]
    fn dll_without_get_time_is_rejected_before_missing_dll() {
        let ctx = Context::new(EngineOptions::DLL);
        assert_eq!(ctx.validate(), Err(Error::NoGetTime));
    }
}
