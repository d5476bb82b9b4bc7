//! The two worker threads spawned by [`crate::engine::Engine::activate`]:
//! the audio/o2p-MIDI worker that owns the libusb event loop, and the
//! p2o-MIDI pacing worker.

pub mod audio;
pub mod midi;
