//! Userspace bridge core: USB transfer plumbing, wire codec, lifecycle, and
//! worker threads for a class-compliant-but-proprietary audio/MIDI device.
//!
//! Ring buffers, the wall clock, DLL numerics, and realtime scheduling are
//! all host-supplied via the traits in [`context`] — this crate only drives
//! them.

pub mod codec;
pub mod consts;
pub mod context;
pub mod device;
pub mod engine;
pub mod error;
pub mod options;
pub mod resample;
pub mod shared;
pub mod single_writer;
pub mod status;
pub mod usb;
pub mod worker;

pub use context::{AudioRing, Context, Dll, MidiRecord, MidiRing, RtPriority};
pub use device::{BusAddress, DeviceDescriptor};
pub use engine::Engine;
pub use error::{Error, Result};
pub use options::EngineOptions;
pub use status::EngineStatus;
