//! # ow_midi
//!
//! USB-MIDI event framing shared between the device-facing transfer pump and
//! the host-facing MIDI rings.
//!
//! This crate provides:
//! - [`MidiEvent`] — a 4-byte USB-MIDI packet paired with a host timestamp
//! - [`code_index_number`] / [`is_data_event`] — the class-compliant event
//!   filter applied to bulk MIDI-in payloads
//!
//! ## FFI Compatibility
//!
//! [`MidiEvent`] uses `#[repr(C)]` so it can be written byte-for-byte into a
//! host ring buffer record.

pub mod event;

pub use event::{MidiEvent, code_index_number, is_data_event, scan_midi_in_payload};
