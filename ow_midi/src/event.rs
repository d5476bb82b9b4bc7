//! USB-MIDI event type and class-compliant code-index filtering.

/// Number of raw bytes in one USB-MIDI event packet.
pub const EVENT_BYTES: usize = 4;

/// A single USB-MIDI event packet tagged with the host time it was received.
///
/// Uses `#[repr(C)]` so the 4 packet bytes plus the `f64` timestamp can be
/// written byte-for-byte into a host MIDI ring record (16 bytes: 4-byte
/// packet, 4 bytes of implementation-defined padding, 8-byte timestamp).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// The raw 4-byte USB-MIDI packet (cable number / code index nibble,
    /// then up to three MIDI data bytes).
    pub bytes: [u8; EVENT_BYTES],
    /// Host monotonic time, in seconds, at which this event was observed.
    pub time: f64,
}

impl MidiEvent {
    /// Build an event from a raw 4-byte packet and a host timestamp.
    pub fn new(bytes: [u8; EVENT_BYTES], time: f64) -> Self {
        Self { bytes, time }
    }

    /// The event's code index number, assuming USB-MIDI cable number 0 (the
    /// bridge never multiplexes more than one MIDI cable, so the packet's
    /// first byte equals its code index number directly).
    #[inline]
    pub fn code_index_number(&self) -> u8 {
        code_index_number(self.bytes[0])
    }

    /// Whether this event carries a class-compliant channel-voice message
    /// (code index `0x8..=0xF`), as opposed to reserved/single-byte codes.
    #[inline]
    pub fn is_data_event(&self) -> bool {
        is_data_event(self.bytes[0])
    }
}

/// Extract the code index number of a USB-MIDI packet's first byte, assuming
/// cable number 0.
#[inline]
pub fn code_index_number(first_byte: u8) -> u8 {
    first_byte
}

/// Whether a packet's first byte carries a code index in the channel-voice
/// range `0x8..=0xF` that the bridge forwards to the host MIDI ring.
#[inline]
pub fn is_data_event(first_byte: u8) -> bool {
    matches!(code_index_number(first_byte), 0x08..=0x0F)
}

/// Scan a raw MIDI-in bulk transfer payload, yielding one [`MidiEvent`] per
/// accepted 4-byte packet, all stamped with the same `time` (the host time
/// at which the containing transfer completed — not per-packet).
///
/// Packets whose code index number falls outside `0x8..=0xF` are silently
/// dropped. Any trailing bytes that don't form a full 4-byte packet are
/// ignored (the USB controller never reports a partial packet at the end of
/// a valid transfer, but defensive trimming costs nothing here).
pub fn scan_midi_in_payload(payload: &[u8], time: f64) -> impl Iterator<Item = MidiEvent> + '_ {
    payload
        .chunks_exact(EVENT_BYTES)
        .filter(|chunk| is_data_event(chunk[0]))
        .map(move |chunk| {
            let mut bytes = [0u8; EVENT_BYTES];
            bytes.copy_from_slice(chunk);
            MidiEvent::new(bytes, time)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_index_is_the_first_byte_under_single_cable_assumption() {
        assert_eq!(code_index_number(0x09), 0x09);
        assert_eq!(code_index_number(0x05), 0x05);
    }

    #[test]
    fn data_event_range() {
        for byte in 0x00..=0x07u8 {
            assert!(!is_data_event(byte));
        }
        for byte in 0x08..=0x0Fu8 {
            assert!(is_data_event(byte));
        }
        for byte in 0x10..=0xFFu8 {
            assert!(!is_data_event(byte));
        }
    }

    #[test]
    fn scan_keeps_only_code_index_data_events() {
        // matches the worked example in the bridge's testable properties:
        // two of the three packets fall in the 0x08..=0x0F code-index range.
        let payload = [
            0x09, 0x90, 0x40, 0x7F, 0x05, 0x00, 0x00, 0x00, 0x08, 0x80, 0x40, 0x00,
        ];
        let events: Vec<_> = scan_midi_in_payload(&payload, 1.5).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].bytes, [0x09, 0x90, 0x40, 0x7F]);
        assert_eq!(events[1].bytes, [0x08, 0x80, 0x40, 0x00]);
        assert!(events.iter().all(|e| e.time == 1.5));
    }

    #[test]
    fn scan_ignores_trailing_partial_packet() {
        let payload = [0x09, 0x90, 0x40, 0x7F, 0x00, 0x00];
        let events: Vec<_> = scan_midi_in_payload(&payload, 0.0).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn scan_tags_all_events_with_the_same_transfer_time() {
        let payload = [0x09, 0x90, 0x40, 0x7F, 0x08, 0x80, 0x40, 0x00];
        let events: Vec<_> = scan_midi_in_payload(&payload, 42.0).collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.time == 42.0));
    }
}
