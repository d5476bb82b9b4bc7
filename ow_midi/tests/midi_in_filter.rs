//! Integration tests for the MIDI-in code-index filter.

use ow_midi::{MidiEvent, scan_midi_in_payload};

#[test]
fn filters_and_timestamps_a_bulk_in_payload() {
    let payload = [
        0x09, 0x90, 0x40, 0x7F, //
        0x05, 0x00, 0x00, 0x00, //
        0x08, 0x80, 0x40, 0x00, //
    ];
    let events: Vec<MidiEvent> = scan_midi_in_payload(&payload, 3.25).collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].bytes, [0x09, 0x90, 0x40, 0x7F]);
    assert_eq!(events[1].bytes, [0x08, 0x80, 0x40, 0x00]);
    assert!(events.iter().all(|e| e.time == 3.25));
}

#[test]
fn timestamps_are_monotone_nondecreasing_within_one_callback() {
    let payload = [0x09, 0x90, 0x40, 0x7F, 0x08, 0x80, 0x40, 0x00];
    let events: Vec<MidiEvent> = scan_midi_in_payload(&payload, 7.0).collect();

    let mut last = f64::NEG_INFINITY;
    for event in &events {
        assert!(event.time >= last);
        last = event.time;
    }
}

#[test]
fn empty_payload_yields_no_events() {
    let events: Vec<MidiEvent> = scan_midi_in_payload(&[], 0.0).collect();
    assert!(events.is_empty());
}
