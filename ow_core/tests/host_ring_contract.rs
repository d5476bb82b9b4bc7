//! End-to-end tests against fake, in-memory `AudioRing`/`MidiRing`
//! implementations — exercising the contract `ow_core::context` defines,
//! independent of any real USB device.

use std::sync::Mutex;

use ow_core::{AudioRing, Context, EngineOptions, EngineStatus, MidiRecord, MidiRing};

/// A byte ring with no real wraparound, sized generously for a single test.
/// Good enough to exercise `read_space`/`write_space`/`read`/`write`
/// semantics without needing a production-grade SPSC implementation.
struct FakeAudioRing {
    buf: Mutex<Vec<u8>>,
}

impl FakeAudioRing {
    fn new() -> Self {
        Self { buf: Mutex::new(Vec::new()) }
    }
}

impl AudioRing for FakeAudioRing {
    fn read_space(&self) -> usize {
        self.buf.lock().unwrap().len()
    }

    fn write_space(&self) -> usize {
        1 << 20
    }

    fn read(&self, out: Option<&mut [u8]>, len: usize) -> usize {
        let mut buf = self.buf.lock().unwrap();
        let take = len.min(buf.len());
        if let Some(out) = out {
            out[..take].copy_from_slice(&buf[..take]);
        }
        buf.drain(..take);
        take
    }

    fn write(&self, data: &[u8]) -> usize {
        self.buf.lock().unwrap().extend_from_slice(data);
        data.len()
    }
}

struct FakeMidiRing {
    queue: Mutex<std::collections::VecDeque<MidiRecord>>,
}

impl FakeMidiRing {
    fn new() -> Self {
        Self { queue: Mutex::new(std::collections::VecDeque::new()) }
    }
}

impl MidiRing for FakeMidiRing {
    fn read_space(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    fn write_space(&self) -> usize {
        1024
    }

    fn read(&self) -> Option<MidiRecord> {
        self.queue.lock().unwrap().pop_front()
    }

    fn write(&self, record: MidiRecord) -> bool {
        self.queue.lock().unwrap().push_back(record);
        true
    }
}

#[test]
fn context_validate_rejects_missing_hooks_in_spec_order() {
    let ctx = Context::new(EngineOptions::P2O_AUDIO | EngineOptions::O2P_AUDIO);
    assert_eq!(ctx.validate(), Err(ow_core::Error::NoO2pAudioBuf));

    let mut ctx = ctx;
    ctx.o2p_audio = Some(std::sync::Arc::new(FakeAudioRing::new()));
    assert_eq!(ctx.validate(), Err(ow_core::Error::NoP2oAudioBuf));

    ctx.p2o_audio = Some(std::sync::Arc::new(FakeAudioRing::new()));
    assert!(ctx.validate().is_ok());
}

#[test]
fn midi_ring_round_trips_in_fifo_order() {
    let ring = FakeMidiRing::new();
    assert_eq!(ring.read_space(), 0);
    assert!(ring.write(MidiRecord::new([0x09, 0x90, 0x40, 0x7F], 1.0)));
    assert!(ring.write(MidiRecord::new([0x08, 0x80, 0x40, 0x00], 2.0)));
    assert_eq!(ring.read_space(), 2);

    let first = ring.read().unwrap();
    assert_eq!(first.time, 1.0);
    let second = ring.read().unwrap();
    assert_eq!(second.time, 2.0);
    assert!(ring.read().is_none());
}

#[test]
fn status_is_terminal_gates_worker_continuation() {
    assert!(EngineStatus::Stop.is_terminal());
    assert!(EngineStatus::Error.is_terminal());
    assert!(!EngineStatus::Ready.is_terminal());
    assert!(!EngineStatus::Boot.is_terminal());
    assert!(!EngineStatus::Wait.is_terminal());
    assert!(!EngineStatus::Run.is_terminal());
}
