//! Cross-thread engine state, guarded by the two spin locks `engine.c` uses:
//! one for status/options/latency/DLL bookkeeping, one for the single
//! `p2o_midi_ready` flag. Both locks are held only for O(1) field access,
//! never across a ring operation or a USB call.

use spin::Mutex;

use crate::status::EngineStatus;

/// Fields guarded by the engine's main spin lock.
#[derive(Debug)]
struct Locked {
    status: EngineStatus,
    o2p_latency: usize,
    o2p_max_latency: usize,
    p2o_latency: usize,
    p2o_max_latency: usize,
}

/// Cross-thread state shared between the audio/o2p-MIDI worker and the
/// p2o-MIDI pacing worker, plus the four completion callbacks that run on
/// the libusb event thread.
pub struct Shared {
    locked: Mutex<Locked>,
    p2o_midi_ready: Mutex<bool>,
}

impl Shared {
    pub fn new(initial_status: EngineStatus) -> Self {
        Self {
            locked: Mutex::new(Locked {
                status: initial_status,
                o2p_latency: 0,
                o2p_max_latency: 0,
                p2o_latency: 0,
                p2o_max_latency: 0,
            }),
            p2o_midi_ready: Mutex::new(true),
        }
    }

    #[inline]
    pub fn status(&self) -> EngineStatus {
        self.locked.lock().status
    }

    #[inline]
    pub fn set_status(&self, status: EngineStatus) {
        self.locked.lock().status = status;
    }

    /// Record a fresh o2p (device → host) latency sample, updating the
    /// running maximum if it grew.
    #[inline]
    pub fn record_o2p_latency(&self, value: usize) {
        let mut locked = self.locked.lock();
        locked.o2p_latency = value;
        if value > locked.o2p_max_latency {
            locked.o2p_max_latency = value;
        }
    }

    /// Record a fresh p2o (host → device) latency sample, updating the
    /// running maximum if it grew.
    #[inline]
    pub fn record_p2o_latency(&self, value: usize) {
        let mut locked = self.locked.lock();
        locked.p2o_latency = value;
        if value > locked.p2o_max_latency {
            locked.p2o_max_latency = value;
        }
    }

    #[inline]
    pub fn o2p_max_latency(&self) -> usize {
        self.locked.lock().o2p_max_latency
    }

    #[inline]
    pub fn p2o_max_latency(&self) -> usize {
        self.locked.lock().p2o_max_latency
    }

    /// Reset both latency counters and their maxima to zero, as the outer
    /// loop does at the top of each session pass.
    #[inline]
    pub fn reset_latencies(&self) {
        let mut locked = self.locked.lock();
        locked.o2p_latency = 0;
        locked.o2p_max_latency = 0;
        locked.p2o_latency = 0;
        locked.p2o_max_latency = 0;
    }

    #[inline]
    pub fn p2o_midi_ready(&self) -> bool {
        *self.p2o_midi_ready.lock()
    }

    #[inline]
    pub fn set_p2o_midi_ready(&self, ready: bool) {
        *self.p2o_midi_ready.lock() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_maxima_are_nondecreasing() {
        let shared = Shared::new(EngineStatus::Run);
        shared.record_o2p_latency(10);
        shared.record_o2p_latency(4);
        shared.record_o2p_latency(20);
        assert_eq!(shared.o2p_max_latency(), 20);
    }

    #[test]
    fn status_monotonicity_toward_stop() {
        let shared = Shared::new(EngineStatus::Run);
        shared.set_status(EngineStatus::Stop);
        assert_eq!(shared.status(), EngineStatus::Stop);
        // nothing in this type prevents re-raising status; the worker loops
        // are responsible for never doing so once they observe `is_terminal()`.
        assert!(shared.status().is_terminal());
    }

    #[test]
    fn reset_latencies_zeroes_current_and_max() {
        let shared = Shared::new(EngineStatus::Run);
        shared.record_p2o_latency(50);
        shared.reset_latencies();
        assert_eq!(shared.p2o_max_latency(), 0);
    }
}
