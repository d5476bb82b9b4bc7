//! The engine options bitmask, validated against the `Context` at activation.

use bitflags::bitflags;

bitflags! {
    /// Subset of audio/MIDI directions and clock reconciliation the caller
    /// wants the engine to drive. Each bit gates both which USB transfers
    /// get submitted and which `Context` hooks [`crate::engine::Engine::activate`]
    /// requires to be present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EngineOptions: u8 {
        /// Host → device audio (p2o encode path).
        const P2O_AUDIO = 0b0000_0001;
        /// Device → host audio (o2p decode path).
        const O2P_AUDIO = 0b0000_0010;
        /// Host → device MIDI (p2o pacing thread).
        const P2O_MIDI  = 0b0000_0100;
        /// Device → host MIDI (bulk-in filter/timestamp path).
        const O2P_MIDI  = 0b0000_1000;
        /// Clock reconciliation via the host-supplied DLL.
        const DLL       = 0b0001_0000;
    }
}

impl EngineOptions {
    /// Whether any audio or device→host-MIDI direction is enabled — the
    /// condition under which the audio/o2p-MIDI worker thread is spawned.
    #[inline]
    pub fn needs_audio_worker(self) -> bool {
        self.intersects(Self::P2O_AUDIO | Self::O2P_AUDIO | Self::O2P_MIDI)
    }

    /// Whether the p2o-MIDI pacing worker thread should be spawned.
    #[inline]
    pub fn needs_p2o_midi_worker(self) -> bool {
        self.contains(Self::P2O_MIDI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_worker_needed_for_o2p_midi_alone() {
        assert!(EngineOptions::O2P_MIDI.needs_audio_worker());
        assert!(!EngineOptions::P2O_MIDI.needs_audio_worker());
    }

    #[test]
    fn p2o_midi_worker_needs_its_own_flag() {
        assert!(EngineOptions::P2O_MIDI.needs_p2o_midi_worker());
        assert!(!EngineOptions::O2P_MIDI.needs_p2o_midi_worker());
    }
}
