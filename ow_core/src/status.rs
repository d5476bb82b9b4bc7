//! The engine's lifecycle state machine.

/// Engine lifecycle status, totally ordered so workers can test "at least"
/// and "at most" a given state with ordinary comparison operators.
///
/// Discriminants are assigned in ascending order so `#[derive(PartialOrd,
/// Ord)]` reproduces `ERROR < STOP < READY < BOOT < WAIT < RUN` exactly.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineStatus {
    /// A transfer-submit failure occurred; both workers exit on observing this.
    Error = 0,
    /// Requested shutdown, or the implicit state before activation.
    Stop = 1,
    /// Activated with the DLL option; waiting for an external agent to
    /// release the audio worker into its outer loop.
    Ready = 2,
    /// Between activation and the first outer-loop iteration. No code path
    /// explicitly assigns this value — it is the status an engine without
    /// the DLL option is constructed with, observed identically to `Wait`
    /// by the outer loop before being overwritten on the first iteration.
    Boot = 3,
    /// DLL has just been (re-)initialized for the current outer-loop pass;
    /// the inner libusb event loop is running but input callbacks still
    /// discard frames until `Run` is reached.
    Wait = 4,
    /// Steady state: audio is flowing to and from the host rings.
    Run = 5,
}

impl EngineStatus {
    /// Whether both workers should exit their outer loops on observing this
    /// status (`Error` or `Stop`).
    #[inline]
    pub fn is_terminal(self) -> bool {
        self <= EngineStatus::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order_matches_spec() {
        assert!(EngineStatus::Error < EngineStatus::Stop);
        assert!(EngineStatus::Stop < EngineStatus::Ready);
        assert!(EngineStatus::Ready < EngineStatus::Boot);
        assert!(EngineStatus::Boot < EngineStatus::Wait);
        assert!(EngineStatus::Wait < EngineStatus::Run);
    }

    #[test]
    fn terminal_states() {
        assert!(EngineStatus::Error.is_terminal());
        assert!(EngineStatus::Stop.is_terminal());
        assert!(!EngineStatus::Ready.is_terminal());
        assert!(!EngineStatus::Run.is_terminal());
    }
}
