//! Setup and USB-initialization errors.
//!
//! Only construction and `activate()` return errors — once an [`Engine`](crate::engine::Engine)
//! is running, faults are communicated through the status FSM ([`status::EngineStatus`](crate::status::EngineStatus))
//! and `log` records, never through `Result`.

/// Errors raised while constructing, initializing, or activating an engine.
///
/// The numeric discriminants and wording mirror the device's own error
/// string table, so a caller logging `err as i32` alongside `err` gets a
/// stable, cross-process-comparable tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// Unspecified failure outside the more specific categories below.
    #[error("generic error")]
    Generic = 1,
    /// `libusb_init` failed.
    #[error("libusb init failed")]
    LibusbInitFailed = 2,
    /// The device could not be opened from the given handle or address.
    #[error("can't open device")]
    CantOpenDevice = 3,
    /// `libusb_set_configuration` failed.
    #[error("can't set usb config")]
    CantSetUsbConfig = 4,
    /// `libusb_claim_interface` failed.
    #[error("can't claim usb interface")]
    CantClaimInterface = 5,
    /// `libusb_set_interface_alt_setting` failed.
    #[error("can't set usb alt setting")]
    CantSetAltSetting = 6,
    /// `libusb_clear_halt` failed on one of the four endpoints.
    #[error("can't clear endpoint")]
    CantClearEndpoint = 7,
    /// `libusb_alloc_transfer` returned null for one of the four transfers.
    #[error("can't prepare transfer")]
    CantPrepareTransfer = 8,
    /// No device matching the requested bus/address was found.
    #[error("can't find a matching device")]
    CantFindDevice = 9,
    /// An enabled audio/MIDI option's `read_space` hook was missing.
    #[error("'read_space' not set in context")]
    NoReadSpace = 10,
    /// An enabled audio option's `write_space` hook was missing.
    #[error("'write_space' not set in context")]
    NoWriteSpace = 11,
    /// An enabled audio/MIDI option's `read` hook was missing.
    #[error("'read' not set in context")]
    NoRead = 12,
    /// An enabled audio option's `write` hook was missing.
    #[error("'write' not set in context")]
    NoWrite = 13,
    /// `p2o_audio` was enabled without a ring buffer reference.
    #[error("'p2o_audio_buf' not set in context")]
    NoP2oAudioBuf = 14,
    /// `o2p_audio` was enabled without a ring buffer reference.
    #[error("'o2p_audio_buf' not set in context")]
    NoO2pAudioBuf = 15,
    /// `p2o_midi` was enabled without a ring buffer reference.
    #[error("'p2o_midi_buf' not set in context")]
    NoP2oMidiBuf = 16,
    /// `o2p_midi` was enabled without a ring buffer reference.
    #[error("'o2p_midi_buf' not set in context")]
    NoO2pMidiBuf = 17,
    /// A MIDI or DLL option was enabled without a `get_time` hook.
    #[error("'get_time' not set in context")]
    NoGetTime = 18,
    /// The DLL option was enabled without a DLL object.
    #[error("'dll' not set in context")]
    NoDll = 19,
}

/// Result type alias for `ow_core` setup operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_stable() {
        assert_eq!(Error::Generic as i32, 1);
        assert_eq!(Error::NoDll as i32, 19);
    }
}
