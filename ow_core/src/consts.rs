//! Fixed wire-protocol and USB-topology constants.

/// Audio frames encoded per USB block header.
pub const FRAMES_PER_BLOCK: u16 = 7;

/// Constant block header stamped into every outgoing block exactly once.
pub const BLOCK_HEADER: u16 = 0x07FF;

/// Interrupt-in endpoint carrying device → host audio.
pub const AUDIO_IN_EP: u8 = 0x83;
/// Interrupt-out endpoint carrying host → device audio.
pub const AUDIO_OUT_EP: u8 = 0x03;
/// Bulk-in endpoint carrying device → host MIDI.
pub const MIDI_IN_EP: u8 = 0x81;
/// Bulk-out endpoint carrying host → device MIDI.
pub const MIDI_OUT_EP: u8 = 0x01;

/// Fixed buffer size for both bulk MIDI endpoints.
pub const USB_BULK_MIDI_SIZE: usize = 512;

/// USB configuration value selected at initialization.
pub const USB_CONFIGURATION: u8 = 1;

/// Interfaces claimed at initialization, paired positionally with
/// [`ALT_SETTINGS`].
pub const INTERFACES: [u8; 3] = [1, 2, 3];
/// Alt settings applied to [`INTERFACES`], positionally.
pub const ALT_SETTINGS: [u8; 3] = [3, 2, 0];
