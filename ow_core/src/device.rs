//! Device descriptor and opened-handle bookkeeping.
//!
//! Per-model descriptor tables (VID/PID lookup, channel counts, scale
//! factors for a given hardware SKU) are an external collaborator's job;
//! this module only defines the shape the engine consumes.

/// Maximum length of the display label built from a descriptor's name plus
/// the device's bus/address, matching the device's own label buffer size.
pub const LABEL_MAX_LEN: usize = 64;

/// Static per-model parameters the engine needs but never looks up itself.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Human-readable model name, e.g. `"Digitakt"`.
    pub name: String,
    /// Number of audio input channels the *device* exposes (used by p2o
    /// encode, i.e. host → device).
    pub inputs: usize,
    /// Number of audio output channels the *device* exposes (used by o2p
    /// decode, i.e. device → host).
    pub outputs: usize,
    /// Per-channel float scale applied when decoding device output samples.
    /// Length must equal `outputs`. The p2o encode direction applies no
    /// scale — only the full signed 32-bit range multiply.
    pub output_track_scales: Vec<f32>,
    /// Sample rate the device runs its DLL clock at, passed through to
    /// [`crate::context::Dll::init`] at the top of each outer-loop pass.
    pub sample_rate: f64,
}

impl DeviceDescriptor {
    /// A descriptor with unit scales on every output channel and a 48kHz
    /// sample rate, useful for round-trip codec tests where scaling should
    /// be a no-op.
    pub fn unit_scaled(name: impl Into<String>, inputs: usize, outputs: usize) -> Self {
        Self { name: name.into(), inputs, outputs, output_track_scales: vec![1.0; outputs], sample_rate: 48_000.0 }
    }
}

/// An opened USB device's bus/address pair, used only to build a display
/// label; it plays no role in transfer addressing once the handle is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusAddress {
    pub bus: u8,
    pub address: u8,
}

/// Builds the `"{name}@{bus:03},{address:03}"` display label, truncated to
/// [`LABEL_MAX_LEN`] the way the device's `snprintf` call is bounded.
pub fn label(descriptor: &DeviceDescriptor, bus_address: Option<BusAddress>) -> String {
    let full = match bus_address {
        Some(ba) => format!("{}@{:03},{:03}", descriptor.name, ba.bus, ba.address),
        None => descriptor.name.clone(),
    };
    if full.len() > LABEL_MAX_LEN { full[..LABEL_MAX_LEN].to_string() } else { full }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_bus_and_address() {
        let desc = DeviceDescriptor::unit_scaled("Digitakt", 2, 12);
        let label = label(&desc, Some(BusAddress { bus: 3, address: 7 }));
        assert_eq!(label, "Digitakt@003,007");
    }

    #[test]
    fn label_falls_back_to_bare_name_without_bus_address() {
        let desc = DeviceDescriptor::unit_scaled("Digitakt", 2, 12);
        assert_eq!(label(&desc, None), "Digitakt");
    }
}
