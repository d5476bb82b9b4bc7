//! Pure, allocation-free conversion between USB block buffers and host-side
//! interleaved float32 frames.
//!
//! These are the only functions in the crate that touch big-endian words.

use crate::consts::{BLOCK_HEADER, FRAMES_PER_BLOCK};
use crate::device::DeviceDescriptor;

/// Number of bytes occupied by one sample on the wire (`i32`).
pub const BYTES_PER_SAMPLE: usize = 4;
/// Bytes occupied by a block's fixed header (`header: u16`, `frames: u16`).
pub const BLOCK_HEADER_LEN: usize = 4;

/// Byte length of one input (device → host) block carrying `desc.outputs`
/// channels.
pub fn input_block_len(desc: &DeviceDescriptor) -> usize {
    BLOCK_HEADER_LEN + BYTES_PER_SAMPLE * FRAMES_PER_BLOCK as usize * desc.outputs
}

/// Byte length of one output (host → device) block carrying `desc.inputs`
/// channels.
pub fn output_block_len(desc: &DeviceDescriptor) -> usize {
    BLOCK_HEADER_LEN + BYTES_PER_SAMPLE * FRAMES_PER_BLOCK as usize * desc.inputs
}

/// Decode `blocks_per_transfer` incoming USB blocks from `usb_in` into
/// `dst_floats`, which must have room for exactly
/// `blocks_per_transfer * FRAMES_PER_BLOCK * desc.outputs` floats.
///
/// Each sample is `be32toh(sample) as f32 * scale[channel]`. The 4-byte
/// header/frame-counter pair at the front of each block is skipped — it is
/// read for diagnostics only, never validated here.
pub fn decode_input(usb_in: &[u8], dst_floats: &mut [f32], desc: &DeviceDescriptor, blocks_per_transfer: usize) {
    let block_len = input_block_len(desc);
    let channels = desc.outputs;
    debug_assert_eq!(usb_in.len(), block_len * blocks_per_transfer);
    debug_assert_eq!(dst_floats.len(), blocks_per_transfer * FRAMES_PER_BLOCK as usize * channels);

    let mut out_idx = 0;
    for block in usb_in.chunks_exact(block_len) {
        let samples = &block[BLOCK_HEADER_LEN..];
        for frame in samples.chunks_exact(BYTES_PER_SAMPLE * channels) {
            for (channel, sample_bytes) in frame.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
                let raw = i32::from_be_bytes(sample_bytes.try_into().unwrap());
                dst_floats[out_idx] = raw as f32 * desc.output_track_scales[channel];
                out_idx += 1;
            }
        }
    }
}

/// Encode `src_floats` (`blocks_per_transfer * FRAMES_PER_BLOCK * desc.inputs`
/// floats) into `usb_out`, whose blocks must already carry the stamped
/// [`BLOCK_HEADER`] from initialization.
///
/// `base_frame` is the running frame counter before this transfer; it is
/// advanced by [`FRAMES_PER_BLOCK`] after each block and the updated value
/// is returned so the caller can persist it across transfers. The counter
/// wraps at `u16::MAX` by design — the wire field is 16 bits.
pub fn encode_output(
    src_floats: &[f32],
    usb_out: &mut [u8],
    desc: &DeviceDescriptor,
    blocks_per_transfer: usize,
    mut base_frame: u16,
) -> u16 {
    let block_len = output_block_len(desc);
    let channels = desc.inputs;
    debug_assert_eq!(src_floats.len(), blocks_per_transfer * FRAMES_PER_BLOCK as usize * channels);
    debug_assert_eq!(usb_out.len(), block_len * blocks_per_transfer);

    let mut src_idx = 0;
    for block in usb_out.chunks_exact_mut(block_len) {
        block[2..4].copy_from_slice(&base_frame.to_be_bytes());
        base_frame = base_frame.wrapping_add(FRAMES_PER_BLOCK);

        let samples = &mut block[BLOCK_HEADER_LEN..];
        for sample_bytes in samples.chunks_exact_mut(BYTES_PER_SAMPLE) {
            let f = src_floats[src_idx];
            src_idx += 1;
            let scaled = (f * i32::MAX as f32) as i32;
            sample_bytes.copy_from_slice(&scaled.to_be_bytes());
        }
    }
    base_frame
}

/// Stamp the constant [`BLOCK_HEADER`] into every block of a freshly
/// allocated output buffer, exactly once, as the device does at
/// initialization time (`ow_engine_init_mem`).
pub fn stamp_headers(usb_out: &mut [u8], desc: &DeviceDescriptor, blocks_per_transfer: usize) {
    let block_len = output_block_len(desc);
    for block in usb_out.chunks_exact_mut(block_len) {
        block[0..2].copy_from_slice(&BLOCK_HEADER.to_be_bytes());
    }
}

/// Trace-level diagnostic dump of a raw incoming block buffer: decodes each
/// block's header/frame-counter pair and logs it. Never touches the sample
/// payload; purely for wire-level debugging (mirrors `ow_engine_print_blocks`).
pub fn debug_dump_blocks(usb_in: &[u8], desc: &DeviceDescriptor, blocks_per_transfer: usize) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }
    let block_len = input_block_len(desc);
    for (i, block) in usb_in.chunks_exact(block_len).enumerate().take(blocks_per_transfer) {
        let header = u16::from_be_bytes([block[0], block[1]]);
        let frames = u16::from_be_bytes([block[2], block[3]]);
        log::trace!("block {i}: header={header:#06x} frames={frames}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(inputs: usize, outputs: usize) -> DeviceDescriptor {
        DeviceDescriptor::unit_scaled("test", inputs, outputs)
    }

    #[test]
    fn sizing_matches_worked_example() {
        let d = desc(4, 10);
        let blocks_per_transfer = 4;
        let frames_per_transfer = blocks_per_transfer * FRAMES_PER_BLOCK as usize;
        assert_eq!(frames_per_transfer, 28);
        let p2o_transfer_size = frames_per_transfer * BYTES_PER_SAMPLE * d.inputs;
        let o2p_transfer_size = frames_per_transfer * BYTES_PER_SAMPLE * d.outputs;
        assert_eq!(p2o_transfer_size, 448);
        assert_eq!(o2p_transfer_size, 1120);
    }

    #[test]
    fn encode_zero_buffer_stamps_headers_and_monotone_frame_counters() {
        let d = desc(2, 2);
        let blocks_per_transfer = 2;
        let src = vec![0.0f32; blocks_per_transfer * FRAMES_PER_BLOCK as usize * d.inputs];
        let mut usb_out = vec![0u8; output_block_len(&d) * blocks_per_transfer];
        stamp_headers(&mut usb_out, &d, blocks_per_transfer);
        let next = encode_output(&src, &mut usb_out, &d, blocks_per_transfer, 0);

        let block_len = output_block_len(&d);
        for (i, block) in usb_out.chunks_exact(block_len).enumerate() {
            assert_eq!(&block[0..2], &BLOCK_HEADER.to_be_bytes());
            let expected_frames = (i as u16) * FRAMES_PER_BLOCK;
            assert_eq!(&block[2..4], &expected_frames.to_be_bytes());
            assert!(block[BLOCK_HEADER_LEN..].iter().all(|&b| b == 0));
        }
        assert_eq!(next, 2 * FRAMES_PER_BLOCK);
    }

    #[test]
    fn decode_alternating_extremes() {
        let d = desc(1, 1);
        let blocks_per_transfer = 1;
        let mut usb_in = vec![0u8; input_block_len(&d) * blocks_per_transfer];
        let mut pos = BLOCK_HEADER_LEN;
        for j in 0..FRAMES_PER_BLOCK {
            let v = if j % 2 == 0 { i32::MAX } else { -i32::MAX };
            usb_in[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
            pos += 4;
        }
        let mut dst = vec![0.0f32; FRAMES_PER_BLOCK as usize];
        decode_input(&usb_in, &mut dst, &d, blocks_per_transfer);
        for (j, &f) in dst.iter().enumerate() {
            let expected = if j % 2 == 0 { 1.0 } else { -1.0 };
            assert!((f / i32::MAX as f32 - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn round_trip_within_quantization() {
        let d = desc(2, 2);
        let blocks_per_transfer = 3;
        let frames = blocks_per_transfer * FRAMES_PER_BLOCK as usize;
        let src: Vec<f32> = (0..frames * d.inputs)
            .map(|i| ((i as f32 / (frames * d.inputs) as f32) * 2.0 - 1.0) * 0.9)
            .collect();

        let mut usb_out = vec![0u8; output_block_len(&d) * blocks_per_transfer];
        stamp_headers(&mut usb_out, &d, blocks_per_transfer);
        encode_output(&src, &mut usb_out, &d, blocks_per_transfer, 0);

        // Reinterpret the encoded output buffer as an input buffer with the
        // same per-block layout (same channel count on both descriptor sides).
        let mut decoded = vec![0.0f32; frames * d.inputs];
        decode_input(&usb_out, &mut decoded, &d, blocks_per_transfer);

        for (a, b) in src.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 2.0f32.powi(-20), "a={a} b={b}");
        }
    }

    #[test]
    fn frame_counter_wraps_at_u16_max() {
        let d = desc(1, 1);
        let blocks_per_transfer = 1;
        let src = vec![0.0f32; FRAMES_PER_BLOCK as usize];
        let mut usb_out = vec![0u8; output_block_len(&d)];
        stamp_headers(&mut usb_out, &d, blocks_per_transfer);
        let base = u16::MAX - 2;
        let next = encode_output(&src, &mut usb_out, &d, blocks_per_transfer, base);
        assert_eq!(next, base.wrapping_add(FRAMES_PER_BLOCK));
        assert!(next < base);
    }
}
