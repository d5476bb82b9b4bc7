//! One-shot best-effort resampling used only on a p2o (host → device) audio
//! underrun. This is explicitly not general-purpose sample-rate conversion:
//! it exists to paper over a partially-filled ring at session start or under
//! pathological host scheduling, never as a steady-state feature.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

/// Resample `partial` (a single interleaved-channel buffer of `frames`
/// frames, underrun by a factor of `frames_per_transfer / frames`) up to
/// exactly `frames_per_transfer` frames, one channel at a time.
///
/// `channels` must match the number of interleaved channels in `partial`.
/// Logs at warn level if the resampler produces a different frame count
/// than requested — the source never clips or pads in that case, it simply
/// reports what it got.
pub fn one_shot_resample(partial: &[f32], frames: usize, channels: usize, frames_per_transfer: usize) -> Vec<f32> {
    if frames == 0 || frames_per_transfer == 0 {
        return vec![0.0; frames_per_transfer * channels];
    }

    let src_ratio = frames_per_transfer as f64 / frames as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut deinterleaved: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in partial.chunks_exact(channels).take(frames) {
        for (channel, &sample) in frame.iter().enumerate() {
            deinterleaved[channel].push(sample);
        }
    }

    let Ok(mut resampler) = SincFixedIn::<f32>::new(src_ratio, 2.0, params, frames, channels) else {
        log::warn!("p2o: failed to construct one-shot resampler, zero-filling");
        return vec![0.0; frames_per_transfer * channels];
    };

    let Ok(resampled) = resampler.process(&deinterleaved, None) else {
        log::warn!("p2o: one-shot resample failed, zero-filling");
        return vec![0.0; frames_per_transfer * channels];
    };

    let produced_frames = resampled.first().map_or(0, Vec::len);
    if produced_frames != frames_per_transfer {
        log::warn!("p2o: resampler produced {produced_frames} frames, expected {frames_per_transfer}");
    }

    let mut out = vec![0.0f32; frames_per_transfer * channels];
    for (channel, channel_samples) in resampled.iter().enumerate() {
        for (frame, &sample) in channel_samples.iter().take(frames_per_transfer).enumerate() {
            out[frame * channels + channel] = sample;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_frame_count() {
        let channels = 2;
        let frames = 14;
        let frames_per_transfer = 28;
        let partial: Vec<f32> = (0..frames * channels).map(|i| (i as f32 * 0.01).sin()).collect();

        let out = one_shot_resample(&partial, frames, channels, frames_per_transfer);
        assert_eq!(out.len(), frames_per_transfer * channels);
    }

    #[test]
    fn zero_input_frames_yields_silence() {
        let out = one_shot_resample(&[], 0, 2, 28);
        assert_eq!(out.len(), 56);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
