//! Sample codec and channel conversion.

/// Scale applied to negative samples when encoding.
const NEGATIVE_FULL_SCALE: f32 = 32768.0;

/// Scale applied to non-negative samples when encoding.
///
/// Using 32767 here keeps +1.0 inside `i16` range.
const POSITIVE_FULL_SCALE: f32 = 32767.0;

/// Converts a 16-bit PCM sample to a normalized float.
///
/// Output is in the range [-1.0, 1.0]: `i16::MIN` maps exactly to -1.0 and
/// `i16::MAX` to just under 1.0.
#[inline]
pub fn decode_sample(sample: i16) -> f32 {
    (f32::from(sample) / NEGATIVE_FULL_SCALE).clamp(-1.0, 1.0)
}

/// Converts a normalized float sample to 16-bit PCM.
///
/// Input is clamped to [-1.0, 1.0] first. Negative values scale by 32768 and
/// non-negative values by 32767, so both -1.0 and +1.0 land exactly on the
/// `i16` extremes. NaN encodes as silence.
#[inline]
pub fn encode_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * NEGATIVE_FULL_SCALE) as i16
    } else {
        (clamped * POSITIVE_FULL_SCALE) as i16
    }
}

/// Batch decodes 16-bit PCM samples.
pub fn decode_slice(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| decode_sample(s)).collect()
}

/// Decodes into a caller-provided buffer without allocating.
///
/// Converts `min(input.len(), output.len())` samples and returns that count.
pub fn decode_into(input: &[i16], output: &mut [f32]) -> usize {
    let n = input.len().min(output.len());
    for (out, &s) in output[..n].iter_mut().zip(input) {
        *out = decode_sample(s);
    }
    n
}

/// Batch encodes normalized float samples to 16-bit PCM.
pub fn encode_slice(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

/// Downmixes interleaved audio to mono by averaging each frame.
///
/// A trailing partial frame is ignored. `channels <= 1` copies the input.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let mut mono = Vec::with_capacity(interleaved.len() / usize::from(channels.max(1)));
    downmix_into(interleaved, channels, &mut mono);
    mono
}

/// Appends the mono downmix of `interleaved` to `out`.
pub fn downmix_into(interleaved: &[f32], channels: u16, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / f32::from(channels);
    out.extend(
        interleaved
            .chunks_exact(usize::from(channels))
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Converts stereo samples to mono by averaging channels.
pub fn stereo_to_mono(stereo: &[f32]) -> Vec<f32> {
    downmix(stereo, 2)
}

/// Copies each mono sample into every channel of an interleaved buffer.
///
/// Writes `min(mono.len(), interleaved.len() / channels)` frames and returns
/// the number of frames written.
pub fn fan_out(mono: &[f32], channels: u16, interleaved: &mut [f32]) -> usize {
    let channels = usize::from(channels.max(1));
    let mut frames = 0;
    for (frame, &sample) in interleaved.chunks_exact_mut(channels).zip(mono) {
        frame.fill(sample);
        frames += 1;
    }
    frames
}
