//! Streaming sample rate conversion.
//!
//! Linear interpolation over a [`JitterBuffer`], advancing a fractional read
//! cursor by a fixed ratio. Fast and click-free for speech; not intended for
//! high-fidelity music.

use crate::pipeline::JitterBuffer;

/// `source_rate / output_rate`, fixed for the lifetime of a stream.
///
/// The ratio is computed once and never adjusted, so a host clock that
/// drifts from its nominal rate accumulates a small timing error over long
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRatio(f64);

impl ConversionRatio {
    /// Computes the ratio, or `None` if either rate is zero.
    pub fn new(source_rate: u32, output_rate: u32) -> Option<Self> {
        if source_rate == 0 || output_rate == 0 {
            return None;
        }
        Some(Self(f64::from(source_rate) / f64::from(output_rate)))
    }

    /// Source samples consumed per output sample.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` when no conversion takes place.
    pub fn is_identity(self) -> bool {
        (self.0 - 1.0).abs() < f64::EPSILON
    }
}

/// Linear-interpolating resampler with a persistent fractional cursor.
///
/// The converter holds no samples itself; it reads the two samples that
/// bracket its position from the buffer and consumes whole samples as the
/// position crosses 1.0.
#[derive(Debug, Clone)]
pub struct RateConverter {
    ratio: ConversionRatio,
    position: f64,
}

impl RateConverter {
    /// Creates a converter at position 0.
    pub fn new(ratio: ConversionRatio) -> Self {
        Self {
            ratio,
            position: 0.0,
        }
    }

    /// The fixed conversion ratio.
    pub fn ratio(&self) -> ConversionRatio {
        self.ratio
    }

    /// Fractional offset between the first two buffered samples.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Forgets the fractional position.
    ///
    /// Called whenever the buffer drops samples, so the next output does not
    /// interpolate across the gap.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Produces one output sample.
    ///
    /// Returns `None` without touching the buffer's contents when fewer than
    /// two samples are available to interpolate between.
    #[inline]
    pub fn next_sample(&mut self, buffer: &mut JitterBuffer) -> Option<f32> {
        // Whole steps left over from a previous call that ran the buffer dry.
        while self.position >= 1.0 && buffer.consume(1) == 1 {
            self.position -= 1.0;
        }

        let current = buffer.peek(0)?;
        let next = buffer.peek(1)?;

        let frac = self.position as f32;
        let sample = current + (next - current) * frac;

        self.position += self.ratio.value();
        while self.position >= 1.0 && buffer.consume(1) == 1 {
            self.position -= 1.0;
        }

        Some(sample)
    }

    /// Fills `output` until it is full or the buffer underruns.
    ///
    /// Returns the number of samples written; the rest of `output` is left
    /// untouched.
    pub fn process(&mut self, buffer: &mut JitterBuffer, output: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in output.iter_mut() {
            let Some(sample) = self.next_sample(buffer) else {
                break;
            };
            *slot = sample;
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(source: u32, output: u32) -> RateConverter {
        RateConverter::new(ConversionRatio::new(source, output).unwrap())
    }

    fn filled(samples: &[f32]) -> JitterBuffer {
        let mut buffer = JitterBuffer::new(samples.len().max(1), samples.len().max(1));
        buffer.push(samples);
        buffer
    }

    #[test]
    fn test_ratio() {
        let ratio = ConversionRatio::new(24_000, 48_000).unwrap();
        assert_eq!(ratio.value(), 0.5);
        assert!(!ratio.is_identity());
        assert!(ConversionRatio::new(24_000, 24_000).unwrap().is_identity());
    }

    #[test]
    fn test_ratio_rejects_zero() {
        assert!(ConversionRatio::new(0, 48_000).is_none());
        assert!(ConversionRatio::new(24_000, 0).is_none());
    }

    #[test]
    fn test_identity_reproduces_input() {
        let input: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();
        let mut buffer = filled(&input);
        let mut conv = converter(24_000, 24_000);

        let mut output = vec![0.0; input.len()];
        let written = conv.process(&mut buffer, &mut output);

        // The final sample has no successor to interpolate towards.
        assert_eq!(written, input.len() - 1);
        assert_eq!(&output[..written], &input[..written]);
        assert_eq!(buffer.available(), 1);
    }

    #[test]
    fn test_upsample_interpolates_midpoints() {
        let mut buffer = filled(&[0.0, 1.0, 0.0]);
        let mut conv = converter(1, 2);

        let mut output = [9.0; 6];
        let written = conv.process(&mut buffer, &mut output);

        assert_eq!(written, 4);
        assert_eq!(&output[..4], &[0.0, 0.5, 1.0, 0.5]);
        assert_eq!(output[4], 9.0);
    }

    #[test]
    fn test_downsample_skips_samples() {
        let input: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let mut buffer = filled(&input);
        let mut conv = converter(2, 1);

        let mut output = [0.0; 8];
        let written = conv.process(&mut buffer, &mut output);

        assert_eq!(&output[..written], &[0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_needs_two_samples() {
        let mut buffer = filled(&[0.5]);
        let mut conv = converter(24_000, 48_000);
        assert_eq!(conv.next_sample(&mut buffer), None);
        assert_eq!(buffer.available(), 1);
    }

    #[test]
    fn test_position_persists_across_pushes() {
        let mut buffer = JitterBuffer::new(16, 16);
        let mut conv = converter(2, 3);
        buffer.push(&[0.0, 3.0]);

        let mut first = [0.0; 4];
        let n = conv.process(&mut buffer, &mut first);
        assert_eq!(n, 2);
        assert!(conv.position() > 0.0);

        buffer.push(&[6.0, 9.0]);
        let sample = conv.next_sample(&mut buffer).unwrap();
        // Positions advance by 2/3: 0, 2/3, 4/3 -> 4.0 on the 0..9 ramp.
        assert!((sample - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_reset_clears_position() {
        let mut buffer = filled(&[0.0, 1.0, 2.0]);
        let mut conv = converter(1, 4);
        conv.next_sample(&mut buffer);
        assert!(conv.position() > 0.0);
        conv.reset();
        assert_eq!(conv.position(), 0.0);
    }

    #[test]
    fn test_large_ratio_settles_pending_steps() {
        let mut buffer = JitterBuffer::new(16, 16);
        let mut conv = converter(3, 1);
        buffer.push(&[0.0, 1.0]);
        assert_eq!(conv.next_sample(&mut buffer), Some(0.0));
        // Consumed both samples with one step still owed.
        assert_eq!(buffer.available(), 0);

        buffer.push(&[2.0, 3.0, 4.0]);
        assert_eq!(conv.next_sample(&mut buffer), Some(3.0));
    }
}
