//! Mock audio source for testing without hardware.

use std::time::Duration;

use crate::config::SOURCE_SAMPLE_RATE;
use crate::format::encode_slice;
use crate::AudioFrame;

/// A mock audio source that generates synthetic audio for testing.
///
/// Produces interleaved float samples exactly as a host input callback
/// would, so tests can drive the capture input without a microphone. Mono
/// sources can also be cut into wire frames for the playback side.
///
/// # Example
///
/// ```
/// use voice_stream::source::MockSource;
///
/// let mut mock = MockSource::wire();
///
/// // 100ms of silence, then 100ms of a 440Hz tone
/// mock.generate_silence(100);
/// mock.generate_sine(440.0, 100);
///
/// let frames = mock.into_frames(4096);
/// assert_eq!(frames.len(), 2);
/// ```
pub struct MockSource {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
    seed: u32,
}

impl MockSource {
    /// Creates a new mock source with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            samples: Vec::new(),
            seed: 12345,
        }
    }

    /// Creates a mock source at the wire format (24kHz mono).
    pub fn wire() -> Self {
        Self::new(SOURCE_SAMPLE_RATE, 1)
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0.0);
    }

    /// Generates a full-scale sine wave at the given frequency.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        self.generate_tone(frequency, 1.0, duration_ms);
    }

    /// Generates a sine wave with the given peak amplitude (0.0..=1.0).
    pub fn generate_tone(&mut self, frequency: f64, amplitude: f64, duration_ms: u64) {
        let num_frames = self.samples_for_duration(duration_ms) / usize::from(self.channels);
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let value = (amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32;

            // Same sample on every channel
            for _ in 0..self.channels {
                self.samples.push(value);
            }
        }
    }

    /// Generates deterministic white noise for the given duration.
    pub fn generate_noise(&mut self, duration_ms: u64, amplitude: f64) {
        let num_samples = self.samples_for_duration(duration_ms);
        let amplitude = amplitude as f32;

        // Simple LCG for reproducible noise; the seed carries across calls
        for _ in 0..num_samples {
            self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let random = ((self.seed >> 16) & 0xFFFF) as f32 / 32768.0 - 1.0;
            self.samples.push(random * amplitude);
        }
    }

    /// Adds raw samples directly.
    pub fn add_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Takes all accumulated samples, clearing the internal buffer.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    /// Returns a reference to the accumulated samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the duration of accumulated samples.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Encodes the accumulated audio into numbered frames of `frame_len`
    /// samples, as a transport would deliver them.
    ///
    /// The last frame may be shorter. Multi-channel audio is encoded as-is,
    /// so only mono sources produce valid wire frames.
    pub fn into_frames(self, frame_len: usize) -> Vec<AudioFrame> {
        self.samples
            .chunks(frame_len.max(1))
            .enumerate()
            .map(|(i, chunk)| AudioFrame::with_sequence(encode_slice(chunk), self.sample_rate, i as u64))
            .collect()
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * usize::from(self.channels)
    }
}
