//! Playback scheduler: startup gating, underrun recovery and resampling.

use crate::format::{decode_sample, ConversionRatio, RateConverter};
use crate::pipeline::JitterBuffer;
use crate::{AudioFrame, PlaybackConfig, StreamError};

/// Playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Waiting for `min_buffered` samples; output is silence.
    #[default]
    Buffering,
    /// Resampling buffered audio to the output.
    Playing,
}

/// What happened during one [`PlaybackScheduler::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderReport {
    /// Output samples taken from buffered audio; the rest were silence.
    pub rendered: usize,
    /// The scheduler left `Buffering` at the start of this quantum.
    pub started: bool,
    /// The buffer ran dry during this quantum and the scheduler went back to
    /// `Buffering`.
    pub underrun: bool,
}

/// Drives the jitter buffer and rate converter from the render clock.
///
/// Holds everything the render context owns: buffered samples, the
/// converter's fractional cursor and the current [`PlaybackState`].
/// Both feeding ([`push`](Self::push)) and drawing ([`render`](Self::render))
/// take `&mut self`, so a scheduler used from two threads must go through
/// [`playback_channel`](crate::playback_channel).
#[derive(Debug)]
pub struct PlaybackScheduler {
    buffer: JitterBuffer,
    converter: RateConverter,
    state: PlaybackState,
    min_buffered: usize,
    source_sample_rate: u32,
}

impl PlaybackScheduler {
    /// Creates a scheduler in the `Buffering` state.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(config: &PlaybackConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let ratio = ConversionRatio::new(config.source_sample_rate, config.output_sample_rate)
            .ok_or_else(|| StreamError::invalid_config("sample rates must be non-zero"))?;

        Ok(Self {
            buffer: JitterBuffer::from_config(config),
            converter: RateConverter::new(ratio),
            state: PlaybackState::Buffering,
            min_buffered: config.min_buffered_frames(),
            source_sample_rate: config.source_sample_rate,
        })
    }

    /// Appends decoded samples to the jitter buffer.
    ///
    /// Returns the number of old samples dropped to respect `max_buffered`.
    /// When anything is dropped the converter restarts at the new read
    /// position.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let dropped = self.buffer.push(samples);
        if dropped > 0 {
            self.converter.reset();
        }
        dropped
    }

    /// Decodes and appends a PCM frame.
    ///
    /// Empty frames and frames at the wrong rate are ignored. Returns the
    /// number of old samples dropped.
    pub fn push_frame(&mut self, frame: &AudioFrame) -> usize {
        if frame.is_empty() {
            return 0;
        }
        if frame.sample_rate != self.source_sample_rate {
            tracing::warn!(
                expected = self.source_sample_rate,
                got = frame.sample_rate,
                sequence = frame.sequence,
                "Ignoring frame at unexpected sample rate"
            );
            return 0;
        }
        let decoded: Vec<f32> = frame.samples.iter().map(|&s| decode_sample(s)).collect();
        self.push(&decoded)
    }

    /// Fills one quantum of output at the host rate.
    ///
    /// Never blocks or allocates. Samples not backed by buffered audio are
    /// written as silence.
    pub fn render(&mut self, output: &mut [f32]) -> RenderReport {
        let mut report = RenderReport::default();

        if self.state == PlaybackState::Buffering {
            if self.buffer.available() < self.min_buffered {
                output.fill(0.0);
                return report;
            }
            self.state = PlaybackState::Playing;
            report.started = true;
        }

        let written = self.converter.process(&mut self.buffer, output);
        report.rendered = written;

        if written < output.len() {
            output[written..].fill(0.0);
            self.state = PlaybackState::Buffering;
            report.underrun = true;
        }

        report
    }

    /// Clears buffered audio and returns to `Buffering`.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.converter.reset();
        self.state = PlaybackState::Buffering;
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Source samples waiting to be played.
    pub fn buffered(&self) -> usize {
        self.buffer.available()
    }

    /// Startup threshold in source samples.
    pub fn min_buffered(&self) -> usize {
        self.min_buffered
    }

    /// The fixed source-to-output ratio.
    pub fn ratio(&self) -> ConversionRatio {
        self.converter.ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scheduler(output_rate: u32) -> PlaybackScheduler {
        PlaybackScheduler::new(&PlaybackConfig::with_output_rate(output_rate)).unwrap()
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len).map(|i| 0.5 * (i as f32 * 0.05).sin() + 0.25).collect()
    }

    #[test]
    fn test_starts_buffering() {
        let s = scheduler(48_000);
        assert_eq!(s.state(), PlaybackState::Buffering);
        assert_eq!(s.min_buffered(), 3_600);
        assert_eq!(s.ratio().value(), 0.5);
    }

    #[test]
    fn test_startup_gating_emits_silence() {
        let mut s = scheduler(48_000);
        s.push(&vec![0.8; 1_000]);

        for _ in 0..10 {
            let mut out = [1.0f32; 128];
            let report = s.render(&mut out);
            assert!(out.iter().all(|&x| x == 0.0));
            assert_eq!(report, RenderReport::default());
        }
        assert_eq!(s.state(), PlaybackState::Buffering);
        assert_eq!(s.buffered(), 1_000);
    }

    #[test]
    fn test_transitions_to_playing_at_threshold() {
        let mut s = scheduler(48_000);
        s.push(&vec![0.5; 3_600]);

        let mut out = [0.0f32; 128];
        let report = s.render(&mut out);

        assert!(report.started);
        assert!(!report.underrun);
        assert_eq!(report.rendered, 128);
        assert_eq!(s.state(), PlaybackState::Playing);
        assert!(out.iter().all(|&x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_underrun_returns_to_buffering() {
        let mut s = scheduler(24_000);
        s.push(&tone(3_600));

        let mut out = [0.0f32; 128];
        let mut quanta = 0;
        loop {
            let report = s.render(&mut out);
            quanta += 1;
            if report.underrun {
                // 3599 interpolated samples, 28 quanta of 128 then 15 in the last.
                assert_eq!(report.rendered, 3_599 - 28 * 128);
                assert!(out[report.rendered..].iter().all(|&x| x == 0.0));
                break;
            }
            assert!(quanta < 100, "never underran");
        }
        assert_eq!(s.state(), PlaybackState::Buffering);
        assert!(s.buffered() < 2);

        // Below the threshold again: silence until refilled.
        s.push(&tone(1_000));
        let mut out = [1.0f32; 128];
        let report = s.render(&mut out);
        assert_eq!(report.rendered, 0);
        assert!(out.iter().all(|&x| x == 0.0));
        assert_eq!(s.state(), PlaybackState::Buffering);

        s.push(&tone(2_600));
        let report = s.render(&mut out);
        assert!(report.started);
        assert_eq!(s.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_identity_rate_passes_samples_through() {
        let mut s = scheduler(24_000);
        let input = tone(4_000);
        s.push(&input);

        let mut out = vec![0.0f32; 3_999];
        let report = s.render(&mut out);
        assert_eq!(report.rendered, 3_999);
        assert_eq!(out.as_slice(), &input[..3_999]);
    }

    #[test]
    fn test_overflow_resets_converter_position() {
        let mut s = scheduler(48_000);
        s.push(&tone(4_000));
        let mut out = [0.0f32; 3];
        s.render(&mut out);
        assert!(s.converter.position() > 0.0);

        let dropped = s.push(&tone(12_000));
        assert!(dropped > 0);
        assert_eq!(s.converter.position(), 0.0);
        assert_eq!(s.buffered(), 12_000);
    }

    #[test]
    fn test_overflow_trims_to_max_by_content() {
        let mut s = scheduler(24_000);
        let input: Vec<f32> = (0..12_500).map(|i| i as f32 / 20_000.0).collect();
        let dropped = s.push(&input);
        assert_eq!(dropped, 500);
        assert_eq!(s.buffered(), 12_000);

        let mut out = [0.0f32; 4];
        s.render(&mut out);
        assert_eq!(out[0], input[500]);
        assert_eq!(out[3], input[503]);
    }

    #[test]
    fn test_push_frame_decodes() {
        let mut s = scheduler(24_000);
        s.push_frame(&AudioFrame::new(vec![16384; 3_600], 24_000));
        let mut out = [0.0f32; 2];
        s.render(&mut out);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn test_empty_and_mismatched_frames_ignored() {
        let mut s = scheduler(48_000);
        assert_eq!(s.push_frame(&AudioFrame::new(vec![], 24_000)), 0);
        assert_eq!(s.push_frame(&AudioFrame::new(vec![1; 100], 16_000)), 0);
        assert_eq!(s.buffered(), 0);
        assert_eq!(s.state(), PlaybackState::Buffering);
    }

    #[test]
    fn test_reset() {
        let mut s = scheduler(48_000);
        s.push(&tone(5_000));
        let mut out = [0.0f32; 64];
        s.render(&mut out);
        assert_eq!(s.state(), PlaybackState::Playing);

        s.reset();
        assert_eq!(s.state(), PlaybackState::Buffering);
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PlaybackConfig {
            min_buffered: Duration::from_secs(2),
            ..PlaybackConfig::default()
        };
        assert!(PlaybackScheduler::new(&config).is_err());
    }
}
