//! Configuration types for the capture and playback pipelines.

use std::time::Duration;

use crate::StreamError;

/// Sample rate of every frame on the wire, in Hz.
pub const SOURCE_SAMPLE_RATE: u32 = 24_000;

/// Samples per outbound capture frame.
pub const CAPTURE_BLOCK_SIZE: usize = 4096;

/// Audio that must be buffered before playback starts.
pub const MIN_BUFFERED: Duration = Duration::from_millis(150);

/// Audio kept at most in the jitter buffer; older samples are dropped.
pub const MAX_BUFFERED: Duration = Duration::from_millis(500);

/// Storage reserved for the jitter buffer.
pub const RING_CAPACITY: Duration = Duration::from_secs(3);

/// Largest render quantum preallocated for interleaved output, in frames.
pub const MAX_QUANTUM: usize = 4096;

/// Smallest startup threshold that still lets the converter interpolate.
const MIN_INTERPOLATION_WINDOW: usize = 2;

/// Converts a duration to a whole number of samples at `sample_rate`.
pub(crate) fn frames_for(duration: Duration, sample_rate: u32) -> usize {
    (f64::from(sample_rate) * duration.as_secs_f64()).round() as usize
}

/// Playback-side configuration.
///
/// Durations are measured in source-rate audio.
///
/// # Example
///
/// ```
/// use voice_stream::PlaybackConfig;
///
/// let config = PlaybackConfig::with_output_rate(48_000);
/// assert_eq!(config.min_buffered_frames(), 3_600);
/// assert_eq!(config.max_buffered_frames(), 12_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Rate of the inbound frames. Default: 24000 Hz.
    pub source_sample_rate: u32,

    /// Native rate of the rendering host. Default: 48000 Hz.
    pub output_sample_rate: u32,

    /// Startup threshold before leaving `Buffering`. Default: 150ms.
    pub min_buffered: Duration,

    /// Upper bound on buffered audio; overflow drops the oldest samples.
    /// Default: 500ms.
    pub max_buffered: Duration,

    /// Storage reserved for the jitter buffer and the producer handoff queue.
    /// Raised to `max_buffered` if smaller. Default: 3s.
    pub ring_capacity: Duration,

    /// Largest quantum passed to `render_interleaved`, in frames. Larger
    /// quanta grow the renderer's mono scratch on the audio thread.
    /// Default: 4096.
    pub max_quantum: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            source_sample_rate: SOURCE_SAMPLE_RATE,
            output_sample_rate: 48_000,
            min_buffered: MIN_BUFFERED,
            max_buffered: MAX_BUFFERED,
            ring_capacity: RING_CAPACITY,
            max_quantum: MAX_QUANTUM,
        }
    }
}

impl PlaybackConfig {
    /// Default configuration rendering at the given host rate.
    pub fn with_output_rate(output_sample_rate: u32) -> Self {
        Self {
            output_sample_rate,
            ..Self::default()
        }
    }

    /// Startup threshold in source samples.
    pub fn min_buffered_frames(&self) -> usize {
        frames_for(self.min_buffered, self.source_sample_rate)
    }

    /// Overflow threshold in source samples.
    pub fn max_buffered_frames(&self) -> usize {
        frames_for(self.max_buffered, self.source_sample_rate)
    }

    /// Jitter buffer capacity in source samples.
    pub fn capacity_frames(&self) -> usize {
        frames_for(self.ring_capacity, self.source_sample_rate).max(self.max_buffered_frames())
    }

    /// Checks that the thresholds describe a usable stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] for zero rates, a startup
    /// threshold below two samples, or a startup threshold above the
    /// overflow threshold.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.source_sample_rate == 0 || self.output_sample_rate == 0 {
            return Err(StreamError::invalid_config("sample rates must be non-zero"));
        }
        let min = self.min_buffered_frames();
        let max = self.max_buffered_frames();
        if min < MIN_INTERPOLATION_WINDOW {
            return Err(StreamError::invalid_config(format!(
                "min_buffered must cover at least {MIN_INTERPOLATION_WINDOW} samples, got {min}"
            )));
        }
        if min > max {
            return Err(StreamError::invalid_config(format!(
                "min_buffered ({min} samples) exceeds max_buffered ({max} samples)"
            )));
        }
        Ok(())
    }
}

/// Capture-side configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Samples per outbound frame. Default: 4096.
    pub block_size: usize,

    /// Rate of the audio handed to [`CaptureInput`](crate::CaptureInput).
    /// Converted to [`SOURCE_SAMPLE_RATE`] before chunking. Default: 24000 Hz.
    pub input_sample_rate: u32,

    /// Interleaved channel count of the captured audio. Default: 1.
    pub input_channels: u16,

    /// How often the capture bridge drains the handoff queue. Default: 20ms.
    pub poll_interval: Duration,

    /// Audio the handoff queue holds before dropping input. Default: 3s.
    pub handoff_capacity: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            block_size: CAPTURE_BLOCK_SIZE,
            input_sample_rate: SOURCE_SAMPLE_RATE,
            input_channels: 1,
            poll_interval: Duration::from_millis(20),
            handoff_capacity: RING_CAPACITY,
        }
    }
}

impl CaptureConfig {
    /// Handoff queue capacity in interleaved samples.
    pub fn handoff_samples(&self) -> usize {
        frames_for(self.handoff_capacity, self.input_sample_rate).max(1)
            * usize::from(self.input_channels.max(1))
    }

    /// Checks that the capture parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] for a zero block size, rate,
    /// channel count or poll interval.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.block_size == 0 {
            return Err(StreamError::invalid_config("block_size must be non-zero"));
        }
        if self.input_sample_rate == 0 {
            return Err(StreamError::invalid_config("input_sample_rate must be non-zero"));
        }
        if self.input_channels == 0 {
            return Err(StreamError::invalid_config("input_channels must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(StreamError::invalid_config("poll_interval must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration for a full streaming session.
///
/// Use [`StreamConfig::default()`] for the wire defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use voice_stream::{PlaybackConfig, StreamConfig};
///
/// let config = StreamConfig {
///     playback: PlaybackConfig::with_output_rate(44_100),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Outbound pipeline settings.
    pub capture: CaptureConfig,

    /// Inbound pipeline settings.
    pub playback: PlaybackConfig,

    /// Number of attempts for a failed sink write.
    ///
    /// Default: 3
    pub sink_retry_attempts: u32,

    /// Initial delay between sink retry attempts.
    ///
    /// Uses exponential backoff (delay doubles each attempt).
    /// Default: 50ms
    pub sink_retry_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            sink_retry_attempts: 3,
            sink_retry_delay: Duration::from_millis(50),
        }
    }
}

impl StreamConfig {
    /// Validates both pipelines.
    ///
    /// # Errors
    ///
    /// Returns the first [`StreamError::InvalidConfig`] found.
    pub fn validate(&self) -> Result<(), StreamError> {
        self.capture.validate()?;
        self.playback.validate()
    }
}
