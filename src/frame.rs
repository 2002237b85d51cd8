//! PCM audio frame exchanged with the transport collaborator.

use std::sync::Arc;
use std::time::Duration;

use crate::format::decode_sample;

/// An immutable block of mono 16-bit PCM samples.
///
/// `AudioFrame` is the only unit crossing the pipeline boundary: the capture
/// side emits one per completed block, and the playback side consumes
/// whatever the transport delivers.
///
/// Samples are stored in an `Arc<Vec<i16>>` so a frame can be handed to
/// several sinks without copying.
///
/// # Example
///
/// ```
/// use voice_stream::AudioFrame;
/// use std::time::Duration;
///
/// let frame = AudioFrame::new(vec![0i16; 2400], 24_000);
/// assert_eq!(frame.duration(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// PCM samples, single channel.
    pub samples: Arc<Vec<i16>>,

    /// Sample rate in Hz (24000 by wire contract).
    pub sample_rate: u32,

    /// Position of this frame in its stream, starting at 0.
    pub sequence: u64,
}

impl AudioFrame {
    /// Creates a frame with sequence number 0.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self::with_sequence(samples, sample_rate, 0)
    }

    /// Creates a frame with an explicit sequence number.
    pub fn with_sequence(samples: Vec<i16>, sample_rate: u32, sequence: u64) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            sequence,
        }
    }

    /// Creates a frame from pre-wrapped samples.
    pub fn from_arc(samples: Arc<Vec<i16>>, sample_rate: u32, sequence: u64) -> Self {
        Self {
            samples,
            sample_rate,
            sequence,
        }
    }

    /// Returns the playback duration of this frame.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if this frame contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Decodes the frame to normalized float samples.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| decode_sample(s)).collect()
    }
}
