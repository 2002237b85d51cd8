//! Capture bridge - drains the input queue, converts to the wire format and
//! forwards finished frames to the router.
//!
//! ```text
//! host input → CaptureInput ──SPSC queue──▶ CaptureBridge → Router → Sinks
//!              (interleaved f32)            (downmix, 24 kHz, 4096-sample blocks)
//! ```
//!
//! [`CaptureInput::push`] is the only part that runs on the audio thread. It
//! never blocks, allocates or logs. Everything else happens in the bridge task.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::mpsc;

use crate::config::SOURCE_SAMPLE_RATE;
use crate::event::{emit, EventCallback};
use crate::format::{decode_sample, downmix_into, ConversionRatio, RateConverter};
use crate::pipeline::{BlockChunker, JitterBuffer};
use crate::session::SessionState;
use crate::{AudioFrame, CaptureConfig, StreamError, StreamEvent};

/// Interleaved frames pulled from the handoff queue per step.
const READ_FRAMES: usize = 1024;

/// Audio-thread half of the capture pipeline.
///
/// Accepts interleaved samples at the configured input rate and channel
/// count. Only whole frames are queued; when the queue is full the newest
/// audio is dropped and counted.
pub struct CaptureInput {
    producer: ringbuf::HeapProd<f32>,
    channels: u16,
    scratch: Vec<f32>,
    state: Arc<SessionState>,
}

impl CaptureInput {
    /// Queues interleaved float samples for the bridge.
    ///
    /// Returns the number of samples queued. A trailing partial frame and
    /// anything that does not fit are dropped.
    pub fn push(&mut self, interleaved: &[f32]) -> usize {
        let channels = usize::from(self.channels);
        let room = self.producer.vacant_len() / channels * channels;
        let whole = interleaved.len() - interleaved.len() % channels;

        let pushed = self.producer.push_slice(&interleaved[..whole.min(room)]);

        let dropped = interleaved.len() - pushed;
        if dropped > 0 {
            self.state
                .capture_dropped
                .fetch_add(dropped as u64, Ordering::SeqCst);
        }
        pushed
    }

    /// Decodes and queues interleaved 16-bit samples.
    ///
    /// The decode buffer grows to the largest callback seen and is reused.
    pub fn push_i16(&mut self, interleaved: &[i16]) -> usize {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend(interleaved.iter().map(|&s| decode_sample(s)));
        let pushed = self.push(&scratch);
        self.scratch = scratch;
        pushed
    }

    /// Interleaved channel count expected by [`push`](Self::push).
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples waiting for the bridge.
    pub fn queued(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Streaming conversion from the input rate to the wire rate.
///
/// Reuses the jitter buffer as a drain-mode FIFO: every batch is pushed and
/// then converted until fewer than two samples remain.
struct InputResampler {
    buffer: JitterBuffer,
    converter: RateConverter,
}

impl InputResampler {
    fn new(ratio: ConversionRatio) -> Self {
        // One read batch plus the interpolation tail never exceeds this.
        let capacity = READ_FRAMES * 2;
        Self {
            buffer: JitterBuffer::new(capacity, capacity),
            converter: RateConverter::new(ratio),
        }
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        self.buffer.push(input);
        while let Some(sample) = self.converter.next_sample(&mut self.buffer) {
            output.push(sample);
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.converter.reset();
    }
}

/// Task-side half of the capture pipeline.
///
/// Drains the handoff queue, downmixes to mono, converts to 24 kHz when the
/// input runs at another rate and cuts the result into fixed-size frames.
pub struct CaptureBridge {
    consumer: ringbuf::HeapCons<f32>,
    channels: u16,
    read_buf: Box<[f32]>,
    mono: Vec<f32>,
    resampled: Vec<f32>,
    resampler: Option<InputResampler>,
    chunker: BlockChunker,
    state: Arc<SessionState>,
    poll_interval: Duration,
    event_callback: Option<EventCallback>,
    reported_dropped: u64,
}

impl CaptureBridge {
    /// Converts everything currently queued and returns the finished frames.
    ///
    /// Samples that do not complete a block stay buffered for the next call.
    pub fn process_available(&mut self) -> Vec<AudioFrame> {
        let mut frames = Vec::new();

        loop {
            let n = self.consumer.pop_slice(&mut self.read_buf);
            if n == 0 {
                break;
            }

            self.mono.clear();
            downmix_into(&self.read_buf[..n], self.channels, &mut self.mono);

            let samples: &[f32] = match self.resampler.as_mut() {
                Some(resampler) => {
                    self.resampled.clear();
                    resampler.process(&self.mono, &mut self.resampled);
                    &self.resampled
                }
                None => &self.mono,
            };

            self.state
                .samples_captured
                .fetch_add(samples.len() as u64, Ordering::SeqCst);
            self.chunker.push_with(samples, |frame| frames.push(frame));
        }

        frames
    }

    /// Runs the bridge until the session stops or the router goes away.
    ///
    /// On shutdown the partial block and anything still queued are
    /// discarded. A bridge from [`capture_channel`] never sees a session
    /// stop; it runs until `frame_tx` is closed or the task is aborted.
    pub async fn run(mut self, frame_tx: mpsc::Sender<AudioFrame>) {
        let mut interval = tokio::time::interval(self.poll_interval);

        while self.state.running.load(Ordering::SeqCst) {
            interval.tick().await;
            self.report_overflow();

            for frame in self.process_available() {
                let sequence = frame.sequence;
                if frame_tx.send(frame).await.is_err() {
                    tracing::debug!("Frame channel closed, stopping capture bridge");
                    return;
                }

                let sent = self.state.frames_sent.fetch_add(1, Ordering::SeqCst) + 1;
                if sent % 50 == 0 {
                    tracing::debug!(sequence, frames_sent = sent, "Capture bridge forwarded frame");
                }
            }
        }

        let discarded = self.chunker.buffered() + self.consumer.occupied_len();
        self.reset();
        tracing::debug!(discarded, "Capture bridge stopped");
    }

    /// Discards queued input, the resampler tail and the partial block.
    pub fn reset(&mut self) {
        self.consumer.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.chunker.reset();
    }

    /// Samples waiting for the current block to complete.
    pub fn buffered(&self) -> usize {
        self.chunker.buffered()
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.chunker.frames_emitted()
    }

    /// Sets the callback for capture events.
    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    /// Reports input lost on the audio thread since the last check.
    fn report_overflow(&mut self) {
        let total = self.state.capture_dropped.load(Ordering::SeqCst);
        let dropped = total - self.reported_dropped;
        if dropped == 0 {
            return;
        }
        self.reported_dropped = total;

        tracing::warn!(dropped, total, "Capture queue full, input audio lost");
        emit(
            self.event_callback.as_ref(),
            StreamEvent::CaptureOverflow {
                dropped_samples: dropped,
            },
        );
    }
}

/// Creates a connected capture input and bridge.
///
/// # Errors
///
/// Returns [`StreamError::InvalidConfig`] if the configuration does not validate.
///
/// # Example
///
/// ```
/// use voice_stream::{capture_channel, CaptureConfig};
///
/// let (mut input, mut bridge) = capture_channel(&CaptureConfig::default()).unwrap();
///
/// input.push(&vec![0.25; 5000]);
/// let frames = bridge.process_available();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].len(), 4096);
/// assert_eq!(bridge.buffered(), 904);
/// ```
pub fn capture_channel(config: &CaptureConfig) -> Result<(CaptureInput, CaptureBridge), StreamError> {
    capture_channel_with(config, Arc::new(SessionState::new()), None)
}

/// Creates a capture input and bridge sharing session counters.
pub(crate) fn capture_channel_with(
    config: &CaptureConfig,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
) -> Result<(CaptureInput, CaptureBridge), StreamError> {
    config.validate()?;

    let ratio = ConversionRatio::new(config.input_sample_rate, SOURCE_SAMPLE_RATE)
        .ok_or_else(|| StreamError::invalid_config("input_sample_rate must be non-zero"))?;
    let resampler = (!ratio.is_identity()).then(|| InputResampler::new(ratio));

    let ring = HeapRb::<f32>::new(config.handoff_samples());
    let (producer, consumer) = ring.split();

    tracing::debug!(
        input_rate = config.input_sample_rate,
        input_channels = config.input_channels,
        block_size = config.block_size,
        resampling = resampler.is_some(),
        "Capture channel created"
    );

    let input = CaptureInput {
        producer,
        channels: config.input_channels,
        scratch: Vec::new(),
        state: Arc::clone(&state),
    };
    let bridge = CaptureBridge {
        consumer,
        channels: config.input_channels,
        read_buf: vec![0.0; READ_FRAMES * usize::from(config.input_channels)].into_boxed_slice(),
        mono: Vec::with_capacity(READ_FRAMES),
        resampled: Vec::new(),
        resampler,
        chunker: BlockChunker::new(config.block_size, SOURCE_SAMPLE_RATE),
        state,
        poll_interval: config.poll_interval,
        event_callback,
        reported_dropped: 0,
    };

    Ok((input, bridge))
}
