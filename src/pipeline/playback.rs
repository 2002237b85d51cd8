//! Producer/renderer split of the playback pipeline.
//!
//! ```text
//! Transport → PlaybackProducer ──SPSC queue──▶ PlaybackRenderer → host output
//!             (decode i16 → f32)               (jitter buffer, resample)
//! ```
//!
//! The producer never touches the jitter buffer. The renderer drains the
//! queue into it at the start of every quantum, so the overflow trim, which
//! moves the read cursor, runs in the same context as the reads.
//!
//! A reset is ordered with the data: the request records how many samples
//! had been enqueued, and the renderer discards exactly that prefix of the
//! stream. Audio pushed after the request plays normally.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::event::{emit, EventCallback};
use crate::format::{decode_sample, fan_out};
use crate::pipeline::{PlaybackScheduler, PlaybackState, RenderReport};
use crate::session::SessionState;
use crate::{AudioFrame, PlaybackConfig, StreamError, StreamEvent};

/// Samples moved from the handoff queue to the jitter buffer per step.
const DRAIN_CHUNK: usize = 1024;

/// Network-side half of the playback pipeline.
///
/// Decodes inbound frames and hands them to the [`PlaybackRenderer`].
/// Pushing never blocks; if the renderer has stopped draining and the queue
/// is full, the newest samples are dropped and reported.
pub struct PlaybackProducer {
    producer: ringbuf::HeapProd<f32>,
    source_sample_rate: u32,
    scratch: Vec<f32>,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
}

impl PlaybackProducer {
    /// Decodes and enqueues a frame from the transport.
    ///
    /// Empty frames and frames at a rate other than the configured source
    /// rate are ignored. Returns the number of samples enqueued.
    pub fn push_frame(&mut self, frame: &AudioFrame) -> usize {
        if frame.sample_rate != self.source_sample_rate && !frame.is_empty() {
            tracing::warn!(
                expected = self.source_sample_rate,
                got = frame.sample_rate,
                sequence = frame.sequence,
                "Ignoring frame at unexpected sample rate"
            );
            return 0;
        }
        let pushed = self.push_samples(&frame.samples);
        if pushed > 0 {
            self.state.frames_received.fetch_add(1, Ordering::SeqCst);
        }
        pushed
    }

    /// Decodes and enqueues raw PCM samples at the source rate.
    ///
    /// Returns the number of samples enqueued.
    pub fn push_samples(&mut self, samples: &[i16]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        self.scratch.clear();
        self.scratch.extend(samples.iter().map(|&s| decode_sample(s)));
        let pushed = self.producer.push_slice(&self.scratch);

        self.state
            .playback_enqueued
            .fetch_add(pushed as u64, Ordering::SeqCst);
        self.state
            .samples_received
            .fetch_add(pushed as u64, Ordering::SeqCst);

        let dropped = samples.len() - pushed;
        if dropped > 0 {
            self.state
                .samples_dropped
                .fetch_add(dropped as u64, Ordering::SeqCst);
            tracing::warn!(dropped, "Playback handoff queue full, renderer not draining");
            emit(
                self.event_callback.as_ref(),
                StreamEvent::HandoffOverflow {
                    dropped_samples: dropped,
                },
            );
        }

        pushed
    }

    /// Discards everything pushed so far and returns playback to buffering.
    ///
    /// The renderer applies the reset at its next quantum. Samples pushed
    /// after this call are kept.
    pub fn stop(&self) {
        self.state.request_playback_reset();
    }

    /// Returns a cloneable handle that can also request a reset.
    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Samples waiting in the handoff queue.
    pub fn queued(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Cloneable control handle for the playback pipeline.
#[derive(Clone)]
pub struct PlaybackHandle {
    state: Arc<SessionState>,
}

impl PlaybackHandle {
    /// Discards everything pushed so far, like [`PlaybackProducer::stop`].
    pub fn stop(&self) {
        self.state.request_playback_reset();
    }

    /// Underruns observed so far.
    pub fn underruns(&self) -> u64 {
        self.state.underruns.load(Ordering::SeqCst)
    }
}

/// Render-side half of the playback pipeline.
///
/// Owns the jitter buffer, the rate converter and the playback state. Call
/// [`render`](Self::render) from the host's audio callback once per quantum.
pub struct PlaybackRenderer {
    consumer: ringbuf::HeapCons<f32>,
    scheduler: PlaybackScheduler,
    drain_buf: Box<[f32]>,
    mono: Vec<f32>,
    /// Samples taken from the handoff queue since creation.
    dequeued: u64,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
}

impl PlaybackRenderer {
    /// Fills one mono quantum at the output rate.
    ///
    /// Real-time safe: no locks, no I/O, no allocation.
    pub fn render(&mut self, output: &mut [f32]) -> RenderReport {
        if self.state.playback_reset.swap(false, Ordering::SeqCst) {
            self.discard_to_reset_mark();
        }

        self.drain_handoff();
        let buffered = self.scheduler.buffered();
        let report = self.scheduler.render(output);

        if report.started {
            tracing::debug!(buffered, "Playback started");
            emit(
                self.event_callback.as_ref(),
                StreamEvent::PlaybackStarted { buffered },
            );
        }
        if report.underrun {
            self.state.underruns.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(rendered = report.rendered, "Playback underrun, rebuffering");
            emit(
                self.event_callback.as_ref(),
                StreamEvent::PlaybackUnderrun {
                    frames_rendered: report.rendered,
                },
            );
        }

        report
    }

    /// Fills an interleaved buffer, copying the mono signal to every channel.
    ///
    /// A trailing partial frame is zeroed. The mono scratch is sized from
    /// [`PlaybackConfig::max_quantum`]; a larger quantum grows it once.
    pub fn render_interleaved(&mut self, output: &mut [f32], channels: u16) -> RenderReport {
        let channels = channels.max(1);
        let frames = output.len() / usize::from(channels);

        let mut mono = std::mem::take(&mut self.mono);
        if mono.len() < frames {
            mono.resize(frames, 0.0);
        }
        let report = self.render(&mut mono[..frames]);
        let written = fan_out(&mono[..frames], channels, output);
        output[written * usize::from(channels)..].fill(0.0);
        self.mono = mono;

        report
    }

    /// Moves everything queued by the producer into the jitter buffer.
    fn drain_handoff(&mut self) {
        let mut dropped = 0;
        loop {
            let n = self.consumer.pop_slice(&mut self.drain_buf);
            if n == 0 {
                break;
            }
            self.dequeued += n as u64;
            dropped += self.scheduler.push(&self.drain_buf[..n]);
        }

        if dropped > 0 {
            self.state.buffer_overflows.fetch_add(1, Ordering::SeqCst);
            self.state
                .samples_dropped
                .fetch_add(dropped as u64, Ordering::SeqCst);
            tracing::debug!(dropped, "Jitter buffer over limit, dropped oldest audio");
            emit(
                self.event_callback.as_ref(),
                StreamEvent::BufferOverflow {
                    dropped_samples: dropped,
                },
            );
        }
    }

    /// Clears the handoff queue and jitter buffer and returns to `Buffering`.
    pub fn reset(&mut self) {
        self.dequeued += self.consumer.clear() as u64;
        self.reset_scheduler(0);
    }

    /// Drops queued samples up to the most recent reset request.
    fn discard_to_reset_mark(&mut self) {
        let mark = self.state.playback_reset_mark.load(Ordering::SeqCst);
        let stale = usize::try_from(mark.saturating_sub(self.dequeued)).unwrap_or(usize::MAX);
        let skipped = self.consumer.skip(stale);
        self.dequeued += skipped as u64;
        self.reset_scheduler(skipped);
    }

    fn reset_scheduler(&mut self, skipped: usize) {
        let buffered = self.scheduler.buffered();
        self.scheduler.reset();
        tracing::debug!(buffered, skipped, "Playback reset");
        emit(self.event_callback.as_ref(), StreamEvent::PlaybackReset);
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    /// Source samples in the jitter buffer (excluding the handoff queue).
    pub fn buffered(&self) -> usize {
        self.scheduler.buffered()
    }

    /// Sets the callback for playback events.
    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }
}

/// Creates a connected producer/renderer pair.
///
/// The handoff queue holds `ring_capacity` worth of source audio.
///
/// # Errors
///
/// Returns [`StreamError::InvalidConfig`] if the configuration does not validate.
///
/// # Example
///
/// ```
/// use voice_stream::{playback_channel, AudioFrame, PlaybackConfig, PlaybackState};
///
/// let (mut producer, mut renderer) =
///     playback_channel(&PlaybackConfig::with_output_rate(48_000)).unwrap();
///
/// producer.push_frame(&AudioFrame::new(vec![1000; 4800], 24_000));
///
/// let mut quantum = [0.0f32; 128];
/// renderer.render(&mut quantum);
/// assert_eq!(renderer.state(), PlaybackState::Playing);
/// ```
pub fn playback_channel(
    config: &PlaybackConfig,
) -> Result<(PlaybackProducer, PlaybackRenderer), StreamError> {
    playback_channel_with(config, Arc::new(SessionState::new()), None)
}

/// Creates a producer/renderer pair sharing session counters.
pub(crate) fn playback_channel_with(
    config: &PlaybackConfig,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
) -> Result<(PlaybackProducer, PlaybackRenderer), StreamError> {
    let scheduler = PlaybackScheduler::new(config)?;

    let ring = HeapRb::<f32>::new(config.capacity_frames());
    let (producer, consumer) = ring.split();

    tracing::debug!(
        source_rate = config.source_sample_rate,
        output_rate = config.output_sample_rate,
        min_buffered = config.min_buffered_frames(),
        max_buffered = config.max_buffered_frames(),
        "Playback channel created"
    );

    let producer = PlaybackProducer {
        producer,
        source_sample_rate: config.source_sample_rate,
        scratch: Vec::new(),
        state: Arc::clone(&state),
        event_callback: event_callback.clone(),
    };
    let renderer = PlaybackRenderer {
        consumer,
        scheduler,
        drain_buf: vec![0.0; DRAIN_CHUNK].into_boxed_slice(),
        mono: vec![0.0; config.max_quantum],
        dequeued: 0,
        state,
        event_callback,
    };

    Ok((producer, renderer))
}
