//! Streaming session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::{CaptureInput, PlaybackHandle, PlaybackProducer, PlaybackRenderer, RouterCommand};
use crate::{AudioFrame, StreamConfig, StreamError};

/// Counters describing a running session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Outbound frames handed to the sink router.
    pub frames_sent: u64,
    /// Mono source-rate samples fed to the block chunker.
    pub samples_captured: u64,
    /// Interleaved capture samples lost because the handoff queue was full.
    pub capture_dropped: u64,
    /// Inbound frames accepted for playback.
    pub frames_received: u64,
    /// Inbound samples accepted for playback.
    pub samples_received: u64,
    /// Times playback ran dry and went back to buffering.
    pub underruns: u64,
    /// Times the jitter buffer trimmed old audio.
    pub buffer_overflows: u64,
    /// Playback samples discarded by overflow handling.
    pub samples_dropped: u64,
}

/// Internal state shared between the session, the pipelines and background tasks.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    pub playback_reset: AtomicBool,
    /// Samples ever pushed into the playback handoff queue.
    pub playback_enqueued: AtomicU64,
    /// Queue position up to which the next playback reset discards.
    pub playback_reset_mark: AtomicU64,
    pub frames_sent: AtomicU64,
    pub samples_captured: AtomicU64,
    pub capture_dropped: AtomicU64,
    pub frames_received: AtomicU64,
    pub samples_received: AtomicU64,
    pub underruns: AtomicU64,
    pub buffer_overflows: AtomicU64,
    pub samples_dropped: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            playback_reset: AtomicBool::new(false),
            playback_enqueued: AtomicU64::new(0),
            playback_reset_mark: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            samples_captured: AtomicU64::new(0),
            capture_dropped: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            samples_received: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            buffer_overflows: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
        }
    }

    /// Marks everything enqueued so far for discard at the next render.
    pub fn request_playback_reset(&self) {
        let enqueued = self.playback_enqueued.load(Ordering::SeqCst);
        self.playback_reset_mark.fetch_max(enqueued, Ordering::SeqCst);
        self.playback_reset.store(true, Ordering::SeqCst);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            samples_captured: self.samples_captured.load(Ordering::SeqCst),
            capture_dropped: self.capture_dropped.load(Ordering::SeqCst),
            frames_received: self.frames_received.load(Ordering::SeqCst),
            samples_received: self.samples_received.load(Ordering::SeqCst),
            underruns: self.underruns.load(Ordering::SeqCst),
            buffer_overflows: self.buffer_overflows.load(Ordering::SeqCst),
            samples_dropped: self.samples_dropped.load(Ordering::SeqCst),
        }
    }
}

/// Handle to a running streaming session.
///
/// Returned by [`VoiceStreamBuilder::start()`]. The capture bridge and sink
/// router run in background tasks until [`stop()`](Session::stop) is called
/// or the `Session` is dropped.
///
/// Without attached devices the caller drives both real-time ends itself:
/// take the [`CaptureInput`] and feed it microphone audio, take the
/// [`PlaybackRenderer`] and call it from the output clock, and pass inbound
/// frames to [`play_frame()`](Session::play_frame).
///
/// # Example
///
/// ```ignore
/// let mut session = VoiceStream::builder()
///     .add_sink(ChannelSink::new(outbound_tx))
///     .start()
///     .await?;
///
/// let mut mic = session.take_capture_input().unwrap();
/// let mut speaker = session.take_renderer().unwrap();
///
/// mic.push(&captured);              // microphone thread
/// session.play_frame(&inbound);     // network task
/// speaker.render(&mut quantum);     // audio thread
///
/// session.stop().await?;
/// ```
///
/// [`VoiceStreamBuilder::start()`]: crate::VoiceStreamBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    config: StreamConfig,
    router_cmd_tx: mpsc::Sender<RouterCommand>,
    router_handle: Option<JoinHandle<()>>,
    capture_handle: Option<JoinHandle<()>>,
    capture_input: Option<CaptureInput>,
    renderer: Option<PlaybackRenderer>,
    producer: PlaybackProducer,
    // Keep device streams alive - dropping them stops the host callbacks
    #[cfg(feature = "device")]
    streams: Vec<crate::source::DeviceStream>,
}

/// Everything a session owns besides its shared state.
pub(crate) struct SessionParts {
    pub config: StreamConfig,
    pub router_cmd_tx: mpsc::Sender<RouterCommand>,
    pub router_handle: JoinHandle<()>,
    pub capture_handle: JoinHandle<()>,
    pub capture_input: Option<CaptureInput>,
    pub renderer: Option<PlaybackRenderer>,
    pub producer: PlaybackProducer,
}

impl Session {
    pub(crate) fn new(state: Arc<SessionState>, parts: SessionParts) -> Self {
        Self {
            state,
            config: parts.config,
            router_cmd_tx: parts.router_cmd_tx,
            router_handle: Some(parts.router_handle),
            capture_handle: Some(parts.capture_handle),
            capture_input: parts.capture_input,
            renderer: parts.renderer,
            producer: parts.producer,
            #[cfg(feature = "device")]
            streams: Vec::new(),
        }
    }

    /// Returns `true` if the session is still running.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// The configuration the session was started with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        self.state.stats()
    }

    /// Takes the capture entry point, unless a device already owns it.
    pub fn take_capture_input(&mut self) -> Option<CaptureInput> {
        self.capture_input.take()
    }

    /// Takes the playback renderer, unless a device already owns it.
    pub fn take_renderer(&mut self) -> Option<PlaybackRenderer> {
        self.renderer.take()
    }

    /// Hands an inbound frame to the playback pipeline.
    ///
    /// Returns the number of samples accepted. Empty frames are ignored.
    pub fn play_frame(&mut self, frame: &AudioFrame) -> usize {
        if !self.is_running() {
            return 0;
        }
        self.producer.push_frame(frame)
    }

    /// Returns a cloneable handle for resetting playback from elsewhere.
    pub fn playback_handle(&self) -> PlaybackHandle {
        self.producer.handle()
    }

    /// Discards buffered playback audio without stopping the session.
    ///
    /// Everything played so far is dropped at the renderer's next quantum
    /// and playback returns to buffering. Frames passed to
    /// [`play_frame()`](Self::play_frame) after this call are kept.
    pub fn reset_playback(&self) {
        self.producer.stop();
    }

    /// Drives the capture pipeline from an input device's callback.
    ///
    /// The device's native format must match the session's capture
    /// configuration; build it with [`InputDevice::capture_config()`].
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnsupportedFormat`] on a format mismatch,
    /// [`StreamError::EndpointTaken`] if the capture input is already in
    /// use, or a backend error if the stream cannot start.
    ///
    /// [`InputDevice::capture_config()`]: crate::source::InputDevice::capture_config
    #[cfg(feature = "device")]
    pub fn attach_input(&mut self, device: &crate::source::InputDevice) -> Result<(), StreamError> {
        let (rate, channels) = device.native_config()?;
        let expected = &self.config.capture;
        if rate != expected.input_sample_rate || channels != expected.input_channels {
            return Err(StreamError::UnsupportedFormat {
                format: format!(
                    "{rate} Hz / {channels} ch input, session expects {} Hz / {} ch",
                    expected.input_sample_rate, expected.input_channels
                ),
            });
        }

        let input = self
            .capture_input
            .take()
            .ok_or(StreamError::EndpointTaken { endpoint: "capture" })?;
        self.streams.push(device.start_capture(input)?);
        Ok(())
    }

    /// Drives the playback pipeline from an output device's callback.
    ///
    /// The device must run at the session's output rate; build it with
    /// [`OutputDevice::playback_config()`]. Any channel count works.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnsupportedFormat`] on a rate mismatch,
    /// [`StreamError::EndpointTaken`] if the renderer is already in use, or a
    /// backend error if the stream cannot start.
    ///
    /// [`OutputDevice::playback_config()`]: crate::source::OutputDevice::playback_config
    #[cfg(feature = "device")]
    pub fn attach_output(&mut self, device: &crate::source::OutputDevice) -> Result<(), StreamError> {
        let (rate, _) = device.native_config()?;
        let expected = self.config.playback.output_sample_rate;
        if rate != expected {
            return Err(StreamError::UnsupportedFormat {
                format: format!("{rate} Hz output, session renders at {expected} Hz"),
            });
        }

        let renderer = self
            .renderer
            .take()
            .ok_or(StreamError::EndpointTaken { endpoint: "playback" })?;
        self.streams.push(device.start_playback(renderer)?);
        Ok(())
    }

    /// Stops the session.
    ///
    /// This will:
    /// 1. Reset the playback pipeline and stop any device streams
    /// 2. Stop the capture bridge, discarding any partial block
    /// 3. Deliver frames already handed to the router, then call `on_stop()` on all sinks
    /// 4. Wait for background tasks to complete
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails.
    pub async fn stop(mut self) -> Result<(), StreamError> {
        self.stop_internal().await
    }

    async fn stop_internal(&mut self) -> Result<(), StreamError> {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!(stats = ?self.state.stats(), "Stopping voice stream session");

        self.producer.stop();
        #[cfg(feature = "device")]
        self.streams.clear();

        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.await;
        }

        let _ = self.router_cmd_tx.send(RouterCommand::Stop).await;
        if let Some(handle) = self.router_handle.take() {
            let _ = handle.await;
        }

        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.running.load(Ordering::SeqCst) {
            // Dropped without explicit stop() - let the background tasks wind down
            self.state.running.store(false, Ordering::SeqCst);
            self.producer.stop();
            let _ = self.router_cmd_tx.try_send(RouterCommand::Stop);
        }
    }
}
