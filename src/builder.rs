//! Builder pattern for `VoiceStream`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::pipeline::{capture_channel_with, playback_channel_with, Router};
use crate::session::{Session, SessionParts, SessionState};
use crate::sink::Sink;
use crate::{event_callback, EventCallback, StreamConfig, StreamError, StreamEvent};

/// Channel capacity for frames flowing to the router.
/// About 17 seconds of outbound audio at 4096 samples per frame.
const FRAME_CHANNEL_CAPACITY: usize = 100;

/// Channel capacity for router commands.
/// Only need 1 since commands are rare (just Stop).
const COMMAND_CHANNEL_CAPACITY: usize = 1;

/// Builder for configuring and starting a voice streaming session.
///
/// Use [`VoiceStream::builder()`] to create a new builder.
///
/// # Example
///
/// ```no_run
/// use voice_stream::{AudioFrame, ChannelSink, VoiceStream};
/// use tokio::sync::mpsc;
///
/// # async fn run() -> Result<(), voice_stream::StreamError> {
/// let (tx, mut outbound) = mpsc::channel::<AudioFrame>(32);
///
/// let mut session = VoiceStream::builder()
///     .add_sink(ChannelSink::new(tx))
///     .on_event(|e| tracing::warn!(?e, "stream event"))
///     .start()
///     .await?;
///
/// let mut mic = session.take_capture_input().unwrap();
/// mic.push(&vec![0.0; 4096]);
///
/// if let Some(frame) = outbound.recv().await {
///     // Send to the peer
/// }
///
/// session.stop().await?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct VoiceStreamBuilder {
    /// Configured sinks.
    sinks: Vec<Arc<dyn Sink>>,
    /// Event callback.
    event_callback: Option<EventCallback>,
    /// Stream configuration.
    config: StreamConfig,
}

impl Default for VoiceStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceStreamBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            event_callback: None,
            config: StreamConfig::default(),
        }
    }

    /// Add a sink to receive every outbound frame.
    pub fn add_sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include playback start, underruns, overflows and sink errors.
    /// Playback events fire on the audio thread, so keep the callback cheap.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom stream configuration.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), StreamError> {
        if self.sinks.is_empty() {
            return Err(StreamError::NoSinksConfigured);
        }
        self.config.validate()
    }

    /// Start the session.
    ///
    /// Returns a [`Session`] handle owning both pipelines.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No sinks are configured
    /// - The configuration does not validate
    /// - Any sink fails to start
    pub async fn start(self) -> Result<Session, StreamError> {
        self.validate()?;

        let state = Arc::new(SessionState::new());

        // Build both pipelines before anything is spawned
        let (capture_input, bridge) = capture_channel_with(
            &self.config.capture,
            Arc::clone(&state),
            self.event_callback.clone(),
        )?;
        let (producer, renderer) = playback_channel_with(
            &self.config.playback,
            Arc::clone(&state),
            self.event_callback.clone(),
        )?;

        let router = Router::new(self.sinks.clone(), &self.config)
            .with_event_callback(self.event_callback.clone());
        router.start_sinks().await?;

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (router_cmd_tx, router_cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let router_handle = tokio::spawn(async move {
            router.run(frame_rx, router_cmd_rx).await;
        });
        let capture_handle = tokio::spawn(bridge.run(frame_tx));

        tracing::info!(
            sinks = self.sinks.len(),
            input_rate = self.config.capture.input_sample_rate,
            output_rate = self.config.playback.output_sample_rate,
            "Voice stream session started"
        );

        Ok(Session::new(
            state,
            SessionParts {
                config: self.config,
                router_cmd_tx,
                router_handle,
                capture_handle,
                capture_input: Some(capture_input),
                renderer: Some(renderer),
                producer,
            },
        ))
    }
}

/// Main entry point for voice-stream.
///
/// Use [`VoiceStream::builder()`] to start configuring a session.
pub struct VoiceStream;

impl VoiceStream {
    /// Creates a new builder for configuring a session.
    pub fn builder() -> VoiceStreamBuilder {
        VoiceStreamBuilder::new()
    }
}
