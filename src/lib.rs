//! # voice-stream
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time voice streaming between a local audio device and a remote peer.
//!
//! `voice-stream` moves 24 kHz mono 16-bit PCM in both directions:
//!
//! - **Capture**: microphone audio of any rate and channel count is
//!   downmixed, converted to 24 kHz and cut into 4096-sample
//!   [`AudioFrame`]s that are handed to every registered [`Sink`].
//! - **Playback**: frames arriving from the network go through a jitter
//!   buffer that waits for 150 ms of audio before starting, caps latency at
//!   500 ms by dropping the oldest audio, and is linearly resampled to the
//!   output device's rate.
//!
//! The transport itself (WebSocket, RTP, ...) is out of scope: sinks take
//! outbound frames, and inbound frames are passed to
//! [`Session::play_frame()`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voice_stream::{AudioFrame, ChannelSink, VoiceStream};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), voice_stream::StreamError> {
//! let (tx, mut outbound) = mpsc::channel::<AudioFrame>(32);
//!
//! let mut session = VoiceStream::builder()
//!     .add_sink(ChannelSink::new(tx))
//!     .on_event(|e| tracing::warn!(?e, "stream event"))
//!     .start()
//!     .await?;
//!
//! // Feed the microphone from the host's input callback
//! let mut mic = session.take_capture_input().unwrap();
//! // Render from the host's output callback
//! let mut speaker = session.take_renderer().unwrap();
//!
//! while let Some(frame) = outbound.recv().await {
//!     // Send to the peer; inbound frames go to session.play_frame(&frame)
//! }
//!
//! session.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `device` feature, [`Session::attach_input()`] and
//! [`Session::attach_output()`] wire CPAL devices in directly.
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Audio threads**: [`CaptureInput::push`] and [`PlaybackRenderer::render`]
//!   never block, lock or allocate in steady state. All scratch space is
//!   allocated up front; [`PlaybackRenderer::render_interleaved`] grows its
//!   mono buffer once if handed a quantum above
//!   [`PlaybackConfig::max_quantum`]
//! - **Ring Buffers**: lock-free SPSC queues carry samples across the boundary
//! - **Tokio Runtime**: the capture bridge chunks audio and the router fans
//!   frames out to all registered sinks
//!
//! Starvation and overflow are not errors. The playback scheduler drops back
//! to buffering on underrun and trims stale audio on overflow, reporting both
//! through [`StreamEvent`]s.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod event;
pub mod format;
mod frame;
mod pipeline;
mod session;
mod sink;
pub mod source;

pub use builder::{VoiceStream, VoiceStreamBuilder};
pub use config::{
    CaptureConfig, PlaybackConfig, StreamConfig, CAPTURE_BLOCK_SIZE, MAX_BUFFERED, MAX_QUANTUM,
    MIN_BUFFERED, RING_CAPACITY, SOURCE_SAMPLE_RATE,
};
pub use error::{SinkError, StreamError};
pub use event::{event_callback, EventCallback, StreamEvent};
pub use frame::AudioFrame;
pub use pipeline::{
    capture_channel, playback_channel, BlockChunker, CaptureBridge, CaptureInput, JitterBuffer,
    PlaybackHandle, PlaybackProducer, PlaybackRenderer, PlaybackScheduler, PlaybackState,
    RenderReport,
};
pub use session::{Session, SessionStats};
pub use sink::{ChannelSink, Sink};
pub use source::MockSource;

#[cfg(feature = "device")]
pub use source::{
    default_input_device_name, default_output_device_name, list_input_devices,
    list_output_devices, InputDevice, OutputDevice,
};
