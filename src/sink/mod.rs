//! Sink trait and implementations for outbound frames.
//!
//! A [`Sink`] is the transport adapter seam of the capture pipeline: every
//! completed 4096-sample [`AudioFrame`] is handed to each registered sink.
//! Framing the PCM for the wire (base64, binary WebSocket messages, RTP) is
//! the sink's job.
//!
//! The crate provides [`ChannelSink`], which forwards frames to a tokio mpsc
//! channel. Implement [`Sink`] for anything else.

mod channel;

pub use channel::ChannelSink;

use crate::{AudioFrame, SinkError};
use async_trait::async_trait;

/// Where outbound voice frames go: usually a connection to the remote peer.
///
/// Frames arrive in capture order, one call per frame, from the router task
/// on the tokio runtime. Audio threads never call into a sink, so a slow
/// `write` delays delivery but never glitches capture. Methods take `&self`;
/// keep connection state behind a lock or channel.
///
/// # Example
///
/// ```
/// use voice_stream::{Sink, AudioFrame, SinkError};
/// use async_trait::async_trait;
///
/// struct PrintSink;
///
/// #[async_trait]
/// impl Sink for PrintSink {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     async fn write(&self, frame: &AudioFrame) -> Result<(), SinkError> {
///         println!("frame #{}: {} samples", frame.sequence, frame.len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Name used in [`StreamEvent::SinkError`] events and logs.
    ///
    /// [`StreamEvent::SinkError`]: crate::StreamEvent::SinkError
    fn name(&self) -> &str;

    /// Connects before the session starts. A failure aborts
    /// [`start()`](crate::VoiceStreamBuilder::start).
    async fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Sends one 24 kHz mono frame.
    ///
    /// A failed write is retried with backoff up to
    /// [`StreamConfig::sink_retry_attempts`](crate::StreamConfig::sink_retry_attempts)
    /// times, then the frame is dropped for this sink only.
    async fn write(&self, frame: &AudioFrame) -> Result<(), SinkError>;

    /// Disconnects after the last frame has been offered.
    async fn on_stop(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
