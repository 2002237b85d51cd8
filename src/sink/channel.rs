//! Tokio mpsc channel sink implementation.

use crate::sink::Sink;
use crate::{AudioFrame, SinkError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A sink that forwards outbound frames to a tokio mpsc channel.
///
/// The usual way to hand frames to a transport task that owns the socket.
///
/// # Example
///
/// ```
/// use voice_stream::{AudioFrame, ChannelSink};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<AudioFrame>(64);
/// let sink = ChannelSink::new(tx);
/// // Register with VoiceStream::builder().add_sink(sink), then:
/// // while let Some(frame) = rx.recv().await { socket.send(encode(&frame)).await?; }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<AudioFrame>,
}

impl ChannelSink {
    /// Creates a new channel sink with the given sender.
    pub fn new(sender: mpsc::Sender<AudioFrame>) -> Self {
        Self::with_name("channel", sender)
    }

    /// Creates a new channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<AudioFrame>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &AudioFrame) -> Result<(), SinkError> {
        self.sender
            .send(frame.clone())
            .await
            .map_err(|_| SinkError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_sends_frames() {
        let (tx, mut rx) = mpsc::channel::<AudioFrame>(10);
        let sink = ChannelSink::new(tx);

        let frame = AudioFrame::with_sequence(vec![1, 2, 3], 24_000, 4);
        sink.write(&frame).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(*received.samples, vec![1, 2, 3]);
        assert_eq!(received.sequence, 4);
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (tx, rx) = mpsc::channel::<AudioFrame>(10);
        let sink = ChannelSink::new(tx);
        drop(rx);

        let frame = AudioFrame::new(vec![1, 2, 3], 24_000);
        let result = sink.write(&frame).await;

        assert!(matches!(result, Err(SinkError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_channel_sink_custom_name() {
        let (tx, _rx) = mpsc::channel::<AudioFrame>(10);
        let sink = ChannelSink::with_name("websocket", tx);
        assert_eq!(sink.name(), "websocket");
    }
}
