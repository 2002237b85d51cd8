//! Runtime events for monitoring stream health.
//!
//! Events are non-fatal notifications. Underruns and overflows are part of
//! normal operation on a jittery network; the pipelines heal themselves and
//! keep running. Use events for logging and metrics, not error handling.

use std::sync::Arc;

/// Runtime events emitted by the capture and playback pipelines.
///
/// # Example
///
/// ```
/// use voice_stream::StreamEvent;
///
/// fn handle_event(event: StreamEvent) {
///     match event {
///         StreamEvent::PlaybackStarted { buffered } => {
///             eprintln!("playback started with {} samples buffered", buffered);
///         }
///         StreamEvent::PlaybackUnderrun { frames_rendered } => {
///             eprintln!("underrun after {} samples", frames_rendered);
///         }
///         StreamEvent::BufferOverflow { dropped_samples } => {
///             eprintln!("dropped {} stale samples", dropped_samples);
///         }
///         StreamEvent::HandoffOverflow { dropped_samples } => {
///             eprintln!("renderer stalled, lost {} samples", dropped_samples);
///         }
///         StreamEvent::CaptureOverflow { dropped_samples } => {
///             eprintln!("capture bridge stalled, lost {} samples", dropped_samples);
///         }
///         StreamEvent::PlaybackReset => eprintln!("playback reset"),
///         StreamEvent::SinkError { sink_name, error } => {
///             eprintln!("sink '{}' error: {}", sink_name, error);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Enough audio arrived and the scheduler left `Buffering`.
    PlaybackStarted {
        /// Source samples buffered at the transition.
        buffered: usize,
    },

    /// The jitter buffer ran dry while playing.
    ///
    /// The rest of the quantum was filled with silence and the scheduler
    /// returned to `Buffering`.
    PlaybackUnderrun {
        /// Output samples produced in the quantum before the underrun.
        frames_rendered: usize,
    },

    /// The jitter buffer exceeded its maximum and the oldest audio was dropped.
    BufferOverflow {
        /// Number of source samples discarded.
        dropped_samples: usize,
    },

    /// The producer-to-renderer queue was full and incoming audio was lost.
    ///
    /// Only happens when the renderer stops being polled for a long time.
    HandoffOverflow {
        /// Number of source samples discarded.
        dropped_samples: usize,
    },

    /// The capture handoff queue was full and microphone audio was lost.
    CaptureOverflow {
        /// Number of interleaved input samples discarded.
        dropped_samples: u64,
    },

    /// Playback was stopped and its buffers cleared.
    PlaybackReset,

    /// A sink encountered an error during write.
    ///
    /// The router will retry according to [`StreamConfig`](crate::StreamConfig)
    /// settings.
    SinkError {
        /// Name of the sink that errored.
        sink_name: String,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Playback events are emitted from the render context, so callbacks must
/// return quickly and must not block.
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use voice_stream::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// callback(StreamEvent::PlaybackReset);
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Invokes the callback if one is registered.
pub(crate) fn emit(callback: Option<&EventCallback>, event: StreamEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}
