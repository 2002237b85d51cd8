//! Audio pipeline components.
//!
//! Two independent pipelines meet the transport at [`AudioFrame`](crate::AudioFrame):
//!
//! ```text
//! capture:  audio thread → CaptureInput ─SPSC─▶ CaptureBridge → Router → Sinks
//! playback: transport → PlaybackProducer ─SPSC─▶ PlaybackRenderer → audio thread
//! ```
//!
//! - **Jitter buffer**: fixed-capacity ring with drop-oldest overflow
//! - **Block chunker**: cuts capture audio into 4096-sample frames
//! - **Scheduler**: startup gating, underrun recovery and rate conversion
//! - **Router**: fans frames out to all registered sinks with retry logic
//!
//! The audio-thread halves never block, lock or allocate in steady state.

mod capture;
mod chunker;
mod playback;
mod ring_buffer;
mod router;
mod scheduler;

pub use capture::{capture_channel, CaptureBridge, CaptureInput};
pub(crate) use capture::capture_channel_with;
pub use chunker::BlockChunker;
pub use playback::{playback_channel, PlaybackHandle, PlaybackProducer, PlaybackRenderer};
pub(crate) use playback::playback_channel_with;
pub use ring_buffer::JitterBuffer;
pub(crate) use router::{Router, RouterCommand};
pub use scheduler::{PlaybackScheduler, PlaybackState, RenderReport};
