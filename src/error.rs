//! Error types for voice-stream.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`StreamError`]): Prevent a session or device from starting
//! - **Recoverable events**: Underruns, overflows and sink failures surfaced via
//!   [`EventCallback`](crate::EventCallback)
//!
//! Buffer starvation and overflow are never errors. They are state
//! transitions of the playback scheduler.

/// Fatal errors that prevent a session or device from starting.
///
/// Returned from [`VoiceStreamBuilder::start()`] and the device constructors.
///
/// [`VoiceStreamBuilder::start()`]: crate::VoiceStreamBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// No sinks were configured before starting.
    #[error("no sinks configured - add at least one sink for outbound frames")]
    NoSinksConfigured,

    /// A sink failed during initialization.
    #[error("sink '{sink_name}' failed to start: {reason}")]
    SinkStartFailed {
        /// Name of the sink that failed.
        sink_name: String,
        /// Why the sink failed to start.
        reason: String,
    },

    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default device is configured on this system.
    #[error("no default {direction} device configured")]
    NoDefaultDevice {
        /// `"input"` or `"output"`.
        direction: &'static str,
    },

    /// The device's sample format is not supported.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// The capture input or renderer was already taken or attached.
    #[error("{endpoint} endpoint already taken")]
    EndpointTaken {
        /// `"capture"` or `"playback"`.
        endpoint: &'static str,
    },

    /// An error from the underlying audio library.
    #[error("audio backend error: {0}")]
    BackendError(String),
}

impl StreamError {
    /// Creates an invalid configuration error with the given reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur within a [`Sink`](crate::Sink) implementation.
///
/// Sink errors are recoverable - the router will emit a [`StreamEvent::SinkError`]
/// and retry the write.
///
/// [`StreamEvent::SinkError`]: crate::StreamEvent::SinkError
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The sink was used before initialization.
    #[error("sink not initialized (call on_start first)")]
    NotInitialized,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }
}
