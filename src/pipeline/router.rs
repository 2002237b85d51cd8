//! Outbound frame delivery.
//!
//! The router owns the registered sinks. Each captured frame is offered to
//! all of them at once; a sink that fails is retried on its own schedule
//! without holding back the others.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::emit;
use crate::sink::Sink;
use crate::{AudioFrame, EventCallback, StreamConfig, StreamError, StreamEvent};

#[derive(Debug)]
pub enum RouterCommand {
    /// Flush queued frames, call `on_stop` on every sink and exit.
    Stop,
}

/// Attempts per frame and the first backoff delay, doubled after each failure.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    fn from_config(config: &StreamConfig) -> Self {
        Self {
            attempts: config.sink_retry_attempts.max(1),
            initial_delay: config.sink_retry_delay,
        }
    }
}

pub struct Router {
    sinks: Vec<Arc<dyn Sink>>,
    event_callback: Option<EventCallback>,
    retry: RetryPolicy,
}

impl Router {
    pub fn new(sinks: Vec<Arc<dyn Sink>>, config: &StreamConfig) -> Self {
        Self {
            sinks,
            event_callback: None,
            retry: RetryPolicy::from_config(config),
        }
    }

    #[must_use]
    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    fn report(&self, sink: &dyn Sink, error: String) {
        emit(
            self.event_callback.as_ref(),
            StreamEvent::SinkError {
                sink_name: sink.name().to_string(),
                error,
            },
        );
    }

    /// Delivers `frame` to one sink. Returns `false` once retries run out.
    async fn deliver(&self, sink: &dyn Sink, frame: &AudioFrame) -> bool {
        let mut delay = self.retry.initial_delay;

        for attempt in 1..=self.retry.attempts {
            let Err(e) = sink.write(frame).await else {
                return true;
            };
            self.report(sink, e.to_string());

            if attempt == self.retry.attempts {
                tracing::warn!(
                    sink = sink.name(),
                    sequence = frame.sequence,
                    attempts = attempt,
                    error = %e,
                    "Dropping frame for sink"
                );
                break;
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        false
    }

    /// Offers a frame to every sink concurrently.
    ///
    /// Returns how many sinks accepted it.
    pub async fn write_frame(&self, frame: &AudioFrame) -> usize {
        let deliveries = self
            .sinks
            .iter()
            .map(|sink| self.deliver(sink.as_ref(), frame));

        futures::future::join_all(deliveries)
            .await
            .into_iter()
            .filter(|&accepted| accepted)
            .count()
    }

    /// Calls `on_start` on each sink in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::SinkStartFailed`] for the first sink that fails.
    pub async fn start_sinks(&self) -> Result<(), StreamError> {
        for sink in &self.sinks {
            if let Err(e) = sink.on_start().await {
                return Err(StreamError::SinkStartFailed {
                    sink_name: sink.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Calls `on_stop` on each sink. Failures are reported, not returned.
    pub async fn stop_sinks(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.on_stop().await {
                self.report(sink.as_ref(), format!("on_stop failed: {e}"));
            }
        }
    }

    /// Delivers frames until [`RouterCommand::Stop`] arrives or every
    /// frame sender is gone, then stops the sinks.
    pub async fn run(
        self,
        mut frame_rx: mpsc::Receiver<AudioFrame>,
        mut cmd_rx: mpsc::Receiver<RouterCommand>,
    ) {
        let mut undelivered = 0u64;

        loop {
            tokio::select! {
                Some(frame) = frame_rx.recv() => {
                    if self.write_frame(&frame).await == 0 {
                        undelivered += 1;
                    }
                }
                Some(RouterCommand::Stop) = cmd_rx.recv() => {
                    while let Ok(frame) = frame_rx.try_recv() {
                        if self.write_frame(&frame).await == 0 {
                            undelivered += 1;
                        }
                    }
                    break;
                }
                else => break,
            }
        }

        self.stop_sinks().await;
        tracing::debug!(undelivered, "Router stopped");
    }
}
