//! Jitter ring buffer for decoded playback audio.

use std::fmt;

use ringbuf::storage::Heap;
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::LocalRb;

use crate::PlaybackConfig;

/// Fixed-capacity circular store of normalized samples.
///
/// Absorbs bursty arrival from the network so the render clock can draw at a
/// steady rate. Writes never fail: once more than `max_buffered` samples are
/// held, the oldest are discarded so latency stays bounded.
///
/// The buffer is owned by the render context. Cross-thread delivery happens
/// through the SPSC handoff in [`playback`](super::playback), so a
/// single-threaded [`LocalRb`] is enough here.
///
/// At every observable point `available == (write_index - read_index) mod
/// capacity`, except that a completely full buffer (`available == capacity`)
/// has coinciding cursors.
pub struct JitterBuffer {
    ring: LocalRb<Heap<f32>>,
    max_buffered: usize,
}

impl JitterBuffer {
    /// Creates a buffer.
    ///
    /// `capacity` is raised to `max_buffered` if smaller, and both are at
    /// least 1.
    pub fn new(capacity: usize, max_buffered: usize) -> Self {
        let max_buffered = max_buffered.max(1);
        Self {
            ring: LocalRb::new(capacity.max(max_buffered)),
            max_buffered,
        }
    }

    /// Creates a buffer sized from a playback configuration.
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.capacity_frames(), config.max_buffered_frames())
    }

    /// Appends samples, dropping the oldest ones beyond `max_buffered`.
    ///
    /// Returns the number of samples dropped. A non-zero result means the
    /// sample stream now has a discontinuity at the read cursor.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        // Samples that would be trimmed before anyone could read them are never written.
        let skipped = samples.len().saturating_sub(self.max_buffered);
        let kept = &samples[skipped..];

        let excess = (self.available() + kept.len()).saturating_sub(self.max_buffered);
        let trimmed = self.ring.skip(excess);
        let written = self.ring.push_slice(kept);
        debug_assert_eq!(written, kept.len());

        skipped + trimmed
    }

    /// Returns the sample `offset` positions after the read cursor.
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<f32> {
        let (head, tail) = self.ring.as_slices();
        match head.get(offset) {
            Some(&sample) => Some(sample),
            None => tail.get(offset - head.len()).copied(),
        }
    }

    /// Advances the read cursor by up to `n` samples.
    ///
    /// Returns the number actually consumed.
    #[inline]
    pub fn consume(&mut self, n: usize) -> usize {
        self.ring.skip(n)
    }

    /// Copies and consumes up to `output.len()` samples in FIFO order.
    pub fn pop_into(&mut self, output: &mut [f32]) -> usize {
        self.ring.pop_slice(output)
    }

    /// Number of unread samples.
    #[inline]
    pub fn available(&self) -> usize {
        self.ring.occupied_len()
    }

    /// Returns `true` if no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total storage in samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Overflow threshold in samples.
    pub fn max_buffered(&self) -> usize {
        self.max_buffered
    }

    /// Current write cursor, in `0..capacity`.
    pub fn write_index(&self) -> usize {
        self.ring.write_index() % self.capacity()
    }

    /// Current read cursor, in `0..capacity`.
    pub fn read_index(&self) -> usize {
        self.ring.read_index() % self.capacity()
    }

    /// Discards all buffered samples.
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

impl fmt::Debug for JitterBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitterBuffer")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .field("max_buffered", &self.max_buffered)
            .finish()
    }
}
