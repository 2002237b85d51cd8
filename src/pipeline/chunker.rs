//! Fixed-size block chunker for the capture pipeline.

use crate::config::{CAPTURE_BLOCK_SIZE, SOURCE_SAMPLE_RATE};
use crate::format::encode_sample;
use crate::AudioFrame;

/// Accumulates capture samples into fixed-size blocks.
///
/// Input arrives in batches of any size. Every time `block_size` samples have
/// accumulated, the block is encoded to 16-bit PCM and emitted as one
/// [`AudioFrame`]. Leftover samples stay buffered for the next call; partial
/// blocks are never emitted.
///
/// # Example
///
/// ```
/// use voice_stream::BlockChunker;
///
/// let mut chunker = BlockChunker::new(4, 24_000);
/// let frames = chunker.push(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
/// assert_eq!(frames.len(), 1);
/// assert_eq!(chunker.buffered(), 2);
/// ```
#[derive(Debug)]
pub struct BlockChunker {
    block: Box<[f32]>,
    filled: usize,
    sample_rate: u32,
    next_sequence: u64,
}

impl Default for BlockChunker {
    fn default() -> Self {
        Self::new(CAPTURE_BLOCK_SIZE, SOURCE_SAMPLE_RATE)
    }
}

impl BlockChunker {
    /// Creates a chunker emitting frames of `block_size` samples (at least 1).
    pub fn new(block_size: usize, sample_rate: u32) -> Self {
        Self {
            block: vec![0.0; block_size.max(1)].into_boxed_slice(),
            filled: 0,
            sample_rate,
            next_sequence: 0,
        }
    }

    /// Appends samples, calling `emit` once per completed block.
    ///
    /// Returns the number of frames emitted.
    pub fn push_with<F>(&mut self, samples: &[f32], mut emit: F) -> usize
    where
        F: FnMut(AudioFrame),
    {
        let mut emitted = 0;
        let mut rest = samples;
        while !rest.is_empty() {
            let take = rest.len().min(self.block.len() - self.filled);
            self.block[self.filled..self.filled + take].copy_from_slice(&rest[..take]);
            self.filled += take;
            rest = &rest[take..];

            if self.filled == self.block.len() {
                emit(self.finish_block());
                emitted += 1;
            }
        }
        emitted
    }

    /// Appends samples and returns every completed frame.
    pub fn push(&mut self, samples: &[f32]) -> Vec<AudioFrame> {
        let mut frames = Vec::new();
        self.push_with(samples, |frame| frames.push(frame));
        frames
    }

    fn finish_block(&mut self) -> AudioFrame {
        let encoded = self.block.iter().map(|&s| encode_sample(s)).collect();
        let frame = AudioFrame::with_sequence(encoded, self.sample_rate, self.next_sequence);
        self.next_sequence += 1;
        self.filled = 0;
        frame
    }

    /// Samples waiting for the current block to complete.
    pub fn buffered(&self) -> usize {
        self.filled
    }

    /// Samples per emitted frame.
    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Total frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_sequence
    }

    /// Discards the partial block.
    ///
    /// Sequence numbering continues so downstream consumers can see the gap.
    pub fn reset(&mut self) {
        self.filled = 0;
    }
}
