use super::constants::{ANALYSIS_BLOCK_SIZE, FIFO_CAPACITY};
use super::ring_buffer::{LockFreeRingBuffer, RingConsumer, RingProducer};

/// One fixed-size block of mono samples handed to the analyser
pub type SampleBlock = [f32; ANALYSIS_BLOCK_SIZE];

/// Which input channel a sample buffer taps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Collects one channel's audio into fixed-size blocks for the analyser
///
/// The host delivers blocks of any length. Samples are copied into a temporary block and every
/// time it fills up the whole block is pushed into a lock-free queue. Lives on the audio thread,
/// never allocates after construction.
pub struct PerChannelSampleBuffer {
    channel: Channel,
    // Block currently being filled (audio thread only)
    temp_block: SampleBlock,
    // Position in temp_block
    write_position: usize,
    producer: RingProducer<SampleBlock>,
    dropped_blocks: usize,
}

impl PerChannelSampleBuffer {
    /// Create the buffer for `channel` together with the analyser's reading end
    pub fn new(channel: Channel) -> (Self, RingConsumer<SampleBlock>) {
        let (producer, consumer) = LockFreeRingBuffer::new(FIFO_CAPACITY).split();

        let buffer = Self {
            channel,
            temp_block: [0.0; ANALYSIS_BLOCK_SIZE],
            write_position: 0,
            producer,
            dropped_blocks: 0,
        };

        (buffer, consumer)
    }

    /// Append samples, pushing every completed block (audio thread, no allocations)
    ///
    /// A full queue drops the completed block; the analyser simply misses that part of the
    /// signal.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let mut remaining = samples;

        while !remaining.is_empty() {
            let space = ANALYSIS_BLOCK_SIZE - self.write_position;
            let count = space.min(remaining.len());

            self.temp_block[self.write_position..self.write_position + count]
                .copy_from_slice(&remaining[..count]);
            self.write_position += count;
            remaining = &remaining[count..];

            if self.write_position == ANALYSIS_BLOCK_SIZE {
                if !self.producer.push(self.temp_block) {
                    self.dropped_blocks += 1;
                }
                self.write_position = 0;
            }
        }
    }

    /// Pick this buffer's channel out of a multi-channel block and append it
    pub fn update(&mut self, channels: &[&mut [f32]]) {
        if let Some(samples) = channels.get(self.channel.index()) {
            self.push_samples(samples);
        }
    }

    /// Forget the partially filled block
    pub fn reset(&mut self) {
        self.write_position = 0;
    }

    /// Number of completed blocks that were dropped because the queue was full
    pub fn dropped_blocks(&self) -> usize {
        self.dropped_blocks
    }
}
