use std::ops::Range;

/// Preallocated multi-channel scratch buffer
///
/// Capacity is fixed by [`ChannelBuffer::resize`] during preparation. On the audio thread only
/// the active length changes, so copying host blocks in and summing bands out never allocates.
#[derive(Debug, Clone, Default)]
pub struct ChannelBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl ChannelBuffer {
    pub fn new(num_channels: usize, max_samples: usize) -> Self {
        let mut buffer = Self::default();
        buffer.resize(num_channels, max_samples);
        buffer
    }

    /// Build a buffer holding exactly these samples, mainly useful in tests
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.iter().map(Vec::len).min().unwrap_or(0);
        Self {
            channels,
            num_samples,
        }
    }

    /// Reallocate for a new layout (not real-time safe)
    pub fn resize(&mut self, num_channels: usize, max_samples: usize) {
        self.channels = vec![vec![0.0; max_samples]; num_channels];
        self.num_samples = max_samples;
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn max_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Change the active length, clamped to the allocated capacity
    pub fn set_num_samples(&mut self, num_samples: usize) {
        self.num_samples = num_samples.min(self.max_samples());
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.num_samples]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let num_samples = self.num_samples;
        &mut self.channels[index][..num_samples]
    }

    pub fn iter_channels(&self) -> impl Iterator<Item = &[f32]> {
        let num_samples = self.num_samples;
        self.channels.iter().map(move |c| &c[..num_samples])
    }

    pub fn iter_channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let num_samples = self.num_samples;
        self.channels.iter_mut().map(move |c| &mut c[..num_samples])
    }

    /// Copy `range` of a host block in, adopting its length
    ///
    /// Extra host channels are ignored, missing ones are zeroed.
    pub fn copy_from_slices(&mut self, source: &[&mut [f32]], range: Range<usize>) {
        self.set_num_samples(range.len());
        let num_samples = self.num_samples;
        let start = range.start;

        for (index, channel) in self.channels.iter_mut().enumerate() {
            match source.get(index) {
                Some(src) => {
                    channel[..num_samples].copy_from_slice(&src[start..start + num_samples])
                }
                None => channel[..num_samples].fill(0.0),
            }
        }
    }

    /// Write the active region back into a host block starting at `offset`
    pub fn copy_to_slices(&self, destination: &mut [&mut [f32]], offset: usize) {
        for (dst, src) in destination.iter_mut().zip(self.iter_channels()) {
            dst[offset..offset + src.len()].copy_from_slice(src);
        }
    }

    /// Make this buffer an exact copy of `other`'s active region
    pub fn copy_from(&mut self, other: &ChannelBuffer) {
        self.set_num_samples(other.num_samples);
        let num_samples = self.num_samples;

        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst[..num_samples].copy_from_slice(&src[..num_samples]);
        }
    }

    /// Mix `other`'s active region into this buffer
    pub fn add_from(&mut self, other: &ChannelBuffer) {
        for (dst, src) in self.iter_channels_mut().zip(other.iter_channels()) {
            for (out, &sample) in dst.iter_mut().zip(src.iter()) {
                *out += sample;
            }
        }
    }

    /// Multiply every channel by a per-sample gain, advancing `gain` once per sample
    pub fn apply_gain_ramp(&mut self, mut gain: impl FnMut() -> f32) {
        for sample_idx in 0..self.num_samples {
            let gain = gain();
            for channel in self.channels.iter_mut() {
                channel[sample_idx] *= gain;
            }
        }
    }

    pub fn clear(&mut self) {
        for channel in self.iter_channels_mut() {
            channel.fill(0.0);
        }
    }
}
