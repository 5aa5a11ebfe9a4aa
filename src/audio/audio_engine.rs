use super::band::Band;
use super::channel_buffer::ChannelBuffer;
use super::compressor_band::{BandSettings, CompressorBand};
use super::constants::{DEFAULT_SAMPLE_RATE, GAIN_RAMP_MS};
use super::crossover::CrossoverNetwork;
use super::meter::RmsMeter;
use super::sample_buffer::PerChannelSampleBuffer;
use nih_plug::prelude::*;
use std::ops::Range;

/// Everything the engine reads from the parameters once per block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub gain_in_db: f32,
    pub gain_out_db: f32,
    pub low_mid_crossover_hz: f32,
    pub mid_high_crossover_hz: f32,
    pub bands: [BandSettings; Band::COUNT],
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gain_in_db: 0.0,
            gain_out_db: 0.0,
            low_mid_crossover_hz: 400.0,
            mid_high_crossover_hz: 2000.0,
            bands: [BandSettings::default(); Band::COUNT],
        }
    }
}

/// Three-band compressor signal path
///
/// Per block: input gain, crossover split, per-band compression, solo/mute aware sum, output
/// gain. Everything is allocated in [`MultibandEngine::prepare`]; processing never allocates,
/// locks or blocks.
pub struct MultibandEngine {
    crossover: CrossoverNetwork,
    bands: [CompressorBand; Band::COUNT],

    // Scratch buffers, the input one doubles as the summing bus
    input: ChannelBuffer,
    band_buffers: [ChannelBuffer; Band::COUNT],

    input_gain: Smoother<f32>,
    output_gain: Smoother<f32>,
    input_gain_target: f32,
    output_gain_target: f32,

    input_meter: RmsMeter,
    output_meter: RmsMeter,

    /// Raw input taps feeding the spectrum analyser, if one is attached
    analysis_taps: Vec<PerChannelSampleBuffer>,

    sample_rate: f32,
    max_block_size: usize,
    num_channels: usize,
    prepared: bool,
}

impl Default for MultibandEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MultibandEngine {
    pub fn new() -> Self {
        Self {
            crossover: CrossoverNetwork::new(),
            bands: [
                CompressorBand::new(),
                CompressorBand::new(),
                CompressorBand::new(),
            ],
            input: ChannelBuffer::default(),
            band_buffers: Default::default(),
            input_gain: Smoother::new(SmoothingStyle::Linear(GAIN_RAMP_MS)),
            output_gain: Smoother::new(SmoothingStyle::Linear(GAIN_RAMP_MS)),
            input_gain_target: 1.0,
            output_gain_target: 1.0,
            input_meter: RmsMeter::new(),
            output_meter: RmsMeter::new(),
            analysis_taps: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: 0,
            num_channels: 0,
            prepared: false,
        }
    }

    /// Attach the per-channel sample buffers whose queues feed the spectrum analyser
    pub fn set_analysis_taps(&mut self, taps: Vec<PerChannelSampleBuffer>) {
        self.analysis_taps = taps;
    }

    /// Allocate every buffer and reset all state for a new processing layout
    ///
    /// Nonsensical values are normalised: a sample rate that isn't positive falls back to
    /// 44.1 kHz and block size and channel count are at least 1.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize, num_channels: usize) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        let max_block_size = max_block_size.max(1);
        let num_channels = num_channels.max(1);

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.num_channels = num_channels;

        self.input.resize(num_channels, max_block_size);
        for buffer in &mut self.band_buffers {
            buffer.resize(num_channels, max_block_size);
        }

        self.crossover.prepare(sample_rate, num_channels);
        for band in &mut self.bands {
            band.prepare(sample_rate, max_block_size, num_channels);
        }

        self.prepared = true;
        self.reset();
    }

    /// Clear filter, envelope and gain ramp state without reallocating
    pub fn reset(&mut self) {
        self.crossover.reset();
        for band in &mut self.bands {
            band.reset();
        }
        for tap in &mut self.analysis_taps {
            tap.reset();
        }

        self.input_gain.reset(self.input_gain_target);
        self.output_gain.reset(self.output_gain_target);
        self.input_meter.reset();
        self.output_meter.reset();
    }

    /// Pull a parameter snapshot into the bands, the crossover and the gain ramps
    pub fn update_state(&mut self, settings: &EngineSettings) {
        for (band, band_settings) in self.bands.iter_mut().zip(settings.bands.iter()) {
            band.apply(band_settings);
            band.update_settings();
        }

        self.crossover
            .set_cutoffs(settings.low_mid_crossover_hz, settings.mid_high_crossover_hz);

        // Retargeting restarts the ramp, so only do it when a gain actually moved
        let input_gain_target = util::db_to_gain(settings.gain_in_db);
        if input_gain_target != self.input_gain_target {
            self.input_gain_target = input_gain_target;
            self.input_gain
                .set_target(self.sample_rate, input_gain_target);
        }

        let output_gain_target = util::db_to_gain(settings.gain_out_db);
        if output_gain_target != self.output_gain_target {
            self.output_gain_target = output_gain_target;
            self.output_gain
                .set_target(self.sample_rate, output_gain_target);
        }
    }

    /// Process one host block in place
    ///
    /// Channels beyond the prepared count are silenced. Blocks longer than the prepared maximum
    /// are processed in chunks.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        if !self.prepared {
            nih_debug_assert_failure!("MultibandEngine::process() called before prepare()");
            return;
        }

        for channel in channels.iter_mut().skip(self.num_channels) {
            channel.fill(0.0);
        }

        for tap in &mut self.analysis_taps {
            tap.update(channels);
        }

        let num_samples = channels.first().map_or(0, |c| c.len());
        let mut start = 0;
        while start < num_samples {
            let end = (start + self.max_block_size).min(num_samples);
            self.process_chunk(channels, start..end);
            start = end;
        }
    }

    fn process_chunk(&mut self, channels: &mut [&mut [f32]], range: Range<usize>) {
        let offset = range.start;
        self.input.copy_from_slices(channels, range);
        self.input_meter.update(self.input.iter_channels());

        self.input.apply_gain_ramp(|| self.input_gain.next());

        self.crossover.split(&self.input, &mut self.band_buffers);

        for (band, buffer) in self.bands.iter_mut().zip(self.band_buffers.iter_mut()) {
            band.process(buffer);
        }

        // Soloed bands override mutes, otherwise every unmuted band is summed
        let any_soloed = self.bands.iter().any(CompressorBand::is_soloed);
        self.input.clear();
        for (band, buffer) in self.bands.iter().zip(self.band_buffers.iter()) {
            let audible = if any_soloed {
                band.is_soloed()
            } else {
                !band.is_muted()
            };

            if audible {
                self.input.add_from(buffer);
            }
        }

        self.input.apply_gain_ramp(|| self.output_gain.next());
        self.output_meter.update(self.input.iter_channels());

        let num_channels = self.num_channels.min(channels.len());
        self.input
            .copy_to_slices(&mut channels[..num_channels], offset);
    }

    pub fn band(&self, band: Band) -> &CompressorBand {
        &self.bands[band.index()]
    }

    pub fn crossover(&self) -> &CrossoverNetwork {
        &self.crossover
    }

    /// Smoothed RMS of the host input, before the input gain
    pub fn rms_input_db(&self) -> f32 {
        self.input_meter.level_db()
    }

    /// Smoothed RMS of the final output
    pub fn rms_output_db(&self) -> f32 {
        self.output_meter.level_db()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
