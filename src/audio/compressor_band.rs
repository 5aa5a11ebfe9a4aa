use super::band::BandMode;
use super::channel_buffer::ChannelBuffer;
use super::meter::RmsMeter;
use nih_plug::prelude::*;
use std::f32::consts::PI;

/// Control values for one band, snapshotted from the parameters once per block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub threshold_db: f32,
    pub ratio: f32,
    pub mode: BandMode,
}

impl Default for BandSettings {
    fn default() -> Self {
        Self {
            attack_ms: 50.0,
            release_ms: 250.0,
            threshold_db: 0.0,
            ratio: 3.0,
            mode: BandMode::Normal,
        }
    }
}

/// Peak envelope follower with separate attack and release time constants
struct BallisticsFilter {
    exp_factor: f32,
    attack_coefficient: f32,
    release_coefficient: f32,
    attack_ms: f32,
    release_ms: f32,
    /// Envelope state per channel
    state: Vec<f32>,
}

impl BallisticsFilter {
    fn new() -> Self {
        Self {
            exp_factor: 0.0,
            attack_coefficient: 0.0,
            release_coefficient: 0.0,
            attack_ms: 1.0,
            release_ms: 100.0,
            state: Vec::new(),
        }
    }

    fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.exp_factor = -2.0 * PI * 1000.0 / sample_rate;
        self.state = vec![0.0; num_channels];
        self.attack_coefficient = self.coefficient(self.attack_ms);
        self.release_coefficient = self.coefficient(self.release_ms);
    }

    fn set_attack(&mut self, attack_ms: f32) {
        if attack_ms != self.attack_ms {
            self.attack_ms = attack_ms;
            self.attack_coefficient = self.coefficient(attack_ms);
        }
    }

    fn set_release(&mut self, release_ms: f32) {
        if release_ms != self.release_ms {
            self.release_ms = release_ms;
            self.release_coefficient = self.coefficient(release_ms);
        }
    }

    /// Times under a microsecond mean "follow instantly"
    fn coefficient(&self, time_ms: f32) -> f32 {
        if time_ms < 1.0e-3 {
            0.0
        } else {
            (self.exp_factor / time_ms).exp()
        }
    }

    #[inline]
    fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let level = input.abs();
        let previous = self.state[channel];
        let coefficient = if level > previous {
            self.attack_coefficient
        } else {
            self.release_coefficient
        };

        let envelope = level + coefficient * (previous - level);
        self.state[channel] = envelope;
        envelope
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
    }
}

/// Feed-forward peak compressor with a hard knee
struct Compressor {
    envelope: BallisticsFilter,
    threshold: f32,
    threshold_inverse: f32,
    ratio_inverse: f32,
}

impl Compressor {
    fn new() -> Self {
        let mut compressor = Self {
            envelope: BallisticsFilter::new(),
            threshold: 1.0,
            threshold_inverse: 1.0,
            ratio_inverse: 1.0,
        };
        compressor.set_threshold(0.0);
        compressor.set_ratio(1.0);
        compressor
    }

    fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold = util::db_to_gain(threshold_db).max(f32::MIN_POSITIVE);
        self.threshold_inverse = 1.0 / self.threshold;
    }

    fn set_ratio(&mut self, ratio: f32) {
        self.ratio_inverse = 1.0 / ratio.max(1.0);
    }

    #[inline]
    fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let envelope = self.envelope.process_sample(channel, input);

        let gain = if envelope < self.threshold {
            1.0
        } else {
            (envelope * self.threshold_inverse).powf(self.ratio_inverse - 1.0)
        };

        gain * input
    }
}

/// One band's compressor plus its control values
///
/// The public fields are what the parameter layer writes; [`CompressorBand::update_settings`]
/// pushes them into the dynamics processor once per block.
pub struct CompressorBand {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub threshold_db: f32,
    pub ratio: f32,
    pub mode: BandMode,

    compressor: Compressor,
    num_channels: usize,
    prepared: bool,

    input_meter: RmsMeter,
    output_meter: RmsMeter,
}

impl Default for CompressorBand {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressorBand {
    pub fn new() -> Self {
        let defaults = BandSettings::default();
        Self {
            attack_ms: defaults.attack_ms,
            release_ms: defaults.release_ms,
            threshold_db: defaults.threshold_db,
            ratio: defaults.ratio,
            mode: defaults.mode,
            compressor: Compressor::new(),
            num_channels: 0,
            prepared: false,
            input_meter: RmsMeter::new(),
            output_meter: RmsMeter::new(),
        }
    }

    /// Allocate per-channel state. Must run before [`CompressorBand::process`] and again whenever
    /// the sample rate or channel count changes.
    pub fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.compressor.envelope.prepare(sample_rate, num_channels);
        self.num_channels = num_channels;
        self.prepared = true;
        self.update_settings();
        self.input_meter.reset();
        self.output_meter.reset();
    }

    /// Copy a parameter snapshot into the public fields
    pub fn apply(&mut self, settings: &BandSettings) {
        self.attack_ms = settings.attack_ms;
        self.release_ms = settings.release_ms;
        self.threshold_db = settings.threshold_db;
        self.ratio = settings.ratio;
        self.mode = settings.mode;
    }

    /// Push attack/release/threshold/ratio into the dynamics processor
    pub fn update_settings(&mut self) {
        self.compressor.envelope.set_attack(self.attack_ms.max(0.0));
        self.compressor.envelope.set_release(self.release_ms.max(0.0));
        self.compressor.set_threshold(self.threshold_db);
        self.compressor.set_ratio(self.ratio);
    }

    /// Compress `buffer` in place, or leave it untouched while bypassed
    pub fn process(&mut self, buffer: &mut ChannelBuffer) {
        if !self.prepared {
            nih_debug_assert_failure!("CompressorBand::process() called before prepare()");
            return;
        }

        self.input_meter.update(buffer.iter_channels());

        if !self.is_bypassed() {
            let num_channels = self.num_channels;
            for (channel_idx, channel) in buffer.iter_channels_mut().enumerate().take(num_channels)
            {
                for sample in channel.iter_mut() {
                    *sample = self.compressor.process_sample(channel_idx, *sample);
                }
            }
        }

        self.output_meter.update(buffer.iter_channels());
    }

    /// Clear the envelope so the next block starts from silence
    pub fn reset(&mut self) {
        self.compressor.envelope.reset();
        self.input_meter.reset();
        self.output_meter.reset();
    }

    pub fn is_bypassed(&self) -> bool {
        self.mode.is_bypassed()
    }

    pub fn is_muted(&self) -> bool {
        self.mode.is_muted()
    }

    pub fn is_soloed(&self) -> bool {
        self.mode.is_soloed()
    }

    /// Smoothed RMS of the last processed input block, in dB
    pub fn rms_input_db(&self) -> f32 {
        self.input_meter.level_db()
    }

    /// Smoothed RMS of the last processed output block, in dB
    pub fn rms_output_db(&self) -> f32 {
        self.output_meter.level_db()
    }

    /// Output RMS minus input RMS, so 0 dB or below while compressing
    pub fn gain_reduction_db(&self) -> f32 {
        let input_db = self.rms_input_db();
        let output_db = self.rms_output_db();
        if input_db <= util::MINUS_INFINITY_DB {
            0.0
        } else {
            (output_db - input_db).min(0.0)
        }
    }
}
