use super::band::Band;
use super::channel_buffer::ChannelBuffer;
use super::constants::{
    DEFAULT_SAMPLE_RATE, MAX_CUTOFF_NYQUIST_RATIO, MIN_CROSSOVER_SPACING, MIN_CUTOFF_HZ,
};
use std::f32::consts::{PI, SQRT_2};

/// Response of a [`LinkwitzRileyFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    /// Same phase response as the low/high pair summed, with flat magnitude
    AllPass,
}

/// Fourth-order Linkwitz-Riley filter built from two cascaded topology-preserving-transform
/// state variable sections
///
/// # Mathematical Background
/// Each section is a second-order Butterworth SVF with `g = tan(pi * fc / fs)` and damping
/// `R2 = sqrt(2)`. Cascading two of them gives the LR4 response, whose low and high outputs sum
/// to an allpass. The allpass output reuses the first section only: `yL - R2 * yB + yH`.
#[derive(Debug, Clone)]
pub struct LinkwitzRileyFilter {
    filter_type: FilterType,
    cutoff_hz: f32,
    sample_rate: f32,
    g: f32,
    h: f32,
    // Integrator states per channel, [s1, s2, s3, s4]
    state: Vec<[f32; 4]>,
}

impl LinkwitzRileyFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32) -> Self {
        let mut filter = Self {
            filter_type,
            cutoff_hz,
            sample_rate: DEFAULT_SAMPLE_RATE,
            g: 0.0,
            h: 0.0,
            state: Vec::new(),
        };
        filter.update_coefficients();
        filter
    }

    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.state = vec![[0.0; 4]; num_channels];
        self.update_coefficients();
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.update_coefficients();
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.state {
            *state = [0.0; 4];
        }
    }

    fn update_coefficients(&mut self) {
        self.g = (PI * self.cutoff_hz / self.sample_rate).tan();
        self.h = 1.0 / (1.0 + SQRT_2 * self.g + self.g * self.g);
    }

    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let (g, h) = (self.g, self.h);
        let [s1, s2, s3, s4] = &mut self.state[channel];

        let y_h = (input - (SQRT_2 + g) * *s1 - *s2) * h;
        let y_b = g * y_h + *s1;
        *s1 = g * y_h + y_b;
        let y_l = g * y_b + *s2;
        *s2 = g * y_b + y_l;

        if self.filter_type == FilterType::AllPass {
            return y_l - SQRT_2 * y_b + y_h;
        }

        let stage_input = if self.filter_type == FilterType::LowPass {
            y_l
        } else {
            y_h
        };

        let y_h2 = (stage_input - (SQRT_2 + g) * *s3 - *s4) * h;
        let y_b2 = g * y_h2 + *s3;
        *s3 = g * y_h2 + y_b2;
        let y_l2 = g * y_b2 + *s4;
        *s4 = g * y_b2 + y_l2;

        if self.filter_type == FilterType::LowPass {
            y_l2
        } else {
            y_h2
        }
    }

    /// Filter every prepared channel of `buffer` in place
    pub fn process(&mut self, buffer: &mut ChannelBuffer) {
        let num_channels = self.state.len();
        for (channel_idx, channel) in buffer.iter_channels_mut().enumerate().take(num_channels) {
            for sample in channel.iter_mut() {
                *sample = self.process_sample(channel_idx, *sample);
            }
        }
    }
}

/// Three-way Linkwitz-Riley band splitter
///
/// ```text
///            +-> LP1 -> AP2 ------------> low
/// input -----+
///            +-> HP1 -+-> LP2 ----------> mid
///                     +-> HP2 ----------> high
/// ```
///
/// AP2 gives the low band the same phase shift the mid/high split adds to the other two, so the
/// three bands sum to `AP2(AP1(input))`: flat magnitude, no cancellation at the crossovers.
pub struct CrossoverNetwork {
    lp1: LinkwitzRileyFilter,
    hp1: LinkwitzRileyFilter,
    ap2: LinkwitzRileyFilter,
    lp2: LinkwitzRileyFilter,
    hp2: LinkwitzRileyFilter,
    sample_rate: f32,
    low_mid_hz: f32,
    mid_high_hz: f32,
}

impl Default for CrossoverNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossoverNetwork {
    pub fn new() -> Self {
        let low_mid_hz = 400.0;
        let mid_high_hz = 2000.0;
        Self {
            lp1: LinkwitzRileyFilter::new(FilterType::LowPass, low_mid_hz),
            hp1: LinkwitzRileyFilter::new(FilterType::HighPass, low_mid_hz),
            ap2: LinkwitzRileyFilter::new(FilterType::AllPass, mid_high_hz),
            lp2: LinkwitzRileyFilter::new(FilterType::LowPass, mid_high_hz),
            hp2: LinkwitzRileyFilter::new(FilterType::HighPass, mid_high_hz),
            sample_rate: DEFAULT_SAMPLE_RATE,
            low_mid_hz,
            mid_high_hz,
        }
    }

    /// Allocate filter state for a new layout; clears all state
    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        self.sample_rate = sample_rate;
        for filter in self.filters_mut() {
            filter.prepare(sample_rate, num_channels);
        }

        // Limits depend on the sample rate, so re-apply the current cutoffs
        self.set_cutoffs(self.low_mid_hz, self.mid_high_hz);
    }

    /// Update both split points
    ///
    /// Cutoffs are clamped to `[MIN_CUTOFF_HZ, 0.45 * sample_rate]`, swapped when they arrive in
    /// the wrong order and kept at least `MIN_CROSSOVER_SPACING` apart.
    pub fn set_cutoffs(&mut self, low_mid_hz: f32, mid_high_hz: f32) {
        let (low_mid_hz, mid_high_hz) = order_cutoffs(low_mid_hz, mid_high_hz, self.sample_rate);
        self.low_mid_hz = low_mid_hz;
        self.mid_high_hz = mid_high_hz;

        self.lp1.set_cutoff(low_mid_hz);
        self.hp1.set_cutoff(low_mid_hz);
        self.ap2.set_cutoff(mid_high_hz);
        self.lp2.set_cutoff(mid_high_hz);
        self.hp2.set_cutoff(mid_high_hz);
    }

    pub fn low_mid_cutoff(&self) -> f32 {
        self.low_mid_hz
    }

    pub fn mid_high_cutoff(&self) -> f32 {
        self.mid_high_hz
    }

    /// Split `input` into the low, mid and high band buffers
    ///
    /// The band buffers must be allocated for at least `input`'s length; they adopt it.
    pub fn split(&mut self, input: &ChannelBuffer, bands: &mut [ChannelBuffer; Band::COUNT]) {
        for band in bands.iter_mut() {
            band.copy_from(input);
        }

        let [low, mid, high] = bands;

        self.lp1.process(low);
        self.ap2.process(low);

        self.hp1.process(mid);
        high.copy_from(mid);

        self.lp2.process(mid);
        self.hp2.process(high);
    }

    pub fn reset(&mut self) {
        for filter in self.filters_mut() {
            filter.reset();
        }
    }

    fn filters_mut(&mut self) -> [&mut LinkwitzRileyFilter; 5] {
        [
            &mut self.lp1,
            &mut self.hp1,
            &mut self.ap2,
            &mut self.lp2,
            &mut self.hp2,
        ]
    }
}

/// Clamp, order and separate a pair of crossover frequencies
fn order_cutoffs(low_mid_hz: f32, mid_high_hz: f32, sample_rate: f32) -> (f32, f32) {
    let max_cutoff =
        (sample_rate * MAX_CUTOFF_NYQUIST_RATIO).max(MIN_CUTOFF_HZ * MIN_CROSSOVER_SPACING);
    let clamp = |hz: f32| {
        if hz.is_finite() {
            hz.clamp(MIN_CUTOFF_HZ, max_cutoff)
        } else {
            MIN_CUTOFF_HZ
        }
    };

    let (mut low, mut high) = (clamp(low_mid_hz), clamp(mid_high_hz));
    if low >= high {
        std::mem::swap(&mut low, &mut high);
    }

    if high < low * MIN_CROSSOVER_SPACING {
        high = low * MIN_CROSSOVER_SPACING;
        if high > max_cutoff {
            high = max_cutoff;
            low = max_cutoff / MIN_CROSSOVER_SPACING;
        }
    }

    (low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use realfft::RealFftPlanner;

    const SAMPLE_RATE: f32 = 48000.0;

    fn network(low_mid_hz: f32, mid_high_hz: f32, num_channels: usize) -> CrossoverNetwork {
        let mut network = CrossoverNetwork::new();
        network.prepare(SAMPLE_RATE, num_channels);
        network.set_cutoffs(low_mid_hz, mid_high_hz);
        network
    }

    fn band_buffers(num_channels: usize, len: usize) -> [ChannelBuffer; Band::COUNT] {
        [
            ChannelBuffer::new(num_channels, len),
            ChannelBuffer::new(num_channels, len),
            ChannelBuffer::new(num_channels, len),
        ]
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    #[test]
    fn bands_sum_to_flat_magnitude() {
        const LEN: usize = 8192;

        for (low_mid_hz, mid_high_hz) in [(400.0, 2000.0), (20.0, 20000.0), (900.0, 1000.0)] {
            let mut network = network(low_mid_hz, mid_high_hz, 1);
            let mut impulse = vec![0.0; LEN];
            impulse[0] = 1.0;
            let input = ChannelBuffer::from_channels(vec![impulse]);
            let mut bands = band_buffers(1, LEN);

            network.split(&input, &mut bands);

            let mut summed: Vec<f32> = (0..LEN)
                .map(|i| bands.iter().map(|band| band.channel(0)[i]).sum())
                .collect();

            let fft = RealFftPlanner::<f32>::new().plan_fft_forward(LEN);
            let mut spectrum = fft.make_output_vec();
            fft.process(&mut summed, &mut spectrum).unwrap();

            for (bin, value) in spectrum.iter().enumerate() {
                assert!(
                    (value.norm() - 1.0).abs() < 1e-2,
                    "bin {bin} has magnitude {} for cutoffs {low_mid_hz}/{mid_high_hz}",
                    value.norm()
                );
            }
        }
    }

    #[test]
    fn one_khz_sine_lands_in_mid_band() {
        const LEN: usize = 48000;
        const SETTLE: usize = 4800;

        let mut network = network(400.0, 2000.0, 2);
        let sine: Vec<f32> = (0..LEN)
            .map(|i| 0.5 * (2.0 * PI * 1000.0 * i as f32 / SAMPLE_RATE).sin())
            .collect();
        let input = ChannelBuffer::from_channels(vec![sine.clone(), sine.clone()]);
        let mut bands = band_buffers(2, LEN);

        network.split(&input, &mut bands);

        let input_energy = energy(&sine[SETTLE..]);
        let [low, mid, high] = [0, 1, 2].map(|b| energy(&bands[b].channel(0)[SETTLE..]));
        let total = low + mid + high;

        assert!(mid / total >= 0.95, "mid band share {}", mid / total);
        assert!(low / input_energy < 0.01, "low band energy {}", low / input_energy);
        assert!(high / input_energy < 0.01, "high band energy {}", high / input_energy);
    }

    #[test]
    fn allpass_keeps_magnitude() {
        const LEN: usize = 4096;

        let mut filter = LinkwitzRileyFilter::new(FilterType::AllPass, 1000.0);
        filter.prepare(SAMPLE_RATE, 1);
        let mut buffer = ChannelBuffer::new(1, LEN);
        buffer.channel_mut(0)[0] = 1.0;
        filter.process(&mut buffer);

        let mut response = buffer.channel(0).to_vec();
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(LEN);
        let mut spectrum = fft.make_output_vec();
        fft.process(&mut response, &mut spectrum).unwrap();

        assert!(spectrum.iter().all(|v| (v.norm() - 1.0).abs() < 1e-2));
    }

    #[test]
    fn reversed_cutoffs_are_swapped() {
        let network = network(3000.0, 500.0, 2);
        assert_relative_eq!(network.low_mid_cutoff(), 500.0);
        assert_relative_eq!(network.mid_high_cutoff(), 3000.0);
    }

    #[test]
    fn cutoffs_are_clamped_and_separated() {
        let network = network(1.0, 30000.0, 2);
        assert_relative_eq!(network.low_mid_cutoff(), MIN_CUTOFF_HZ);
        assert_relative_eq!(network.mid_high_cutoff(), SAMPLE_RATE * MAX_CUTOFF_NYQUIST_RATIO);

        let network = self::network(1000.0, 1000.0, 2);
        assert_relative_eq!(network.low_mid_cutoff(), 1000.0);
        assert_relative_eq!(network.mid_high_cutoff(), 1010.0, epsilon = 1e-3);

        let network = self::network(f32::NAN, 50000.0, 2);
        assert!(network.low_mid_cutoff() < network.mid_high_cutoff());
    }

    #[test]
    fn reset_clears_filter_state() {
        let mut network = network(400.0, 2000.0, 1);
        let input = ChannelBuffer::from_channels(vec![vec![1.0; 256]]);
        let mut bands = band_buffers(1, 256);
        network.split(&input, &mut bands);

        network.reset();
        let silence = ChannelBuffer::new(1, 256);
        network.split(&silence, &mut bands);

        assert!(bands
            .iter()
            .all(|band| band.channel(0).iter().all(|&s| s == 0.0)));
    }
}
