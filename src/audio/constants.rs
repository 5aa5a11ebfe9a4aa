/// Audio processing constants and helper functions
/// Shared by the signal path, the analyser and the parameter registry

/// Frequency range of the analyser display and the crossover controls
pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Fallback used when the host hands us a nonsensical sample rate
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Number of slots in every lock-free queue (sample blocks, FFT frames, render paths)
pub const FIFO_CAPACITY: usize = 30;

/// Size of the fixed blocks the per-channel sample buffers hand to the analyser
pub const ANALYSIS_BLOCK_SIZE: usize = 512;

/// Input/output gain ramp length, long enough to avoid zipper noise
pub const GAIN_RAMP_MS: f32 = 50.0;

/// Crossover safety limits
pub const MIN_CUTOFF_HZ: f32 = 10.0;
pub const MAX_CUTOFF_NYQUIST_RATIO: f32 = 0.45; // fraction of the sample rate, just below nyquist
pub const MIN_CROSSOVER_SPACING: f32 = 1.01; // ratio between the two cutoffs

/// Default analyser dB floor, see `SpectrumAnalyzer::resized` for the size-dependent one
pub const NEGATIVE_INFINITY_DB: f32 = -48.0;

/// Draw a line segment for every second FFT bin
pub const PATH_RESOLUTION: usize = 2;

/// Smoothing factors for the RMS meters, applied once per processed block
pub const METER_ATTACK: f32 = 0.8; // Fast attack
pub const METER_RELEASE: f32 = 0.2; // Slower release

// === HELPER FUNCTIONS ===

/// Convert frequency to logarithmic position (0.0 to 1.0)
pub fn freq_to_log_position(freq: f32) -> f32 {
    (freq / MIN_FREQUENCY).log10() / (MAX_FREQUENCY / MIN_FREQUENCY).log10()
}

/// Linear remap of `value` from `[source_min, source_max]` to `[target_min, target_max]`
pub fn map_range(
    value: f32,
    source_min: f32,
    source_max: f32,
    target_min: f32,
    target_max: f32,
) -> f32 {
    target_min + (value - source_min) / (source_max - source_min) * (target_max - target_min)
}
