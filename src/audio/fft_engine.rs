use super::ring_buffer::LockFreeRingBuffer;
use super::window_functions::WindowData;
use nih_plug::nih_log;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Selectable analysis window length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FftOrder {
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    pub fn fft_size(self) -> usize {
        match self {
            Self::Order2048 => 2048,
            Self::Order4096 => 4096,
            Self::Order8192 => 8192,
        }
    }

    /// Bins kept per frame: DC up to, but not including, nyquist
    pub fn num_bins(self) -> usize {
        self.fft_size() / 2
    }
}

/// One analysed window, magnitudes in dB per bin
pub type FftFrame = Vec<f32>;

/// Turns full analysis windows into dB magnitude frames
///
/// Runs on the analysis thread. Frames are queued so the path generator can consume them at its
/// own pace; when more than the queue's capacity pile up the newest frames are dropped.
pub struct FftDataGenerator {
    order: FftOrder,

    // FFT planner and instance
    planner: RealFftPlanner<f32>,
    fft: Arc<dyn RealToComplex<f32>>,

    // Buffers
    input_buffer: Vec<f32>,        // Windowed samples
    output_buffer: Vec<Complex32>, // FFT output (size/2 + 1 bins)

    // Window function (precomputed for efficiency)
    window: WindowData,

    frames: LockFreeRingBuffer<FftFrame>,
}

impl Default for FftDataGenerator {
    fn default() -> Self {
        Self::new(FftOrder::default())
    }
}

impl FftDataGenerator {
    pub fn new(order: FftOrder) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(order.fft_size());

        let mut generator = Self {
            order,
            planner,
            fft,
            input_buffer: Vec::new(),
            output_buffer: Vec::new(),
            window: WindowData::blackman_harris(order.fft_size()),
            frames: LockFreeRingBuffer::with_default_capacity(),
        };
        generator.change_order(order);
        generator
    }

    /// Rebuild the window, the transform plan and every buffer for a new window length
    ///
    /// Queued frames belong to the old size and are discarded.
    pub fn change_order(&mut self, order: FftOrder) {
        let size = order.fft_size();

        self.order = order;
        self.fft = self.planner.plan_fft_forward(size);
        self.window = WindowData::blackman_harris(size);
        self.input_buffer = self.fft.make_input_vec();
        self.output_buffer = self.fft.make_output_vec();
        self.frames = LockFreeRingBuffer::with_default_capacity();
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.order.fft_size()
    }

    /// Analyse the first `fft_size` samples of `samples` and queue the resulting frame
    ///
    /// Magnitudes are normalised by half the FFT size, non-finite values count as silence and
    /// the dB values never go below `negative_infinity`. Returns whether a frame was queued.
    pub fn produce_frame(&mut self, samples: &[f32], negative_infinity: f32) -> bool {
        let size = self.fft_size();
        if samples.len() < size {
            nih_log!(
                "Skipping FFT frame: got {} samples, need {}",
                samples.len(),
                size
            );
            return false;
        }

        // Step 1: Apply window function to input
        self.input_buffer.copy_from_slice(&samples[..size]);
        self.window.apply(&mut self.input_buffer);

        // Step 2: Run FFT (time domain -> frequency domain)
        if let Err(error) = self
            .fft
            .process(&mut self.input_buffer, &mut self.output_buffer)
        {
            nih_log!("FFT processing failed, dropping frame: {error}");
            return false;
        }

        // Step 3: Normalise magnitudes and convert to dB
        let num_bins = self.order.num_bins();
        let frame: FftFrame = self.output_buffer[..num_bins]
            .iter()
            .map(|bin| {
                let magnitude = bin.norm();
                let magnitude = if magnitude.is_finite() {
                    magnitude / num_bins as f32
                } else {
                    0.0
                };

                gain_to_decibels(magnitude, negative_infinity)
            })
            .collect();

        self.frames.push(frame)
    }

    pub fn available_frames(&self) -> usize {
        self.frames.available_for_read()
    }

    pub fn pull_frame(&mut self) -> Option<FftFrame> {
        self.frames.pop()
    }
}

/// Gain to dB with a configurable floor, silence maps to the floor
fn gain_to_decibels(gain: f32, negative_infinity: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(negative_infinity)
    } else {
        negative_infinity
    }
}
