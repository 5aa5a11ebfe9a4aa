use super::constants::{
    freq_to_log_position, map_range, NEGATIVE_INFINITY_DB, PATH_RESOLUTION,
};
use super::fft_engine::{FftDataGenerator, FftOrder};
use super::ring_buffer::{LockFreeRingBuffer, RingConsumer};
use super::sample_buffer::{Channel, SampleBlock};
use triple_buffer::TripleBuffer;

/// A point in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Screen-space rectangle, y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Shrink by the given margins, never below zero size
    pub fn trimmed(&self, top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }
}

/// Polyline for one analysed frame, x on a log-frequency axis and y on a dB axis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPath {
    points: Vec<Point>,
}

impl RenderPath {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Map a dB frame into `bounds`
///
/// The first point sits at x = 0 with bin 0's level (the bottom edge if that is not finite),
/// then every `PATH_RESOLUTION`th bin is placed at its log-frequency position. Non-finite levels
/// are skipped.
pub fn generate_path(
    frame: &[f32],
    bounds: Bounds,
    fft_size: usize,
    bin_width: f32,
    negative_infinity: f32,
) -> RenderPath {
    let top = bounds.top();
    let bottom = bounds.bottom();
    let width = bounds.width;
    let num_bins = (fft_size / 2).min(frame.len());

    let map = |db: f32| map_range(db, negative_infinity, 0.0, bottom, top);

    let mut points = Vec::with_capacity(num_bins / PATH_RESOLUTION + 1);
    if num_bins == 0 {
        return RenderPath { points };
    }

    let first_y = map(frame[0]);
    points.push(Point {
        x: 0.0,
        y: if first_y.is_finite() { first_y } else { bottom },
    });

    for bin in (1..num_bins).step_by(PATH_RESOLUTION) {
        let y = map(frame[bin]);
        if !y.is_finite() {
            continue;
        }

        let bin_frequency = bin as f32 * bin_width;
        let x = (freq_to_log_position(bin_frequency) * width).floor();
        points.push(Point { x, y });
    }

    RenderPath { points }
}

/// Where a [`PathProducer`] is in its frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing received since construction or the last order change
    Idle,
    /// Collecting samples, or every produced frame has been turned into a path
    Accumulating,
    /// At least one frame is waiting for path generation
    Ready,
}

/// Reading end of a [`PathProducer`]'s latest-path channel
///
/// Hand this to whatever draws the analyser. Reading never blocks and always yields the most
/// recently completed path.
pub struct PathReader {
    output: triple_buffer::Output<RenderPath>,
}

impl PathReader {
    pub fn latest(&mut self) -> &RenderPath {
        self.output.read()
    }
}

/// Per-channel analysis pipeline: sample blocks to FFT frames to render paths
///
/// Incoming blocks are appended to a shift register holding one analysis window. Once a full
/// window's worth of samples has arrived, every further block yields a new frame. Runs on the
/// analysis thread only.
pub struct PathProducer {
    samples: RingConsumer<SampleBlock>,
    shift_register: Vec<f32>,
    accumulated: usize,
    generator: FftDataGenerator,
    paths: LockFreeRingBuffer<RenderPath>,
    latest_path: RenderPath,
    publisher: triple_buffer::Input<RenderPath>,
    negative_infinity: f32,
    state: PipelineState,
}

impl PathProducer {
    pub fn new(samples: RingConsumer<SampleBlock>) -> (Self, PathReader) {
        let (publisher, output) = TripleBuffer::new(&RenderPath::default()).split();
        let order = FftOrder::default();

        let producer = Self {
            samples,
            shift_register: vec![0.0; order.fft_size()],
            accumulated: 0,
            generator: FftDataGenerator::new(order),
            paths: LockFreeRingBuffer::with_default_capacity(),
            latest_path: RenderPath::default(),
            publisher,
            negative_infinity: NEGATIVE_INFINITY_DB,
            state: PipelineState::Idle,
        };

        (producer, PathReader { output })
    }

    /// Drain queued sample blocks, then turn every pending frame into a path and publish the
    /// newest one
    pub fn process(&mut self, bounds: Bounds, sample_rate: f32) {
        self.pull_samples();
        self.generate_paths(bounds, sample_rate);

        let mut newest = None;
        while let Some(path) = self.paths.pop() {
            newest = Some(path);
        }

        if let Some(path) = newest {
            self.publisher.write(path.clone());
            self.latest_path = path;
        }
    }

    /// Move every queued block into the shift register, producing frames as windows fill up.
    /// Returns the number of blocks consumed.
    pub fn pull_samples(&mut self) -> usize {
        let mut blocks = 0;
        while let Some(block) = self.samples.pop() {
            self.push_block(&block);
            blocks += 1;
        }
        blocks
    }

    /// Append one block of samples to the shift register
    pub fn push_block(&mut self, block: &[f32]) {
        let window = self.shift_register.len();
        let count = block.len().min(window);
        if count == 0 {
            return;
        }

        // Oldest samples fall off the front, newest land at the back
        self.shift_register.copy_within(count.., 0);
        self.shift_register[window - count..].copy_from_slice(&block[block.len() - count..]);
        self.accumulated = (self.accumulated + block.len()).min(window);

        if self.accumulated >= window
            && self
                .generator
                .produce_frame(&self.shift_register, self.negative_infinity)
        {
            self.state = PipelineState::Ready;
        } else if self.state == PipelineState::Idle {
            self.state = PipelineState::Accumulating;
        }
    }

    /// Convert all pending frames into paths
    pub fn generate_paths(&mut self, bounds: Bounds, sample_rate: f32) {
        let fft_size = self.generator.fft_size();
        let bin_width = sample_rate / fft_size as f32;

        while let Some(frame) = self.generator.pull_frame() {
            let path = generate_path(&frame, bounds, fft_size, bin_width, self.negative_infinity);
            // A full path queue just means the reader is behind, the newest path is dropped
            let _ = self.paths.push(path);
        }

        if self.state == PipelineState::Ready {
            self.state = PipelineState::Accumulating;
        }
    }

    /// Switch the analysis window length, discarding all buffered audio, frames and paths
    pub fn change_order(&mut self, order: FftOrder) {
        self.generator.change_order(order);
        self.shift_register = vec![0.0; order.fft_size()];
        self.accumulated = 0;
        self.paths.clear();
        self.state = PipelineState::Idle;
    }

    pub fn order(&self) -> FftOrder {
        self.generator.order()
    }

    pub fn set_negative_infinity(&mut self, negative_infinity: f32) {
        self.negative_infinity = negative_infinity;
    }

    pub fn negative_infinity(&self) -> f32 {
        self.negative_infinity
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn available_frames(&self) -> usize {
        self.generator.available_frames()
    }

    pub fn latest_path(&self) -> &RenderPath {
        &self.latest_path
    }

    /// Throw away queued sample blocks without analysing them
    pub fn discard_samples(&mut self) {
        while self.samples.pop().is_some() {}
    }
}

/// Margins between the analyser component and the area the spectrum is drawn into
const RENDER_MARGIN_TOP: f32 = 12.0;
const RENDER_MARGIN_BOTTOM: f32 = 2.0;
const RENDER_MARGIN_SIDES: f32 = 20.0;
const ANALYSIS_MARGIN: f32 = 4.0;

/// Left/right spectrum analyser, driven by a ~60 Hz timer off the audio thread
pub struct SpectrumAnalyzer {
    left: PathProducer,
    right: PathProducer,
    enabled: bool,
    fft_bounds: Bounds,
}

impl SpectrumAnalyzer {
    /// Build the analyser from the reading ends of the left and right sample queues
    pub fn new(
        left_samples: RingConsumer<SampleBlock>,
        right_samples: RingConsumer<SampleBlock>,
    ) -> (Self, [PathReader; 2]) {
        let (left, left_reader) = PathProducer::new(left_samples);
        let (right, right_reader) = PathProducer::new(right_samples);

        let analyzer = Self {
            left,
            right,
            enabled: true,
            fft_bounds: Bounds::default(),
        };

        (analyzer, [left_reader, right_reader])
    }

    /// Timer callback: analyse whatever arrived since the last tick
    ///
    /// While disabled the queued audio is discarded so stale blocks don't pile up.
    pub fn tick(&mut self, bounds: Bounds, sample_rate: f32) {
        if self.enabled {
            self.left.process(bounds, sample_rate);
            self.right.process(bounds, sample_rate);
        } else {
            self.left.discard_samples();
            self.right.discard_samples();
        }
    }

    /// Recompute the drawing area for a new component size
    ///
    /// The dB floor is chosen so that the component's bottom edge lines up with -48 dB at the
    /// analysis area's bottom and 0 dB at its top.
    pub fn resized(&mut self, component: Bounds) {
        let render_area = component.trimmed(
            RENDER_MARGIN_TOP,
            RENDER_MARGIN_BOTTOM,
            RENDER_MARGIN_SIDES,
            RENDER_MARGIN_SIDES,
        );
        let analysis_area = render_area.trimmed(ANALYSIS_MARGIN, ANALYSIS_MARGIN, 0.0, 0.0);

        if analysis_area.height > 0.0 {
            let negative_infinity = map_range(
                component.bottom(),
                analysis_area.bottom(),
                analysis_area.top(),
                NEGATIVE_INFINITY_DB,
                0.0,
            );
            self.set_negative_infinity(negative_infinity);
        }

        self.fft_bounds = Bounds {
            height: component.bottom() - analysis_area.top(),
            ..analysis_area
        };
    }

    /// Area the paths are mapped into, extending down to the component's bottom edge
    pub fn fft_bounds(&self) -> Bounds {
        self.fft_bounds
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_fft_order(&mut self, order: FftOrder) {
        if order != self.left.order() {
            nih_plug::nih_log!("Analyser FFT size changed to {}", order.fft_size());
        }
        self.left.change_order(order);
        self.right.change_order(order);
    }

    pub fn set_negative_infinity(&mut self, negative_infinity: f32) {
        self.left.set_negative_infinity(negative_infinity);
        self.right.set_negative_infinity(negative_infinity);
    }

    pub fn latest_path(&self, channel: Channel) -> &RenderPath {
        match channel {
            Channel::Left => self.left.latest_path(),
            Channel::Right => self.right.latest_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::constants::ANALYSIS_BLOCK_SIZE;
    use crate::audio::sample_buffer::PerChannelSampleBuffer;
    use approx::assert_relative_eq;

    const SAMPLE_RATE: f32 = 48000.0;

    fn bounds() -> Bounds {
        Bounds::new(0.0, 0.0, 600.0, 200.0)
    }

    fn producer() -> (PerChannelSampleBuffer, PathProducer, PathReader) {
        let (buffer, consumer) = PerChannelSampleBuffer::new(Channel::Left);
        let (producer, reader) = PathProducer::new(consumer);
        (buffer, producer, reader)
    }

    #[test]
    fn one_full_window_yields_one_frame() {
        let (mut buffer, mut producer, _) = producer();
        assert_eq!(producer.state(), PipelineState::Idle);

        buffer.push_samples(&vec![0.25; 2048]);
        assert_eq!(producer.pull_samples(), 2048 / ANALYSIS_BLOCK_SIZE);

        assert_eq!(producer.available_frames(), 1);
        assert_eq!(producer.state(), PipelineState::Ready);
    }

    #[test]
    fn partial_window_yields_nothing() {
        let (mut buffer, mut producer, _) = producer();

        buffer.push_samples(&vec![0.25; 2048 - ANALYSIS_BLOCK_SIZE]);
        producer.pull_samples();

        assert_eq!(producer.available_frames(), 0);
        assert_eq!(producer.state(), PipelineState::Accumulating);
    }

    #[test]
    fn every_block_after_the_first_window_yields_a_frame() {
        let (mut buffer, mut producer, _) = producer();

        buffer.push_samples(&vec![0.25; 2048 + 2 * ANALYSIS_BLOCK_SIZE]);
        producer.pull_samples();

        assert_eq!(producer.available_frames(), 3);
    }

    #[test]
    fn processing_publishes_the_latest_path() {
        let (mut buffer, mut producer, mut reader) = producer();
        assert!(reader.latest().is_empty());

        buffer.push_samples(&vec![0.25; 4096]);
        producer.process(bounds(), SAMPLE_RATE);

        assert_eq!(producer.state(), PipelineState::Accumulating);
        assert_eq!(producer.available_frames(), 0);
        assert!(!producer.latest_path().is_empty());
        assert_eq!(reader.latest(), producer.latest_path());
    }

    #[test]
    fn changing_order_resets_everything() {
        let (mut buffer, mut producer, _) = producer();
        buffer.push_samples(&vec![0.25; 2048]);
        producer.pull_samples();

        producer.change_order(FftOrder::Order4096);
        assert_eq!(producer.state(), PipelineState::Idle);
        assert_eq!(producer.available_frames(), 0);

        // The old samples are gone, a 4096 window needs a fresh 4096 samples
        buffer.push_samples(&vec![0.25; 2048]);
        producer.pull_samples();
        assert_eq!(producer.available_frames(), 0);

        buffer.push_samples(&vec![0.25; 2048]);
        producer.pull_samples();
        assert_eq!(producer.available_frames(), 1);
    }

    #[test]
    fn path_maps_decibels_and_log_frequency() {
        let fft_size = 2048;
        let bin_width = SAMPLE_RATE / fft_size as f32;
        let mut frame = vec![-48.0; fft_size / 2];
        frame[0] = f32::NAN;
        frame[1] = 0.0;
        frame[3] = -24.0;
        frame[5] = f32::INFINITY;

        let path = generate_path(&frame, bounds(), fft_size, bin_width, -48.0);
        let points = path.points();

        // NaN at bin 0 falls back to the bottom edge
        assert_eq!(points[0], Point { x: 0.0, y: 200.0 });
        // 0 dB is the top edge
        assert_relative_eq!(points[1].y, 0.0);
        assert_eq!(
            points[1].x,
            (freq_to_log_position(bin_width) * 600.0).floor()
        );
        assert_relative_eq!(points[2].y, 100.0);
        // Bin 5 is infinite and skipped, so bin 7 follows bin 3
        assert_eq!(
            points[3].x,
            (freq_to_log_position(7.0 * bin_width) * 600.0).floor()
        );
        // First point plus every second bin from 1, minus the skipped one
        assert_eq!(points.len(), 1 + 512 - 1);
    }

    #[test]
    fn disabled_analyzer_discards_audio() {
        let (mut left, left_consumer) = PerChannelSampleBuffer::new(Channel::Left);
        let (mut right, right_consumer) = PerChannelSampleBuffer::new(Channel::Right);
        let (mut analyzer, _) = SpectrumAnalyzer::new(left_consumer, right_consumer);

        analyzer.set_enabled(false);
        left.push_samples(&vec![0.5; 4096]);
        right.push_samples(&vec![0.5; 4096]);
        analyzer.tick(bounds(), SAMPLE_RATE);
        assert!(analyzer.latest_path(Channel::Left).is_empty());

        analyzer.set_enabled(true);
        left.push_samples(&vec![0.5; 2048]);
        analyzer.tick(bounds(), SAMPLE_RATE);
        assert!(!analyzer.latest_path(Channel::Left).is_empty());
        assert!(analyzer.latest_path(Channel::Right).is_empty());
    }

    #[test]
    fn resizing_derives_the_decibel_floor() {
        let (_, left_consumer) = PerChannelSampleBuffer::new(Channel::Left);
        let (_, right_consumer) = PerChannelSampleBuffer::new(Channel::Right);
        let (mut analyzer, _) = SpectrumAnalyzer::new(left_consumer, right_consumer);

        analyzer.resized(Bounds::new(0.0, 0.0, 640.0, 200.0));

        // Analysis area spans y = 16..194, the component bottom is 200
        let fft_bounds = analyzer.fft_bounds();
        assert_relative_eq!(fft_bounds.x, 20.0);
        assert_relative_eq!(fft_bounds.width, 600.0);
        assert_relative_eq!(fft_bounds.top(), 16.0);
        assert_relative_eq!(fft_bounds.bottom(), 200.0);
        assert_relative_eq!(
            analyzer.left.negative_infinity(),
            -48.0 - 6.0 * 48.0 / 178.0,
            epsilon = 1e-4
        );
    }
}
