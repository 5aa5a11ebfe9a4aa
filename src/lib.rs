pub mod audio;
pub mod params;

use atomic_float::AtomicF32;
use audio::audio_engine::MultibandEngine;
use audio::constants::DEFAULT_SAMPLE_RATE;
use audio::sample_buffer::{Channel, PerChannelSampleBuffer};
use audio::spectrum::{Bounds, PathReader, RenderPath, SpectrumAnalyzer};
use nih_plug::prelude::*;
use params::MultibandParams;
use std::sync::{atomic::Ordering, Arc, Mutex};

/// How often the analyser runs on the background thread
const ANALYZER_TICK_HZ: f32 = 60.0;

/// Analyser area used until an editor reports its real size
const DEFAULT_ANALYZER_BOUNDS: Bounds = Bounds {
    x: 0.0,
    y: 0.0,
    width: 640.0,
    height: 240.0,
};

/// Work the audio thread hands to the background thread
pub enum AnalyzerTask {
    /// Drain the sample queues and refresh both spectrum paths
    Tick,
}

pub struct SimpleMbComp {
    params: Arc<MultibandParams>,
    engine: MultibandEngine,

    /// Only locked off the audio thread, by the background task and the UI
    analyzer: Arc<Mutex<SpectrumAnalyzer>>,
    path_readers: [PathReader; 2],
    sample_rate: Arc<AtomicF32>,

    samples_until_tick: usize,
    tick_interval: usize,
}

impl Default for SimpleMbComp {
    fn default() -> Self {
        let (left_tap, left_samples) = PerChannelSampleBuffer::new(Channel::Left);
        let (right_tap, right_samples) = PerChannelSampleBuffer::new(Channel::Right);
        let (mut analyzer, path_readers) = SpectrumAnalyzer::new(left_samples, right_samples);
        analyzer.resized(DEFAULT_ANALYZER_BOUNDS);

        let mut engine = MultibandEngine::new();
        engine.set_analysis_taps(vec![left_tap, right_tap]);

        Self {
            params: Arc::new(MultibandParams::default()),
            engine,
            analyzer: Arc::new(Mutex::new(analyzer)),
            path_readers,
            sample_rate: Arc::new(AtomicF32::new(DEFAULT_SAMPLE_RATE)),
            samples_until_tick: 0,
            tick_interval: 1,
        }
    }
}

impl SimpleMbComp {
    /// Shared analyser handle for an editor's timer and resize callbacks
    pub fn analyzer(&self) -> Arc<Mutex<SpectrumAnalyzer>> {
        self.analyzer.clone()
    }

    /// Most recent spectrum path for `channel`, never blocks
    pub fn latest_path(&mut self, channel: Channel) -> &RenderPath {
        self.path_readers[channel.index()].latest()
    }

    pub fn engine(&self) -> &MultibandEngine {
        &self.engine
    }
}

impl Plugin for SimpleMbComp {
    const NAME: &'static str = "Simple MB Comp";
    const VENDOR: &'static str = "Cmdv";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "info@cmdv.me";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // One stereo bus in, one stereo bus out
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),

        aux_input_ports: &[],
        aux_output_ports: &[],

        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = AnalyzerTask;

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn task_executor(&mut self) -> TaskExecutor<Self> {
        let analyzer = self.analyzer.clone();
        let sample_rate = self.sample_rate.clone();

        Box::new(move |task| match task {
            AnalyzerTask::Tick => {
                // A UI holding the lock just means this tick is skipped
                if let Ok(mut analyzer) = analyzer.try_lock() {
                    let bounds = analyzer.fft_bounds();
                    analyzer.tick(bounds, sample_rate.load(Ordering::Relaxed));
                }
            }
        })
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let num_channels = audio_io_layout
            .main_output_channels
            .map_or(2, |channels| channels.get() as usize);

        nih_plug::nih_log!(
            "Plugin initialize called, sample_rate: {}, buffer_size: {}, channels: {}",
            buffer_config.sample_rate,
            buffer_config.max_buffer_size,
            num_channels
        );

        self.engine.update_state(&self.params.settings());
        self.engine.prepare(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
            num_channels,
        );

        let sample_rate = self.engine.sample_rate();
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.tick_interval = ((sample_rate / ANALYZER_TICK_HZ) as usize).max(1);
        self.samples_until_tick = self.tick_interval;

        nih_plug::nih_log!("Plugin initialized successfully");
        true
    }

    fn reset(&mut self) {
        // Called from the audio thread, must not allocate
        self.engine.reset();
        self.samples_until_tick = self.tick_interval;
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let num_samples = buffer.samples();

        self.engine.update_state(&self.params.settings());
        self.engine.process(buffer.as_slice());

        self.samples_until_tick = self.samples_until_tick.saturating_sub(num_samples);
        if self.samples_until_tick == 0 {
            context.execute_background(AnalyzerTask::Tick);
            self.samples_until_tick = self.tick_interval;
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for SimpleMbComp {
    const CLAP_ID: &'static str = "me.cmdv.simple-mb-comp";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Three band compressor with solo, mute and bypass per band");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Compressor,
        ClapFeature::Analyzer,
    ];
}

impl Vst3Plugin for SimpleMbComp {
    const VST3_CLASS_ID: [u8; 16] = *b"SimpleMbCompCmdv";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Dynamics,
        Vst3SubCategory::Analyzer,
    ];
}

nih_export_clap!(SimpleMbComp);
nih_export_vst3!(SimpleMbComp);
