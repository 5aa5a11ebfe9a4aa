use crate::audio::audio_engine::EngineSettings;
use crate::audio::band::{Band, BandMode};
use crate::audio::compressor_band::BandSettings;
use nih_plug::prelude::*;
use std::sync::Arc;

/// Selectable compression ratios, in the order the host sees them
pub const RATIO_CHOICES: [f32; 14] = [
    1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 15.0, 20.0, 50.0, 100.0,
];
const DEFAULT_RATIO_INDEX: usize = 3;

/// Every control the plugin exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    GainIn,
    GainOut,
    LowMidCrossover,
    MidHighCrossover,
    Threshold(Band),
    Attack(Band),
    Release(Band),
    Ratio(Band),
    Bypassed(Band),
    Mute(Band),
    Solo(Band),
}

/// What kind of value a control holds, with its range and default
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Continuous {
        min: f32,
        max: f32,
        default: f32,
        step: f32,
        /// Skew as nih_plug's `FloatRange::Skewed` factor, 1.0 is linear
        skew: f32,
    },
    Discrete {
        choices: &'static [f32],
        default_index: usize,
    },
    Boolean {
        default: bool,
    },
}

/// How a control's value is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDisplay {
    /// Number followed by a unit; values above 999 are shown in thousands with a "k" prefix
    Unit {
        suffix: &'static str,
        decimals: usize,
    },
    /// Compression ratio as "N:1"
    Ratio,
    /// "On" / "Off"
    Toggle,
}

/// Static description of one control
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub kind: ParamKind,
    pub display: ValueDisplay,
}

impl ControlId {
    /// All 25 controls: the four global ones, then every per-band control band by band
    pub fn all() -> impl Iterator<Item = ControlId> {
        [
            Self::GainIn,
            Self::GainOut,
            Self::LowMidCrossover,
            Self::MidHighCrossover,
        ]
        .into_iter()
        .chain(Band::ALL.into_iter().flat_map(|band| {
            [
                Self::Threshold(band),
                Self::Attack(band),
                Self::Release(band),
                Self::Ratio(band),
                Self::Bypassed(band),
                Self::Mute(band),
                Self::Solo(band),
            ]
        }))
    }

    pub fn band(self) -> Option<Band> {
        match self {
            Self::GainIn | Self::GainOut | Self::LowMidCrossover | Self::MidHighCrossover => None,
            Self::Threshold(band)
            | Self::Attack(band)
            | Self::Release(band)
            | Self::Ratio(band)
            | Self::Bypassed(band)
            | Self::Mute(band)
            | Self::Solo(band) => Some(band),
        }
    }

    pub fn spec(self) -> ControlSpec {
        let decibels = ValueDisplay::Unit {
            suffix: "dB",
            decimals: 1,
        };
        let milliseconds = ValueDisplay::Unit {
            suffix: "ms",
            decimals: 0,
        };
        let hertz = ValueDisplay::Unit {
            suffix: "Hz",
            decimals: 0,
        };

        let continuous = |min, max, default, step, skew| ParamKind::Continuous {
            min,
            max,
            default,
            step,
            skew,
        };
        let toggle = ParamKind::Boolean { default: false };

        let (kind, display) = match self {
            Self::GainIn | Self::GainOut => (continuous(-24.0, 24.0, 0.0, 0.5, 1.5), decibels),
            Self::LowMidCrossover => (continuous(20.0, 999.0, 400.0, 1.0, 1.0), hertz),
            Self::MidHighCrossover => (continuous(1000.0, 20000.0, 2000.0, 1.0, 1.0), hertz),
            Self::Threshold(_) => (continuous(-60.0, 12.0, 0.0, 1.0, 1.0), decibels),
            Self::Attack(_) => (continuous(5.0, 500.0, 50.0, 1.0, 1.0), milliseconds),
            Self::Release(_) => (continuous(5.0, 500.0, 250.0, 1.0, 1.0), milliseconds),
            Self::Ratio(_) => (
                ParamKind::Discrete {
                    choices: &RATIO_CHOICES,
                    default_index: DEFAULT_RATIO_INDEX,
                },
                ValueDisplay::Ratio,
            ),
            Self::Bypassed(_) | Self::Mute(_) | Self::Solo(_) => (toggle, ValueDisplay::Toggle),
        };

        ControlSpec {
            name: self.name(),
            kind,
            display,
        }
    }

    /// Host-facing name, e.g. "Threshold Low Band"
    pub fn name(self) -> String {
        let control = match self {
            Self::GainIn => return "Gain In".to_string(),
            Self::GainOut => return "Gain Out".to_string(),
            Self::LowMidCrossover => return "Low-Mid Crossover Freq".to_string(),
            Self::MidHighCrossover => return "Mid-High Crossover Freq".to_string(),
            Self::Threshold(_) => "Threshold",
            Self::Attack(_) => "Attack",
            Self::Release(_) => "Release",
            Self::Ratio(_) => "Ratio",
            Self::Bypassed(_) => "Bypassed",
            Self::Mute(_) => "Mute",
            Self::Solo(_) => "Solo",
        };

        match self.band() {
            Some(band) => format!("{control} {} Band", band.name()),
            None => control.to_string(),
        }
    }
}

impl ValueDisplay {
    pub fn format(self, value: f32) -> String {
        match self {
            Self::Unit { suffix, decimals } => {
                if value > 999.0 {
                    format!("{:.2} k{suffix}", value / 1000.0)
                } else {
                    format!("{value:.decimals$} {suffix}")
                }
            }
            Self::Ratio => {
                if value.fract() == 0.0 {
                    format!("{value:.0}:1")
                } else {
                    format!("{value:.1}:1")
                }
            }
            Self::Toggle => {
                if value >= 0.5 {
                    "On".to_string()
                } else {
                    "Off".to_string()
                }
            }
        }
    }

    /// Inverse of [`ValueDisplay::format`], tolerant of missing units and a "k" multiplier
    pub fn parse(self, text: &str) -> Option<f32> {
        let text = text.trim();
        match self {
            Self::Unit { suffix, .. } => {
                let number = strip_suffix_ignore_case(text, suffix).trim_end();
                let (number, multiplier) = match number
                    .strip_suffix('k')
                    .or_else(|| number.strip_suffix('K'))
                {
                    Some(number) => (number, 1000.0),
                    None => (number, 1.0),
                };
                number.trim().parse::<f32>().ok().map(|v| v * multiplier)
            }
            Self::Ratio => text.trim_end_matches(":1").trim().parse().ok(),
            Self::Toggle => match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => Some(1.0),
                "off" | "false" | "0" => Some(0.0),
                _ => None,
            },
        }
    }

    fn value_to_string(self) -> Arc<dyn Fn(f32) -> String + Send + Sync> {
        Arc::new(move |value| self.format(value))
    }

    fn string_to_value(self) -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
        Arc::new(move |text| self.parse(text))
    }
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> &'a str {
    if text.len() >= suffix.len() && text.is_char_boundary(text.len() - suffix.len()) {
        let (head, tail) = text.split_at(text.len() - suffix.len());
        if tail.eq_ignore_ascii_case(suffix) {
            return head;
        }
    }
    text
}

/// Compression ratio choice
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    #[id = "1"]
    #[name = "1:1"]
    One,
    #[id = "1.5"]
    #[name = "1.5:1"]
    OneAndAHalf,
    #[id = "2"]
    #[name = "2:1"]
    Two,
    #[id = "3"]
    #[name = "3:1"]
    Three,
    #[id = "4"]
    #[name = "4:1"]
    Four,
    #[id = "5"]
    #[name = "5:1"]
    Five,
    #[id = "6"]
    #[name = "6:1"]
    Six,
    #[id = "7"]
    #[name = "7:1"]
    Seven,
    #[id = "8"]
    #[name = "8:1"]
    Eight,
    #[id = "10"]
    #[name = "10:1"]
    Ten,
    #[id = "15"]
    #[name = "15:1"]
    Fifteen,
    #[id = "20"]
    #[name = "20:1"]
    Twenty,
    #[id = "50"]
    #[name = "50:1"]
    Fifty,
    #[id = "100"]
    #[name = "100:1"]
    Hundred,
}

impl Ratio {
    pub fn value(self) -> f32 {
        RATIO_CHOICES[self.to_index()]
    }
}

/// Build a float parameter from its registry entry
///
/// # Panics
///
/// Panics if `id` is not a continuous control. This only happens at construction time and
/// indicates a programming error.
fn float_param(id: ControlId) -> FloatParam {
    let spec = id.spec();
    let ParamKind::Continuous {
        min,
        max,
        default,
        step,
        skew,
    } = spec.kind
    else {
        panic!("{id:?} is not a continuous control");
    };

    let range = if skew == 1.0 {
        FloatRange::Linear { min, max }
    } else {
        FloatRange::Skewed {
            min,
            max,
            factor: skew,
        }
    };

    FloatParam::new(spec.name, default, range)
        .with_step_size(step)
        .with_value_to_string(spec.display.value_to_string())
        .with_string_to_value(spec.display.string_to_value())
}

/// # Panics
///
/// Panics if `id` is not a boolean control.
fn bool_param(id: ControlId) -> BoolParam {
    let spec = id.spec();
    let ParamKind::Boolean { default } = spec.kind else {
        panic!("{id:?} is not a boolean control");
    };

    BoolParam::new(spec.name, default)
}

/// # Panics
///
/// Panics if `id` is not a discrete control or its default is out of range.
fn ratio_param(id: ControlId) -> EnumParam<Ratio> {
    let spec = id.spec();
    let ParamKind::Discrete {
        choices,
        default_index,
    } = spec.kind
    else {
        panic!("{id:?} is not a discrete control");
    };
    assert_eq!(
        choices.len(),
        Ratio::variants().len(),
        "ratio choices out of sync"
    );

    EnumParam::new(spec.name, Ratio::from_index(default_index))
}

/// Controls for one band
#[derive(Params)]
pub struct BandParams {
    #[id = "threshold"]
    pub threshold: FloatParam,
    #[id = "attack"]
    pub attack: FloatParam,
    #[id = "release"]
    pub release: FloatParam,
    #[id = "ratio"]
    pub ratio: EnumParam<Ratio>,
    #[id = "bypassed"]
    pub bypassed: BoolParam,
    #[id = "mute"]
    pub mute: BoolParam,
    #[id = "solo"]
    pub solo: BoolParam,
}

impl BandParams {
    pub fn new(band: Band) -> Self {
        Self {
            threshold: float_param(ControlId::Threshold(band)),
            attack: float_param(ControlId::Attack(band)),
            release: float_param(ControlId::Release(band)),
            ratio: ratio_param(ControlId::Ratio(band)),
            bypassed: bool_param(ControlId::Bypassed(band)),
            mute: bool_param(ControlId::Mute(band)),
            solo: bool_param(ControlId::Solo(band)),
        }
    }

    pub fn mode(&self) -> BandMode {
        BandMode::from_flags(self.solo.value(), self.mute.value(), self.bypassed.value())
    }

    pub fn settings(&self) -> BandSettings {
        BandSettings {
            attack_ms: self.attack.value(),
            release_ms: self.release.value(),
            threshold_db: self.threshold.value(),
            ratio: self.ratio.value().value(),
            mode: self.mode(),
        }
    }
}

#[derive(Params)]
pub struct MultibandParams {
    #[id = "gain_in"]
    pub gain_in: FloatParam,
    #[id = "gain_out"]
    pub gain_out: FloatParam,
    #[id = "low_mid_crossover"]
    pub low_mid_crossover: FloatParam,
    #[id = "mid_high_crossover"]
    pub mid_high_crossover: FloatParam,

    #[nested(id_prefix = "low", group = "Low Band")]
    pub low: BandParams,
    #[nested(id_prefix = "mid", group = "Mid Band")]
    pub mid: BandParams,
    #[nested(id_prefix = "high", group = "High Band")]
    pub high: BandParams,
}

impl Default for MultibandParams {
    fn default() -> Self {
        Self {
            gain_in: float_param(ControlId::GainIn),
            gain_out: float_param(ControlId::GainOut),
            low_mid_crossover: float_param(ControlId::LowMidCrossover),
            mid_high_crossover: float_param(ControlId::MidHighCrossover),
            low: BandParams::new(Band::Low),
            mid: BandParams::new(Band::Mid),
            high: BandParams::new(Band::High),
        }
    }
}

impl MultibandParams {
    pub fn band(&self, band: Band) -> &BandParams {
        match band {
            Band::Low => &self.low,
            Band::Mid => &self.mid,
            Band::High => &self.high,
        }
    }

    /// Snapshot every current value for the audio engine
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            gain_in_db: self.gain_in.value(),
            gain_out_db: self.gain_out.value(),
            low_mid_crossover_hz: self.low_mid_crossover.value(),
            mid_high_crossover_hz: self.mid_high_crossover.value(),
            bands: Band::ALL.map(|band| self.band(band).settings()),
        }
    }
}
