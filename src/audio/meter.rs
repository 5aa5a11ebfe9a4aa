use super::constants::{METER_ATTACK, METER_RELEASE};
use atomic_float::AtomicF32;
use nih_plug::prelude::*;
use std::sync::{atomic::Ordering, Arc};

/// Smoothed RMS level shared between the audio thread and the UI
///
/// The audio thread is the only writer, the UI the only reader. Only the latest value matters,
/// so a relaxed atomic float is all the synchronisation needed. Clones share the same level.
#[derive(Clone)]
pub struct RmsMeter {
    level_db: Arc<AtomicF32>,
}

impl Default for RmsMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl RmsMeter {
    pub fn new() -> Self {
        Self {
            level_db: Arc::new(AtomicF32::new(util::MINUS_INFINITY_DB)),
        }
    }

    /// Measure a block and fold it into the smoothed level (audio thread)
    /// Must be real-time safe - no allocations or locks
    pub fn update<'a>(&self, channels: impl IntoIterator<Item = &'a [f32]>) {
        let block_db = calculate_rms_db(channels);
        let previous_db = self.level_db.load(Ordering::Relaxed);

        let smoothed_db = if block_db > previous_db {
            // Attack: follow increases quickly
            block_db * METER_ATTACK + previous_db * (1.0 - METER_ATTACK)
        } else {
            // Release: decay more gently
            block_db * METER_RELEASE + previous_db * (1.0 - METER_RELEASE)
        };

        self.level_db
            .store(smoothed_db.max(util::MINUS_INFINITY_DB), Ordering::Relaxed);
    }

    /// Latest smoothed level in dB, `util::MINUS_INFINITY_DB` for silence (UI thread)
    pub fn level_db(&self) -> f32 {
        self.level_db.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.level_db
            .store(util::MINUS_INFINITY_DB, Ordering::Relaxed);
    }
}

/// RMS over every sample of every channel, in dB
///
/// Returns `util::MINUS_INFINITY_DB` for empty or silent input.
pub fn calculate_rms_db<'a>(channels: impl IntoIterator<Item = &'a [f32]>) -> f32 {
    let mut sum_of_squares = 0.0f32;
    let mut count = 0usize;

    for channel in channels {
        sum_of_squares += channel.iter().map(|s| s * s).sum::<f32>();
        count += channel.len();
    }

    if count == 0 || sum_of_squares <= 0.0 {
        return util::MINUS_INFINITY_DB;
    }

    let rms = (sum_of_squares / count as f32).sqrt();
    util::gain_to_db(rms).max(util::MINUS_INFINITY_DB)
}
