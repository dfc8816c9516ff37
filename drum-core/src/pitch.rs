//! # Pitch Estimation Module
//!
//! The strike session does not care how a pitch is found, only that an
//! estimator can turn a window of samples into a [`PitchEstimate`]. Two
//! strategies are provided:
//!
//! - [`SpectralAnalyzer`](crate::SpectralAnalyzer): windowed FFT with parabolic
//!   interpolation, harmonic peaks and overtone search (default)
//! - [`ZeroCrossingEstimator`]: zero-crossing rate, a low-power fallback
//!   with no harmonic information
//!
//! This module also holds the numeric helpers both strategies share.

use crate::{Peak, Stage};

/// Lower bound of the overtone search, as a multiple of f0.
pub const OVERTONE_MIN_RATIO: f32 = 1.4;
/// Upper bound of the overtone search, as a multiple of f0.
pub const OVERTONE_MAX_RATIO: f32 = 3.2;

/// Denominators smaller than this disable parabolic interpolation.
const INTERPOLATION_EPSILON: f64 = 1e-9;

/// What an estimator found in one window.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEstimate {
    pub f0_hz: f32,
    pub f1_hz: Option<f32>,
    pub rtf: Option<f32>,
    pub confidence: f32,
    pub peaks: Vec<Peak>,
}

/// A strategy that estimates pitch from a window of samples.
///
/// `samples` may be shorter than the stage's window; implementations treat the
/// missing tail as silence. Returning `None` means the window was
/// inconclusive, which is not an error.
pub trait PitchEstimator: Send {
    fn estimate(&mut self, samples: &[f32], stage: Stage) -> Option<PitchEstimate>;
}

/// Refines a spectral peak to fractional-bin precision.
///
/// Fits a parabola through the magnitude at `index` and its two neighbours.
/// Edge bins and flat neighbourhoods return `index` unchanged.
pub fn parabolic_interpolate(magnitudes: &[f64], index: usize) -> f64 {
    if index == 0 || index + 1 >= magnitudes.len() {
        return index as f64;
    }
    let left = magnitudes[index - 1];
    let center = magnitudes[index];
    let right = magnitudes[index + 1];
    let denominator = left - 2.0 * center + right;
    if denominator.abs() < INTERPOLATION_EPSILON {
        return index as f64;
    }
    index as f64 + 0.5 * (left - right) / denominator
}

/// Returns the first peak (in the given order) inside `[1.4·f0, 3.2·f0]`.
pub fn find_overtone<'a, I>(peaks: I, f0: f32) -> Option<f32>
where
    I: IntoIterator<Item = &'a Peak>,
{
    if !f0.is_finite() || f0 <= 0.0 {
        return None;
    }
    let min = f0 * OVERTONE_MIN_RATIO;
    let max = f0 * OVERTONE_MAX_RATIO;
    peaks
        .into_iter()
        .map(|p| p.frequency_hz)
        .find(|&hz| hz >= min && hz <= max)
}

/// Clamps a raw confidence for the stage that produced it.
///
/// Coarse windows are short, so their confidence is held within `0.3..=0.6`.
pub fn stage_confidence(stage: Stage, raw: f32) -> f32 {
    let raw = if raw.is_nan() { 0.0 } else { raw };
    match stage {
        Stage::Coarse => raw.clamp(0.3, 1.0).min(0.6),
        Stage::Refine => raw.clamp(0.0, 1.0),
    }
}

/// Zero-crossing rate pitch estimator.
///
/// Counts sign changes over the window and converts the rate to Hz.
/// Confidence scales with the window's RMS relative to `target_rms`.
#[derive(Debug, Clone)]
pub struct ZeroCrossingEstimator {
    sample_rate: u32,
    min_frequency_hz: f32,
    max_frequency_hz: f32,
    target_rms: f32,
}

impl ZeroCrossingEstimator {
    pub fn new(sample_rate: u32, min_frequency_hz: f32, max_frequency_hz: f32, target_rms: f32) -> Self {
        Self {
            sample_rate,
            min_frequency_hz,
            max_frequency_hz,
            target_rms,
        }
    }
}

impl PitchEstimator for ZeroCrossingEstimator {
    fn estimate(&mut self, samples: &[f32], stage: Stage) -> Option<PitchEstimate> {
        if samples.len() < 2 {
            return None;
        }
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] >= 0.0 && w[1] < 0.0) || (w[0] <= 0.0 && w[1] > 0.0))
            .count();
        if crossings < 2 {
            return None;
        }

        let f0 = (crossings as f64 * self.sample_rate as f64 / (2.0 * samples.len() as f64)) as f32;
        if f0 < self.min_frequency_hz || f0 > self.max_frequency_hz {
            return None;
        }

        let (rms, _) = crate::envelope::block_level(samples);
        let raw = if self.target_rms > 0.0 { rms / self.target_rms } else { 1.0 };

        Some(PitchEstimate {
            f0_hz: f0,
            f1_hz: None,
            rtf: None,
            confidence: stage_confidence(stage, raw),
            peaks: Vec::new(),
        })
    }
}
