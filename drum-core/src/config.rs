//! # Engine Configuration
//!
//! All tunables of the strike engine live in [`EngineConfig`]. Field names
//! serialize in camelCase so that option files written for the web plugin
//! (`coarseSize`, `strikeOnRms`, ...) deserialize unchanged. Missing fields
//! fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{require_power_of_two, ConfigError};

/// Which pitch estimator the strike session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimatorKind {
    /// Windowed FFT with parabolic peak interpolation (default).
    #[default]
    Spectral,
    /// Zero-crossing rate. Cheap, no harmonic information.
    ZeroCrossing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Stream sample rate in Hz, constant for the engine's lifetime.
    pub sample_rate: u32,
    /// Coarse analysis window length in samples (power of two).
    pub coarse_size: usize,
    /// Refine analysis window length in samples (power of two).
    pub refine_size: usize,
    /// FFT length multiplier applied to the refine window.
    pub zero_pad_factor: usize,
    /// Envelope level that opens a strike session.
    pub strike_on_rms: f32,
    /// Envelope level below which a partially filled session is flushed.
    pub strike_off_rms: f32,
    pub cooldown_ms: f32,
    pub amplitude_interval_ms: f32,
    pub min_frequency_hz: f32,
    pub max_frequency_hz: f32,
    /// Upper bound on peaks reported per result.
    pub max_peaks: usize,
    pub estimator: EstimatorKind,
    /// RMS that maps to full confidence for the zero-crossing estimator.
    pub zero_crossing_target_rms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            coarse_size: 4096,
            refine_size: 16384,
            zero_pad_factor: 2,
            strike_on_rms: 0.012,
            strike_off_rms: 0.006,
            cooldown_ms: 260.0,
            amplitude_interval_ms: 50.0,
            min_frequency_hz: 20.0,
            max_frequency_hz: 1200.0,
            max_peaks: 6,
            estimator: EstimatorKind::Spectral,
            zero_crossing_target_rms: 0.12,
        }
    }
}

impl EngineConfig {
    /// Rejects configurations that cannot produce a working engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        require_power_of_two("coarseSize", self.coarse_size)?;
        require_power_of_two("refineSize", self.refine_size)?;
        require_power_of_two("zeroPadFactor", self.zero_pad_factor)?;
        if self.coarse_size > self.refine_size {
            return Err(ConfigError::CoarseExceedsRefine {
                coarse: self.coarse_size,
                refine: self.refine_size,
            });
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        let band_ok = self.min_frequency_hz.is_finite()
            && self.max_frequency_hz.is_finite()
            && self.min_frequency_hz >= 0.0
            && self.min_frequency_hz < self.max_frequency_hz
            && self.max_frequency_hz <= nyquist;
        if !band_ok {
            return Err(ConfigError::InvalidBand {
                min_hz: self.min_frequency_hz,
                max_hz: self.max_frequency_hz,
                sample_rate: self.sample_rate,
            });
        }

        if self.max_peaks == 0 {
            return Err(ConfigError::NoPeaks);
        }
        Ok(())
    }

    /// FFT length used by the refine stage.
    pub fn refine_fft_size(&self) -> usize {
        self.refine_size * self.zero_pad_factor
    }

    pub fn cooldown_samples(&self) -> u64 {
        ms_to_samples(self.cooldown_ms, self.sample_rate)
    }

    /// Never zero, so a report is due at least once per block.
    pub fn amplitude_interval_samples(&self) -> u64 {
        ms_to_samples(self.amplitude_interval_ms, self.sample_rate).max(1)
    }
}

fn ms_to_samples(ms: f32, sample_rate: u32) -> u64 {
    let samples = (ms.max(0.0) as f64 * sample_rate as f64 / 1000.0).floor();
    samples as u64
}
