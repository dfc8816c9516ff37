//! # Spectral Analyzer
//!
//! Turns a strike window into a fundamental estimate:
//! 1. Hann window over the first window-length samples, zero beyond
//! 2. Radix-2 FFT (the refine FFT may be longer than its window to zero-pad)
//! 3. Magnitude spectrum over the lower half
//! 4. Strongest bin inside the configured band, refined by parabolic interpolation
//! 5. Local-maximum peaks, overtone search and a peak-to-floor confidence
//!
//! Each stage owns a preallocated [`SpectralFrame`], so analysis on the audio
//! path never allocates except for the returned peak list.

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::fft::Radix2Fft;
use crate::pitch::{find_overtone, parabolic_interpolate, stage_confidence, PitchEstimate, PitchEstimator};
use crate::window::hann_window;
use crate::{Peak, Stage};

/// Bins at or below this magnitude are treated as silence.
const MAGNITUDE_FLOOR: f64 = 1e-9;

/// Scratch state for one window class.
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    fft: Radix2Fft,
    window: Vec<f64>,
    real: Vec<f64>,
    imag: Vec<f64>,
    magnitudes: Vec<f64>,
    /// (bin, magnitude) of local maxima, reused across calls.
    candidates: Vec<(usize, f64)>,
    bin_resolution: f64,
    min_bin: usize,
    max_bin: usize,
}

impl SpectralFrame {
    fn new(
        window_size: usize,
        fft_size: usize,
        sample_rate: u32,
        min_frequency_hz: f32,
        max_frequency_hz: f32,
    ) -> Result<Self, ConfigError> {
        let fft = Radix2Fft::new(fft_size)?;
        let bins = fft_size / 2;
        let bin_resolution = sample_rate as f64 / fft_size as f64;
        let min_bin = ((min_frequency_hz as f64 / bin_resolution).floor() as usize).max(1);
        let max_bin = ((max_frequency_hz as f64 / bin_resolution).ceil() as usize).min(bins.saturating_sub(2));

        Ok(Self {
            fft,
            window: hann_window(window_size),
            real: vec![0.0; fft_size],
            imag: vec![0.0; fft_size],
            magnitudes: vec![0.0; bins],
            candidates: Vec::with_capacity(max_bin.saturating_sub(min_bin)),
            bin_resolution,
            min_bin,
            max_bin,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn bin_resolution(&self) -> f64 {
        self.bin_resolution
    }

    /// Inclusive in-band bin range searched for the fundamental.
    pub fn band(&self) -> (usize, usize) {
        (self.min_bin, self.max_bin)
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Windows `samples` into the real buffer and runs the transform.
    fn load_and_transform(&mut self, samples: &[f32]) {
        for (i, (re, w)) in self.real.iter_mut().zip(&self.window).enumerate() {
            *re = samples.get(i).map_or(0.0, |&s| s as f64 * w);
        }
        let window_size = self.window.len();
        self.real[window_size..].fill(0.0);
        self.imag.fill(0.0);
        self.fft.transform(&mut self.real, &mut self.imag);
    }

    /// Fills the magnitude array. Returns the strongest in-band bin, its
    /// magnitude, and the sum over all bins.
    fn compute_magnitudes(&mut self) -> (Option<usize>, f64, f64) {
        let mut best_bin = None;
        let mut best_mag = 0.0;
        let mut total = 0.0;
        for (i, mag) in self.magnitudes.iter_mut().enumerate() {
            *mag = self.real[i].hypot(self.imag[i]);
            total += *mag;
            if i >= self.min_bin && i <= self.max_bin && *mag > best_mag {
                best_mag = *mag;
                best_bin = Some(i);
            }
        }
        (best_bin, best_mag, total)
    }

    /// Strict local maxima strictly inside the band, strongest first.
    fn collect_peaks(&mut self) {
        self.candidates.clear();
        let end = self.max_bin.saturating_sub(1);
        for i in (self.min_bin + 1)..end {
            let mag = self.magnitudes[i];
            if mag > self.magnitudes[i - 1] && mag > self.magnitudes[i + 1] {
                self.candidates.push((i, mag));
            }
        }
        self.candidates
            .sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    }
}

/// Windowed-FFT pitch estimator with coarse and refine frames.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    coarse: SpectralFrame,
    refine: SpectralFrame,
    max_peaks: usize,
}

impl SpectralAnalyzer {
    /// Allocates both frames from `config`.
    ///
    /// # Returns
    /// * `Err(ConfigError)` - if the configuration is invalid
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let coarse = SpectralFrame::new(
            config.coarse_size,
            config.coarse_size,
            config.sample_rate,
            config.min_frequency_hz,
            config.max_frequency_hz,
        )?;
        let refine = SpectralFrame::new(
            config.refine_size,
            config.refine_fft_size(),
            config.sample_rate,
            config.min_frequency_hz,
            config.max_frequency_hz,
        )?;
        Ok(Self {
            coarse,
            refine,
            max_peaks: config.max_peaks,
        })
    }

    pub fn frame(&self, stage: Stage) -> &SpectralFrame {
        match stage {
            Stage::Coarse => &self.coarse,
            Stage::Refine => &self.refine,
        }
    }

    /// Analyzes `samples` with the frame for `stage`.
    ///
    /// # Returns
    /// * `Some(estimate)` - a fundamental was found in band
    /// * `None` - silence or nothing in band above the magnitude floor
    pub fn analyze(&mut self, samples: &[f32], stage: Stage) -> Option<PitchEstimate> {
        let max_peaks = self.max_peaks;
        let frame = match stage {
            Stage::Coarse => &mut self.coarse,
            Stage::Refine => &mut self.refine,
        };

        frame.load_and_transform(samples);
        let (best_bin, best_mag, total) = frame.compute_magnitudes();
        let best_bin = best_bin.filter(|_| best_mag > MAGNITUDE_FLOOR)?;

        let refined_bin = parabolic_interpolate(&frame.magnitudes, best_bin);
        let f0 = refined_bin * frame.bin_resolution;
        if !f0.is_finite() || f0 <= 0.0 {
            return None;
        }
        let f0 = f0 as f32;

        frame.collect_peaks();
        let resolution = frame.bin_resolution;
        let to_peak = |&(bin, mag): &(usize, f64)| Peak {
            frequency_hz: (bin as f64 * resolution) as f32,
            magnitude: mag as f32,
        };
        let peaks: Vec<Peak> = frame.candidates.iter().take(max_peaks).map(to_peak).collect();
        let f1 = find_overtone(
            peaks
                .iter()
                .zip(&frame.candidates)
                .filter(|(_, (bin, _))| *bin != best_bin)
                .map(|(peak, _)| peak),
            f0,
        );

        let bins = frame.magnitudes.len().max(1) as f64;
        let noise_floor = ((total - best_mag) / bins).max(MAGNITUDE_FLOOR);
        let raw_confidence = (best_mag / (best_mag + noise_floor)) as f32;

        Some(PitchEstimate {
            f0_hz: f0,
            f1_hz: f1,
            rtf: f1.map(|f1| f1 / f0),
            confidence: stage_confidence(stage, raw_confidence),
            peaks,
        })
    }
}

impl PitchEstimator for SpectralAnalyzer {
    fn estimate(&mut self, samples: &[f32], stage: Stage) -> Option<PitchEstimate> {
        self.analyze(samples, stage)
    }
}
