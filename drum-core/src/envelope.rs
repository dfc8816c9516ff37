//! # Envelope Tracker
//!
//! Keeps an exponential moving average of block RMS, which the strike engine
//! compares against its onset and offset thresholds, and emits an
//! [`AmplitudeSample`] every configured interval.

use crate::AmplitudeSample;

/// Weight given to the previous envelope value on each block.
pub const ENVELOPE_DECAY: f32 = 0.85;

/// Floor applied before converting RMS to decibels.
const DB_FLOOR: f32 = 1e-6;

/// Level measurements for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLevel {
    pub rms: f32,
    pub peak: f32,
    /// Smoothed envelope after this block.
    pub envelope: f32,
    /// Set when an amplitude report fell due on this block.
    pub report: Option<AmplitudeSample>,
}

#[derive(Debug, Clone)]
pub struct EnvelopeTracker {
    envelope: f32,
    samples_since_report: u64,
    report_interval: u64,
}

impl EnvelopeTracker {
    pub fn new(report_interval: u64) -> Self {
        Self {
            envelope: 0.0,
            samples_since_report: 0,
            report_interval: report_interval.max(1),
        }
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Folds one block into the envelope. `samples` must not be empty.
    pub fn update(&mut self, samples: &[f32]) -> BlockLevel {
        let (rms, peak) = block_level(samples);
        self.envelope = ENVELOPE_DECAY * self.envelope + (1.0 - ENVELOPE_DECAY) * rms;
        self.samples_since_report += samples.len() as u64;

        let report = if self.samples_since_report >= self.report_interval {
            self.samples_since_report = 0;
            Some(AmplitudeSample {
                rms,
                peak,
                db: 20.0 * rms.max(DB_FLOOR).log10(),
            })
        } else {
            None
        };

        BlockLevel {
            rms,
            peak,
            envelope: self.envelope,
            report,
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.samples_since_report = 0;
    }
}

/// RMS and peak absolute value of a block. Zero for an empty block.
pub fn block_level(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mut sum_squares = 0.0f64;
    let mut peak = 0.0f32;
    for &s in samples {
        sum_squares += (s as f64) * (s as f64);
        peak = peak.max(s.abs());
    }
    ((sum_squares / samples.len() as f64).sqrt() as f32, peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_of_constant_block() {
        let (rms, peak) = block_level(&[0.5, -0.5, 0.5, -0.5]);
        assert!((rms - 0.5).abs() < 1e-6);
        assert_eq!(peak, 0.5);
        assert_eq!(block_level(&[]), (0.0, 0.0));
    }

    #[test]
    fn envelope_follows_ema() {
        let mut tracker = EnvelopeTracker::new(u64::MAX);
        let block = [0.1f32; 128];
        let first = tracker.update(&block);
        assert!((first.envelope - 0.015).abs() < 1e-6);
        let second = tracker.update(&block);
        assert!((second.envelope - (0.85 * 0.015 + 0.015)).abs() < 1e-6);

        let silent = tracker.update(&[0.0; 128]);
        assert!((silent.envelope - 0.85 * second.envelope).abs() < 1e-6);
    }

    #[test]
    fn reports_every_interval() {
        let mut tracker = EnvelopeTracker::new(300);
        let block = [0.25f32; 128];
        let reports: Vec<bool> = (0..6).map(|_| tracker.update(&block).report.is_some()).collect();
        // 128, 256, 384 -> report, 128, 256, 384 -> report
        assert_eq!(reports, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn report_contents() {
        let mut tracker = EnvelopeTracker::new(1);
        let report = tracker.update(&[0.1, -0.1, 0.1, -0.1]).report.unwrap();
        assert!((report.rms - 0.1).abs() < 1e-6);
        assert!((report.peak - 0.1).abs() < 1e-6);
        assert!((report.db + 20.0).abs() < 1e-3);

        let silent = tracker.update(&[0.0; 16]).report.unwrap();
        assert!((silent.db + 120.0).abs() < 1e-3);
    }

    #[test]
    fn reset_clears_state() {
        let mut tracker = EnvelopeTracker::new(1000);
        tracker.update(&[0.3; 256]);
        tracker.reset();
        assert_eq!(tracker.envelope(), 0.0);
        assert!(tracker.update(&[0.3; 999]).report.is_none());
    }
}
