// drum-core/src/lib.rs

//! The core logic for the drum tuner.
//! This crate detects percussive strikes in a block-wise audio stream and
//! estimates their fundamental, first overtone and confidence. It opens no
//! audio devices and contains no UI code; callers push blocks in and receive
//! [`EngineEvent`]s through an [`EventSink`].

pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod session;
pub mod sink;
pub mod spectrum;
pub mod window;

use serde::{Deserialize, Serialize};

pub use config::{EngineConfig, EstimatorKind};
pub use engine::{EngineStatus, Phase, StrikeEngine};
pub use error::ConfigError;
pub use pitch::{PitchEstimate, PitchEstimator, ZeroCrossingEstimator};
pub use sink::{CallbackSink, EngineEvent, EventSink};
pub use spectrum::SpectralAnalyzer;

/// Which analysis pass produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Short window, low latency, lower trust.
    Coarse,
    /// Long (optionally zero-padded) window.
    Refine,
}

/// A local maximum of the magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    #[serde(rename = "Hz")]
    pub frequency_hz: f32,
    #[serde(rename = "mag")]
    pub magnitude: f32,
}

/// Represents the result of analyzing one strike window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub stage: Stage,
    /// Stream time at the end of the analyzed window, in milliseconds.
    pub timestamp_ms: u64,
    /// The fundamental frequency in Hz.
    pub f0_hz: Option<f32>,
    /// The first strongly coupled overtone above the fundamental.
    pub f1_hz: Option<f32>,
    /// `f1 / f0`.
    pub rtf: Option<f32>,
    /// 0.0 to 1.0; coarse results stay within 0.3..=0.6.
    pub confidence: f32,
    /// Strongest in-band peaks, descending by magnitude.
    pub peaks: Vec<Peak>,
    /// RMS of the most recent block fed into the session.
    pub rms: f32,
}

/// Periodic loudness report, independent of strike detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeSample {
    pub rms: f32,
    pub peak: f32,
    pub db: f32,
}
