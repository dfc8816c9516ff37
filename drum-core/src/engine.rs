//! # Strike Engine
//!
//! Block-driven state machine tying the envelope tracker, the strike session
//! and a pitch estimator together.
//!
//! ## States
//! - **Idle**: waiting for the envelope to reach the onset threshold once the
//!   cooldown from the previous strike has expired
//! - **Capturing**: appending blocks to the session buffer; emits a `coarse`
//!   result once the coarse window is filled and a `refine` result when the
//!   buffer is full or the strike decays below the offset threshold
//!
//! Blocks must be fed one at a time, in order. Nothing on this path blocks or
//! allocates apart from the peak list of an emitted result.

use crate::config::{EngineConfig, EstimatorKind};
use crate::envelope::EnvelopeTracker;
use crate::error::ConfigError;
use crate::pitch::{PitchEstimator, ZeroCrossingEstimator};
use crate::session::StrikeSession;
use crate::sink::{EngineEvent, EventSink};
use crate::spectrum::SpectralAnalyzer;
use crate::{AnalysisResult, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
}

/// Observable engine state, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub phase: Phase,
    pub envelope: f32,
    /// Samples consumed since construction or the last reset.
    pub position: u64,
    /// No session may start before this sample position.
    pub cooldown_until: u64,
    pub captured: usize,
    pub coarse_sent: bool,
}

/// How a capturing block ended the session, if it did.
enum Completion {
    Full,
    Early,
}

pub struct StrikeEngine {
    config: EngineConfig,
    estimator: Box<dyn PitchEstimator>,
    envelope: EnvelopeTracker,
    session: Option<StrikeSession>,
    /// Buffer held between sessions so a new strike does not allocate.
    spare_buffer: Vec<f32>,
    position: u64,
    cooldown_until: u64,
    cooldown_samples: u64,
}

impl StrikeEngine {
    /// Builds an engine with the estimator selected by `config.estimator`.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator: Box<dyn PitchEstimator> = match config.estimator {
            EstimatorKind::Spectral => Box::new(SpectralAnalyzer::new(&config)?),
            EstimatorKind::ZeroCrossing => Box::new(ZeroCrossingEstimator::new(
                config.sample_rate,
                config.min_frequency_hz,
                config.max_frequency_hz,
                config.zero_crossing_target_rms,
            )),
        };
        Self::with_estimator(config, estimator)
    }

    /// Builds an engine around a caller-supplied estimator.
    pub fn with_estimator(
        config: EngineConfig,
        estimator: Box<dyn PitchEstimator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        log::debug!(
            "initialized sample_rate={} coarse={} refine={} zero_pad={} estimator={:?}",
            config.sample_rate,
            config.coarse_size,
            config.refine_size,
            config.zero_pad_factor,
            config.estimator
        );
        Ok(Self {
            envelope: EnvelopeTracker::new(config.amplitude_interval_samples()),
            spare_buffer: Vec::with_capacity(config.refine_size),
            cooldown_samples: config.cooldown_samples(),
            session: None,
            position: 0,
            cooldown_until: 0,
            estimator,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            phase: if self.session.is_some() { Phase::Capturing } else { Phase::Idle },
            envelope: self.envelope.envelope(),
            position: self.position,
            cooldown_until: self.cooldown_until,
            captured: self.session.as_ref().map_or(0, StrikeSession::captured),
            coarse_sent: self.session.as_ref().is_some_and(StrikeSession::coarse_sent),
        }
    }

    /// Feeds one block of mono samples. Events produced by the block are
    /// published to `sink` before this returns. Empty blocks are ignored.
    pub fn process_block<S: EventSink + ?Sized>(&mut self, samples: &[f32], sink: &mut S) {
        if samples.is_empty() {
            return;
        }

        let level = self.envelope.update(samples);
        if let Some(amplitude) = level.report {
            sink.publish(EngineEvent::Amplitude(amplitude));
        }

        let now = self.position;
        if self.session.is_none() && now >= self.cooldown_until && level.envelope >= self.config.strike_on_rms {
            let buffer = std::mem::take(&mut self.spare_buffer);
            self.session = Some(StrikeSession::start(buffer, self.config.refine_size, now));
            log::debug!("strike:start start_sample={} envelope={:.5}", now, level.envelope);
        }

        if let Some(mut session) = self.session.take() {
            session.append(samples);
            session.set_last_rms(level.rms);
            let coarse_size = self.config.coarse_size;

            if !session.coarse_sent() && session.captured() >= coarse_size {
                self.analyze(&session, Stage::Coarse, coarse_size, sink);
                session.mark_coarse_sent();
            }

            let completion = if session.is_full() {
                Some(Completion::Full)
            } else if level.envelope <= self.config.strike_off_rms && session.captured() >= coarse_size {
                Some(Completion::Early)
            } else {
                None
            };

            match completion {
                Some(Completion::Full) => {
                    self.analyze(&session, Stage::Refine, session.capacity(), sink);
                    self.finish(session, now);
                }
                Some(Completion::Early) => {
                    // The tail past the captured samples is already zero.
                    log::debug!(
                        "strike:early start_sample={} captured={}",
                        session.start_sample(),
                        session.captured()
                    );
                    self.analyze(&session, Stage::Refine, session.captured(), sink);
                    self.finish(session, now);
                }
                None => self.session = Some(session),
            }
        }

        self.position += samples.len() as u64;
    }

    /// Drops any active session and returns to the initial Idle state.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            self.spare_buffer = session.into_buffer();
        }
        self.envelope.reset();
        self.position = 0;
        self.cooldown_until = 0;
    }

    fn finish(&mut self, session: StrikeSession, now: u64) {
        self.cooldown_until = now + self.cooldown_samples;
        self.spare_buffer = session.into_buffer();
    }

    /// Runs the estimator over the first `len` samples of the session and
    /// publishes the result, if any.
    fn analyze<S: EventSink + ?Sized>(
        &mut self,
        session: &StrikeSession,
        stage: Stage,
        len: usize,
        sink: &mut S,
    ) {
        let Some(estimate) = self.estimator.estimate(session.window(len), stage) else {
            log::debug!(
                "{}:analysis-null start_sample={}",
                stage_name(stage),
                session.start_sample()
            );
            return;
        };

        let window_len = match stage {
            Stage::Coarse => self.config.coarse_size,
            Stage::Refine => self.config.refine_size,
        };
        let result = AnalysisResult {
            stage,
            timestamp_ms: self.timestamp_ms(session.start_sample() + window_len as u64),
            f0_hz: Some(estimate.f0_hz),
            f1_hz: estimate.f1_hz,
            rtf: estimate.rtf,
            confidence: estimate.confidence,
            peaks: estimate.peaks,
            rms: session.last_rms(),
        };
        log::debug!(
            "emit stage={} f0={:.2} f1={:?} confidence={:.3}",
            stage_name(stage),
            estimate.f0_hz,
            result.f1_hz,
            result.confidence
        );
        sink.publish(EngineEvent::Analysis(result));
    }

    fn timestamp_ms(&self, sample: u64) -> u64 {
        (sample as f64 * 1000.0 / self.config.sample_rate as f64).round() as u64
    }
}

fn stage_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Coarse => "coarse",
        Stage::Refine => "refine",
    }
}
