//! End-to-end strike scenarios against the real spectral and zero-crossing
//! estimators.

use std::f32::consts::PI;
use std::thread;

use drum_core::{
    AnalysisResult, EngineConfig, EngineEvent, EstimatorKind, Phase, Stage, StrikeEngine,
};

const SAMPLE_RATE: u32 = 44_100;
const BLOCK: usize = 128;

/// A sine burst of `burst_ms` at the given RMS, followed by silence up to `total_ms`.
fn tone_burst(freq: f32, rms: f32, burst_ms: f32, total_ms: f32) -> Vec<f32> {
    let amplitude = rms * 2f32.sqrt();
    let burst = (burst_ms * SAMPLE_RATE as f32 / 1000.0) as usize;
    let total = (total_ms * SAMPLE_RATE as f32 / 1000.0) as usize;
    (0..total)
        .map(|i| {
            if i < burst {
                amplitude * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin()
            } else {
                0.0
            }
        })
        .collect()
}

fn run(engine: &mut StrikeEngine, signal: &[f32]) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for block in signal.chunks(BLOCK) {
        engine.process_block(block, &mut events);
    }
    events
}

fn analysis(events: &[EngineEvent]) -> Vec<AnalysisResult> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Analysis(result) => Some(result.clone()),
            EngineEvent::Amplitude(_) => None,
        })
        .collect()
}

#[test]
fn tone_burst_yields_coarse_then_refine() {
    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let signal = tone_burst(220.0, 0.05, 400.0, 1000.0);
    let results = analysis(&run(&mut engine, &signal));

    assert_eq!(results.len(), 2, "{results:#?}");

    let coarse = &results[0];
    assert_eq!(coarse.stage, Stage::Coarse);
    let f0 = coarse.f0_hz.unwrap();
    assert!((f0 - 220.0).abs() < 5.0, "coarse f0 = {f0}");
    assert!((0.3..=0.6).contains(&coarse.confidence));

    let refine = &results[1];
    assert_eq!(refine.stage, Stage::Refine);
    let f0 = refine.f0_hz.unwrap();
    assert!((f0 - 220.0).abs() < 1.0, "refine f0 = {f0}");
    assert!(refine.confidence > 0.5);
    assert!(refine.timestamp_ms > coarse.timestamp_ms);
    assert!(!refine.peaks.is_empty());
    assert!(refine.rms > 0.03 && refine.rms < 0.07);

    assert_eq!(engine.status().phase, Phase::Idle);
}

#[test]
fn short_strike_is_flushed_early() {
    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let signal = tone_burst(220.0, 0.05, 136.0, 800.0);
    let results = analysis(&run(&mut engine, &signal));

    let stages: Vec<Stage> = results.iter().map(|r| r.stage).collect();
    assert_eq!(stages, vec![Stage::Coarse, Stage::Refine]);
    let f0 = results[1].f0_hz.unwrap();
    assert!((f0 - 220.0).abs() < 3.0, "early refine f0 = {f0}");
    assert_eq!(engine.status().phase, Phase::Idle);
}

#[test]
fn separated_strikes_are_analyzed_independently() {
    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let mut signal = tone_burst(180.0, 0.05, 400.0, 1000.0);
    signal.extend(tone_burst(330.0, 0.05, 400.0, 1000.0));
    let results = analysis(&run(&mut engine, &signal));

    let refines: Vec<f32> = results
        .iter()
        .filter(|r| r.stage == Stage::Refine)
        .filter_map(|r| r.f0_hz)
        .collect();
    assert_eq!(refines.len(), 2, "{results:#?}");
    assert!((refines[0] - 180.0).abs() < 1.0);
    assert!((refines[1] - 330.0).abs() < 1.0);
}

#[test]
fn zero_crossing_strategy_reports_pitch_without_peaks() {
    let config = EngineConfig {
        estimator: EstimatorKind::ZeroCrossing,
        ..Default::default()
    };
    let mut engine = StrikeEngine::new(config).unwrap();
    let signal = tone_burst(220.0, 0.05, 400.0, 1000.0);
    let results = analysis(&run(&mut engine, &signal));

    assert_eq!(results.len(), 2);
    for result in &results {
        let f0 = result.f0_hz.unwrap();
        assert!((f0 - 220.0).abs() < 10.0, "{:?} f0 = {f0}", result.stage);
        assert!(result.peaks.is_empty());
        assert!(result.f1_hz.is_none());
    }
}

#[test]
fn amplitude_reports_are_periodic() {
    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let signal = tone_burst(220.0, 0.05, 400.0, 1000.0);
    let events = run(&mut engine, &signal);

    let reports = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Amplitude(_)))
        .count();
    // 2205-sample interval reached every 18 blocks of 128
    assert_eq!(reports, signal.len() / BLOCK / 18);
}

#[test]
fn engine_runs_on_a_processing_thread() {
    let (tx, rx) = crossbeam_channel::bounded(64);
    let signal = tone_burst(220.0, 0.05, 400.0, 1000.0);

    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let worker = thread::spawn(move || {
        let mut sink = tx;
        for block in signal.chunks(BLOCK) {
            engine.process_block(block, &mut sink);
        }
    });
    worker.join().unwrap();

    let stages: Vec<Stage> = rx
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::Analysis(result) => Some(result.stage),
            EngineEvent::Amplitude(_) => None,
        })
        .collect();
    assert_eq!(stages, vec![Stage::Coarse, Stage::Refine]);
}

#[test]
fn reset_discards_a_strike_in_progress() {
    let mut engine = StrikeEngine::new(EngineConfig::default()).unwrap();
    let signal = tone_burst(220.0, 0.05, 400.0, 400.0);
    run(&mut engine, &signal[..8192]);
    assert_eq!(engine.status().phase, Phase::Capturing);

    engine.reset();
    let first = engine.status();
    engine.reset();
    assert_eq!(first, engine.status());
    assert_eq!(first.phase, Phase::Idle);
    assert_eq!(first.position, 0);
}
