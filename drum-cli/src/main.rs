//! # drum-tuner
//!
//! Command-line front end for the strike engine. It plays the part of the
//! platform plugin: it owns the audio source, drives `drum_core::StrikeEngine`
//! block by block, and prints every event as one JSON object per line.
//!
//! ## Architecture
//! - **listen**: CPAL stream → crossbeam channel → analysis thread → crossbeam
//!   channel → stdout
//! - **file**: WAV file read with hound, processed inline

mod capture;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{select, Receiver};
use drum_core::{EngineConfig, EngineEvent, EstimatorKind, EventSink, StrikeEngine};

/// Capacity of the block and event channels between threads.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "drum-tuner", about = "Detect drum strikes and report their pitch")]
struct Cli {
    /// JSON file with engine options (camelCase keys, missing keys use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Samples per block fed to the engine
    #[arg(long, global = true, default_value_t = 128)]
    block_size: usize,
    /// Use the zero-crossing estimator instead of the spectral analyzer
    #[arg(long, global = true)]
    zero_crossing: bool,
    /// Suppress periodic amplitude lines
    #[arg(long, global = true)]
    no_amplitude: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the default input device
    Listen {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f32>,
    },
    /// Analyze a WAV file (first channel)
    File { path: PathBuf },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.block_size == 0 {
        bail!("--block-size must be positive");
    }
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if cli.zero_crossing {
        config.estimator = EstimatorKind::ZeroCrossing;
    }

    match cli.command {
        Command::Listen { seconds } => listen(config, &cli, seconds),
        Command::File { ref path } => analyze_file(config, &cli, path),
    }
}

/// Reads engine options from a JSON file.
fn load_config(path: &Path) -> Result<EngineConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn listen(mut config: EngineConfig, cli: &Cli, seconds: Option<f32>) -> Result<()> {
    let (block_tx, block_rx) = crossbeam_channel::bounded::<Vec<f32>>(CHANNEL_CAPACITY);
    let (stream, sample_rate) = capture::start_audio_capture(block_tx, cli.block_size)?;
    config.sample_rate = sample_rate;
    let mut engine = StrikeEngine::new(config).context("invalid engine configuration")?;

    let (event_tx, event_rx) = crossbeam_channel::bounded::<EngineEvent>(CHANNEL_CAPACITY);
    let worker = thread::spawn(move || {
        let mut sink = event_tx;
        for block in block_rx.iter() {
            engine.process_block(&block, &mut sink);
        }
        log::debug!("block channel closed, analysis thread exiting");
    });

    let deadline: Receiver<_> = match seconds {
        Some(s) => crossbeam_channel::after(Duration::from_secs_f32(s.max(0.0))),
        None => crossbeam_channel::never(),
    };

    let mut printer = JsonLines::new(io::stdout().lock(), !cli.no_amplitude);
    log::info!("Listening for strikes...");
    loop {
        select! {
            recv(event_rx) -> msg => match msg {
                Ok(event) => printer.publish(event),
                Err(_) => break,
            },
            recv(deadline) -> _ => break,
        }
    }

    if let Err(e) = cpal::traits::StreamTrait::pause(&stream) {
        log::warn!("Error pausing stream: {}", e);
    }
    // Dropping the stream drops the block sender, which ends the worker.
    drop(stream);
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("analysis thread panicked"))?;
    Ok(())
}

fn analyze_file(mut config: EngineConfig, cli: &Cli, path: &Path) -> Result<()> {
    let (samples, sample_rate) = read_wav(path)?;
    config.sample_rate = sample_rate;
    let mut engine = StrikeEngine::new(config).context("invalid engine configuration")?;
    log::info!(
        "Analyzing {} ({} samples at {} Hz)",
        path.display(),
        samples.len(),
        sample_rate
    );

    let mut printer = JsonLines::new(io::stdout().lock(), !cli.no_amplitude);
    for block in samples.chunks(cli.block_size) {
        engine.process_block(block, &mut printer);
    }
    log::info!("Done: {} analysis result(s)", printer.analysis_count);
    Ok(())
}

/// Loads the first channel of a WAV file as `f32` in [-1, 1].
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok((samples, spec.sample_rate))
}

/// Factor mapping a signed integer sample of `bits` width onto [-1, 1).
fn int_scale(bits: u16) -> f32 {
    1.0 / (1u64 << (bits.clamp(1, 32) - 1)) as f32
}

/// Writes each event as a JSON line.
struct JsonLines<W: Write> {
    out: W,
    amplitude: bool,
    analysis_count: usize,
}

impl<W: Write> JsonLines<W> {
    fn new(out: W, amplitude: bool) -> Self {
        Self {
            out,
            amplitude,
            analysis_count: 0,
        }
    }

    fn write(&mut self, event: &EngineEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> EventSink for JsonLines<W> {
    fn publish(&mut self, event: EngineEvent) {
        match &event {
            EngineEvent::Amplitude(_) if !self.amplitude => return,
            EngineEvent::Analysis(_) => self.analysis_count += 1,
            EngineEvent::Amplitude(_) => {}
        }
        if let Err(e) = self.write(&event) {
            log::warn!("Failed to write event: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drum_core::AmplitudeSample;

    #[test]
    fn int_scale_matches_bit_depth() {
        assert_eq!(int_scale(16), 1.0 / 32768.0);
        assert_eq!(int_scale(24), 1.0 / 8_388_608.0);
        assert_eq!(int_scale(8), 1.0 / 128.0);
    }

    #[test]
    fn loads_partial_config() {
        let path = std::env::temp_dir().join(format!("drum-tuner-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "refineSize": 8192, "zeroPadFactor": 4 }"#).unwrap();
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.refine_size, 8192);
        assert_eq!(config.zero_pad_factor, 4);
        assert_eq!(config.coarse_size, 4096);
    }

    #[test]
    fn missing_config_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/drum-tuner.json")).is_err());
    }

    #[test]
    fn json_lines_filters_amplitude() {
        let amplitude = EngineEvent::Amplitude(AmplitudeSample { rms: 0.5, peak: 0.5, db: -6.0 });

        let mut printer = JsonLines::new(Vec::new(), false);
        printer.publish(amplitude.clone());
        assert!(printer.out.is_empty());

        let mut printer = JsonLines::new(Vec::new(), true);
        printer.publish(amplitude);
        let line = String::from_utf8(printer.out).unwrap();
        assert_eq!(line, "{\"type\":\"amplitude\",\"payload\":{\"rms\":0.5,\"peak\":0.5,\"db\":-6.0}}\n");
    }

    #[test]
    fn reads_wav_first_channel() {
        let path = std::env::temp_dir().join(format!("drum-tuner-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(16384i16, -1i16), (-16384, -1), (0, -1)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = read_wav(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(rate, 48_000);
        assert_eq!(samples, vec![0.5, -0.5, 0.0]);
    }
}
