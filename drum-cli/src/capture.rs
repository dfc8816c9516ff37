//! # Audio Capture Module
//!
//! Opens the default input device with CPAL and streams fixed-size mono
//! blocks to the analysis thread. Multi-channel devices are reduced to their
//! first channel.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;

/// Sample rate requested from the device when it supports it.
const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel receiving blocks of exactly `block_size` samples
/// * `block_size` - Samples per block handed to the engine
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No usable device or format
pub fn start_audio_capture(sender: Sender<Vec<f32>>, block_size: usize) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    log::info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

    let err_fn = |err| log::error!("An error occurred on the audio stream: {}", err);

    // Accumulates first-channel samples until a whole block is available.
    let mut pending = Vec::with_capacity(block_size * 2);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend(data.iter().step_by(channels.max(1)));

                while pending.len() >= block_size {
                    let block = pending[..block_size].to_vec();
                    // Dropping a block beats stalling the audio callback.
                    let _ = sender.try_send(block);
                    pending.drain(..block_size);
                }
            },
            err_fn,
            None,
        )
        .context("failed to build input stream")?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks an f32 input configuration, preferring mono and then the range
/// closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels() != 1, distance)
        })
}
