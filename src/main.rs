//! Application entry point — console DOA tracker.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and
//!    validate the framing constants.
//! 3. Open the microphone array by name substring and start the capture
//!    stream (fatal if no device matches).
//! 4. Build the bundled estimator and the processor, subscribe a console
//!    observer.
//! 5. Start the worker and block on stdin — press Enter to stop.

use std::sync::Arc;

use anyhow::Context;
use doa_tracker::audio::AudioCapture;
use doa_tracker::config::AppConfig;
use doa_tracker::doa::GridSearchEstimator;
use doa_tracker::processor::DoaProcessor;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("DOA tracker starting up");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }
    };
    config.validate().context("invalid configuration")?;

    let capture = AudioCapture::open(&config.audio, &config.device_filter)
        .context("failed to open the microphone array")?;
    let (handle, source) = capture.start().context("failed to start capture")?;

    let estimator = Arc::new(GridSearchEstimator::new(&config.doa));
    let mut processor = DoaProcessor::new(&config, estimator);
    processor.subscribe(|update| match update.angle_degrees {
        Some(degrees) => println!(
            "Estimated Angle: {degrees:.2}°  ({:.1} dB)",
            update.decibels
        ),
        None => println!("(below gate)      ({:.1} dB)", update.decibels),
    });

    processor
        .start(Box::new(source))
        .context("failed to start the processor")?;

    println!(
        "tracking with {} (gate {} dB) — press Enter to stop",
        config.algorithm, config.threshold_db
    );
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    processor.stop().context("processor failed")?;
    drop(handle); // releases the capture stream
    Ok(())
}
