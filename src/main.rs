//! Omni multisensor capture - OOK/PWM telemetry decoder
//!
//! Reads pulse timings from a radio front end, demodulates the PWM bit
//! stream, decodes Omni telemetry messages, and reports decoded records as
//! JSON lines on stdout.

mod config;
mod omni;
mod ook;
mod report;
mod sensor_tracker;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;
use omni::SensorRecord;
use ook::PulseCapture;
use report::Reporter;
use sensor_tracker::SensorTracker;

/// Seconds between tracker summary log lines
const TRACKER_REPORT_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Records own stdout; all logging goes to stderr
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("===========================================");
    info!("   Omni multisensor capture");
    info!("   rtl_433-style OOK/PWM decoder");
    info!("===========================================");

    let config = Config::from_env();
    info!("Configuration:");
    info!("  Pulse source: {}", config.pulse_source);
    match config.id_filter {
        Some(id) => info!("  Device id filter: {}", id),
        None => info!("  Device id filter: none"),
    }
    info!("  Stats interval: {}s", config.stats_interval_secs);

    // Reporter task writes records to stdout
    let (record_tx, record_rx) = mpsc::channel::<SensorRecord>(1000);
    let reporter_handle = tokio::spawn(async move {
        if let Err(e) = Reporter::new().run(record_rx).await {
            error!("Reporter failed: {:#}", e);
        }
    });

    // Start the pulse capture thread
    let capture = PulseCapture::new(&config.pulse_source);
    let bits_rx = match capture.start() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start pulse capture: {:#}", e);
            return Err(e);
        }
    };

    // Sensor tracker for per-unit aggregation
    let mut tracker = SensorTracker::new();

    // Track statistics
    let mut transmissions = 0u64;
    let mut records_emitted = 0u64;
    let mut decode_failures = 0u64;
    let mut last_stats = Instant::now();
    let mut last_tracker_report = Instant::now();

    info!("===========================================");
    info!("  Listening for transmissions...");
    info!("===========================================");

    // Main processing loop - receive demodulated transmissions
    loop {
        // Non-blocking receive with timeout for periodic tasks
        match bits_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(bits) => {
                transmissions += 1;

                match omni::decode(&bits) {
                    Ok(record) => {
                        if config.id_filter.is_some_and(|id| id != record.id) {
                            debug!("Ignoring filtered device id {}", record.id);
                        } else {
                            tracker.update(&record);
                            if record_tx.send(record).await.is_err() {
                                warn!("Reporter channel closed");
                                break;
                            }
                            records_emitted += 1;
                        }
                    }
                    // Expected under noise and partial reception; the message
                    // is dropped and the next transmission starts fresh
                    Err(e) => {
                        decode_failures += 1;
                        debug!("Transmission dropped: {}", e);
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // No transmission received, continue with periodic tasks
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Pulse capture finished");
                break;
            }
        }

        // Periodic capture statistics
        if last_stats.elapsed() >= Duration::from_secs(config.stats_interval_secs) {
            let stats = capture.stats();
            info!(
                "[Capture] Pulses: {} | Transmissions: {} (dropped: {}) | Parse errors: {} | Records: {} | Decode failures: {}",
                stats.pulses_read.load(Ordering::Relaxed),
                stats.transmissions.load(Ordering::Relaxed),
                stats.dropped_transmissions.load(Ordering::Relaxed),
                stats.parse_errors.load(Ordering::Relaxed),
                records_emitted,
                decode_failures,
            );
            last_stats = Instant::now();
        }

        // Periodic tracker summary
        if last_tracker_report.elapsed() >= Duration::from_secs(TRACKER_REPORT_INTERVAL_SECS) {
            if !tracker.is_empty() {
                info!("[Sensors] {}", tracker.stats_summary());
            }
            last_tracker_report = Instant::now();
        }
    }

    // Cleanup
    capture.stop();
    drop(record_tx);
    let _ = reporter_handle.await;

    info!(
        "Shutdown complete. Transmissions: {}, records: {}, decode failures: {}",
        transmissions, records_emitted, decode_failures
    );
    Ok(())
}
