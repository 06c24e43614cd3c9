//! Pulse source capture
//!
//! Spawns the radio pulse front end as a subprocess (or reads stdin when the
//! source is "-") and feeds its pulse timing lines through the PWM slicer on
//! a reader thread. Completed transmissions flow to the decode loop over a
//! bounded channel.
//!
//! Line format: two integer fields per line, pulse and gap duration in
//! microseconds, comma or whitespace separated. Lines starting with '#' or
//! ';' are comments.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

use super::bitbuffer::BitBuffer;
use super::slicer::{Pulse, PwmSlicer};

/// Capacity of the transmission channel to the decode loop
const CHANNEL_CAPACITY: usize = 64;

/// Capture statistics shared with the main loop
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub pulses_read: AtomicU64,
    pub parse_errors: AtomicU64,
    pub transmissions: AtomicU64,
    pub dropped_transmissions: AtomicU64,
}

/// Pulse capture - owns the reader thread and its statistics
pub struct PulseCapture {
    source: String,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl PulseCapture {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(CaptureStats::default()),
        }
    }

    /// Start the capture thread and return the transmission channel
    pub fn start(&self) -> Result<Receiver<BitBuffer>> {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);

        let source = self.source.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();
        running.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("pulse-capture".to_string())
            .spawn(move || {
                if let Err(e) = run_capture(&source, tx, &running, &stats) {
                    error!("Pulse capture failed: {:#}", e);
                }
                running.store(false, Ordering::SeqCst);
            })
            .context("Failed to spawn capture thread")?;

        Ok(rx)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        self.stats.clone()
    }
}

impl Drop for PulseCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reader thread body: pulse lines -> slicer -> transmission channel
fn run_capture(
    source: &str,
    tx: Sender<BitBuffer>,
    running: &AtomicBool,
    stats: &CaptureStats,
) -> Result<()> {
    let mut child = None;

    let reader: Box<dyn BufRead> = if source == "-" {
        info!("Reading pulse timings from stdin");
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let mut parts = source.split_whitespace();
        let program = parts.next().context("Empty pulse source command")?;

        info!("Starting pulse source: {}", source);
        let mut spawned = Command::new(program)
            .args(parts)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn pulse source '{}'", program))?;

        let stdout = spawned
            .stdout
            .take()
            .context("Failed to capture pulse source stdout")?;

        // The front end reports its own status on stderr
        if let Some(stderr) = spawned.stderr.take() {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.is_empty() {
                        info!("pulse source: {}", line);
                    }
                }
            });
        }

        child = Some(spawned);
        Box::new(BufReader::new(stdout))
    };

    let mut slicer = PwmSlicer::new();

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = line.context("Error reading pulse source")?;
        let trimmed = line.trim();
        if is_ignorable(trimmed) {
            continue;
        }

        match parse_pulse_line(trimmed) {
            Some(pulse) => {
                stats.pulses_read.fetch_add(1, Ordering::Relaxed);
                if let Some(bits) = slicer.process(pulse) {
                    deliver(&tx, bits, stats);
                }
            }
            None => {
                stats.parse_errors.fetch_add(1, Ordering::Relaxed);
                debug!("Unparseable pulse line: {}", trimmed);
            }
        }
    }

    // The gap that would terminate the last transmission never arrives at EOF
    if let Some(bits) = slicer.flush() {
        deliver(&tx, bits, stats);
    }

    if let Some(mut child) = child {
        let _ = child.kill();
    }

    info!(
        "Pulse source finished. Pulses: {} ({} sync), transmissions: {}, parse errors: {}",
        stats.pulses_read.load(Ordering::Relaxed),
        slicer.stats.sync_pulses,
        stats.transmissions.load(Ordering::Relaxed),
        stats.parse_errors.load(Ordering::Relaxed),
    );

    Ok(())
}

fn deliver(tx: &Sender<BitBuffer>, bits: BitBuffer, stats: &CaptureStats) {
    stats.transmissions.fetch_add(1, Ordering::Relaxed);
    if tx.try_send(bits).is_err() {
        stats.dropped_transmissions.fetch_add(1, Ordering::Relaxed);
        warn!("Transmission channel full, dropping transmission");
    }
}

/// Blank and comment lines carry no pulses and are not errors
fn is_ignorable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with(';')
}

/// Parse one pulse line: "<pulse_us> <gap_us>", comma or whitespace separated
fn parse_pulse_line(line: &str) -> Option<Pulse> {
    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());

    let pulse_us = fields.next()?.parse().ok()?;
    let gap_us = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }

    Some(Pulse { pulse_us, gap_us })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pulse_line_whitespace() {
        let pulse = parse_pulse_line("200 400").unwrap();
        assert_eq!(
            pulse,
            Pulse {
                pulse_us: 200,
                gap_us: 400
            }
        );
    }

    #[test]
    fn test_parse_pulse_line_comma() {
        let pulse = parse_pulse_line("400,200").unwrap();
        assert_eq!(
            pulse,
            Pulse {
                pulse_us: 400,
                gap_us: 200
            }
        );
    }

    #[test]
    fn test_parse_pulse_line_comma_and_space() {
        assert!(parse_pulse_line("600, 600").is_some());
    }

    #[test]
    fn test_parse_pulse_line_invalid() {
        assert!(parse_pulse_line("not a pulse").is_none());
        assert!(parse_pulse_line("200").is_none());
        assert!(parse_pulse_line("200 400 600").is_none());
        assert!(parse_pulse_line("-200 400").is_none());
    }

    #[test]
    fn test_ignorable_lines() {
        assert!(is_ignorable(""));
        assert!(is_ignorable("# pulse capture v1"));
        assert!(is_ignorable("; centifreq 433920000"));
        assert!(!is_ignorable("200 400"));
    }
}
