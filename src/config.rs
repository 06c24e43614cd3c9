//! Configuration loaded from environment variables

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Pulse source command, or "-" to read pulse timings from stdin
    pub pulse_source: String,

    /// Only report this device id when set
    pub id_filter: Option<u8>,

    /// Seconds between periodic capture statistics log lines
    pub stats_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            pulse_source: std::env::var("PULSE_SOURCE").unwrap_or_else(|_| "-".to_string()),

            id_filter: std::env::var("ID_FILTER").ok().and_then(|s| s.parse().ok()),

            stats_interval_secs: std::env::var("STATS_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}
