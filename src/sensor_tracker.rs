//! Sensor state tracking and aggregation
//!
//! Keeps the latest decoded reading per sensor so periodic summaries and
//! downstream consumers can see which units are alive. Decoding itself stays
//! stateless; tracking sits strictly after the decode boundary.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::omni::SensorRecord;

/// Maximum age for sensor state before removal
const SENSOR_TIMEOUT_SECS: u64 = 300;

/// Aggregated state for one sensor unit
#[derive(Debug, Clone)]
pub struct SensorState {
    /// Format and device id, the unit's identity on the channel
    pub fmt: u8,
    pub id: u8,
    /// Most recent decoded record
    pub last_record: SensorRecord,
    /// First and most recent reception times
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Messages decoded from this unit
    pub messages: u64,
}

impl SensorState {
    fn new(record: &SensorRecord) -> Self {
        let now = Instant::now();
        Self {
            fmt: record.fmt,
            id: record.id,
            last_record: record.clone(),
            first_seen: now,
            last_seen: now,
            messages: 0,
        }
    }

    fn update(&mut self, record: &SensorRecord) {
        self.last_record = record.clone();
        self.last_seen = Instant::now();
        self.messages += 1;
    }

    /// Check if this sensor has gone quiet
    pub fn is_stale(&self) -> bool {
        self.last_seen.elapsed() > Duration::from_secs(SENSOR_TIMEOUT_SECS)
    }

    /// Seconds since the last reception
    pub fn age_secs(&self) -> u64 {
        self.last_seen.elapsed().as_secs()
    }
}

/// Sensor tracker - manages state for all units heard on the channel
pub struct SensorTracker {
    sensors: HashMap<(u8, u8), SensorState>,
    last_cleanup: Instant,
}

impl SensorTracker {
    pub fn new() -> Self {
        Self {
            sensors: HashMap::new(),
            last_cleanup: Instant::now(),
        }
    }

    /// Update state with a decoded record, returns the aggregated state
    pub fn update(&mut self, record: &SensorRecord) -> &SensorState {
        let key = (record.fmt, record.id);

        let state = self.sensors.entry(key).or_insert_with(|| {
            info!("New sensor heard: {} id {}", record.model, record.id);
            SensorState::new(record)
        });
        state.update(record);
        debug!(
            "Sensor {} id {} message #{}",
            record.model, record.id, state.messages
        );

        // Periodic cleanup
        if self.last_cleanup.elapsed() > Duration::from_secs(30) {
            self.cleanup_stale();
            self.last_cleanup = Instant::now();
        }

        &self.sensors[&key]
    }

    /// Get state for one unit
    pub fn get(&self, fmt: u8, id: u8) -> Option<&SensorState> {
        self.sensors.get(&(fmt, id))
    }

    /// Count of tracked units, stale ones included until cleanup
    pub fn count(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Remove units that have gone quiet
    fn cleanup_stale(&mut self) {
        let before = self.sensors.len();
        self.sensors.retain(|_, state| !state.is_stale());
        let removed = before - self.sensors.len();
        if removed > 0 {
            debug!(
                "Cleaned up {} stale sensors, {} remaining",
                removed,
                self.sensors.len()
            );
        }
    }

    /// Get summary statistics
    pub fn stats_summary(&self) -> TrackerStats {
        TrackerStats {
            total_sensors: self.sensors.len(),
            total_messages: self.sensors.values().map(|s| s.messages).sum(),
        }
    }
}

impl Default for SensorTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracker statistics
#[derive(Debug, Clone)]
pub struct TrackerStats {
    pub total_sensors: usize,
    pub total_messages: u64,
}

impl std::fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sensors: {} active, {} msgs",
            self.total_sensors, self.total_messages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omni::FormatFields;

    fn record(fmt: u8, id: u8) -> SensorRecord {
        SensorRecord {
            model: if fmt == 0 { "Omni_00" } else { "Omni_01" },
            fmt,
            id,
            fields: FormatFields::Core {
                temperature_c: 21.0,
                voltage_v: 3.3,
                payload: String::new(),
            },
            mic: "CRC",
        }
    }

    #[test]
    fn test_update_counts_messages() {
        let mut tracker = SensorTracker::new();
        tracker.update(&record(0, 1));
        let state = tracker.update(&record(0, 1));
        assert_eq!(state.messages, 2);
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn test_units_tracked_separately() {
        let mut tracker = SensorTracker::new();
        tracker.update(&record(0, 1));
        tracker.update(&record(1, 1));
        tracker.update(&record(1, 2));

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.get(1, 2).unwrap().messages, 1);
        assert!(tracker.get(2, 2).is_none());
    }

    #[test]
    fn test_last_record_kept() {
        let mut tracker = SensorTracker::new();
        tracker.update(&record(1, 1));
        let state = tracker.update(&record(1, 1));
        assert_eq!(state.last_record.model, "Omni_01");
        assert!(!state.is_stale());
    }

    #[test]
    fn test_stats_summary() {
        let mut tracker = SensorTracker::new();
        tracker.update(&record(0, 1));
        tracker.update(&record(0, 1));
        tracker.update(&record(1, 3));

        let stats = tracker.stats_summary();
        assert_eq!(stats.total_sensors, 2);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.to_string(), "Sensors: 2 active, 3 msgs");
    }
}
