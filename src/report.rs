//! Decoded record reporting
//!
//! Writes one JSON object per line to stdout, stamped with the reception
//! time. This is the boundary to downstream consumers (MQTT relays, log
//! collectors); everything else stays on stderr via tracing.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::info;

use crate::omni::SensorRecord;

/// One emitted report line: reception time plus the record fields
#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    time: String,
    #[serde(flatten)]
    record: &'a SensorRecord,
}

/// Record reporter (takes ownership of the record receiver)
pub struct Reporter {
    out: tokio::io::Stdout,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }

    /// Consume records until the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<SensorRecord>) -> Result<()> {
        info!("[Report] Writing records to stdout");
        let mut emitted = 0u64;

        while let Some(record) = rx.recv().await {
            let line = render_line(&record, &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())?;
            self.out.write_all(line.as_bytes()).await?;
            self.out.flush().await?;
            emitted += 1;
        }

        info!("[Report] Stream ended after {} records", emitted);
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one newline-terminated JSON report line
fn render_line(record: &SensorRecord, time: &str) -> Result<String> {
    let mut line = serde_json::to_string(&ReportLine {
        time: time.to_string(),
        record,
    })?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omni::{decode_frame, Frame};

    fn decoded(hex_frame: &str) -> SensorRecord {
        let bytes: [u8; 10] = hex::decode(hex_frame).unwrap().try_into().unwrap();
        decode_frame(&Frame::new(bytes)).unwrap()
    }

    #[test]
    fn test_report_line_format_1() {
        let record = decoded("11000000000003e80063");
        let line = render_line(&record, "2025-06-01 12:00:00").unwrap();

        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""time":"2025-06-01 12:00:00""#));
        assert!(line.contains(r#""model":"Omni_01""#));
        assert!(line.contains(r#""fmt":1"#));
        assert!(line.contains(r#""id":1"#));
        assert!(line.contains(r#""pressure_hPa":100.0"#));
        assert!(line.contains(r#""mic":"CRC""#));
    }

    #[test]
    fn test_report_line_format_0() {
        let record = decoded("00000a000000000032c7");
        let line = render_line(&record, "2025-06-01 12:00:00").unwrap();

        assert!(line.contains(r#""model":"Omni_00""#));
        assert!(line.contains(r#""temperature_C":1.0"#));
        assert!(line.contains(r#""voltage_V":3.5"#));
        assert!(line.contains(r#""payload":"0x00 0x0a 0x00 0x00 0x00 0x00 0x00 0x32""#));
    }

    #[test]
    fn test_report_line_is_valid_json() {
        let record = decoded("110d7fcb2d5803e81e1b");
        let line = render_line(&record, "2025-06-01 12:00:00").unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["humidity"], 45);
        assert_eq!(value["humidity_2"], 88);
        assert_eq!(value["temperature_2_C"], -5.3);
    }
}
