//! Recorded sensor streams
//!
//! A recording is JSON lines, one input per line, in arrival order:
//!
//! ```text
//! {"kind":"accel","x":0.1,"y":0.2,"z":9.8,"timestamp_ms":1000}
//! {"kind":"fix","latitude":52.1,"longitude":4.3,"timestamp_ms":1000,"speed_mps":null}
//! {"kind":"nmea","sentence":"$GPRMC,...","timestamp_ms":1000}
//! {"kind":"location_error","message":"timeout","timestamp_ms":1000}
//! ```
//!
//! Blank lines and `#` comments are skipped. Lines that fail to decode are
//! logged and skipped; only I/O errors end the stream.

use std::io::BufRead;

use log::warn;
use roadpulse::{AccelSample, PositionFix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordEntry {
    Accel(AccelSample),
    Fix(PositionFix),
    Nmea { sentence: String, timestamp_ms: u64 },
    LocationError { message: String, timestamp_ms: u64 },
}

impl RecordEntry {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            RecordEntry::Accel(sample) => sample.timestamp_ms,
            RecordEntry::Fix(fix) => fix.timestamp_ms,
            RecordEntry::Nmea { timestamp_ms, .. } => *timestamp_ms,
            RecordEntry::LocationError { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("read failed at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Iterator over the entries of a recording
pub struct RecordingReader<R> {
    reader: R,
    line_no: usize,
    skipped: usize,
    buf: String,
}

impl<R: BufRead> RecordingReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            skipped: 0,
            buf: String::new(),
        }
    }

    /// Malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for RecordingReader<R> {
    type Item = Result<RecordEntry, RecordingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(RecordingError::Io {
                        line: self.line_no,
                        source,
                    }))
                }
            }

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match serde_json::from_str::<RecordEntry>(line) {
                Ok(entry) => return Some(Ok(entry)),
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping recording line {}: {}", self.line_no, e);
                }
            }
        }
    }
}
