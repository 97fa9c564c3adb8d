//! NMEA RMC Parser
//!
//! Turns the byte stream of a serial GPS receiver into position fixes.
//! Only the recommended minimum sentence (`$GPRMC` / `$GNRMC`) is decoded;
//! every other talker sentence is skipped.
//!
//! # Features
//!
//! - Zero-allocation parsing into a fixed line buffer
//! - Checksum verification when the sentence carries one
//! - Explicit "no fix" reporting (status `V`) instead of stale data
//! - `no_std` compatible (uses `libm`)
//!
//! # Example
//!
//! ```no_run
//! use roadpulse_nmea::NmeaParser;
//!
//! let mut parser = NmeaParser::new();
//! # let uart_bytes: &[u8] = &[];
//!
//! for &byte in uart_bytes {
//!     match parser.feed_byte(byte) {
//!         Some(Ok(fix)) => { let _ = (fix.lat, fix.lon, fix.speed_mps); }
//!         Some(Err(e)) => { let _ = e; }
//!         None => {}
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "logging")]
use log::warn;

use libm::floor;

/// Longest sentence accepted (NMEA 0183 allows 82, some receivers exceed it)
pub const MAX_SENTENCE_LEN: usize = 120;

/// Knots to meters per second
const KNOTS_TO_MPS: f32 = 0.514444;

/// RMC carries 12 or 13 fields depending on NMEA version
const MAX_FIELDS: usize = 20;

/// Decoded RMC fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmcFix {
    /// Latitude in degrees (positive = North, negative = South)
    pub lat: f64,
    /// Longitude in degrees (positive = East, negative = West)
    pub lon: f64,
    /// Ground speed in m/s, if the receiver reported one
    pub speed_mps: Option<f32>,
    /// Course over ground in radians
    pub course_rad: Option<f32>,
    /// UTC hour (0-23)
    pub hour: u8,
    /// UTC minute (0-59)
    pub minute: u8,
    /// UTC second (0-59)
    pub second: u8,
}

impl RmcFix {
    /// Seconds since UTC midnight
    pub fn seconds_of_day(&self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }
}

/// Why a sentence did not produce a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixError {
    /// Receiver reports no valid fix (status `V`)
    NoFix,
    /// Sentence could not be decoded
    Malformed(&'static str),
}

impl core::fmt::Display for FixError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FixError::NoFix => write!(f, "receiver has no fix"),
            FixError::Malformed(what) => write!(f, "malformed sentence: {}", what),
        }
    }
}

/// Byte-at-a-time sentence assembler
pub struct NmeaParser {
    line_buffer: [u8; MAX_SENTENCE_LEN],
    line_len: usize,
    overflow: bool,
    last_fix: Option<RmcFix>,
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            line_buffer: [0; MAX_SENTENCE_LEN],
            line_len: 0,
            overflow: false,
            last_fix: None,
        }
    }

    /// Feed a single byte from the receiver
    ///
    /// # Returns
    /// * `None` until a complete RMC sentence has been received
    /// * `Some(Ok(fix))` for a valid fix
    /// * `Some(Err(_))` for a no-fix or malformed RMC sentence
    pub fn feed_byte(&mut self, byte: u8) -> Option<Result<RmcFix, FixError>> {
        match byte {
            b'$' => {
                self.line_buffer[0] = byte;
                self.line_len = 1;
                self.overflow = false;
                None
            }
            b'\r' => None,
            b'\n' => {
                if self.line_len == 0 {
                    return None;
                }
                let len = self.line_len;
                self.line_len = 0;

                if self.overflow {
                    self.overflow = false;
                    #[cfg(feature = "logging")]
                    warn!("NMEA sentence exceeded {} bytes", MAX_SENTENCE_LEN);
                    return Some(Err(FixError::Malformed("sentence too long")));
                }

                let mut local_buf = [0u8; MAX_SENTENCE_LEN];
                local_buf[..len].copy_from_slice(&self.line_buffer[..len]);
                let line = match core::str::from_utf8(&local_buf[..len]) {
                    Ok(s) => s,
                    Err(_) => return Some(Err(FixError::Malformed("not ascii"))),
                };

                let result = parse_sentence(line)?;
                if let Ok(fix) = result {
                    self.last_fix = Some(fix);
                }
                Some(result)
            }
            _ => {
                if self.line_len == 0 {
                    // Noise before the first '$'
                    return None;
                }
                if self.line_len < MAX_SENTENCE_LEN {
                    self.line_buffer[self.line_len] = byte;
                    self.line_len += 1;
                } else {
                    self.overflow = true;
                }
                None
            }
        }
    }

    /// Last valid fix seen by this parser
    pub fn last_fix(&self) -> Option<&RmcFix> {
        self.last_fix.as_ref()
    }
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one complete sentence
///
/// # Returns
/// * `None` if the sentence is not RMC
pub fn parse_sentence(line: &str) -> Option<Result<RmcFix, FixError>> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if !(line.starts_with("$GPRMC") || line.starts_with("$GNRMC")) {
        return None;
    }

    let body = match verify_checksum(line) {
        Ok(body) => body,
        Err(e) => {
            #[cfg(feature = "logging")]
            warn!("NMEA checksum mismatch: {}", line);
            return Some(Err(e));
        }
    };

    Some(parse_rmc(body))
}

/// Strip `$` and `*hh`, checking the XOR checksum when present
fn verify_checksum(line: &str) -> Result<&str, FixError> {
    let body = &line[1..];
    let Some((data, checksum)) = body.split_once('*') else {
        return Ok(body);
    };

    let expected =
        u8::from_str_radix(checksum.trim(), 16).map_err(|_| FixError::Malformed("checksum field"))?;
    let actual = data.bytes().fold(0u8, |acc, b| acc ^ b);

    if actual == expected {
        Ok(data)
    } else {
        Err(FixError::Malformed("checksum mismatch"))
    }
}

fn parse_rmc(body: &str) -> Result<RmcFix, FixError> {
    let mut fields = [""; MAX_FIELDS];
    let mut count = 0;
    for field in body.split(',') {
        if count == MAX_FIELDS {
            break;
        }
        fields[count] = field;
        count += 1;
    }

    if count < 10 {
        return Err(FixError::Malformed("too few fields"));
    }

    if fields[2] != "A" {
        return Err(FixError::NoFix);
    }

    let (hour, minute, second) = parse_time(fields[1]).ok_or(FixError::Malformed("time"))?;
    let lat = parse_coordinate(fields[3], fields[4]).ok_or(FixError::Malformed("latitude"))?;
    let lon = parse_coordinate(fields[5], fields[6]).ok_or(FixError::Malformed("longitude"))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(FixError::Malformed("coordinate out of range"));
    }

    let speed_mps = fields[7]
        .parse::<f32>()
        .ok()
        .map(|knots| knots * KNOTS_TO_MPS);
    let course_rad = fields[8].parse::<f32>().ok().map(f32::to_radians);

    Ok(RmcFix {
        lat,
        lon,
        speed_mps,
        course_rad,
        hour,
        minute,
        second,
    })
}

/// Parse NMEA coordinate field (ddmm.mmmm format)
fn parse_coordinate(coord_str: &str, dir_str: &str) -> Option<f64> {
    if coord_str.is_empty() || dir_str.is_empty() {
        return None;
    }

    let value = coord_str.parse::<f64>().ok()?;

    let degrees = floor(value / 100.0);
    let minutes = value - (degrees * 100.0);
    if minutes >= 60.0 {
        return None;
    }

    let decimal = degrees + (minutes / 60.0);

    match dir_str {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}

/// Parse NMEA time field (hhmmss.ss format)
fn parse_time(time_str: &str) -> Option<(u8, u8, u8)> {
    if time_str.len() < 6 || !time_str.is_char_boundary(6) {
        return None;
    }

    let hh = time_str[0..2].parse::<u8>().ok()?;
    let mm = time_str[2..4].parse::<u8>().ok()?;
    let ss = time_str[4..6].parse::<u8>().ok()?;

    if hh > 23 || mm > 59 || ss > 60 {
        return None;
    }

    Some((hh, mm, ss))
}
