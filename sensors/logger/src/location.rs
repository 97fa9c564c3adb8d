/// NMEA location source
/// Feeds raw receiver bytes through the RMC parser and stamps each fix with
/// the arrival time supplied by the caller.
use roadpulse::PositionFix;
use roadpulse_nmea::{FixError, NmeaParser, RmcFix};

pub fn fix_from_rmc(rmc: &RmcFix, timestamp_ms: u64) -> PositionFix {
    PositionFix {
        latitude: rmc.lat,
        longitude: rmc.lon,
        timestamp_ms,
        speed_mps: rmc.speed_mps,
        accuracy_m: None,
    }
}

pub struct NmeaLocationSource {
    parser: NmeaParser,
}

impl NmeaLocationSource {
    pub fn new() -> Self {
        Self {
            parser: NmeaParser::new(),
        }
    }

    /// Feed receiver bytes that arrived at `timestamp_ms`
    ///
    /// Returns one result per complete RMC sentence in `bytes`.
    pub fn feed(&mut self, bytes: &[u8], timestamp_ms: u64) -> Vec<Result<PositionFix, FixError>> {
        bytes
            .iter()
            .filter_map(|&b| self.parser.feed_byte(b))
            .map(|result| result.map(|rmc| fix_from_rmc(&rmc, timestamp_ms)))
            .collect()
    }

    /// Feed one sentence (line terminator optional)
    pub fn feed_sentence(
        &mut self,
        sentence: &str,
        timestamp_ms: u64,
    ) -> Option<Result<PositionFix, FixError>> {
        let mut results = self.feed(sentence.trim_end().as_bytes(), timestamp_ms);
        results.extend(self.feed(b"\r\n", timestamp_ms));
        results.pop()
    }
}

impl Default for NmeaLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const NO_FIX: &str = "$GPRMC,123520,V,,,,,,,230394,,,N*5B";

    #[test]
    fn test_sentence_becomes_fix() {
        let mut source = NmeaLocationSource::new();
        let fix = source.feed_sentence(VALID, 42_000).unwrap().unwrap();
        assert!((fix.latitude - 48.1173).abs() < 1e-6);
        assert_eq!(fix.timestamp_ms, 42_000);
        assert!((fix.speed_mps.unwrap() - 11.52).abs() < 0.01);
        assert_eq!(fix.accuracy_m, None);
    }

    #[test]
    fn test_no_fix_is_error() {
        let mut source = NmeaLocationSource::new();
        assert_eq!(source.feed_sentence(NO_FIX, 0), Some(Err(FixError::NoFix)));
    }

    #[test]
    fn test_split_byte_stream() {
        let mut source = NmeaLocationSource::new();
        let stream = format!("{}\r\n{}\r\n", VALID, NO_FIX);
        let (head, tail) = stream.as_bytes().split_at(30);
        assert!(source.feed(head, 1).is_empty());
        let results = source.feed(tail, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().timestamp_ms, 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_non_rmc_sentence_ignored() {
        let mut source = NmeaLocationSource::new();
        assert!(source
            .feed_sentence("$GPGSV,3,1,11,03,03,111,00*74", 0)
            .is_none());
    }
}
