use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::helpers::parse_period_secs;

/// Candle interval such as `15m` or `4h`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timeframe {
    label: String,
    secs: u64,
}

impl Timeframe {
    pub fn as_str(&self) -> &str {
        &self.label
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn millis(&self) -> u64 {
        self.secs * 1000
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }

    /// Open time of the candle containing `timestamp_ms`.
    pub fn align(&self, timestamp_ms: u64) -> u64 {
        timestamp_ms - timestamp_ms % self.millis()
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self {
            label: "4h".to_string(),
            secs: 4 * 3600,
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_string();
        let secs = parse_period_secs(&label)?;
        // keeps millis() from overflowing
        if secs.checked_mul(1000).is_none() {
            return Err(format!("{label:?}: timeframe is too long"));
        }
        Ok(Self { label, secs })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_align() {
        let tf: Timeframe = "4h".parse().unwrap();
        assert_eq!(tf.as_str(), "4h");
        assert_eq!(tf.millis(), 14_400_000);
        assert_eq!(tf.align(14_400_000 + 1234), 14_400_000);
    }

    #[test]
    fn test_invalid_timeframe() {
        assert!("four hours".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_oversized_timeframe_is_rejected() {
        assert!("99999999999999999w".parse::<Timeframe>().is_err());
        assert!("18446744073709551615s".parse::<Timeframe>().is_err());
        let year: Timeframe = "52w".parse().unwrap();
        assert_eq!(year.millis(), 52 * 604_800_000);
    }
}
