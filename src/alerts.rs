use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;

use crate::helpers::format_price;
use crate::indicators::RetracementLevel;

/// Price moved into a different retracement band.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub symbol: String,
    pub price: f64,
    pub band_low: f64,
    pub band_high: f64,
    pub ratio_low_label: String,
    pub ratio_high_label: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "💡 Alert! {} entered the Fibonacci band {} – {} ({} – {})\n💲 Current price: {}\n⏰ {}",
            self.symbol,
            self.ratio_low_label,
            self.ratio_high_label,
            format_price(self.band_low),
            format_price(self.band_high),
            format_price(self.price),
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

/// Price came within the tolerance of a single level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTouch {
    pub symbol: String,
    pub price: f64,
    pub ratio: f64,
    pub level_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for LevelTouch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "💡 Alert! {} current price: {} for Fibonacci level {} ({}) 🔔",
            self.symbol,
            format_price(self.price),
            self.ratio,
            format_price(self.level_price),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    BandEntry(AlertEvent),
    LevelTouch(LevelTouch),
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::BandEntry(event) => event.fmt(f),
            Alert::LevelTouch(touch) => touch.fmt(f),
        }
    }
}

/// Fires at most once per level per candle period.
#[derive(Debug, Clone)]
pub struct ProximityGuard {
    tolerance: f64,
    period_open: Option<u64>,
    fired: Vec<f64>,
}

impl ProximityGuard {
    pub const DEFAULT_TOLERANCE: f64 = 0.004;

    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            period_open: None,
            fired: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn check(
        &mut self,
        symbol: &str,
        price: f64,
        levels: &[RetracementLevel],
        period_open: u64,
        now: DateTime<Utc>,
    ) -> Vec<LevelTouch> {
        if self.period_open != Some(period_open) {
            if !self.fired.is_empty() {
                debug!(
                    "[{}] New candle at {}, clearing {} fired levels",
                    symbol,
                    period_open,
                    self.fired.len()
                );
            }
            self.period_open = Some(period_open);
            self.fired.clear();
        }

        let mut touches = Vec::new();
        for level in levels {
            let band = level.price.abs() * self.tolerance;
            if (price - level.price).abs() >= band || self.fired.contains(&level.ratio) {
                continue;
            }
            self.fired.push(level.ratio);
            touches.push(LevelTouch {
                symbol: symbol.to_string(),
                price,
                ratio: level.ratio,
                level_price: level.price,
                timestamp: now,
            });
        }
        touches
    }
}

impl Default for ProximityGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::millis_to_datetime;

    fn levels() -> Vec<RetracementLevel> {
        [(0.0, 100.0), (0.5, 75.0), (1.0, 50.0)]
            .into_iter()
            .map(|(ratio, price)| RetracementLevel { ratio, price })
            .collect()
    }

    #[test]
    fn test_touch_fires_once_per_candle() {
        let mut guard = ProximityGuard::default();
        let now = millis_to_datetime(0);

        let touches = guard.check("BTC", 75.2, &levels(), 1_000, now);
        assert_eq!(touches.len(), 1);
        assert_eq!(touches[0].ratio, 0.5);

        assert!(guard.check("BTC", 75.1, &levels(), 1_000, now).is_empty());

        let next_candle = guard.check("BTC", 75.1, &levels(), 2_000, now);
        assert_eq!(next_candle.len(), 1);
    }

    #[test]
    fn test_outside_tolerance_is_ignored() {
        let mut guard = ProximityGuard::new(0.004);
        let now = millis_to_datetime(0);
        // 0.4% of 75 is 0.3
        assert!(guard.check("BTC", 75.31, &levels(), 1, now).is_empty());
        assert!(guard.check("BTC", 74.69, &levels(), 1, now).is_empty());
        assert_eq!(guard.check("BTC", 74.75, &levels(), 1, now).len(), 1);
    }

    #[test]
    fn test_alert_messages() {
        let event = AlertEvent {
            symbol: "BTC".to_string(),
            price: 78.0,
            band_low: 75.0,
            band_high: 80.9,
            ratio_low_label: "0.5".to_string(),
            ratio_high_label: "0.382".to_string(),
            timestamp: millis_to_datetime(0),
        };
        let text = Alert::BandEntry(event).to_string();
        assert!(text.contains("BTC entered the Fibonacci band 0.5 – 0.382"));
        assert!(text.contains("78.0000"));

        let touch = LevelTouch {
            symbol: "ETH".to_string(),
            price: 2000.5,
            ratio: 0.618,
            level_price: 2001.0,
            timestamp: millis_to_datetime(0),
        };
        assert!(Alert::LevelTouch(touch)
            .to_string()
            .contains("for Fibonacci level 0.618"));
    }
}
