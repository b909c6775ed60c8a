use std::ops::RangeInclusive;
use std::str::FromStr;

use super::oscillator::{sign, OscillatorPoint};
use crate::models::Candle;

pub const STANDARD_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
pub const EXTENSION_RATIOS: [f64; 2] = [1.414, 1.618];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Uptrend,
    Downtrend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetracementLevel {
    pub ratio: f64,
    pub price: f64,
}

impl RetracementLevel {
    pub fn label(&self) -> String {
        format!("{}", self.ratio)
    }
}

/// Which candles the swing high and low are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookback {
    /// Every candle of the evaluated window.
    #[default]
    Window,
    /// The most recent `n` candles.
    Candles(usize),
    /// The last two complete oscillator-sign segments.
    OscillatorSwing,
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "window" => Ok(Lookback::Window),
            "swing" => Ok(Lookback::OscillatorSwing),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 2)
                .map(Lookback::Candles)
                .ok_or_else(|| {
                    format!("invalid lookback {s:?}: expected window, swing or a count >= 2")
                }),
        }
    }
}

/// Extremes of a price swing and the direction they imply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    pub high: f64,
    pub low: f64,
    pub high_index: usize,
    pub low_index: usize,
    pub trend: Trend,
}

impl Swing {
    /// Ties resolve to the most recent candle setting the extreme.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let (mut high, mut high_index) = (first.high, 0);
        let (mut low, mut low_index) = (first.low, 0);

        for (i, candle) in candles.iter().enumerate().skip(1) {
            if candle.high >= high {
                high = candle.high;
                high_index = i;
            }
            if candle.low <= low {
                low = candle.low;
                low_index = i;
            }
        }

        let trend = if high_index > low_index {
            Trend::Uptrend
        } else {
            Trend::Downtrend
        };

        Some(Self {
            high,
            low,
            high_index,
            low_index,
            trend,
        })
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn level(&self, ratio: f64) -> f64 {
        match self.trend {
            Trend::Uptrend => self.high - ratio * self.range(),
            Trend::Downtrend => self.low + ratio * self.range(),
        }
    }

    pub fn levels(&self, ratios: &[f64]) -> Vec<RetracementLevel> {
        ratios
            .iter()
            .map(|&ratio| RetracementLevel {
                ratio,
                price: self.level(ratio),
            })
            .collect()
    }
}

/// Candle indices spanning the last two complete oscillator-sign segments.
///
/// A boundary is the last point before the sign flips. With the three most
/// recent boundaries `b1 < b2 < b3` the range is `b1..=b3`. `offset` maps
/// oscillator indices back to candle indices.
pub fn swing_range(points: &[OscillatorPoint], offset: usize) -> Option<RangeInclusive<usize>> {
    let boundaries: Vec<usize> = points
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| sign(pair[0].value) != sign(pair[1].value))
        .map(|(i, _)| i)
        .collect();

    if boundaries.len() < 3 {
        return None;
    }

    let recent = &boundaries[boundaries.len() - 3..];
    Some(offset + recent[0]..=offset + recent[2])
}
