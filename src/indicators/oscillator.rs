use crate::error::EvalError;
use crate::models::Candle;

pub const FAST_PERIOD: usize = 5;
pub const SLOW_PERIOD: usize = 34;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorPoint {
    pub timestamp: u64,
    pub value: f64,
}

/// Direction of the oscillator relative to its zero line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Momentum {
    Bullish,
    Bearish,
    Flat,
}

impl Momentum {
    pub fn of(value: f64) -> Self {
        match sign(value) {
            1 => Momentum::Bullish,
            -1 => Momentum::Bearish,
            _ => Momentum::Flat,
        }
    }
}

/// Sign of `value` where an exact zero stays zero.
pub fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Awesome Oscillator: SMA(fast) - SMA(slow) of the candle midpoints.
#[derive(Debug, Clone, Copy)]
pub struct AwesomeOscillator {
    fast: usize,
    slow: usize,
}

impl Default for AwesomeOscillator {
    fn default() -> Self {
        Self {
            fast: FAST_PERIOD,
            slow: SLOW_PERIOD,
        }
    }
}

impl AwesomeOscillator {
    pub fn new(fast: usize, slow: usize) -> Result<Self, String> {
        if fast == 0 || fast >= slow {
            return Err(format!(
                "oscillator periods must satisfy 0 < fast < slow, got fast={fast} slow={slow}"
            ));
        }
        Ok(Self { fast, slow })
    }

    pub fn fast(&self) -> usize {
        self.fast
    }

    pub fn slow(&self) -> usize {
        self.slow
    }

    /// Minimum number of candles needed for the first point.
    pub fn required_candles(&self) -> usize {
        self.slow
    }

    /// One point per candle starting at index `slow - 1`.
    pub fn compute(&self, candles: &[Candle]) -> Result<Vec<OscillatorPoint>, EvalError> {
        if candles.len() < self.slow {
            return Err(EvalError::InsufficientData {
                required: self.slow,
                available: candles.len(),
            });
        }

        let midpoints: Vec<f64> = candles.iter().map(Candle::midpoint).collect();

        let points = (self.slow - 1..candles.len())
            .map(|i| {
                let fast = mean(&midpoints[i + 1 - self.fast..=i]);
                let slow = mean(&midpoints[i + 1 - self.slow..=i]);
                OscillatorPoint {
                    timestamp: candles[i].timestamp,
                    value: fast - slow,
                }
            })
            .collect();

        Ok(points)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
