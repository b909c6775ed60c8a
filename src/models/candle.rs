use crate::error::EvalError;

/// OHLCV candle. `timestamp` is the open time in milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: u64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Median price of the period, `(high + low) / 2`.
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    fn check(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
        }
        if self.high < self.low {
            return Err(format!("high {} below low {}", self.high, self.low));
        }
        if self.open < self.low || self.open > self.high {
            return Err(format!("open {} outside [{}, {}]", self.open, self.low, self.high));
        }
        if self.close < self.low || self.close > self.high {
            return Err(format!("close {} outside [{}, {}]", self.close, self.low, self.high));
        }
        if self.volume < 0.0 {
            return Err(format!("negative volume {}", self.volume));
        }
        Ok(())
    }
}

/// Rejects windows that are not strictly ordered by time or hold malformed candles.
pub fn validate_window(candles: &[Candle]) -> Result<(), EvalError> {
    for (i, candle) in candles.iter().enumerate() {
        candle
            .check()
            .map_err(|reason| EvalError::DataIntegrity(format!("candle {i}: {reason}")))?;
    }

    if let Some(pair) = candles
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        return Err(EvalError::DataIntegrity(format!(
            "timestamps not increasing at index {}: {} then {}",
            pair + 1,
            candles[pair].timestamp,
            candles[pair + 1].timestamp
        )));
    }

    Ok(())
}
