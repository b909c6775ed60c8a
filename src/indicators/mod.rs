mod oscillator;
mod retracement;

pub use oscillator::{
    sign, AwesomeOscillator, Momentum, OscillatorPoint, FAST_PERIOD, SLOW_PERIOD,
};
pub use retracement::{
    swing_range, Lookback, RetracementLevel, Swing, Trend, EXTENSION_RATIOS, STANDARD_RATIOS,
};
