mod candle;
mod timeframe;

pub use candle::{validate_window, Candle};
pub use timeframe::Timeframe;
