pub mod client;
pub mod req;
pub mod simulator;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Candle, Timeframe};

pub use client::InfoClient;
pub use simulator::{SimulatedSource, SimulationConfig};
pub use types::BaseUrl;

/// Delivers candles and the last traded price for a symbol.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Most recent `limit` candles, oldest first. The last one may still be forming.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    async fn fetch_price(&self, symbol: &str) -> Result<f64>;
}
