use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::sync::Mutex;

use super::CandleSource;
use crate::error::{Error, Result};
use crate::helpers::round_to_step;
use crate::models::{Candle, Timeframe};

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub initial_price: f64,
    /// Standard deviation of the per-tick relative return.
    pub volatility: f64,
    pub tick_size: f64,
    pub ticks_per_candle: u32,
    /// Ticks advanced by every `fetch_candles` call.
    pub ticks_per_fetch: u32,
    /// Complete candles generated up front.
    pub history: usize,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            volatility: 0.004,
            tick_size: 0.01,
            ticks_per_candle: 12,
            ticks_per_fetch: 3,
            history: 120,
            seed: None,
        }
    }
}

struct SimState {
    rng: StdRng,
    returns: Normal<f64>,
    price: f64,
    tick: u32,
    candles: Vec<Candle>,
}

/// Random-walk candle source for offline runs.
pub struct SimulatedSource {
    config: SimulationConfig,
    timeframe_ms: u64,
    state: Mutex<SimState>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig, timeframe: &Timeframe) -> Result<Self> {
        if !(config.initial_price > 0.0) || config.ticks_per_candle == 0 {
            return Err(Error::Config(format!(
                "simulation needs a positive price and ticks per candle, got {} and {}",
                config.initial_price, config.ticks_per_candle
            )));
        }
        let returns = Normal::new(0.0, config.volatility)
            .map_err(|e| Error::Config(format!("volatility {}: {e}", config.volatility)))?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());

        let timeframe_ms = timeframe.millis();
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let start = timeframe
            .align(now)
            .saturating_sub(timeframe_ms * config.history as u64);
        let price = round_to_step(config.initial_price, config.tick_size);

        let mut state = SimState {
            rng: StdRng::seed_from_u64(seed),
            returns,
            price,
            tick: 0,
            candles: vec![Candle::new(start, price, price, price, price, 0.0)],
        };

        let warmup = config.ticks_per_candle as usize * config.history;
        for _ in 0..warmup {
            state.step(&config, timeframe_ms);
        }

        Ok(Self {
            config,
            timeframe_ms,
            state: Mutex::new(state),
        })
    }

    pub async fn advance(&self, ticks: u32) -> f64 {
        let mut state = self.state.lock().await;
        for _ in 0..ticks {
            state.step(&self.config, self.timeframe_ms);
        }
        state.price
    }

    pub async fn candles(&self) -> Vec<Candle> {
        self.state.lock().await.candles.clone()
    }
}

impl SimState {
    fn step(&mut self, config: &SimulationConfig, timeframe_ms: u64) {
        let change = self.returns.sample(&mut self.rng);
        let next = round_to_step(self.price * (1.0 + change), config.tick_size);
        self.price = next.max(config.tick_size);

        if self.tick == config.ticks_per_candle {
            let open_time = self
                .candles
                .last()
                .map_or(0, |c| c.timestamp + timeframe_ms);
            self.candles
                .push(Candle::new(open_time, self.price, self.price, self.price, self.price, 0.0));
            self.tick = 0;
        }

        let volume = self.rng.random_range(0.1..2.0);
        if let Some(candle) = self.candles.last_mut() {
            candle.high = candle.high.max(self.price);
            candle.low = candle.low.min(self.price);
            candle.close = self.price;
            candle.volume += volume;
        }
        self.tick += 1;
    }
}

#[async_trait]
impl CandleSource for SimulatedSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let mut state = self.state.lock().await;
        for _ in 0..self.config.ticks_per_fetch {
            state.step(&self.config, self.timeframe_ms);
        }
        let skip = state.candles.len().saturating_sub(limit);
        debug!(
            "[{}] Simulated price {} over {} candles",
            symbol,
            state.price,
            state.candles.len()
        );
        Ok(state.candles[skip..].to_vec())
    }

    async fn fetch_price(&self, _symbol: &str) -> Result<f64> {
        Ok(self.state.lock().await.price)
    }
}
