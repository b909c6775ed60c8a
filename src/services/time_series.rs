use std::collections::VecDeque;

use crate::models::Candle;

/// Bounded, most-recent-last window of candles.
pub struct CandleWindow {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Merges a fetched batch and returns how many candles were appended.
    ///
    /// A candle with the same open time as the newest one replaces it (the
    /// exchange keeps updating the forming candle); older ones are ignored.
    pub fn merge(&mut self, fetched: impl IntoIterator<Item = Candle>) -> usize {
        let mut appended = 0;
        for candle in fetched {
            match self.candles.back() {
                Some(last) if candle.timestamp < last.timestamp => continue,
                Some(last) if candle.timestamp == last.timestamp => {
                    if let Some(last) = self.candles.back_mut() {
                        *last = candle;
                    }
                }
                _ => {
                    self.candles.push_back(candle);
                    appended += 1;
                }
            }
        }

        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
        appended
    }

    pub fn candles(&mut self) -> &[Candle] {
        self.candles.make_contiguous()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
