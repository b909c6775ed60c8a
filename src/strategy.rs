use log::{debug, info};

use crate::alerts::AlertEvent;
use crate::error::EvalError;
use crate::helpers::millis_to_datetime;
use crate::indicators::{
    sign, swing_range, AwesomeOscillator, Lookback, Momentum, OscillatorPoint, RetracementLevel,
    Swing, STANDARD_RATIOS,
};
use crate::models::{validate_window, Candle};

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub oscillator: AwesomeOscillator,
    pub ratios: Vec<f64>,
    pub lookback: Lookback,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            oscillator: AwesomeOscillator::default(),
            ratios: STANDARD_RATIOS.to_vec(),
            lookback: Lookback::Window,
        }
    }
}

/// Interval between two price-adjacent levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub lower: RetracementLevel,
    pub upper: RetracementLevel,
}

impl Band {
    /// Band holding `price`. Lower bounds are inclusive and so is the topmost
    /// level; prices outside the level range or a zero-width range yield `None`.
    pub fn locate(levels: &[RetracementLevel], price: f64) -> Option<Band> {
        let mut sorted = levels.to_vec();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

        let (first, last) = (sorted.first()?, sorted.last()?);
        if !price.is_finite() || first.price >= last.price {
            return None;
        }
        if price < first.price || price > last.price {
            return None;
        }

        let top = sorted.len() - 1;
        sorted
            .windows(2)
            .enumerate()
            .find(|(i, pair)| {
                pair[0].price <= price && (price < pair[1].price || (*i + 1 == top && price == pair[1].price))
            })
            .map(|(_, pair)| Band {
                lower: pair[0],
                upper: pair[1],
            })
    }

    /// Bands are identified by their ratios, prices move every cycle.
    pub fn same_as(&self, other: &Band) -> bool {
        self.lower.ratio == other.lower.ratio && self.upper.ratio == other.upper.ratio
    }

    pub fn contains(&self, price: f64) -> bool {
        self.lower.price <= price && price <= self.upper.price
    }
}

/// Band occupied on the previous cycle.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    band: Option<Band>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn band(&self) -> Option<&Band> {
        self.band.as_ref()
    }

    pub fn is_new_band(&self, band: &Band) -> bool {
        self.band.as_ref().map_or(true, |previous| !previous.same_as(band))
    }

    pub fn record(&mut self, evaluation: &Evaluation) {
        self.band = evaluation.band.clone();
    }

    pub fn reset(&mut self) {
        self.band = None;
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub symbol: String,
    pub timestamp: u64,
    pub close: f64,
    pub oscillator: f64,
    pub previous_oscillator: Option<f64>,
    pub momentum: Momentum,
    pub crossed_zero: bool,
    pub swing: Swing,
    pub levels: Vec<RetracementLevel>,
    pub band: Option<Band>,
    pub alert: Option<AlertEvent>,
}

/// Computes the oscillator, the retracement levels and the band alert for a window.
pub struct Evaluator {
    symbol: String,
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(symbol: impl Into<String>, config: EvaluatorConfig) -> Self {
        Self {
            symbol: symbol.into(),
            config,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn required_candles(&self) -> usize {
        let lookback = match self.config.lookback {
            Lookback::Candles(n) => n,
            Lookback::Window | Lookback::OscillatorSwing => 2,
        };
        self.config.oscillator.required_candles().max(lookback)
    }

    pub fn evaluate(&self, window: &[Candle], state: &AlertState) -> Result<Evaluation, EvalError> {
        let required = self.required_candles();
        if window.len() < required {
            return Err(EvalError::InsufficientData {
                required,
                available: window.len(),
            });
        }
        validate_window(window)?;

        let points = self.config.oscillator.compute(window)?;
        let (oscillator, previous_oscillator) = match points.as_slice() {
            [.., previous, latest] => (latest.value, Some(previous.value)),
            [latest] => (latest.value, None),
            [] => {
                return Err(EvalError::InsufficientData {
                    required,
                    available: window.len(),
                })
            }
        };
        let crossed_zero = previous_oscillator.is_some_and(|prev| sign(prev) != sign(oscillator));

        let slice = self.lookback_slice(window, &points);
        let swing = Swing::from_candles(slice).ok_or(EvalError::InsufficientData {
            required: 2,
            available: slice.len(),
        })?;
        let levels = swing.levels(&self.config.ratios);

        let latest = window[window.len() - 1];
        let band = Band::locate(&levels, latest.close);

        debug!(
            "[{}] AO={:.6} trend={:?} high={} low={} close={} band={:?}",
            self.symbol,
            oscillator,
            swing.trend,
            swing.high,
            swing.low,
            latest.close,
            band.as_ref().map(|b| (b.lower.label(), b.upper.label()))
        );

        let alert = band
            .as_ref()
            .filter(|band| state.is_new_band(band))
            .map(|band| AlertEvent {
                symbol: self.symbol.clone(),
                price: latest.close,
                band_low: band.lower.price,
                band_high: band.upper.price,
                ratio_low_label: band.lower.label(),
                ratio_high_label: band.upper.label(),
                timestamp: millis_to_datetime(latest.timestamp),
            });

        if let Some(event) = &alert {
            info!(
                "[{}] Price {} entered band {} - {}",
                self.symbol, event.price, event.ratio_low_label, event.ratio_high_label
            );
        }

        Ok(Evaluation {
            symbol: self.symbol.clone(),
            timestamp: latest.timestamp,
            close: latest.close,
            oscillator,
            previous_oscillator,
            momentum: Momentum::of(oscillator),
            crossed_zero,
            swing,
            levels,
            band,
            alert,
        })
    }

    fn lookback_slice<'a>(&self, window: &'a [Candle], points: &[OscillatorPoint]) -> &'a [Candle] {
        match self.config.lookback {
            Lookback::Window => window,
            Lookback::Candles(n) => &window[window.len() - n..],
            Lookback::OscillatorSwing => {
                let offset = self.config.oscillator.slow() - 1;
                match swing_range(points, offset) {
                    Some(range) => &window[range],
                    None => {
                        debug!(
                            "[{}] Fewer than three oscillator sign changes, using the whole window",
                            self.symbol
                        );
                        window
                    }
                }
            }
        }
    }
}
