use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::alerts::{Alert, ProximityGuard};
use crate::config::Settings;
use crate::error::{EvalError, Result};
use crate::exchange::CandleSource;
use crate::models::Candle;
use crate::services::CandleWindow;
use crate::strategy::{AlertState, Evaluation, Evaluator};

/// Latest evaluated window, kept for `/chart`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub candles: Vec<Candle>,
    pub evaluation: Evaluation,
    pub price: f64,
    pub updated_at: DateTime<Utc>,
}

/// State shared between the monitor task and the bot loop.
#[derive(Debug)]
pub struct SharedState {
    pub alert_state: AlertState,
    pub guard: ProximityGuard,
    pub alerts_enabled: bool,
    pub chat_id: Option<i64>,
    pub snapshot: Option<Snapshot>,
}

impl SharedState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            alert_state: AlertState::new(),
            guard: ProximityGuard::new(settings.tolerance),
            alerts_enabled: true,
            chat_id: settings.chat_id,
            snapshot: None,
        }
    }

    pub fn shared(settings: &Settings) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(settings)))
    }

    /// Remembers `chat_id` and enables alerts. Returns true if they were paused.
    pub fn start(&mut self, chat_id: i64) -> bool {
        self.chat_id = Some(chat_id);
        let paused = !self.alerts_enabled;
        self.alerts_enabled = true;
        paused
    }

    pub fn pause(&mut self) {
        self.alerts_enabled = false;
    }

    /// Chat that should receive alerts right now, if any.
    pub fn delivery_target(&self) -> Option<i64> {
        self.chat_id.filter(|_| self.alerts_enabled)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        "{} failed ({}), retry {}/{}",
                        label, e, retries, self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Evaluated(Evaluation),
    Skipped(EvalError),
}

/// Periodically fetches candles, evaluates them and forwards alerts to the bot.
pub struct Monitor<S> {
    source: S,
    settings: Settings,
    evaluator: Evaluator,
    window: CandleWindow,
    state: Arc<Mutex<SharedState>>,
    alerts_tx: mpsc::Sender<Alert>,
    policy: RetryPolicy,
}

impl<S: CandleSource> Monitor<S> {
    pub fn new(
        source: S,
        settings: &Settings,
        state: Arc<Mutex<SharedState>>,
        alerts_tx: mpsc::Sender<Alert>,
    ) -> Self {
        Self {
            source,
            evaluator: Evaluator::new(settings.symbol.clone(), settings.evaluator_config()),
            window: CandleWindow::new(settings.candle_limit),
            settings: settings.clone(),
            state,
            alerts_tx,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn window(&self) -> &CandleWindow {
        &self.window
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let symbol = self.settings.symbol.as_str();
        let timeframe = &self.settings.timeframe;
        let limit = self.settings.candle_limit;
        let source = &self.source;

        let fetched = self
            .policy
            .run("fetch candles", move || {
                source.fetch_candles(symbol, timeframe, limit)
            })
            .await?;
        let appended = self.window.merge(fetched);
        debug!(
            "[{}] {} new candles, window holds {}",
            symbol,
            appended,
            self.window.len()
        );

        let price = match self
            .policy
            .run("fetch price", move || source.fetch_price(symbol))
            .await
        {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("[{}] No last price this cycle: {}", symbol, e);
                None
            }
        };

        let candles = self.window.candles();
        let (evaluation, alerts) = {
            let mut state = self.state.lock().await;
            let evaluation = match self.evaluator.evaluate(candles, &state.alert_state) {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    match &e {
                        EvalError::InsufficientData { .. } => {
                            info!("[{}] Skipping cycle: {}", symbol, e)
                        }
                        EvalError::DataIntegrity(_) => {
                            error!("[{}] Skipping cycle: {}", symbol, e)
                        }
                    }
                    return Ok(CycleOutcome::Skipped(e));
                }
            };
            state.alert_state.record(&evaluation);

            let price = price.unwrap_or(evaluation.close);
            let now = Utc::now();
            let mut alerts = Vec::new();
            if state.alerts_enabled {
                alerts.extend(evaluation.alert.clone().map(Alert::BandEntry));
                let touches =
                    state
                        .guard
                        .check(symbol, price, &evaluation.levels, evaluation.timestamp, now);
                alerts.extend(touches.into_iter().map(Alert::LevelTouch));
            }

            state.snapshot = Some(Snapshot {
                candles: candles.to_vec(),
                evaluation: evaluation.clone(),
                price,
                updated_at: now,
            });
            (evaluation, alerts)
        };

        for alert in alerts {
            if self.alerts_tx.send(alert).await.is_err() {
                warn!("[{}] Alert receiver is gone", symbol);
                break;
            }
        }
        Ok(CycleOutcome::Evaluated(evaluation))
    }

    pub async fn run(mut self, poll_interval: Duration) {
        info!(
            "[{}] Monitoring {} candles every {}s",
            self.settings.symbol,
            self.settings.timeframe,
            poll_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!("[{}] Cycle failed: {}", self.settings.symbol, e);
            }
            if self.alerts_tx.is_closed() {
                info!("[{}] Alert receiver closed, stopping", self.settings.symbol);
                break;
            }
        }
    }
}

impl<S: CandleSource + 'static> Monitor<S> {
    pub fn spawn(self, poll_interval: Duration) -> JoinHandle<()> {
        tokio::spawn(self.run(poll_interval))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::models::Timeframe;

    const MINUTE: u64 = 60_000;

    /// Levels 100 / 88.2 / 80.9 / 75 / 69.1 / 60.7 / 50 with the last close at `last_close`.
    fn swing_window(last_close: f64) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..40)
            .map(|i| Candle::new(i * MINUTE, 75.0, 76.0, 74.0, 75.0, 1.0))
            .collect();
        candles[5].low = 50.0;
        candles[20].high = 100.0;
        candles[39] = Candle::new(
            39 * MINUTE,
            last_close,
            last_close + 0.5,
            last_close - 0.5,
            last_close,
            1.0,
        );
        candles
    }

    struct ScriptedSource {
        windows: std::sync::Mutex<VecDeque<Vec<Candle>>>,
        price: Option<f64>,
        failures: AtomicU32,
    }

    impl ScriptedSource {
        fn new(windows: Vec<Vec<Candle>>, price: Option<f64>) -> Self {
            Self {
                windows: std::sync::Mutex::new(windows.into()),
                price,
                failures: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CandleSource for ScriptedSource {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            _timeframe: &Timeframe,
            _limit: usize,
        ) -> Result<Vec<Candle>> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Api {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            self.windows
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Api {
                    status: 404,
                    body: "script exhausted".to_string(),
                })
        }

        async fn fetch_price(&self, symbol: &str) -> Result<f64> {
            self.price
                .ok_or_else(|| Error::AssetNotFound(symbol.to_string()))
        }
    }

    fn monitor(
        source: ScriptedSource,
    ) -> (
        Monitor<ScriptedSource>,
        Arc<Mutex<SharedState>>,
        mpsc::Receiver<Alert>,
    ) {
        let settings = Settings::default();
        let state = SharedState::shared(&settings);
        let (tx, rx) = mpsc::channel(16);
        let monitor = Monitor::new(source, &settings, state.clone(), tx).with_retry_policy(
            RetryPolicy {
                max_retries: 3,
                retry_delay_ms: 0,
            },
        );
        (monitor, state, rx)
    }

    #[test]
    fn test_start_remembers_chat_and_resumes() {
        let mut state = SharedState::new(&Settings::default());
        assert_eq!(state.delivery_target(), None);

        assert!(!state.start(42));
        assert_eq!(state.chat_id, Some(42));
        assert_eq!(state.delivery_target(), Some(42));

        state.pause();
        assert!(!state.alerts_enabled);
        assert_eq!(state.delivery_target(), None);

        assert!(state.start(7));
        assert!(state.alerts_enabled);
        assert_eq!(state.delivery_target(), Some(7));
    }

    #[test]
    fn test_configured_chat_receives_until_paused() {
        let settings = Settings {
            chat_id: Some(-100123),
            ..Settings::default()
        };
        let mut state = SharedState::new(&settings);
        assert_eq!(state.delivery_target(), Some(-100123));
        state.pause();
        assert_eq!(state.delivery_target(), None);
        assert_eq!(state.chat_id, Some(-100123));
    }

    #[tokio::test]
    async fn test_band_entry_is_delivered_once() {
        let source = ScriptedSource::new(vec![swing_window(78.0), swing_window(79.0)], None);
        let (mut monitor, state, mut rx) = monitor(source);

        let outcome = monitor.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Evaluated(_)));
        match rx.try_recv().unwrap() {
            Alert::BandEntry(event) => {
                assert_eq!(event.ratio_low_label, "0.5");
                assert_eq!(event.ratio_high_label, "0.382");
            }
            other => panic!("unexpected alert {other:?}"),
        }
        assert!(rx.try_recv().is_err());

        monitor.run_cycle().await.unwrap();
        assert!(rx.try_recv().is_err());

        let state = state.lock().await;
        let snapshot = state.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.candles.len(), 40);
        assert_eq!(snapshot.price, 79.0);
        assert_eq!(state.alert_state.band().unwrap().lower.ratio, 0.5);
    }

    #[tokio::test]
    async fn test_paused_alerts_still_track_band() {
        let source = ScriptedSource::new(vec![swing_window(78.0), swing_window(78.0)], None);
        let (mut monitor, state, mut rx) = monitor(source);
        state.lock().await.alerts_enabled = false;

        monitor.run_cycle().await.unwrap();
        assert!(rx.try_recv().is_err());
        assert!(state.lock().await.alert_state.band().is_some());

        state.lock().await.alerts_enabled = true;
        monitor.run_cycle().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_level_touch_uses_last_price() {
        let source = ScriptedSource::new(
            vec![swing_window(78.0), swing_window(78.0)],
            Some(75.1),
        );
        let (mut monitor, _state, mut rx) = monitor(source);

        monitor.run_cycle().await.unwrap();
        let alerts: Vec<Alert> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(alerts.len(), 2);
        assert!(matches!(&alerts[1], Alert::LevelTouch(touch) if touch.ratio == 0.5));

        // same candle period, nothing new
        monitor.run_cycle().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_short_window_is_skipped() {
        let source = ScriptedSource::new(vec![swing_window(78.0)[..20].to_vec()], None);
        let (mut monitor, state, mut rx) = monitor(source);

        let outcome = monitor.run_cycle().await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Skipped(EvalError::InsufficientData {
                required: 34,
                available: 20
            })
        ));
        assert!(rx.try_recv().is_err());
        assert!(state.lock().await.snapshot.is_none());
    }

    #[tokio::test]
    async fn test_fetch_is_retried() {
        let source = ScriptedSource::new(vec![swing_window(78.0)], None);
        source.failures.store(2, Ordering::SeqCst);
        let (mut monitor, _state, _rx) = monitor(source);
        assert!(monitor.run_cycle().await.is_ok());
        assert_eq!(monitor.window().len(), 40);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_max_retries() {
        let source = ScriptedSource::new(vec![swing_window(78.0)], None);
        source.failures.store(5, Ordering::SeqCst);
        let (monitor, _state, _rx) = monitor(source);
        let mut monitor = monitor.with_retry_policy(RetryPolicy {
            max_retries: 1,
            retry_delay_ms: 0,
        });
        assert!(matches!(
            monitor.run_cycle().await,
            Err(Error::Api { status: 502, .. })
        ));
        assert_eq!(monitor.source().failures.load(Ordering::SeqCst), 3);
    }
}
