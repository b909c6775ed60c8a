use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};

use super::client::TelegramClient;
use super::commands::{bot_commands, help_text, main_keyboard, welcome_text, Command};
use super::types::Update;
use crate::alerts::Alert;
use crate::chart::{render_chart, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::config::Settings;
use crate::error::Result;
use crate::helpers::{escape_html, format_price};
use crate::manager::{SharedState, Snapshot};
use crate::models::Timeframe;

const POLL_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub const WAIT_TEXT: &str = "⏳ Please wait until data is ready.";

pub struct Bot {
    client: TelegramClient,
    symbol: String,
    timeframe: Timeframe,
    state: Arc<Mutex<SharedState>>,
    alerts_rx: mpsc::Receiver<Alert>,
    offset: i64,
}

impl Bot {
    pub fn new(
        client: TelegramClient,
        settings: &Settings,
        state: Arc<Mutex<SharedState>>,
        alerts_rx: mpsc::Receiver<Alert>,
    ) -> Self {
        Self {
            client,
            symbol: settings.symbol.clone(),
            timeframe: settings.timeframe.clone(),
            state,
            alerts_rx,
            offset: 0,
        }
    }

    /// Serves chat commands and delivers alerts until Ctrl-C or the monitor stops.
    pub async fn run(mut self) -> Result<()> {
        if let Err(e) = self.client.set_my_commands(&bot_commands()).await {
            warn!("[{}] Could not register bot commands: {}", self.symbol, e);
        }
        info!("[{}] Bot is polling for updates", self.symbol);

        loop {
            tokio::select! {
                updates = self.client.get_updates(self.offset, POLL_TIMEOUT_SECS) => {
                    match updates {
                        Ok(updates) => {
                            for update in updates {
                                self.offset = self.offset.max(update.update_id + 1);
                                if let Err(e) = self.handle_update(update).await {
                                    error!("[{}] Failed to handle update: {}", self.symbol, e);
                                }
                            }
                        }
                        Err(e) => {
                            warn!("[{}] Failed to fetch updates: {}", self.symbol, e);
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                    }
                }
                alert = self.alerts_rx.recv() => {
                    match alert {
                        Some(alert) => self.deliver(alert).await,
                        None => {
                            info!("[{}] Monitor stopped, shutting down bot", self.symbol);
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("[{}] Interrupted, shutting down bot", self.symbol);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(callback) = update.callback_query {
            if let Err(e) = self.client.answer_callback_query(&callback.id).await {
                debug!("[{}] Callback {} not acknowledged: {}", self.symbol, callback.id, e);
            }
            let chat_id = callback.message.map(|m| m.chat.id);
            let command = callback.data.as_deref().and_then(Command::from_callback);
            if let (Some(chat_id), Some(command)) = (chat_id, command) {
                self.execute(chat_id, command).await?;
            }
        } else if let Some(message) = update.message {
            if let Some(command) = message.text.as_deref().and_then(Command::parse) {
                self.execute(message.chat.id, command).await?;
            }
        }
        Ok(())
    }

    async fn execute(&self, chat_id: i64, command: Command) -> Result<()> {
        info!("[{}] /{} from chat {}", self.symbol, command.name(), chat_id);
        let keyboard = main_keyboard();

        match command {
            Command::Start => {
                let resumed = self.state.lock().await.start(chat_id);
                let text = if resumed {
                    "🔔 Alerts resumed.".to_string()
                } else {
                    welcome_text(&self.symbol, self.timeframe.as_str())
                };
                self.client
                    .send_message(chat_id, &text, None, Some(&keyboard))
                    .await?;
            }
            Command::Help => {
                self.client
                    .send_message(chat_id, &help_text(), None, Some(&keyboard))
                    .await?;
            }
            Command::Chart => {
                let text = {
                    let state = self.state.lock().await;
                    chart_message(state.snapshot.as_ref(), &self.symbol, &self.timeframe)
                };
                self.client
                    .send_message(chat_id, &text, Some("HTML"), Some(&keyboard))
                    .await?;
            }
            Command::Stop => {
                self.state.lock().await.pause();
                self.client
                    .send_message(
                        chat_id,
                        "🔕 Alerts paused. Send /start to resume.",
                        None,
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn deliver(&self, alert: Alert) {
        let chat_id = self.state.lock().await.delivery_target();
        match chat_id {
            Some(chat_id) => {
                if let Err(e) = self
                    .client
                    .send_message(chat_id, &alert.to_string(), None, None)
                    .await
                {
                    error!("[{}] Failed to deliver alert: {}", self.symbol, e);
                }
            }
            None => debug!("[{}] No chat to deliver alert: {}", self.symbol, alert),
        }
    }
}

/// HTML message with the rendered chart and its caption.
pub fn chart_message(snapshot: Option<&Snapshot>, symbol: &str, timeframe: &Timeframe) -> String {
    let Some(snapshot) = snapshot else {
        return WAIT_TEXT.to_string();
    };

    let title = format!("{symbol} {timeframe}");
    match render_chart(
        &snapshot.candles,
        &snapshot.evaluation.levels,
        &title,
        DEFAULT_WIDTH,
        DEFAULT_HEIGHT,
    ) {
        Ok(artifact) => format!(
            "<pre>{}</pre>\n{}",
            escape_html(&artifact.text()),
            escape_html(&caption(snapshot, symbol, timeframe))
        ),
        Err(e) => {
            warn!("[{}] Chart rendering failed: {}", symbol, e);
            format!("⚠️ Chart unavailable: {}", escape_html(&e.to_string()))
        }
    }
}

fn caption(snapshot: &Snapshot, symbol: &str, timeframe: &Timeframe) -> String {
    format!(
        "🕒 Last checked: {}\n💲 Ticker (last checked): {}\n🪙 Symbol: {}\n⏳ Timeframe: {}",
        snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_price(snapshot.price),
        symbol,
        timeframe
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use crate::strategy::{AlertState, Evaluator, EvaluatorConfig};
    use chrono::TimeZone;

    fn snapshot() -> Snapshot {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let mid = 100.0 + (i as f64 / 3.0).sin() * 8.0;
                Candle::new(i * 60_000, mid, mid + 1.0, mid - 1.0, mid, 1.0)
            })
            .collect();
        let evaluation = Evaluator::new("BTC", EvaluatorConfig::default())
            .evaluate(&candles, &AlertState::new())
            .unwrap();
        Snapshot {
            price: evaluation.close,
            candles,
            evaluation,
            updated_at: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_chart_waits_for_data() {
        let timeframe: Timeframe = "4h".parse().unwrap();
        assert_eq!(chart_message(None, "BTC", &timeframe), WAIT_TEXT);
    }

    #[test]
    fn test_chart_message_has_caption() {
        let timeframe: Timeframe = "4h".parse().unwrap();
        let text = chart_message(Some(&snapshot()), "BTC", &timeframe);
        assert!(text.starts_with("<pre>"));
        assert!(text.contains("</pre>"));
        assert!(text.contains("Last checked: 2024-05-01 12:00:00 UTC"));
        let snapshot = snapshot();
        let ticker = format!("Ticker (last checked): {}", format_price(snapshot.price));
        assert!(text.contains(&ticker));
        assert!(text.contains("Symbol: BTC"));
        assert!(text.contains("Timeframe: 4h"));
    }

    #[test]
    fn test_chart_message_escapes_markup() {
        let timeframe: Timeframe = "1h".parse().unwrap();
        let text = chart_message(Some(&snapshot()), "<BTC&ETH>", &timeframe);
        assert!(text.contains("&lt;BTC&amp;ETH&gt;"));
        assert!(!text.contains("<BTC"));
    }
}
