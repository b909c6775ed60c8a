use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;

use fibscout::{
    cli::Args,
    config::Settings,
    exchange::{InfoClient, SimulatedSource, SimulationConfig},
    manager::{Monitor, SharedState},
    telegram::{Bot, TelegramClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::load(&args).context("failed to load settings")?;
    info!("Starting with {}", settings);

    let state = SharedState::shared(&settings);
    let (alerts_tx, mut alerts_rx) = mpsc::channel(64);

    let monitor = if args.simulate {
        let config = SimulationConfig {
            seed: args.seed,
            ..SimulationConfig::default()
        };
        let source = SimulatedSource::new(config, &settings.timeframe)?;
        Monitor::new(source, &settings, state.clone(), alerts_tx).spawn(settings.poll_interval)
    } else {
        let source = InfoClient::new(None, Some(settings.base_url.clone()));
        Monitor::new(source, &settings, state.clone(), alerts_tx).spawn(settings.poll_interval)
    };

    match &settings.token_id {
        Some(token) => {
            let bot = Bot::new(TelegramClient::new(None, token), &settings, state, alerts_rx);
            bot.run().await?;
        }
        None => {
            warn!("No token_id configured, alerts are only logged");
            loop {
                tokio::select! {
                    alert = alerts_rx.recv() => match alert {
                        Some(alert) => info!("{}", alert),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    monitor.abort();
    info!("Stopped");
    Ok(())
}
