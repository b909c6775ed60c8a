use clap::Parser;
use log::info;
use tokio::sync::mpsc;

use fibscout::{
    chart::{render_chart, DEFAULT_HEIGHT, DEFAULT_WIDTH},
    cli::Args,
    config::Settings,
    exchange::{SimulatedSource, SimulationConfig},
    helpers::format_price,
    manager::{CycleOutcome, Monitor, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::load(&args)?;
    let config = SimulationConfig {
        seed: Some(args.seed.unwrap_or(42)),
        ..SimulationConfig::default()
    };
    let source = SimulatedSource::new(config, &settings.timeframe)?;

    let state = SharedState::shared(&settings);
    let (alerts_tx, mut alerts_rx) = mpsc::channel(256);
    let mut monitor = Monitor::new(source, &settings, state.clone(), alerts_tx);

    info!("Simulating {} cycles of {}", args.cycles, settings);
    let mut delivered = 0;
    for cycle in 1..=args.cycles {
        match monitor.run_cycle().await? {
            CycleOutcome::Evaluated(evaluation) => println!(
                "#{cycle:>4} close={} AO={:+.4} {:?} band={}",
                format_price(evaluation.close),
                evaluation.oscillator,
                evaluation.momentum,
                evaluation
                    .band
                    .as_ref()
                    .map(|b| format!("{} - {}", b.lower.label(), b.upper.label()))
                    .unwrap_or_else(|| "outside".to_string()),
            ),
            CycleOutcome::Skipped(reason) => println!("#{cycle:>4} skipped: {reason}"),
        }

        while let Ok(alert) = alerts_rx.try_recv() {
            delivered += 1;
            println!("{alert}");
        }
    }
    println!("{delivered} alerts in {} cycles", args.cycles);

    let state = state.lock().await;
    if let Some(snapshot) = &state.snapshot {
        let title = format!("{} {}", settings.symbol, settings.timeframe);
        let chart = render_chart(
            &snapshot.candles,
            &snapshot.evaluation.levels,
            &title,
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
        )?;
        println!("{}", chart.text());
    }
    Ok(())
}
