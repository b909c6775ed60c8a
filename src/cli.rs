use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::helpers::parse_period_secs;
use crate::models::Timeframe;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file with one `key=value` pair per line.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub symbol: Option<String>,

    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// How often prices are checked, e.g. 20s or 1m.
    #[arg(short, long, value_parser = parse_duration)]
    pub poll: Option<Duration>,

    #[arg(long)]
    pub testnet: bool,

    /// Use the random-walk source instead of the exchange.
    #[arg(long)]
    pub simulate: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Evaluation cycles for the offline simulation.
    #[arg(long, default_value_t = 50)]
    pub cycles: usize,
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    parse_period_secs(s).map(Duration::from_secs)
}
