use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::warn;

use crate::alerts::ProximityGuard;
use crate::cli::{parse_duration, Args};
use crate::error::{Error, Result};
use crate::exchange::BaseUrl;
use crate::indicators::{AwesomeOscillator, Lookback, EXTENSION_RATIOS, STANDARD_RATIOS};
use crate::models::Timeframe;
use crate::strategy::EvaluatorConfig;

/// Runtime settings, passed explicitly to every component that needs them.
#[derive(Debug, Clone)]
pub struct Settings {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Telegram bot token.
    pub token_id: Option<String>,
    /// Chat that receives alerts before anyone sends /start.
    pub chat_id: Option<i64>,
    pub base_url: BaseUrl,
    pub candle_limit: usize,
    pub poll_interval: Duration,
    pub tolerance: f64,
    pub ratios: Vec<f64>,
    pub lookback: Lookback,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "BTC".to_string(),
            timeframe: Timeframe::default(),
            token_id: None,
            chat_id: None,
            base_url: BaseUrl::Mainnet,
            candle_limit: 200,
            poll_interval: Duration::from_secs(20),
            tolerance: ProximityGuard::DEFAULT_TOLERANCE,
            ratios: STANDARD_RATIOS.to_vec(),
            lookback: Lookback::Window,
        }
    }
}

fn invalid(key: &str, value: &str, reason: impl fmt::Display) -> Error {
    Error::Config(format!("{key}={value}: {reason}"))
}

fn parse_ratios(key: &str, value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r >= 0.0)
                .ok_or_else(|| invalid(key, value, format!("{part:?} is not a ratio")))
        })
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

impl Settings {
    /// Parses `key=value` lines. Lines without `=` and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self> {
        let entries: HashMap<&str, &str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let mut settings = Settings::default();
        let mut extensions = false;
        for key in ["symbol", "timeframe"] {
            if !entries.contains_key(key) {
                return Err(Error::Config(format!("missing required key {key:?}")));
            }
        }

        for (&key, &value) in &entries {
            match key {
                "symbol" => settings.symbol = value.to_string(),
                "timeframe" => {
                    settings.timeframe = value.parse().map_err(|e| invalid(key, value, e))?
                }
                "token_id" => settings.token_id = Some(value.to_string()).filter(|t| !t.is_empty()),
                "chat_id" => {
                    settings.chat_id = Some(value.parse().map_err(|e| invalid(key, value, e))?)
                }
                "base_url" => {
                    settings.base_url = value.parse().map_err(|e| invalid(key, value, e))?
                }
                "candle_limit" => {
                    settings.candle_limit = value.parse().map_err(|e| invalid(key, value, e))?
                }
                "poll_interval" => {
                    settings.poll_interval =
                        parse_duration(value).map_err(|e| invalid(key, value, e))?
                }
                "tolerance" => {
                    settings.tolerance = value.parse().map_err(|e| invalid(key, value, e))?
                }
                "ratios" => settings.ratios = parse_ratios(key, value)?,
                "extensions" => extensions = parse_bool(key, value)?,
                "lookback" => {
                    settings.lookback = value.parse().map_err(|e| invalid(key, value, e))?
                }
                other => warn!("Ignoring unknown setting {:?}", other),
            }
        }

        if extensions {
            settings.ratios.extend(EXTENSION_RATIOS);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Settings file (if any) with command-line flags layered on top.
    pub fn load(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(symbol) = &args.symbol {
            settings.symbol = symbol.clone();
        }
        if let Some(timeframe) = &args.timeframe {
            settings.timeframe = timeframe.clone();
        }
        if let Some(poll) = args.poll {
            settings.poll_interval = poll;
        }
        if args.testnet {
            settings.base_url = BaseUrl::Testnet;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".to_string()));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(Error::Config(format!(
                "tolerance must be within (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.ratios.len() < 2 {
            return Err(Error::Config("at least two ratios are required".to_string()));
        }

        let lookback = match self.lookback {
            Lookback::Candles(n) => n,
            Lookback::Window | Lookback::OscillatorSwing => 0,
        };
        let required = AwesomeOscillator::default().required_candles().max(lookback);
        if self.candle_limit < required {
            return Err(Error::Config(format!(
                "candle_limit {} is below the {} candles the indicators need",
                self.candle_limit, required
            )));
        }
        Ok(())
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            oscillator: AwesomeOscillator::default(),
            ratios: self.ratios.clone(),
            lookback: self.lookback,
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings(symbol='{}', timeframe='{}', poll={}s, limit={})",
            self.symbol,
            self.timeframe,
            self.poll_interval.as_secs(),
            self.candle_limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_information_file() {
        let settings = Settings::parse(
            "symbol=BTC\ntimeframe=4h\ntoken_id=123:abc=def\n\nnot a setting\n",
        )
        .unwrap();
        assert_eq!(settings.symbol, "BTC");
        assert_eq!(settings.timeframe.as_str(), "4h");
        // only the first '=' splits
        assert_eq!(settings.token_id.as_deref(), Some("123:abc=def"));
        assert_eq!(settings.candle_limit, 200);
        assert_eq!(settings.ratios, STANDARD_RATIOS.to_vec());
    }

    #[test]
    fn test_parse_optional_keys() {
        let settings = Settings::parse(
            "# alerts\nsymbol = ETH\ntimeframe = 15m\nchat_id=-100123\npoll_interval=1m\n\
             tolerance=0.002\nratios=0,0.5,1\nextensions=true\nlookback=swing\nbase_url=testnet\n",
        )
        .unwrap();
        assert_eq!(settings.chat_id, Some(-100123));
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.tolerance, 0.002);
        assert_eq!(settings.ratios, vec![0.0, 0.5, 1.0, 1.414, 1.618]);
        assert_eq!(settings.lookback, Lookback::OscillatorSwing);
        assert_eq!(settings.base_url, BaseUrl::Testnet);
    }

    #[test]
    fn test_missing_required_key() {
        let err = Settings::parse("timeframe=4h\n").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("symbol")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Settings::parse("symbol=BTC\ntimeframe=4x\n").is_err());
        assert!(matches!(
            Settings::parse("symbol=BTC\ntimeframe=99999999999999999w\n"),
            Err(Error::Config(msg)) if msg.contains("too long")
        ));
        assert!(Settings::parse("symbol=BTC\ntimeframe=4h\nratios=0,abc\n").is_err());
        assert!(Settings::parse("symbol=BTC\ntimeframe=4h\ntolerance=2\n").is_err());
        assert!(Settings::parse("symbol=BTC\ntimeframe=4h\ncandle_limit=20\n").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args {
            config: None,
            symbol: Some("SOL".to_string()),
            timeframe: Some("1h".parse().unwrap()),
            poll: Some(Duration::from_secs(5)),
            testnet: true,
            simulate: false,
            seed: None,
            cycles: 1,
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.symbol, "SOL");
        assert_eq!(settings.timeframe.secs(), 3600);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.base_url, BaseUrl::Testnet);
        assert!(!settings.to_string().contains("token"));
    }
}
