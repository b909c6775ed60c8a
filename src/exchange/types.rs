use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Candle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    Mainnet,
    Testnet,
    Localhost,
    Custom(String),
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Mainnet => "https://api.hyperliquid.xyz".to_string(),
            BaseUrl::Testnet => "https://api.hyperliquid-testnet.xyz".to_string(),
            BaseUrl::Localhost => "http://localhost:3001".to_string(),
            BaseUrl::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

impl FromStr for BaseUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mainnet" => Ok(BaseUrl::Mainnet),
            "testnet" => Ok(BaseUrl::Testnet),
            "localhost" => Ok(BaseUrl::Localhost),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(BaseUrl::Custom(url.to_string()))
            }
            other => Err(format!(
                "invalid base url {other:?}: expected mainnet, testnet, localhost or an http(s) url"
            )),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CandleSnapshotRequest {
    pub coin: String,
    pub interval: String,
    pub start_time: u64,
    pub end_time: u64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum InfoRequest {
    AllMids,
    CandleSnapshot { req: CandleSnapshotRequest },
}

#[derive(Deserialize, Debug, Clone)]
pub struct CandlesSnapshotResponse {
    #[serde(rename = "t")]
    pub time_open: u64,
    #[serde(rename = "T")]
    pub time_close: u64,
    #[serde(rename = "s")]
    pub coin: String,
    #[serde(rename = "i")]
    pub candle_interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "v")]
    pub vlm: String,
    #[serde(rename = "n")]
    pub num_trades: u64,
}

pub(crate) fn parse_float(value: &str) -> Result<f64, Error> {
    value
        .parse::<f64>()
        .map_err(|_| Error::FloatStringParse(value.to_string()))
}

impl TryFrom<&CandlesSnapshotResponse> for Candle {
    type Error = Error;

    fn try_from(raw: &CandlesSnapshotResponse) -> Result<Self, Self::Error> {
        Ok(Candle::new(
            raw.time_open,
            parse_float(&raw.open)?,
            parse_float(&raw.high)?,
            parse_float(&raw.low)?,
            parse_float(&raw.close)?,
            parse_float(&raw.vlm)?,
        ))
    }
}
