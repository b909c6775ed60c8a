use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::req::HttpClient;
use super::types::{parse_float, BaseUrl, CandleSnapshotRequest, CandlesSnapshotResponse, InfoRequest};
use super::CandleSource;
use crate::error::{Error, Result};
use crate::models::{Candle, Timeframe};

/// Read-only client for the exchange `/info` endpoint.
#[derive(Debug, Clone)]
pub struct InfoClient {
    pub http_client: HttpClient,
}

impl InfoClient {
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> Self {
        let client = client.unwrap_or_default();
        let base_url = base_url.unwrap_or(BaseUrl::Mainnet).get_url();

        InfoClient {
            http_client: HttpClient { client, base_url },
        }
    }

    async fn send_info_request<T: DeserializeOwned>(&self, info_request: InfoRequest) -> Result<T> {
        let data =
            serde_json::to_string(&info_request).map_err(|e| Error::JsonParse(e.to_string()))?;

        let return_data = self.http_client.post("/info", data).await?;
        serde_json::from_str(&return_data).map_err(|e| Error::JsonParse(e.to_string()))
    }

    pub async fn all_mids(&self) -> Result<HashMap<String, String>> {
        self.send_info_request(InfoRequest::AllMids).await
    }

    pub async fn candles_snapshot(
        &self,
        coin: String,
        interval: String,
        start_time: u64,
        end_time: u64,
    ) -> Result<Vec<CandlesSnapshotResponse>> {
        let input = InfoRequest::CandleSnapshot {
            req: CandleSnapshotRequest {
                coin,
                interval,
                start_time,
                end_time,
            },
        };
        self.send_info_request(input).await
    }
}

/// Converts a snapshot into a time-ordered window of at most `limit` candles.
pub fn snapshot_to_candles(raw: &[CandlesSnapshotResponse], limit: usize) -> Result<Vec<Candle>> {
    let mut candles = raw
        .iter()
        .map(Candle::try_from)
        .collect::<Result<Vec<Candle>>>()?;
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);

    let skip = candles.len().saturating_sub(limit);
    Ok(candles.split_off(skip))
}

#[async_trait]
impl CandleSource for InfoClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let end_time = Utc::now().timestamp_millis().max(0) as u64;
        let start_time = end_time.saturating_sub(timeframe.millis() * limit as u64);

        let raw = self
            .candles_snapshot(
                symbol.to_string(),
                timeframe.as_str().to_string(),
                start_time,
                end_time,
            )
            .await?;
        debug!("[{}] Received {} raw candles", symbol, raw.len());

        snapshot_to_candles(&raw, limit)
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let mids = self.all_mids().await?;
        let mid = mids
            .get(symbol)
            .ok_or_else(|| Error::AssetNotFound(symbol.to_string()))?;
        parse_float(mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"[
        {"t":1700003600000,"T":1700007199999,"s":"BTC","i":"1h","o":"101.5","c":"102.0","h":"103.0","l":"100.5","v":"12.5","n":40},
        {"t":1700000000000,"T":1700003599999,"s":"BTC","i":"1h","o":"100.0","c":"101.5","h":"102.0","l":"99.0","v":"10.0","n":32}
    ]"#;

    #[test]
    fn test_candle_snapshot_request_shape() {
        let request = InfoRequest::CandleSnapshot {
            req: CandleSnapshotRequest {
                coin: "BTC".to_string(),
                interval: "4h".to_string(),
                start_time: 1,
                end_time: 2,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "candleSnapshot",
                "req": {"coin": "BTC", "interval": "4h", "startTime": 1, "endTime": 2}
            })
        );
        assert_eq!(
            serde_json::to_value(InfoRequest::AllMids).unwrap(),
            serde_json::json!({"type": "allMids"})
        );
    }

    #[test]
    fn test_snapshot_sorted_and_limited() {
        let raw: Vec<CandlesSnapshotResponse> = serde_json::from_str(SNAPSHOT).unwrap();
        let candles = snapshot_to_candles(&raw, 200).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(candles[1].close, 102.0);
        assert_eq!(candles[0].volume, 10.0);

        let last_only = snapshot_to_candles(&raw, 1).unwrap();
        assert_eq!(last_only.len(), 1);
        assert_eq!(last_only[0].timestamp, 1_700_003_600_000);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let mut raw: Vec<CandlesSnapshotResponse> = serde_json::from_str(SNAPSHOT).unwrap();
        raw[0].high = "n/a".to_string();
        assert!(matches!(
            snapshot_to_candles(&raw, 10),
            Err(Error::FloatStringParse(value)) if value == "n/a"
        ));
    }

    #[test]
    fn test_base_url_parsing() {
        assert_eq!("testnet".parse::<BaseUrl>(), Ok(BaseUrl::Testnet));
        assert_eq!(
            "https://example.org/".parse::<BaseUrl>().unwrap().get_url(),
            "https://example.org"
        );
        assert!("ftp://nope".parse::<BaseUrl>().is_err());
    }
}
