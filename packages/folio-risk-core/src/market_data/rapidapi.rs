//! Yahoo Finance historical prices through RapidAPI.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DateRange, PriceSource};
use crate::config::MarketDataConfig;
use crate::types::PricePoint;
use crate::{Error, Result};

const HISTORY_PATH: &str = "/stock/v3/get-historical-data";

/// HTTP client for the `yh-finance` RapidAPI host.
#[derive(Clone)]
pub struct RapidApiClient {
    http: Client,
    base_url: String,
    host: String,
    api_key: String,
}

impl std::fmt::Debug for RapidApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapidApiClient")
            .field("base_url", &self.base_url)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    prices: Vec<HistoryEntry>,
}

// Dividend and split events share the array but carry no close.
#[derive(Debug, Deserialize)]
struct HistoryEntry {
    date: Option<i64>,
    close: Option<f64>,
}

impl RapidApiClient {
    /// Create a client from explicit configuration.
    ///
    /// Fails with [`Error::Config`] when no API key is configured.
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("market data API key is not set".to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            host: config.host.clone(),
            api_key,
        })
    }

    async fn fetch_raw(&self, symbol: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        debug!(symbol, url = %url, "requesting price history");

        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AssetUnavailable {
                symbol: symbol.to_string(),
                reason: format!("provider returned HTTP {}", status.as_u16()),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PriceSource for RapidApiClient {
    async fn fetch_history(&self, symbol: &str, range: DateRange) -> Result<Vec<PricePoint>> {
        let body = self.fetch_raw(symbol).await?;
        parse_history(symbol, &body, range)
    }
}

/// Parse a historical-data payload into sorted closing prices within `range`.
///
/// Entries without a date or close are skipped. Unix timestamps are mapped
/// to their UTC calendar date.
pub fn parse_history(symbol: &str, body: &str, range: DateRange) -> Result<Vec<PricePoint>> {
    let parsed: HistoryResponse =
        serde_json::from_str(body).map_err(|e| Error::AssetUnavailable {
            symbol: symbol.to_uppercase(),
            reason: format!("malformed response: {}", e),
        })?;

    let mut points: Vec<PricePoint> = parsed
        .prices
        .into_iter()
        .filter_map(|entry| {
            let date = DateTime::from_timestamp(entry.date?, 0)?.date_naive();
            let close = entry.close?;
            Some(PricePoint::new(date, close))
        })
        .filter(|p| range.contains(p.date))
        .collect();

    if points.is_empty() {
        return Err(Error::AssetUnavailable {
            symbol: symbol.to_uppercase(),
            reason: "no prices in requested range".to_string(),
        });
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_history() {
        // 2024-01-03 and 2024-01-02 (14:30 UTC), a dividend row, and one
        // observation from December that falls outside the range.
        let body = r#"{
            "prices": [
                {"date": 1704292200, "open": 184.2, "close": 184.25, "volume": 58414500},
                {"date": 1704205800, "open": 187.15, "close": 185.64, "volume": 82488700},
                {"date": 1704205800, "amount": 0.24, "type": "DIVIDEND"},
                {"date": 1703860200, "close": 192.53}
            ],
            "isPending": false
        }"#;

        let points = parse_history("aapl", body, range()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(points[0].close, 185.64);
        assert_eq!(points[1].close, 184.25);
    }

    #[test]
    fn test_parse_history_empty() {
        let result = parse_history("XYZ", r#"{"prices": []}"#, range());
        match result {
            Err(Error::AssetUnavailable { symbol, .. }) => assert_eq!(symbol, "XYZ"),
            other => panic!("unexpected result: {:?}", other),
        }

        let result = parse_history("XYZ", r#"{"message": "not found"}"#, range());
        assert!(matches!(result, Err(Error::AssetUnavailable { .. })));
    }

    #[test]
    fn test_parse_history_malformed() {
        let result = parse_history("XYZ", "<html>", range());
        assert!(matches!(result, Err(Error::AssetUnavailable { .. })));
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = MarketDataConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(RapidApiClient::new(&config), Err(Error::Config(_))));

        let config = MarketDataConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let client = RapidApiClient::new(&config).unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
