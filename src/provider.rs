use crate::series::CloseObservation;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider responded with status {0}")]
    Status(u16),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("no usable close-price data")]
    NoData,
}

/// Narrow interface to the external price-data provider: a window of daily
/// close prices for a set of tickers, or an explicit no-data signal.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn daily_closes(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CloseObservation>, ProviderError>;
}

/// HTTP implementation talking to the market-data gateway.
///
/// The gateway answers `POST {base_url}/daily-closes` with one object per
/// requested symbol, each carrying parallel `t` (epoch seconds) and `c`
/// (close price) arrays.
pub struct HttpPriceProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPriceProvider {
    pub fn new(base_url: String, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl PriceProvider for HttpPriceProvider {
    async fn daily_closes(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CloseObservation>, ProviderError> {
        let url = format!("{}/daily-closes", self.base_url);
        let payload = serde_json::json!({
            "symbols": tickers,
            "start": start.format("%Y-%m-%d").to_string(),
            "end": end.format("%Y-%m-%d").to_string(),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        parse_daily_closes(&body, tickers, start, end)
    }
}

/// Decode the gateway's columnar response into flat observations.
///
/// A symbol whose entry is malformed (missing arrays, mismatched lengths) is
/// skipped with a warning rather than failing the whole window; a response
/// with no recognizable close field at all is the `NoData` signal.
pub fn parse_daily_closes(
    body: &Value,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CloseObservation>, ProviderError> {
    let items = body
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("expected a JSON array".to_string()))?;
    if items.is_empty() {
        return Err(ProviderError::NoData);
    }

    let mut observations = Vec::new();
    let mut any_close_field = false;

    for (i, item) in items.iter().enumerate() {
        let symbol = item
            .get("symbol")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| tickers.get(i).cloned());
        let Some(symbol) = symbol else {
            warn!(index = i, "Provider item has no symbol, skipping");
            continue;
        };

        let (Some(times), Some(closes)) = (
            item.get("t").and_then(|v| v.as_array()),
            item.get("c").and_then(|v| v.as_array()),
        ) else {
            warn!(%symbol, "Provider item missing time/close arrays, skipping");
            continue;
        };
        any_close_field = true;

        if times.len() != closes.len() {
            warn!(
                %symbol,
                times = times.len(),
                closes = closes.len(),
                "Inconsistent array lengths, skipping symbol"
            );
            continue;
        }

        for (time, close) in times.iter().zip(closes.iter()) {
            // Timestamps arrive either as epoch seconds or stringified ints.
            let timestamp = time
                .as_i64()
                .or_else(|| time.as_str().and_then(|s| s.parse::<i64>().ok()));
            let (Some(timestamp), Some(close)) = (timestamp, close.as_f64()) else {
                continue;
            };
            let Some(date) = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
            else {
                continue;
            };
            if date >= start && date <= end {
                observations.push(CloseObservation {
                    ticker: symbol.clone(),
                    date,
                    close,
                });
            }
        }
    }

    if !any_close_field {
        return Err(ProviderError::NoData);
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_columnar_response() {
        // 2025-03-03 and 2025-03-04 as epoch seconds.
        let body = json!([
            { "symbol": "AAA", "t": [1740960000, 1741046400], "c": [10.0, 11.0] }
        ]);
        let obs =
            parse_daily_closes(&body, &symbols(&["AAA"]), d("2025-03-01"), d("2025-03-10"))
                .unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].ticker, "AAA");
        assert_eq!(obs[0].date, d("2025-03-03"));
        assert_eq!(obs[1].close, 11.0);
    }

    #[test]
    fn observations_outside_window_are_dropped() {
        let body = json!([
            { "symbol": "AAA", "t": [1740960000, 1741046400], "c": [10.0, 11.0] }
        ]);
        let obs =
            parse_daily_closes(&body, &symbols(&["AAA"]), d("2025-03-04"), d("2025-03-10"))
                .unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].date, d("2025-03-04"));
    }

    #[test]
    fn missing_close_field_is_no_data() {
        let body = json!([ { "symbol": "AAA", "t": [1740960000] } ]);
        let err = parse_daily_closes(&body, &symbols(&["AAA"]), d("2025-03-01"), d("2025-03-10"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoData));
    }

    #[test]
    fn empty_array_is_no_data() {
        let err = parse_daily_closes(
            &json!([]),
            &symbols(&["AAA"]),
            d("2025-03-01"),
            d("2025-03-10"),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::NoData));
    }

    #[test]
    fn malformed_symbol_is_skipped_not_fatal() {
        let body = json!([
            { "symbol": "AAA", "t": [1740960000], "c": [10.0, 11.0] },
            { "symbol": "BBB", "t": [1740960000], "c": [20.0] }
        ]);
        let obs =
            parse_daily_closes(&body, &symbols(&["AAA", "BBB"]), d("2025-03-01"), d("2025-03-10"))
                .unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].ticker, "BBB");
    }

    #[test]
    fn string_timestamps_are_accepted() {
        let body = json!([
            { "symbol": "AAA", "t": ["1740960000"], "c": [10.0] }
        ]);
        let obs =
            parse_daily_closes(&body, &symbols(&["AAA"]), d("2025-03-01"), d("2025-03-10"))
                .unwrap();
        assert_eq!(obs.len(), 1);
    }
}
