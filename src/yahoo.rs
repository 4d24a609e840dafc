use crate::error::{DataError, Result};
use crate::models::{normalize_ticker, Candle, Interval, Period, PriceSeries};
use chrono::DateTime;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client around the chart API. One request per fetch, no retries;
/// failures surface immediately to the caller.
pub struct YahooClient {
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Downloads historical OHLCV bars for one ticker. Rows missing any
    /// field are skipped; an empty result is an explicit `NoData` error.
    pub async fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        period: Period,
    ) -> Result<PriceSeries> {
        let symbol = normalize_ticker(ticker)?;
        let url = format!("{}/{}", CHART_BASE_URL, symbol);
        debug!("Fetching {} ({} @ {})", symbol, period.as_str(), interval.as_str());

        let response = self
            .http
            .get(&url)
            .query(&[
                ("range", period.as_str()),
                ("interval", interval.as_str()),
                ("events", "history"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Chart API returned {} for {}", status, symbol);
            return Err(DataError::NoData(format!("{} (HTTP {})", symbol, status)));
        }

        let body: ChartResponse = response.json().await?;

        if let Some(error) = body.chart.error {
            return Err(DataError::NoData(format!(
                "{} ({}: {})",
                symbol, error.code, error.description
            )));
        }

        let result = body
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| DataError::NoData(symbol.clone()))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NoData(symbol.clone()))?;

        let opens = quote.open.unwrap_or_default();
        let highs = quote.high.unwrap_or_default();
        let lows = quote.low.unwrap_or_default();
        let closes = quote.close.unwrap_or_default();
        let volumes = quote.volume.unwrap_or_default();

        let mut candles = Vec::with_capacity(timestamps.len());
        let mut last_ts = None;
        for (i, &ts) in timestamps.iter().enumerate() {
            // The API occasionally repeats the trailing bar; keep the first.
            if last_ts == Some(ts) {
                continue;
            }

            let open = opens.get(i).and_then(|v| *v);
            let high = highs.get(i).and_then(|v| *v);
            let low = lows.get(i).and_then(|v| *v);
            let close = closes.get(i).and_then(|v| *v);
            let volume = volumes.get(i).and_then(|v| *v);

            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
                (open, high, low, close, volume)
            else {
                continue;
            };
            let Some(date) = DateTime::from_timestamp(ts, 0) else {
                continue;
            };

            candles.push(Candle {
                date,
                open,
                high,
                low,
                close,
                volume: volume as f64,
            });
            last_ts = Some(ts);
        }

        if candles.is_empty() {
            return Err(DataError::NoData(symbol));
        }

        PriceSeries::new(symbol, candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_ticker_fails_before_any_request() {
        let client = YahooClient::new().unwrap();
        let result = client.fetch("  ", Interval::Day1, Period::Year1).await;
        assert!(matches!(result, Err(DataError::InvalidArgument(_))));
    }

    #[test]
    fn chart_response_decodes_error_payload() {
        let raw = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let decoded: ChartResponse = serde_json::from_str(raw).unwrap();
        let error = decoded.chart.error.unwrap();
        assert_eq!(error.code, "Not Found");
    }

    #[test]
    fn chart_response_decodes_quote_rows() {
        let raw = r#"{"chart":{"result":[{"timestamp":[1700000000,1700086400],
            "indicators":{"quote":[{"open":[10.0,null],"high":[11.0,12.0],
            "low":[9.0,10.0],"close":[10.5,11.5],"volume":[1000,2000]}]}}],
            "error":null}}"#;
        let decoded: ChartResponse = serde_json::from_str(raw).unwrap();
        let result = decoded.chart.result.unwrap();
        let quote = &result[0].indicators.quote[0];
        assert_eq!(quote.open.as_ref().unwrap()[1], None);
        assert_eq!(quote.volume.as_ref().unwrap()[0], Some(1000));
    }
}
