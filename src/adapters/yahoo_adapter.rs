//! Yahoo Finance price adapter.
//!
//! Daily closes from the v8 chart API. Yahoo has no official API and the
//! format changes without notice; the CSV price adapter is the offline
//! fallback.

use crate::domain::error::TrendwatchError;
use crate::ports::price_port::{PricePoint, PricePort};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new() -> Self {
        Self::with_base_url("https://query2.finance.yahoo.com".into())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .expect("valid time")
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        )
    }
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PricePoint>, TrendwatchError> {
    let unavailable = |reason: String| TrendwatchError::SourceUnavailable {
        ticker: symbol.to_string(),
        reason,
    };

    let result = resp.chart.result.ok_or_else(|| {
        let reason = match resp.chart.error {
            Some(err) => format!("{}: {}", err.code, err.description),
            None => "empty result with no error".into(),
        };
        unavailable(reason)
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| unavailable("result array is empty".into()))?;

    let timestamps = data
        .timestamp
        .ok_or_else(|| unavailable("no timestamps".into()))?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| unavailable("no quote data".into()))?;

    let mut prices = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(date) = chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc().date())
        else {
            return Err(unavailable(format!("invalid timestamp: {ts}")));
        };
        // Holidays and half-days come back as nulls; skip them.
        if let Some(close) = quote.close.get(i).copied().flatten() {
            prices.push(PricePoint { date, price: close });
        }
    }
    Ok(prices)
}

impl PricePort for YahooAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, TrendwatchError> {
        let url = self.chart_url(symbol, start, end);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TrendwatchError::SourceUnavailable {
                ticker: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendwatchError::SourceUnavailable {
                ticker: symbol.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let chart: ChartResponse =
            response
                .json()
                .map_err(|e| TrendwatchError::SourceUnavailable {
                    ticker: symbol.to_string(),
                    reason: format!("failed to parse response: {e}"),
                })?;

        let prices = parse_response(symbol, chart)?;
        if prices.is_empty() {
            return Err(TrendwatchError::EmptySeries {
                ticker: symbol.to_string(),
            });
        }
        Ok(prices)
    }
}
