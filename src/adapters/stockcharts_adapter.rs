//! StockCharts series adapter.
//!
//! The chart endpoint returns a text payload when asked with `img=text`; the
//! rows sit between `<pricedata>` markers, pipe-separated, each row holding
//! space-separated columns where column 1 is a `YYYYMMDDhhmm` stamp and
//! column 3 the indicator value, e.g.
//! `83 202509180930 202509181600 631.29 0|218 202509190930 ...`.

use crate::domain::error::TrendwatchError;
use crate::domain::series::{ObservationPoint, Series};
use crate::ports::series_port::SeriesPort;
use chrono::NaiveDate;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";

pub struct StockchartsAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl StockchartsAdapter {
    pub fn new() -> Self {
        Self::with_base_url("https://stockcharts.com".into())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    fn chart_url(&self, ticker: &str, lookback_days: u32) -> String {
        format!(
            "{}/c-sc/sc?s={}&p=D&yr=0&mn=0&dy={}&i=t3757734781c&img=text&inspector=yes",
            self.base_url,
            ticker.replace('$', "%24"),
            lookback_days
        )
    }
}

impl Default for StockchartsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract observation points from a chart text payload.
pub fn parse_pricedata(ticker: &str, body: &str) -> Result<Vec<ObservationPoint>, TrendwatchError> {
    let unavailable = |reason: String| TrendwatchError::SourceUnavailable {
        ticker: ticker.to_string(),
        reason,
    };

    let start = body
        .find("<pricedata>")
        .ok_or_else(|| unavailable("no <pricedata> section in response".into()))?
        + "<pricedata>".len();
    let section = match body[start..].find("</pricedata>") {
        Some(end) => &body[start..start + end],
        None => &body[start..],
    };

    let mut points = Vec::new();
    for row in section.split('|') {
        let cols: Vec<&str> = row.split_whitespace().collect();
        if cols.len() < 4 {
            continue;
        }
        let stamp = cols[1];
        if stamp.len() < 8 {
            continue;
        }
        let Ok(date) = NaiveDate::parse_from_str(&stamp[..8], "%Y%m%d") else {
            continue;
        };
        let Ok(value) = cols[3].parse::<f64>() else {
            continue;
        };
        if value.is_nan() {
            continue;
        }
        points.push(ObservationPoint { date, value });
    }
    Ok(points)
}

impl SeriesPort for StockchartsAdapter {
    fn fetch(&self, ticker: &str, lookback_days: u32) -> Result<Series, TrendwatchError> {
        let url = self.chart_url(ticker, lookback_days);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TrendwatchError::SourceUnavailable {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendwatchError::SourceUnavailable {
                ticker: ticker.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response
            .text()
            .map_err(|e| TrendwatchError::SourceUnavailable {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;

        let points = parse_pricedata(ticker, &body)?;
        if points.is_empty() {
            return Err(TrendwatchError::EmptySeries {
                ticker: ticker.to_string(),
            });
        }
        Ok(Series::new(ticker, points))
    }
}
