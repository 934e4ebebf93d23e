//! CSV file price adapter.
//!
//! Reads `<SYMBOL>.csv` files (`date,close` columns, `.` in symbols replaced
//! by `_`) from a base directory. Offline fallback for the Yahoo adapter and
//! the input path for recorded historical data.

use crate::domain::error::TrendwatchError;
use crate::ports::price_port::{PricePoint, PricePort};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.replace('.', "_")))
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, TrendwatchError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TrendwatchError::SourceUnavailable {
            ticker: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut prices = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TrendwatchError::SourceUnavailable {
                ticker: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record
                .get(0)
                .ok_or_else(|| TrendwatchError::SourceUnavailable {
                    ticker: symbol.to_string(),
                    reason: "missing date column".into(),
                })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                TrendwatchError::SourceUnavailable {
                    ticker: symbol.to_string(),
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if date < start || date > end {
                continue;
            }

            let price: f64 = record
                .get(1)
                .ok_or_else(|| TrendwatchError::SourceUnavailable {
                    ticker: symbol.to_string(),
                    reason: "missing close column".into(),
                })?
                .parse()
                .map_err(|e| TrendwatchError::SourceUnavailable {
                    ticker: symbol.to_string(),
                    reason: format!("invalid close value: {}", e),
                })?;

            prices.push(PricePoint { date, price });
        }

        if prices.is_empty() {
            return Err(TrendwatchError::EmptySeries {
                ticker: symbol.to_string(),
            });
        }
        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }
}
