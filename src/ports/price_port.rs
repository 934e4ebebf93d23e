//! Stock price access port trait (simulator input).

use crate::domain::error::TrendwatchError;
use chrono::NaiveDate;

/// One daily closing price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

pub trait PricePort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, TrendwatchError>;
}
