//! Indicator time series representation.

use chrono::NaiveDate;

/// One dated observation of an indicator value.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A fetched series for one ticker: date-ascending, one point per date.
///
/// Produced fresh on every fetch and never persisted.
#[derive(Debug, Clone)]
pub struct Series {
    ticker: String,
    points: Vec<ObservationPoint>,
}

impl Series {
    /// Build a series, sorting by date and keeping the last point for any
    /// duplicated date.
    pub fn new(ticker: impl Into<String>, mut points: Vec<ObservationPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by(|next, prev| {
            if next.date == prev.date {
                prev.value = next.value;
                true
            } else {
                false
            }
        });
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[ObservationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&ObservationPoint> {
        self.points.last()
    }
}
