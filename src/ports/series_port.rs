//! Indicator series access port trait.

use crate::domain::error::TrendwatchError;
use crate::domain::series::Series;

/// Fetches a dated indicator series for a ticker from an external provider.
///
/// Fails with `SourceUnavailable` when the provider cannot be reached or
/// returns a malformed payload, and `EmptySeries` when the window holds no
/// points. Retry policy belongs to the caller, not the source.
pub trait SeriesPort {
    fn fetch(&self, ticker: &str, lookback_days: u32) -> Result<Series, TrendwatchError>;
}
