//! Durable monitor-state port trait.

use crate::domain::error::TrendwatchError;
use crate::domain::state::MonitorState;

/// Key-value store of the last-known state per ticker.
///
/// `save` must be atomic with respect to process crashes: it either fully
/// lands or the prior record stays readable. Single writer per ticker; the
/// scheduler runs one check cycle at a time.
pub trait StatePort {
    fn load(&self, ticker: &str) -> Result<Option<MonitorState>, TrendwatchError>;
    fn save(&self, state: &MonitorState) -> Result<(), TrendwatchError>;
}
