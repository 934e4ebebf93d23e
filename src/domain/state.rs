//! Durable per-ticker monitoring state.

use crate::domain::signal::Signal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How many recent observations a state record keeps.
pub const HISTORY_LIMIT: usize = 10;

/// One remembered observation: the data date, the indicator value, and the
/// signal it classified to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub value: f64,
    pub signal: Signal,
}

/// Last-known state for one monitored ticker.
///
/// One record per ticker, owned by the state store. `last_checked_date` is
/// monotonically non-decreasing; `last_transition_date`, when present, is the
/// most recent date on which `last_signal` changed and never exceeds
/// `last_checked_date`.
///
/// Stored as JSON; unknown fields are ignored on load so records written by
/// newer versions stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub ticker: String,
    pub last_signal: Signal,
    /// Indicator value behind the last classification.
    #[serde(default)]
    pub last_value: f64,
    pub last_checked_date: NaiveDate,
    #[serde(default)]
    pub last_transition_date: Option<NaiveDate>,
    /// Rolling window of the last [`HISTORY_LIMIT`] observations, date
    /// ascending, one entry per data date.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl MonitorState {
    /// Record an observation. A later entry for the same date replaces the
    /// earlier one, and only the newest [`HISTORY_LIMIT`] entries survive.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.retain(|e| e.date != entry.date);
        self.history.push(entry);
        self.history.sort_by_key(|e| e.date);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}
