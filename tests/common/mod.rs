#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use trendwatch::domain::detector::TransitionEvent;
use trendwatch::domain::error::TrendwatchError;
use trendwatch::domain::series::{ObservationPoint, Series};
use trendwatch::domain::state::MonitorState;
use trendwatch::ports::notify_port::NotifyPort;
use trendwatch::ports::price_port::PricePoint;
use trendwatch::ports::series_port::SeriesPort;
use trendwatch::ports::state_port::StatePort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn series(ticker: &str, points: &[(NaiveDate, f64)]) -> Series {
    Series::new(
        ticker,
        points
            .iter()
            .map(|&(date, value)| ObservationPoint { date, value })
            .collect(),
    )
}

pub fn prices(points: &[(NaiveDate, f64)]) -> Vec<PricePoint> {
    points
        .iter()
        .map(|&(date, price)| PricePoint { date, price })
        .collect()
}

/// Series source returning canned data per ticker.
pub struct MockSeriesPort {
    data: RefCell<HashMap<String, Series>>,
    errors: RefCell<HashMap<String, String>>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            data: RefCell::new(HashMap::new()),
            errors: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_series(self, series: Series) -> Self {
        self.set_series(series);
        self
    }

    /// Replace the canned series for its ticker. Lets one test advance the
    /// feed between check cycles.
    pub fn set_series(&self, series: Series) {
        self.data
            .borrow_mut()
            .insert(series.ticker().to_string(), series);
    }

    pub fn set_error(&self, ticker: &str, reason: &str) {
        self.errors
            .borrow_mut()
            .insert(ticker.to_string(), reason.to_string());
    }
}

impl SeriesPort for MockSeriesPort {
    fn fetch(&self, ticker: &str, _lookback_days: u32) -> Result<Series, TrendwatchError> {
        if let Some(reason) = self.errors.borrow().get(ticker) {
            return Err(TrendwatchError::SourceUnavailable {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .borrow()
            .get(ticker)
            .cloned()
            .ok_or_else(|| TrendwatchError::EmptySeries {
                ticker: ticker.to_string(),
            })
    }
}

/// In-memory state store with an optional failure switch.
pub struct MemoryStatePort {
    states: RefCell<HashMap<String, MonitorState>>,
    fail_saves: RefCell<bool>,
}

impl MemoryStatePort {
    pub fn new() -> Self {
        Self {
            states: RefCell::new(HashMap::new()),
            fail_saves: RefCell::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.borrow_mut() = fail;
    }

    pub fn get(&self, ticker: &str) -> Option<MonitorState> {
        self.states.borrow().get(ticker).cloned()
    }
}

impl StatePort for MemoryStatePort {
    fn load(&self, ticker: &str) -> Result<Option<MonitorState>, TrendwatchError> {
        Ok(self.states.borrow().get(ticker).cloned())
    }

    fn save(&self, state: &MonitorState) -> Result<(), TrendwatchError> {
        if *self.fail_saves.borrow() {
            return Err(TrendwatchError::StateIo {
                path: format!("{}_state.json", state.ticker),
                reason: "disk full".into(),
            });
        }
        self.states
            .borrow_mut()
            .insert(state.ticker.clone(), state.clone());
        Ok(())
    }
}

/// Notifier that records every delivered event, with an optional failure
/// switch to simulate SMTP outages.
pub struct RecordingNotifier {
    events: RefCell<Vec<(TransitionEvent, f64)>>,
    fail: RefCell<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            fail: RefCell::new(false),
        }
    }

    pub fn fail_deliveries(&self, fail: bool) {
        *self.fail.borrow_mut() = fail;
    }

    pub fn events(&self) -> Vec<(TransitionEvent, f64)> {
        self.events.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.events.borrow().len()
    }
}

impl NotifyPort for RecordingNotifier {
    fn notify(&self, event: &TransitionEvent, value: f64) -> Result<(), TrendwatchError> {
        if *self.fail.borrow() {
            return Err(TrendwatchError::Delivery {
                reason: "connection refused".into(),
            });
        }
        self.events.borrow_mut().push((event.clone(), value));
        Ok(())
    }
}
