//! Monitoring loop: fetch, classify, detect, notify, persist, sleep.
//!
//! Single-threaded and cooperative. The only suspension point is the sleep
//! between cycles; every state save completes before a sleep begins, so
//! process termination during a wait never leaves a partially updated store.

use crate::domain::classifier::DeltaRule;
use crate::domain::detector::{self, Detection};
use crate::domain::error::TrendwatchError;
use crate::domain::series::Series;
use crate::domain::signal::Signal;
use crate::domain::state::{HistoryEntry, HISTORY_LIMIT};
use crate::ports::notify_port::NotifyPort;
use crate::ports::series_port::SeriesPort;
use crate::ports::state_port::StatePort;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, error, info, warn};
use std::time::Duration;

/// Daily time-of-day range during which polling is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl MonitorWindow {
    /// Parse `HH:MM-HH:MM`.
    pub fn parse(s: &str) -> Result<Self, TrendwatchError> {
        let invalid = |reason: &str| TrendwatchError::ConfigInvalid {
            section: "monitor".into(),
            key: "window".into(),
            reason: format!("{reason} (expected HH:MM-HH:MM, got {s:?})"),
        };
        let (start_str, end_str) = s.split_once('-').ok_or_else(|| invalid("missing '-'"))?;
        let start = NaiveTime::parse_from_str(start_str.trim(), "%H:%M")
            .map_err(|_| invalid("bad start time"))?;
        let end = NaiveTime::parse_from_str(end_str.trim(), "%H:%M")
            .map_err(|_| invalid("bad end time"))?;
        Ok(Self { start, end })
    }

    /// Whether `t` falls inside the window, inclusive. Windows where start is
    /// after end cross midnight.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }

    /// Forward sleep duration from `now` to the next window start, rolling to
    /// tomorrow when today's start has already passed.
    pub fn until_next_start(&self, now: NaiveDateTime) -> Duration {
        let mut next = now.date().and_time(self.start);
        if next <= now {
            next += chrono::Duration::days(1);
        }
        (next - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Scheduler loop states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    Idle,
    Checking,
    Waiting,
    OutsideWindow,
    Done,
}

fn transition(state: &mut LoopState, next: LoopState) {
    if *state != next {
        debug!("loop state {:?} -> {:?}", *state, next);
        *state = next;
    }
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Sleep between polls within the window.
    pub interval: Duration,
    pub window: Option<MonitorWindow>,
    /// Poll every interval regardless of window or daily completion.
    pub continuous: bool,
    /// Exit after the first day on which every ticker has been checked.
    pub run_once: bool,
    /// Terminate on the first error instead of logging and continuing.
    pub fail_fast: bool,
}

/// Result of one successful check for one ticker.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub ticker: String,
    pub signal: Signal,
    pub value: f64,
    pub data_date: NaiveDate,
    pub detection: Detection,
}

/// Drives repeated fetch -> classify -> detect -> notify -> persist cycles.
pub struct Monitor<'a> {
    series: &'a dyn SeriesPort,
    store: &'a dyn StatePort,
    notifier: &'a dyn NotifyPort,
    rule: DeltaRule,
    tickers: Vec<String>,
    lookback_days: u32,
}

impl<'a> Monitor<'a> {
    pub fn new(
        series: &'a dyn SeriesPort,
        store: &'a dyn StatePort,
        notifier: &'a dyn NotifyPort,
        rule: DeltaRule,
        tickers: Vec<String>,
        lookback_days: u32,
    ) -> Self {
        Self {
            series,
            store,
            notifier,
            rule,
            tickers,
            lookback_days,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Run one full check cycle for one ticker.
    ///
    /// The new state is persisted before the notifier runs: a crash after
    /// `save` costs at most one missed email, never a duplicate.
    pub fn check_ticker(
        &self,
        ticker: &str,
        today: NaiveDate,
    ) -> Result<CheckReport, TrendwatchError> {
        let series = self.series.fetch(ticker, self.lookback_days)?;
        let signal = self.rule.classify(&series)?;
        let latest = series
            .latest()
            .ok_or_else(|| TrendwatchError::EmptySeries {
                ticker: ticker.to_string(),
            })?
            .clone();

        let prior = self.store.load(ticker)?;
        let (mut state, detection) =
            detector::detect(prior.as_ref(), ticker, signal, latest.value, today);
        if prior.is_none() {
            state.history = backfill_history(&self.rule, &series);
        } else {
            state.push_history(HistoryEntry {
                date: latest.date,
                value: latest.value,
                signal,
            });
        }
        self.store.save(&state)?;

        match &detection {
            Detection::FirstObservation => {
                info!("{ticker}: first observation, {signal} at {}", latest.value);
            }
            Detection::NoChange => {
                info!("{ticker}: no change, still {signal} at {}", latest.value);
            }
            Detection::Transition(event) => {
                info!(
                    "{ticker}: transition {} -> {} on {}",
                    event.from, event.to, event.date
                );
                self.notifier.notify(event, latest.value)?;
            }
            Detection::SuppressedSameDay(event) => {
                warn!(
                    "{ticker}: transition {} -> {} suppressed, already notified today",
                    event.from, event.to
                );
            }
        }

        Ok(CheckReport {
            ticker: ticker.to_string(),
            signal,
            value: latest.value,
            data_date: latest.date,
            detection,
        })
    }

    /// Run one cycle across all tickers. Used by single-check mode; any
    /// error aborts and is surfaced to the caller.
    pub fn check_all(&self, today: NaiveDate) -> Result<Vec<CheckReport>, TrendwatchError> {
        self.tickers
            .iter()
            .map(|ticker| self.check_ticker(ticker, today))
            .collect()
    }

    fn all_checked(&self, today: NaiveDate) -> Result<bool, TrendwatchError> {
        for ticker in &self.tickers {
            match self.store.load(ticker)? {
                Some(state) if state.last_checked_date >= today => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Continuous monitoring loop. Returns only in run-once mode or on a
    /// non-recoverable error.
    pub fn run(&self, opts: &LoopOptions) -> Result<(), TrendwatchError> {
        let mut state = LoopState::Idle;
        info!(
            "monitoring {} every {}s{}",
            self.tickers.join(", "),
            opts.interval.as_secs(),
            match (&opts.window, opts.continuous) {
                (_, true) => " (continuous)".to_string(),
                (Some(w), false) => format!(" within {}-{}", w.start, w.end),
                (None, false) => String::new(),
            }
        );

        loop {
            let now = Local::now().naive_local();
            let today = now.date();

            if !opts.continuous {
                if let Some(window) = &opts.window {
                    if !window.contains(now.time()) {
                        let wait = window.until_next_start(now);
                        if state != LoopState::OutsideWindow {
                            info!(
                                "outside monitoring window, sleeping {}s until {}",
                                wait.as_secs(),
                                window.start
                            );
                        }
                        transition(&mut state, LoopState::OutsideWindow);
                        std::thread::sleep(wait);
                        continue;
                    }
                }

                if self.all_checked(today)? {
                    if opts.run_once {
                        transition(&mut state, LoopState::Done);
                        info!("today's check complete, exiting (run-once)");
                        return Ok(());
                    }
                    let wait = match &opts.window {
                        Some(window) => window.until_next_start(now),
                        None => until_next_day(now),
                    };
                    info!(
                        "today's check complete, sleeping {}s until tomorrow",
                        wait.as_secs()
                    );
                    transition(&mut state, LoopState::Waiting);
                    std::thread::sleep(wait);
                    continue;
                }
            }

            transition(&mut state, LoopState::Checking);
            for ticker in &self.tickers {
                match self.check_ticker(ticker, today) {
                    Ok(_) => {}
                    Err(e) if e.is_recoverable() && !opts.fail_fast => {
                        warn!("check failed for {ticker}: {e}");
                    }
                    Err(e) => {
                        error!("fatal error for {ticker}: {e}");
                        transition(&mut state, LoopState::Done);
                        return Err(e);
                    }
                }
            }

            transition(&mut state, LoopState::Waiting);
            std::thread::sleep(opts.interval);
        }
    }
}

/// Seed a fresh state's history from the fetched series, one entry per
/// classifiable data date, newest [`HISTORY_LIMIT`] only.
fn backfill_history(rule: &DeltaRule, series: &Series) -> Vec<HistoryEntry> {
    let values: std::collections::BTreeMap<NaiveDate, f64> = series
        .points()
        .iter()
        .map(|p| (p.date, p.value))
        .collect();
    let mut entries: Vec<HistoryEntry> = rule
        .classify_points(series.points())
        .into_iter()
        .filter_map(|(date, signal)| {
            values.get(&date).map(|&value| HistoryEntry {
                date,
                value,
                signal,
            })
        })
        .collect();
    let excess = entries.len().saturating_sub(HISTORY_LIMIT);
    entries.drain(..excess);
    entries
}

fn until_next_day(now: NaiveDateTime) -> Duration {
    let next = now.date().succ_opt().unwrap_or(now.date()).and_time(
        NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time"),
    );
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
