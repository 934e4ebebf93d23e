//! Trading simulation over a merged indicator/price history.
//!
//! Shares the monitor's classification rule: the indicator series is
//! classified per date, inner-joined with the price series, and walked once.
//! Entering the buy signal opens a position, leaving it closes one.

use crate::domain::classifier::DeltaRule;
use crate::domain::series::Series;
use crate::domain::signal::Signal;
use crate::ports::price_port::PricePoint;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One completed round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrade {
    pub entry_date: NaiveDate,
    pub entry_signal: Signal,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
}

impl SimulatedTrade {
    /// Fractional gain or loss over the holding period.
    pub fn realized_return(&self) -> f64 {
        self.exit_price / self.entry_price - 1.0
    }
}

/// Inclusive date range during which no new position may be opened.
/// Exits are never suppressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlacklistRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BlacklistRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub trades: Vec<SimulatedTrade>,
    /// Dates present in only one of the two input series, dropped by the
    /// merge. Non-fatal; surfaced so thin data is visible in the report.
    pub unmatched_dates: usize,
}

/// Merge an indicator series with a price series by date and simulate one
/// position toggled by transitions into and out of `buy_signal`.
///
/// Deterministic: the same inputs always produce the same trades. A position
/// still open at the end of the merged range is closed at its final date.
pub fn simulate(
    rule: &DeltaRule,
    indicator: &Series,
    prices: &[PricePoint],
    buy_signal: Signal,
    blacklist: Option<BlacklistRange>,
) -> SimulationResult {
    let signals = rule.classify_points(indicator.points());
    let price_by_date: BTreeMap<NaiveDate, f64> =
        prices.iter().map(|p| (p.date, p.price)).collect();

    let mut merged: Vec<(NaiveDate, Signal, f64)> = Vec::new();
    let mut unmatched = 0usize;
    for (date, signal) in &signals {
        match price_by_date.get(date) {
            Some(&price) => merged.push((*date, *signal, price)),
            None => unmatched += 1,
        }
    }
    let signal_dates: std::collections::BTreeSet<NaiveDate> =
        signals.iter().map(|(d, _)| *d).collect();
    unmatched += prices
        .iter()
        .filter(|p| !signal_dates.contains(&p.date))
        .count();

    let mut trades = Vec::new();
    let mut open: Option<(NaiveDate, Signal, f64)> = None;
    let mut prev_signal: Option<Signal> = None;

    for &(date, signal, price) in &merged {
        let entered = prev_signal != Some(buy_signal) && signal == buy_signal;
        let exited = prev_signal == Some(buy_signal) && signal != buy_signal;

        if exited {
            if let Some((entry_date, entry_signal, entry_price)) = open.take() {
                trades.push(SimulatedTrade {
                    entry_date,
                    entry_signal,
                    entry_price,
                    exit_date: date,
                    exit_price: price,
                });
            }
        }
        if entered {
            let blocked = blacklist.is_some_and(|b| b.contains(date));
            if !blocked {
                open = Some((date, signal, price));
            }
        }
        prev_signal = Some(signal);
    }

    // Close any position left open at the end of the merged range.
    if let Some((entry_date, entry_signal, entry_price)) = open {
        if let Some(&(date, _, price)) = merged.last() {
            if date > entry_date {
                trades.push(SimulatedTrade {
                    entry_date,
                    entry_signal,
                    entry_price,
                    exit_date: date,
                    exit_price: price,
                });
            }
        }
    }

    SimulationResult {
        trades,
        unmatched_dates: unmatched,
    }
}
