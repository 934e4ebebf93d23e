//! Trend classification rule.
//!
//! The rule is a configurable strategy rather than a hardcoded constant: it
//! compares the latest value against the value `lookback` points earlier.
//! The same rule instance drives both live monitoring and the trading
//! simulator, so a historical series classified twice yields identical
//! signals.

use crate::domain::error::TrendwatchError;
use crate::domain::series::{ObservationPoint, Series};
use crate::domain::signal::Signal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy)]
pub struct DeltaRule {
    /// How many points back the reference value sits. 1 compares the last
    /// two observations.
    pub lookback: usize,
}

impl Default for DeltaRule {
    fn default() -> Self {
        Self { lookback: 1 }
    }
}

impl DeltaRule {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    /// Minimum number of points the rule needs.
    pub fn min_points(&self) -> usize {
        self.lookback + 1
    }

    /// Classify the most recent point of a series.
    ///
    /// When latest and reference are equal, walks back to the most recent
    /// unequal pair at the same lookback distance and uses its direction. A
    /// fully flat series carries no direction and is reported as
    /// insufficient data.
    pub fn classify(&self, series: &Series) -> Result<Signal, TrendwatchError> {
        let pts = series.points();
        if pts.len() < self.min_points() {
            return Err(TrendwatchError::InsufficientData {
                have: pts.len(),
                need: self.min_points(),
            });
        }

        // Walks back one point at a time, always comparing at the
        // configured lookback distance.
        for i in (self.lookback..pts.len()).rev() {
            let latest = pts[i].value;
            let reference = pts[i - self.lookback].value;
            if latest > reference {
                return Ok(Signal::Rising);
            }
            if latest < reference {
                return Ok(Signal::Declining);
            }
        }
        Err(TrendwatchError::InsufficientData {
            have: pts.len(),
            need: self.min_points(),
        })
    }

    /// Classify every point of a historical series for the simulator.
    ///
    /// The first `lookback` points have no reference and are skipped. When a
    /// point equals its reference the previous signal carries forward; a
    /// leading flat run stays unclassified until the first real move.
    pub fn classify_points(&self, pts: &[ObservationPoint]) -> Vec<(NaiveDate, Signal)> {
        let mut signals = Vec::new();
        let mut prev: Option<Signal> = None;

        for i in self.lookback..pts.len() {
            let latest = pts[i].value;
            let reference = pts[i - self.lookback].value;
            let signal = if latest > reference {
                Some(Signal::Rising)
            } else if latest < reference {
                Some(Signal::Declining)
            } else {
                prev
            };
            if let Some(s) = signal {
                signals.push((pts[i].date, s));
                prev = Some(s);
            }
        }
        signals
    }
}
