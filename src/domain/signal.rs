//! Trend signal derived from an indicator series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categorical trend direction. On StockCharts the NYSI line is drawn black
/// while rising and red while declining, so the colour names are the common
/// vocabulary for these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Indicator is increasing ("Black").
    Rising,
    /// Indicator is decreasing ("Red").
    Declining,
}

impl Signal {
    /// The chart colour name for this signal.
    pub fn color(&self) -> &'static str {
        match self {
            Signal::Rising => "Black",
            Signal::Declining => "Red",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "black" | "rising" => Ok(Signal::Rising),
            "red" | "declining" => Ok(Signal::Declining),
            other => Err(format!("unknown signal {other:?} (expected Black or Red)")),
        }
    }
}
