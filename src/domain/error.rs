//! Domain error types.

/// Top-level error type for trendwatch.
#[derive(Debug, thiserror::Error)]
pub enum TrendwatchError {
    #[error("source unavailable for {ticker}: {reason}")]
    SourceUnavailable { ticker: String, reason: String },

    #[error("empty series for {ticker}: provider returned no points")]
    EmptySeries { ticker: String },

    #[error("insufficient data: have {have} points, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("state store error for {path}: {reason}")]
    StateIo { path: String, reason: String },

    #[error("notification delivery failed: {reason}")]
    Delivery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendwatchError {
    /// Whether the monitoring loop may log this error and keep running.
    ///
    /// State-store failures are fatal for the cycle: notifying without a
    /// durable state risks duplicate notifications after a restart.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrendwatchError::SourceUnavailable { .. }
                | TrendwatchError::EmptySeries { .. }
                | TrendwatchError::InsufficientData { .. }
                | TrendwatchError::Delivery { .. }
        )
    }
}

impl From<&TrendwatchError> for std::process::ExitCode {
    fn from(err: &TrendwatchError) -> Self {
        let code: u8 = match err {
            TrendwatchError::Io(_) => 1,
            TrendwatchError::ConfigParse { .. }
            | TrendwatchError::ConfigMissing { .. }
            | TrendwatchError::ConfigInvalid { .. } => 2,
            TrendwatchError::StateIo { .. } => 3,
            TrendwatchError::Delivery { .. } => 4,
            TrendwatchError::SourceUnavailable { .. }
            | TrendwatchError::EmptySeries { .. }
            | TrendwatchError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_and_delivery_errors_are_recoverable() {
        assert!(
            TrendwatchError::SourceUnavailable {
                ticker: "$NYSI".into(),
                reason: "timeout".into()
            }
            .is_recoverable()
        );
        assert!(
            TrendwatchError::EmptySeries {
                ticker: "$NYSI".into()
            }
            .is_recoverable()
        );
        assert!(TrendwatchError::InsufficientData { have: 1, need: 2 }.is_recoverable());
        assert!(
            TrendwatchError::Delivery {
                reason: "smtp auth".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn state_io_is_fatal_for_the_cycle() {
        let err = TrendwatchError::StateIo {
            path: "state/NYSI_state.json".into(),
            reason: "permission denied".into(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = TrendwatchError::ConfigMissing {
            section: "email".into(),
            key: "sender".into(),
        };
        assert!(!err.is_recoverable());
    }
}
