//! Notification sink port trait.

use crate::domain::detector::TransitionEvent;
use crate::domain::error::TrendwatchError;

/// Renders and delivers a transition notification to configured recipients.
pub trait NotifyPort {
    fn notify(&self, event: &TransitionEvent, value: f64) -> Result<(), TrendwatchError>;
}
