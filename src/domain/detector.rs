//! Transition detection against the stored state.
//!
//! Sole authority for "should we notify now". Pure: the caller loads the
//! prior state, and must persist the returned state before invoking the
//! notifier so that a crash between the two never replays a notification.

use crate::domain::signal::Signal;
use crate::domain::state::MonitorState;
use chrono::NaiveDate;

/// A signal change, constructed only to pass through the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub ticker: String,
    pub from: Signal,
    pub to: Signal,
    pub date: NaiveDate,
}

/// Outcome of one detection step.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Cold start: no prior state existed, nothing to compare against.
    FirstObservation,
    /// Signal unchanged since the last check.
    NoChange,
    /// Signal flipped; notify once.
    Transition(TransitionEvent),
    /// Signal flipped again on a day that already produced a notification.
    /// Recorded in state and logged, never notified twice per day.
    SuppressedSameDay(TransitionEvent),
}

/// Compare a freshly classified signal against the prior state.
///
/// Returns the state to persist and what happened. `last_checked_date` is
/// always advanced; `last_signal` and `last_transition_date` change only
/// when the signal flipped.
pub fn detect(
    prior: Option<&MonitorState>,
    ticker: &str,
    signal: Signal,
    value: f64,
    today: NaiveDate,
) -> (MonitorState, Detection) {
    let Some(prior) = prior else {
        let state = MonitorState {
            ticker: ticker.to_string(),
            last_signal: signal,
            last_value: value,
            last_checked_date: today,
            last_transition_date: None,
            history: Vec::new(),
        };
        return (state, Detection::FirstObservation);
    };

    if prior.last_signal == signal {
        let state = MonitorState {
            last_value: value,
            last_checked_date: today.max(prior.last_checked_date),
            ..prior.clone()
        };
        return (state, Detection::NoChange);
    }

    let event = TransitionEvent {
        ticker: ticker.to_string(),
        from: prior.last_signal,
        to: signal,
        date: today,
    };
    let state = MonitorState {
        ticker: ticker.to_string(),
        last_signal: signal,
        last_value: value,
        last_checked_date: today.max(prior.last_checked_date),
        last_transition_date: Some(today),
        history: prior.history.clone(),
    };

    if prior.last_transition_date == Some(today) {
        (state, Detection::SuppressedSameDay(event))
    } else {
        (state, Detection::Transition(event))
    }
}
