mod common;

use common::{date, series, MemoryStatePort, MockSeriesPort, RecordingNotifier};
use tempfile::TempDir;
use trendwatch::adapters::file_state_adapter::FileStateAdapter;
use trendwatch::domain::classifier::DeltaRule;
use trendwatch::domain::detector::Detection;
use trendwatch::domain::error::TrendwatchError;
use trendwatch::domain::scheduler::Monitor;
use trendwatch::domain::signal::Signal;

fn monitor<'a>(
    source: &'a MockSeriesPort,
    store: &'a MemoryStatePort,
    notifier: &'a RecordingNotifier,
) -> Monitor<'a> {
    Monitor::new(
        source,
        store,
        notifier,
        DeltaRule::default(),
        vec!["$NYSI".to_string()],
        14,
    )
}

#[test]
fn cold_start_records_state_without_notifying() {
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -120.0), (date(2024, 1, 10), -130.0)],
    ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    let report = monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();

    assert_eq!(report.detection, Detection::FirstObservation);
    assert_eq!(report.signal, Signal::Declining);
    assert_eq!(notifier.count(), 0);
    let state = store.get("$NYSI").unwrap();
    assert_eq!(state.last_signal, Signal::Declining);
    assert_eq!(state.last_transition_date, None);
}

#[test]
fn unchanged_signal_over_many_days_never_notifies() {
    let source = MockSeriesPort::new();
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    for day in 1..=10 {
        // The value keeps falling, so the signal stays Declining.
        source.set_series(series(
            "$NYSI",
            &[
                (date(2024, 1, day), -100.0 - day as f64),
                (date(2024, 1, day + 1), -110.0 - day as f64),
            ],
        ));
        monitor.check_ticker("$NYSI", date(2024, 1, day + 1)).unwrap();
    }

    assert_eq!(notifier.count(), 0);
    assert_eq!(
        store.get("$NYSI").unwrap().last_checked_date,
        date(2024, 1, 11)
    );
}

#[test]
fn flip_notifies_exactly_once() {
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
    ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();
    assert_eq!(notifier.count(), 0);

    // Next day the series turns up.
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -95.0)],
    ));
    let report = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();

    assert!(matches!(report.detection, Detection::Transition(_)));
    let events = notifier.events();
    assert_eq!(events.len(), 1);
    let (event, value) = &events[0];
    assert_eq!(event.from, Signal::Declining);
    assert_eq!(event.to, Signal::Rising);
    assert_eq!(event.date, date(2024, 1, 11));
    assert_eq!(*value, -95.0);

    // Same feed, same day: no second notification.
    monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();
    assert_eq!(notifier.count(), 1);
}

#[test]
fn second_flip_same_day_is_suppressed() {
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
    ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -95.0)],
    ));
    monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();
    assert_eq!(notifier.count(), 1);

    // An intraday revision flips the signal back the same day.
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -90.0), (date(2024, 1, 11), -95.0)],
    ));
    let report = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();

    assert!(matches!(report.detection, Detection::SuppressedSameDay(_)));
    assert_eq!(notifier.count(), 1);
    // The flip is still recorded for tomorrow's comparison.
    assert_eq!(store.get("$NYSI").unwrap().last_signal, Signal::Declining);
}

#[test]
fn delivery_failure_keeps_state_and_never_renotifies() {
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
    ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();

    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -95.0)],
    ));
    notifier.fail_deliveries(true);
    let err = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap_err();
    assert!(matches!(err, TrendwatchError::Delivery { .. }));

    // The state was saved before the failed send.
    assert_eq!(store.get("$NYSI").unwrap().last_signal, Signal::Rising);

    // SMTP comes back; the saved state prevents a duplicate.
    notifier.fail_deliveries(false);
    let report = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();
    assert_eq!(report.detection, Detection::NoChange);
    assert_eq!(notifier.count(), 0);
}

#[test]
fn failed_save_aborts_before_any_notification() {
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
    ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();

    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -95.0)],
    ));
    store.fail_saves(true);
    let err = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap_err();

    assert!(matches!(err, TrendwatchError::StateIo { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(notifier.count(), 0);
}

#[test]
fn source_outage_surfaces_as_recoverable_error() {
    let source = MockSeriesPort::new();
    source.set_error("$NYSI", "connect timeout");
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    let err = monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap_err();
    assert!(matches!(err, TrendwatchError::SourceUnavailable { .. }));
    assert!(err.is_recoverable());
    assert!(store.get("$NYSI").is_none());
}

#[test]
fn tickers_keep_independent_state() {
    let source = MockSeriesPort::new()
        .with_series(series(
            "$NYSI",
            &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
        ))
        .with_series(series(
            "$NYMO",
            &[(date(2024, 1, 9), 10.0), (date(2024, 1, 10), 20.0)],
        ));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = Monitor::new(
        &source,
        &store,
        &notifier,
        DeltaRule::default(),
        vec!["$NYSI".to_string(), "$NYMO".to_string()],
        14,
    );

    let reports = monitor.check_all(date(2024, 1, 10)).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(store.get("$NYSI").unwrap().last_signal, Signal::Declining);
    assert_eq!(store.get("$NYMO").unwrap().last_signal, Signal::Rising);

    // Only $NYSI flips; $NYMO stays quiet.
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -90.0)],
    ));
    source.set_series(series(
        "$NYMO",
        &[(date(2024, 1, 10), 20.0), (date(2024, 1, 11), 30.0)],
    ));
    monitor.check_all(date(2024, 1, 11)).unwrap();

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0.ticker, "$NYSI");
}

#[test]
fn cold_start_backfills_history_and_checks_append_to_it() {
    // 13 observations classify into 12 dated entries; only the newest 10
    // survive in the stored history.
    let points: Vec<(chrono::NaiveDate, f64)> = (1..=13)
        .map(|d| (date(2024, 1, d), -100.0 - d as f64))
        .collect();
    let source = MockSeriesPort::new().with_series(series("$NYSI", &points));
    let store = MemoryStatePort::new();
    let notifier = RecordingNotifier::new();
    let monitor = monitor(&source, &store, &notifier);

    monitor.check_ticker("$NYSI", date(2024, 1, 13)).unwrap();

    let state = store.get("$NYSI").unwrap();
    assert_eq!(state.history.len(), 10);
    assert_eq!(state.history.first().unwrap().date, date(2024, 1, 4));
    let last = state.history.last().unwrap();
    assert_eq!(last.date, date(2024, 1, 13));
    assert_eq!(last.value, -113.0);
    assert_eq!(last.signal, Signal::Declining);

    // The next day's check appends its data date and drops the oldest.
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 13), -113.0), (date(2024, 1, 14), -105.0)],
    ));
    monitor.check_ticker("$NYSI", date(2024, 1, 14)).unwrap();

    let state = store.get("$NYSI").unwrap();
    assert_eq!(state.history.len(), 10);
    assert_eq!(state.history.first().unwrap().date, date(2024, 1, 5));
    let last = state.history.last().unwrap();
    assert_eq!(last.date, date(2024, 1, 14));
    assert_eq!(last.signal, Signal::Rising);

    // Re-checking the same data date replaces, never duplicates.
    monitor.check_ticker("$NYSI", date(2024, 1, 14)).unwrap();
    assert_eq!(store.get("$NYSI").unwrap().history.len(), 10);
}

#[test]
fn restart_resumes_from_persisted_state() {
    // A restart between two checks must not replay or miss the transition.
    let dir = TempDir::new().unwrap();
    let source = MockSeriesPort::new().with_series(series(
        "$NYSI",
        &[(date(2024, 1, 9), -100.0), (date(2024, 1, 10), -110.0)],
    ));
    let notifier = RecordingNotifier::new();

    {
        let store = FileStateAdapter::new(dir.path().to_path_buf());
        let monitor = Monitor::new(
            &source,
            &store,
            &notifier,
            DeltaRule::default(),
            vec!["$NYSI".to_string()],
            14,
        );
        monitor.check_ticker("$NYSI", date(2024, 1, 10)).unwrap();
    }
    assert_eq!(notifier.count(), 0);

    // Fresh process over the same state directory sees the flip.
    source.set_series(series(
        "$NYSI",
        &[(date(2024, 1, 10), -110.0), (date(2024, 1, 11), -95.0)],
    ));
    let store = FileStateAdapter::new(dir.path().to_path_buf());
    let monitor = Monitor::new(
        &source,
        &store,
        &notifier,
        DeltaRule::default(),
        vec!["$NYSI".to_string()],
        14,
    );
    let report = monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();

    assert!(matches!(report.detection, Detection::Transition(_)));
    assert_eq!(notifier.count(), 1);

    // And a third run on the same day changes nothing.
    monitor.check_ticker("$NYSI", date(2024, 1, 11)).unwrap();
    assert_eq!(notifier.count(), 1);
}
