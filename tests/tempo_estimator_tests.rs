use delaysyncrs::midi::{ClockEvent, ClockEventKind, RealtimeMessage, TempoEstimator};
use std::sync::{Arc, Mutex};

fn interval_for(bpm: f64) -> f64 {
    60_000.0 / (24.0 * bpm)
}

/// Two pulses one interval apart; returns what the second pulse reported
fn single_interval(interval_ms: f64) -> Option<u32> {
    let mut estimator = TempoEstimator::new();
    assert_eq!(estimator.handle_pulse(1000.0), None);
    estimator.handle_pulse(1000.0 + interval_ms)
}

fn feed_pulses(estimator: &mut TempoEstimator, start_ms: f64, interval_ms: f64, count: usize) -> f64 {
    let mut t = start_ms;
    for _ in 0..count {
        estimator.handle_message(RealtimeMessage::Clock, t);
        t += interval_ms;
    }
    t
}

#[test]
fn test_steady_clock_reports_once() {
    let mut estimator = TempoEstimator::new();
    let reports = Arc::new(Mutex::new(Vec::new()));
    let r = reports.clone();
    estimator.on_bpm_change(move |bpm| r.lock().unwrap().push(bpm));

    feed_pulses(&mut estimator, 0.0, interval_for(120.0), 96);

    assert_eq!(*reports.lock().unwrap(), vec![120]);
    assert_eq!(estimator.last_reported_bpm(), Some(120));
    assert_eq!(estimator.pulse_count(), 96);
}

#[test]
fn test_tempo_change_is_followed() {
    let mut estimator = TempoEstimator::new();
    let reports = Arc::new(Mutex::new(Vec::new()));
    let r = reports.clone();
    estimator.on_bpm_change(move |bpm| r.lock().unwrap().push(bpm));

    let t = feed_pulses(&mut estimator, 0.0, interval_for(120.0), 24);
    feed_pulses(&mut estimator, t, interval_for(90.0), 24);

    let reports = reports.lock().unwrap();
    assert_eq!(reports.first(), Some(&120));
    assert_eq!(reports.last(), Some(&90));
    // Every report differs from the previous one by at least 1 BPM
    assert!(reports.windows(2).all(|w| w[0].abs_diff(w[1]) >= 1));
    assert!(reports.iter().all(|bpm| (20..=300).contains(bpm)));
}

#[test]
fn test_upper_bound_is_inclusive() {
    assert_eq!(single_interval(interval_for(300.0)), Some(300));
    assert_eq!(single_interval(interval_for(301.0)), None);
}

#[test]
fn test_lower_bound_is_inclusive() {
    assert_eq!(single_interval(interval_for(20.0)), Some(20));
    assert_eq!(single_interval(interval_for(19.0)), None);
}

#[test]
fn test_zero_interval_is_not_reported() {
    assert_eq!(single_interval(0.0), None);
}

#[test]
fn test_window_holds_last_five_intervals() {
    let mut estimator = TempoEstimator::new();
    feed_pulses(&mut estimator, 0.0, 20.0, 12);
    assert_eq!(estimator.intervals().count(), 5);
    assert!(estimator.intervals().all(|i| (i - 20.0).abs() < 1e-9));
}

#[test]
fn test_first_pulse_only_records_time() {
    let mut estimator = TempoEstimator::new();
    assert_eq!(estimator.handle_pulse(42.0), None);
    assert_eq!(estimator.last_pulse_time(), Some(42.0));
    assert_eq!(estimator.intervals().count(), 0);
    assert_eq!(estimator.current_bpm(), None);
}

#[test]
fn test_start_and_stop_reset_timing() {
    for transport in [RealtimeMessage::Start, RealtimeMessage::Stop] {
        let mut estimator = TempoEstimator::new();
        feed_pulses(&mut estimator, 0.0, interval_for(120.0), 10);
        estimator.handle_message(transport, 500.0);

        assert_eq!(estimator.last_pulse_time(), None);
        assert_eq!(estimator.intervals().count(), 0);
        assert_eq!(estimator.last_reported_bpm(), None);
        assert_eq!(estimator.pulse_count(), 0);
    }
}

#[test]
fn test_tempo_is_reported_again_after_reset() {
    let mut estimator = TempoEstimator::new();
    feed_pulses(&mut estimator, 0.0, interval_for(120.0), 10);
    estimator.handle_message(RealtimeMessage::Stop, 1000.0);
    estimator.handle_message(RealtimeMessage::Start, 2000.0);

    // The first pulse after the reset only records its time
    assert_eq!(estimator.handle_pulse(3000.0), None);
    assert_eq!(estimator.handle_pulse(3000.0 + interval_for(120.0)), Some(120));
}

#[test]
fn test_reset_is_idempotent() {
    let mut estimator = TempoEstimator::new();
    feed_pulses(&mut estimator, 0.0, interval_for(100.0), 10);
    estimator.reset();
    estimator.reset();
    assert_eq!(estimator.last_pulse_time(), None);
    assert_eq!(estimator.intervals().count(), 0);
    assert_eq!(estimator.last_reported_bpm(), None);
}

#[test]
fn test_continue_keeps_timing() {
    let mut estimator = TempoEstimator::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    estimator
        .events()
        .subscribe(ClockEventKind::Continue, move |e| s.lock().unwrap().push(e.clone()));

    let t = feed_pulses(&mut estimator, 0.0, interval_for(120.0), 10);
    estimator.handle_message(RealtimeMessage::Continue, t);

    assert_eq!(*seen.lock().unwrap(), vec![ClockEvent::Continue]);
    assert_eq!(estimator.last_reported_bpm(), Some(120));
    assert_eq!(estimator.intervals().count(), 5);
}

#[test]
fn test_transport_events_are_published() {
    let mut estimator = TempoEstimator::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [ClockEventKind::Start, ClockEventKind::Stop] {
        let s = seen.clone();
        estimator
            .events()
            .subscribe(kind, move |e| s.lock().unwrap().push(e.clone()));
    }

    estimator.handle_message(RealtimeMessage::Start, 0.0);
    estimator.handle_message(RealtimeMessage::Stop, 10.0);

    assert_eq!(*seen.lock().unwrap(), vec![ClockEvent::Start, ClockEvent::Stop]);
}

#[test]
fn test_jittered_intervals_report_rounded_mean() {
    let mut estimator = TempoEstimator::new();
    let intervals = [20.0, 22.5, 19.1, 21.7, 20.9];

    let mut t = 0.0;
    estimator.handle_pulse(t);
    for interval in intervals {
        t += interval;
        estimator.handle_pulse(t);
    }

    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let expected = (60_000.0 / (mean * 24.0)).round() as u32;
    assert_eq!(expected, 120);
    assert_eq!(estimator.last_reported_bpm(), Some(expected));
}

#[test]
fn test_dropout_interval_skews_average_until_evicted() {
    let mut estimator = TempoEstimator::new();
    let reports = Arc::new(Mutex::new(Vec::new()));
    let r = reports.clone();
    estimator.on_bpm_change(move |bpm| r.lock().unwrap().push(bpm));

    let mut t = feed_pulses(&mut estimator, 0.0, interval_for(120.0), 12);
    assert_eq!(*reports.lock().unwrap(), vec![120]);

    // A 5 s gap, then pulses at 100 BPM
    t += 5000.0;
    estimator.handle_pulse(t);
    for _ in 0..4 {
        t += interval_for(100.0);
        estimator.handle_pulse(t);
        assert!(estimator.current_bpm().unwrap() < 20.0);
    }
    assert_eq!(*reports.lock().unwrap(), vec![120]);
    assert_eq!(estimator.last_reported_bpm(), Some(120));

    // Fifth pulse evicts the gap
    t += interval_for(100.0);
    assert_eq!(estimator.handle_pulse(t), Some(100));
    assert_eq!(*reports.lock().unwrap(), vec![120, 100]);
}
