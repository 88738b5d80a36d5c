//! MIDI clock to BPM estimation

use super::RealtimeMessage;
use crate::config::TempoSettings;
use crate::events::{Event, EventBus, Subscription};
use log::{debug, info};
use std::collections::VecDeque;

/// Notifications published by the [`TempoEstimator`]
#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    BpmChanged(u32),
    Start,
    Continue,
    Stop,
    /// Any status byte the tempo logic does not act on
    Unrecognized(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockEventKind {
    BpmChanged,
    Start,
    Continue,
    Stop,
    Unrecognized,
}

impl Event for ClockEvent {
    type Kind = ClockEventKind;

    fn kind(&self) -> ClockEventKind {
        match self {
            ClockEvent::BpmChanged(_) => ClockEventKind::BpmChanged,
            ClockEvent::Start => ClockEventKind::Start,
            ClockEvent::Continue => ClockEventKind::Continue,
            ClockEvent::Stop => ClockEventKind::Stop,
            ClockEvent::Unrecognized(_) => ClockEventKind::Unrecognized,
        }
    }
}

/// Smooths Timing Clock pulses into a rate-limited BPM signal.
///
/// Keeps a moving average over the last `smoothing_window` inter-pulse
/// intervals and only reports a tempo when it moved by at least
/// `change_threshold` and lies within `[min_bpm, max_bpm]`. An out-of-range
/// interval is never reported but still stays in the average until it is
/// evicted.
///
/// Timestamps are milliseconds from any monotonic source.
#[derive(Debug)]
pub struct TempoEstimator {
    settings: TempoSettings,
    intervals: VecDeque<f64>,
    last_pulse_time: Option<f64>,
    last_reported_bpm: u32,
    pulse_count: u64,
    events: EventBus<ClockEvent>,
}

impl Default for TempoEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TempoEstimator {
    /// Creates an estimator with standard MIDI timing (24 PPQ, 5-interval window)
    pub fn new() -> Self {
        Self::with_settings(TempoSettings::default())
    }

    pub fn with_settings(settings: TempoSettings) -> Self {
        Self {
            intervals: VecDeque::with_capacity(settings.smoothing_window + 1),
            settings,
            last_pulse_time: None,
            last_reported_bpm: 0,
            pulse_count: 0,
            events: EventBus::new(),
        }
    }

    pub fn settings(&self) -> &TempoSettings {
        &self.settings
    }

    pub fn events(&mut self) -> &mut EventBus<ClockEvent> {
        &mut self.events
    }

    /// Registers `callback` for every reported tempo change
    pub fn on_bpm_change<F>(&mut self, mut callback: F) -> Subscription<ClockEventKind>
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.events.subscribe(ClockEventKind::BpmChanged, move |event| {
            if let ClockEvent::BpmChanged(bpm) = event {
                callback(*bpm);
            }
        })
    }

    /// Routes one incoming message. Start and Stop reset timing, Continue is
    /// only forwarded.
    pub fn handle_message(&mut self, msg: RealtimeMessage, now_ms: f64) {
        match msg {
            RealtimeMessage::Clock => {
                self.handle_pulse(now_ms);
            }
            RealtimeMessage::Start => {
                info!("Clock started playback");
                self.reset();
                self.events.emit(&ClockEvent::Start);
            }
            RealtimeMessage::Stop => {
                info!("Clock stopped playback");
                self.reset();
                self.events.emit(&ClockEvent::Stop);
            }
            RealtimeMessage::Continue => {
                info!("Clock resumed playback");
                self.events.emit(&ClockEvent::Continue);
            }
            RealtimeMessage::Other(status) => {
                self.events.emit(&ClockEvent::Unrecognized(status));
            }
        }
    }

    /// Handles one Timing Clock pulse and returns the BPM if a change was reported
    pub fn handle_pulse(&mut self, now_ms: f64) -> Option<u32> {
        self.pulse_count += 1;

        let mut reported = None;
        if let Some(last_time) = self.last_pulse_time {
            let interval = now_ms - last_time;
            self.intervals.push_back(interval);
            self.maintain_interval_window();

            let avg_interval = self.average_interval();
            let bpm = self.raw_bpm(avg_interval);
            if self.should_report(bpm) {
                let bpm = bpm as u32;
                debug!(
                    "Tempo change {} -> {} BPM (avg interval {:.3} ms)",
                    self.last_reported_bpm, bpm, avg_interval
                );
                self.last_reported_bpm = bpm;
                self.events.emit(&ClockEvent::BpmChanged(bpm));
                reported = Some(bpm);
            }
        }

        self.last_pulse_time = Some(now_ms);
        reported
    }

    /// Clears all timing state so the next pulse is treated as the first one
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last_pulse_time = None;
        self.last_reported_bpm = 0;
        self.pulse_count = 0;
    }

    /// Last tempo emitted to subscribers, `None` before the first report
    pub fn last_reported_bpm(&self) -> Option<u32> {
        (self.last_reported_bpm != 0).then_some(self.last_reported_bpm)
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count
    }

    pub fn last_pulse_time(&self) -> Option<f64> {
        self.last_pulse_time
    }

    pub fn intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.intervals.iter().copied()
    }

    /// Rounded BPM the current window implies, whether or not it was reported
    pub fn current_bpm(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }
        let bpm = self.raw_bpm(self.average_interval());
        bpm.is_finite().then_some(bpm)
    }

    fn average_interval(&self) -> f64 {
        self.intervals.iter().sum::<f64>() / self.intervals.len() as f64
    }

    fn raw_bpm(&self, avg_interval: f64) -> f64 {
        (60_000.0 / (avg_interval * self.settings.pulses_per_quarter as f64)).round()
    }

    fn should_report(&self, bpm: f64) -> bool {
        if !bpm.is_finite() {
            return false;
        }
        let changed = (bpm - self.last_reported_bpm as f64).abs() >= self.settings.change_threshold;
        let in_range =
            bpm >= self.settings.min_bpm as f64 && bpm <= self.settings.max_bpm as f64;
        changed && in_range
    }

    /// Maintains the interval window size, oldest first out
    fn maintain_interval_window(&mut self) {
        while self.intervals.len() > self.settings.smoothing_window {
            self.intervals.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Interval in ms between pulses at `bpm`
    fn pulse_interval(bpm: f64) -> f64 {
        60_000.0 / (bpm * 24.0)
    }

    #[test]
    fn test_first_pulse_only_records_time() {
        let mut estimator = TempoEstimator::new();
        assert_eq!(estimator.handle_pulse(1000.0), None);
        assert_eq!(estimator.pulse_count(), 1);
        assert_eq!(estimator.last_pulse_time(), Some(1000.0));
        assert_eq!(estimator.intervals().count(), 0);
    }

    #[test]
    fn test_window_never_exceeds_five() {
        let mut estimator = TempoEstimator::new();
        let mut now = 0.0;
        for i in 0..20 {
            now += 20.0 + i as f64;
            estimator.handle_pulse(now);
            assert!(estimator.intervals().count() <= 5);
        }
        let kept: Vec<f64> = estimator.intervals().collect();
        assert_eq!(kept, vec![35.0, 36.0, 37.0, 38.0, 39.0]);
    }

    #[test]
    fn test_sub_threshold_change_is_not_reported() {
        let mut estimator = TempoEstimator::new();
        let interval = pulse_interval(120.0);
        estimator.handle_pulse(0.0);
        assert_eq!(estimator.handle_pulse(interval), Some(120));
        // 120.4 BPM rounds to 120: no new report
        let slightly_faster = pulse_interval(120.4);
        assert_eq!(estimator.handle_pulse(interval + slightly_faster), None);
        assert_eq!(estimator.last_reported_bpm(), Some(120));
    }

    #[test]
    fn test_zero_interval_is_suppressed() {
        let mut estimator = TempoEstimator::new();
        estimator.handle_pulse(10.0);
        assert_eq!(estimator.handle_pulse(10.0), None);
        assert_eq!(estimator.last_reported_bpm(), None);
    }
}
