//! Internal MIDI clock source

use super::{RealtimeMessage, TimedMessage};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{info, trace};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Generates Start followed by Timing Clock pulses at a fixed BPM, stamped
/// with milliseconds since the generator was started.
pub struct ClockGenerator {
    bpm: f64,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ClockGenerator {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Interval between two pulses at 24 PPQ
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.bpm * 24.0))
    }

    /// Starts the clock thread; returns `None` if it is already running
    pub fn start(&mut self) -> Option<Receiver<TimedMessage>> {
        if self.thread_handle.is_some() {
            return None;
        }

        let (tx, rx) = unbounded();
        let running = Arc::clone(&self.running);
        let tick_interval = self.tick_interval();
        self.running.store(true, Ordering::SeqCst);
        info!("Internal clock started at {} BPM", self.bpm);

        self.thread_handle = Some(thread::spawn(move || {
            run_clock(tx, running, tick_interval);
        }));
        Some(rx)
    }

    /// Stops the clock thread; the receiver sees a final Stop message
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            info!("Internal clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Drop for ClockGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_clock(tx: Sender<TimedMessage>, running: Arc<AtomicBool>, tick_interval: Duration) {
    let epoch = Instant::now();
    let stamp = |message| TimedMessage {
        message,
        timestamp_ms: epoch.elapsed().as_secs_f64() * 1000.0,
    };

    if tx.send(stamp(RealtimeMessage::Start)).is_err() {
        return;
    }

    // Schedule against absolute deadlines so sleep overshoot does not accumulate
    let mut next_tick = Instant::now();
    while running.load(Ordering::SeqCst) {
        if tx.send(stamp(RealtimeMessage::Clock)).is_err() {
            trace!("Clock receiver dropped");
            return;
        }
        next_tick += tick_interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        }
    }

    let _ = tx.send(stamp(RealtimeMessage::Stop));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval_at_120bpm() {
        let generator = ClockGenerator::new(120.0);
        let micros = generator.tick_interval().as_micros();
        assert!((20_832..=20_834).contains(&micros), "got {}", micros);
    }

    #[test]
    fn test_generator_emits_start_clock_stop() {
        let mut generator = ClockGenerator::new(240.0);
        let rx = generator.start().unwrap();
        assert!(generator.start().is_none());
        thread::sleep(Duration::from_millis(50));
        generator.stop();
        assert!(!generator.is_running());

        let messages: Vec<RealtimeMessage> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(messages.first(), Some(&RealtimeMessage::Start));
        assert_eq!(messages.last(), Some(&RealtimeMessage::Stop));
        assert!(messages.iter().any(|m| *m == RealtimeMessage::Clock));
    }
}
