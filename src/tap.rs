//! Tap tempo

use crate::config::TapSettings;
use log::debug;
use std::collections::VecDeque;

/// Derives BPM from the spacing of manual taps.
///
/// Keeps the most recent `max_taps` timestamps (ms). A tap arriving more than
/// `reset_after_ms` after the previous one starts a new sequence.
#[derive(Debug, Clone)]
pub struct TapTempo {
    settings: TapSettings,
    taps: VecDeque<f64>,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(TapSettings::default())
    }
}

impl TapTempo {
    pub fn new(settings: TapSettings) -> Self {
        Self {
            taps: VecDeque::with_capacity(settings.max_taps + 1),
            settings,
        }
    }

    /// Records a tap at `now_ms`; returns the BPM once two or more taps are held
    pub fn tap(&mut self, now_ms: f64) -> Option<u32> {
        if let Some(&last) = self.taps.back() {
            if now_ms - last > self.settings.reset_after_ms {
                debug!("Tap gap of {:.0} ms, starting over", now_ms - last);
                self.taps.clear();
            }
        }

        self.taps.push_back(now_ms);
        while self.taps.len() > self.settings.max_taps {
            self.taps.pop_front();
        }
        self.bpm()
    }

    pub fn bpm(&self) -> Option<u32> {
        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let intervals = self.taps.len() - 1;
        if intervals == 0 {
            return None;
        }
        // Mean of consecutive intervals telescopes to the overall span
        let avg_interval = (last - first) / intervals as f64;
        if avg_interval <= 0.0 {
            return None;
        }
        Some((60_000.0 / avg_interval).round() as u32)
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
