// ui.rs

use crate::config::MAX_BPM;
use crate::delay::DelayTime;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

fn create_tempo_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(MAX_BPM)));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan}] {pos} BPM")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("⣀⣤⣦⣶⣷⣿ "),
    );
    pb.set_prefix("Tempo");
    pb
}

fn create_delay_line(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Delays");
    pb
}

fn create_transport_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Transport");
    pb
}

/// Live terminal view of the estimated tempo
pub struct BpmDisplay {
    #[allow(dead_code)]
    multi_progress: MultiProgress,
    tempo_pb: ProgressBar,
    delay_pb: ProgressBar,
    transport_pb: ProgressBar,
}

impl Default for BpmDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl BpmDisplay {
    pub fn new() -> Self {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());
        let tempo_pb = create_tempo_bar(&multi_progress);
        let delay_pb = create_delay_line(&multi_progress);
        let transport_pb = create_transport_spinner(&multi_progress);
        transport_pb.enable_steady_tick(Duration::from_millis(120));
        transport_pb.set_message("waiting for clock");

        BpmDisplay {
            multi_progress,
            tempo_pb,
            delay_pb,
            transport_pb,
        }
    }

    pub fn set_bpm(&self, bpm: u32, delays: &[DelayTime]) {
        self.tempo_pb.set_position(u64::from(bpm));
        self.delay_pb.set_message(summarize_delays(delays));
    }

    pub fn set_transport(&self, status: &str) {
        self.transport_pb.set_message(status.to_string());
    }

    pub fn finish(&self) {
        self.transport_pb.finish_with_message("stopped");
        self.tempo_pb.finish();
        self.delay_pb.finish();
    }
}

/// One-line summary of the most used subdivisions
pub fn summarize_delays(delays: &[DelayTime]) -> String {
    const SHOWN: [&str; 4] = [
        "Quarter Note (1/4)",
        "Eighth Note (1/8)",
        "Dotted Eighth Note (3/16)",
        "Triplet Quarter Note (2/3)",
    ];
    delays
        .iter()
        .filter(|d| SHOWN.contains(&d.name.as_str()))
        .map(|d| format!("{} {:.2} ms", short_name(&d.name), d.delay_ms))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn short_name(name: &str) -> &str {
    name.split(" Note").next().unwrap_or(name)
}

/// Table printed by the `delays` command
pub fn format_delay_table(bpm: f64, delays: &[DelayTime]) -> String {
    let width = delays.iter().map(|d| d.name.len()).max().unwrap_or(0);
    let mut out = format!("Delay times at {} BPM:\n", bpm);
    for delay in delays {
        let marker = if delay.custom { " (custom)" } else { "" };
        out.push_str(&format!(
            "  {:<width$}  {:>9.2} ms{}\n",
            delay.name,
            delay.delay_ms,
            marker,
            width = width
        ));
    }
    out
}
