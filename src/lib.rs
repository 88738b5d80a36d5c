pub mod cli;
pub mod config;
pub mod delay;
pub mod error;
pub mod events;
pub mod logging;
pub mod midi;
pub mod sysex;
pub mod tap;
pub mod ui;

// Re-export commonly used types
pub use cli::Args;
pub use config::Settings;
pub use delay::{DelayCalculator, DelayTime};
pub use error::{Error, Result};
pub use midi::{ClockEvent, ClockListener, TempoEstimator};
pub use sysex::{SendQueue, SysexConnection};
pub use tap::TapTempo;

/// Input port names; an empty list if MIDI input is unavailable
pub fn handle_device_list() -> Vec<String> {
    match midi::list_input_ports() {
        Ok(ports) => ports,
        Err(e) => {
            log::warn!("Could not enumerate MIDI inputs: {}", e);
            Vec::new()
        }
    }
}

/// Output port names; an empty list if MIDI output is unavailable
pub fn handle_output_list() -> Vec<String> {
    match midi::list_output_ports() {
        Ok(ports) => ports,
        Err(e) => {
            log::warn!("Could not enumerate MIDI outputs: {}", e);
            Vec::new()
        }
    }
}
