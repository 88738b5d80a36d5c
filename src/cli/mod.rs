use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML); defaults to ./delaysyncrs.toml if present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List available MIDI input and output devices
    Devices,

    /// Print delay times for every subdivision at a tempo
    Delays {
        #[arg(long)]
        bpm: f64,
    },

    /// Derive a tempo by pressing Enter in time
    Tap,

    /// Follow the MIDI clock on an input device
    Listen {
        /// Input device (substring match); prompts if omitted
        #[arg(long)]
        input: Option<String>,
    },

    /// Run the tempo estimator against the internal clock
    Simulate {
        #[arg(long)]
        bpm: f64,

        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },

    /// Print the SysEx bytes for a parameter update without sending
    Encode {
        #[arg(long)]
        param: String,

        #[arg(long, allow_negative_numbers = true)]
        value: i32,
    },

    /// Send a single parameter update
    Send {
        /// Output device (substring match)
        #[arg(long)]
        output: String,

        #[arg(long)]
        param: String,

        #[arg(long, allow_negative_numbers = true)]
        value: i32,
    },

    /// Set both delay lines to a subdivision of a tempo
    Sync {
        #[arg(long)]
        output: String,

        #[arg(long)]
        bpm: f64,

        #[arg(long, default_value = "Quarter Note (1/4)")]
        subdivision: String,
    },
}

pub fn handle_device_list() -> Vec<String> {
    // Re-export from the crate root
    crate::handle_device_list()
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Renders bytes as space-separated upper-case hex
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
