use crate::midi::output::OutputError;
use thiserror::Error;

/// Result type for delaysyncrs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the tempo, calculator and SysEx components
#[derive(Debug, Error)]
pub enum Error {
    /// The host has no usable MIDI subsystem
    #[error("MIDI transport unsupported: {0}")]
    UnsupportedTransport(String),

    /// The requested input or output port is not present
    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("value {value} is out of range [{min}, {max}] for parameter {parameter}")]
    OutOfRange {
        parameter: String,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("invalid value {value} for {parameter}, must be one of: {allowed:?}")]
    InvalidEnumValue {
        parameter: String,
        value: i32,
        allowed: Vec<i32>,
    },

    #[error("not connected to any MIDI output device")]
    NotConnected,

    #[error("no MIDI output device provided")]
    InvalidDestination,

    /// A single framed message could not be written to the output
    #[error("SysEx transmission failed: {0}")]
    Transmission(#[source] OutputError),

    #[error("BPM must be between 20 and 300, got {0}")]
    InvalidBpm(f64),

    #[error("invalid subdivision: {0}")]
    InvalidSubdivision(String),

    #[error("malformed SysEx message: {0}")]
    MalformedSysex(String),

    /// The send queue worker has shut down
    #[error("SysEx send queue is closed")]
    QueueClosed,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
