//! MIDI functionality for delaysyncrs
//!
//! This module provides:
//! - real-time status byte parsing ([`RealtimeMessage`])
//! - the MIDI-clock tempo estimator ([`TempoEstimator`])
//! - an internal clock generator for driving the estimator without hardware
//! - port enumeration and midir-backed input/output
//!
pub mod clock;
pub mod devices;
pub mod generator;
pub mod input;
pub mod output;

pub use clock::{ClockEvent, ClockEventKind, TempoEstimator};
pub use devices::{find_port, list_input_ports, list_output_ports};
pub use generator::ClockGenerator;
pub use input::{ClockListener, ListenerState};
pub use output::{MidirOutput, OutputError, RecordingOutput, SysexOutput};

pub const TIMING_CLOCK: u8 = 0xF8;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;

/// A message as seen by the tempo logic. Only the real-time transport bytes
/// are recognised; every other status byte is passed through as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeMessage {
    Clock,
    Start,
    Continue,
    Stop,
    Other(u8),
}

impl RealtimeMessage {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        Some(match status {
            TIMING_CLOCK => RealtimeMessage::Clock,
            START => RealtimeMessage::Start,
            CONTINUE => RealtimeMessage::Continue,
            STOP => RealtimeMessage::Stop,
            other => RealtimeMessage::Other(other),
        })
    }

    pub fn status(&self) -> u8 {
        match self {
            RealtimeMessage::Clock => TIMING_CLOCK,
            RealtimeMessage::Start => START,
            RealtimeMessage::Continue => CONTINUE,
            RealtimeMessage::Stop => STOP,
            RealtimeMessage::Other(status) => *status,
        }
    }
}

/// A message stamped with its arrival time in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedMessage {
    pub message: RealtimeMessage,
    pub timestamp_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_parsing() {
        assert_eq!(RealtimeMessage::parse(&[0xF8]), Some(RealtimeMessage::Clock));
        assert_eq!(RealtimeMessage::parse(&[0xFA]), Some(RealtimeMessage::Start));
        assert_eq!(RealtimeMessage::parse(&[0xFB]), Some(RealtimeMessage::Continue));
        assert_eq!(RealtimeMessage::parse(&[0xFC]), Some(RealtimeMessage::Stop));
    }

    #[test]
    fn test_channel_messages_pass_through() {
        assert_eq!(
            RealtimeMessage::parse(&[0x90, 60, 100]),
            Some(RealtimeMessage::Other(0x90))
        );
        assert_eq!(RealtimeMessage::parse(&[]), None);
        assert_eq!(RealtimeMessage::Other(0xFE).status(), 0xFE);
    }
}
