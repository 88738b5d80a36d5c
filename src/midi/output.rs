//! MIDI output destinations for SysEx traffic

use crate::error::{Error, Result};
use log::{debug, info};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Failure reported by an output destination for a single message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("MIDI send error: {0}")]
    Send(String),
    #[error("MIDI output disconnected: {0}")]
    Disconnected(String),
}

/// A destination able to transmit one framed SysEx message at a time
pub trait SysexOutput: Send {
    fn name(&self) -> &str;

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), OutputError>;
}

impl<T: SysexOutput + ?Sized> SysexOutput for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), OutputError> {
        (**self).send(bytes)
    }
}

/// Output port opened through midir
pub struct MidirOutput {
    name: String,
    connection: MidiOutputConnection,
}

impl MidirOutput {
    /// Opens the first output port whose name contains `device_name`
    pub fn open(device_name: &str) -> Result<Self> {
        let midi_out = MidiOutput::new("delaysyncrs-out")
            .map_err(|e| Error::UnsupportedTransport(e.to_string()))?;

        let out_ports = midi_out.ports();
        let port = out_ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(device_name)
            })
            .ok_or_else(|| Error::DeviceNotFound(device_name.to_string()))?;
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| device_name.to_string());

        info!("Connecting to MIDI output port: {}", name);
        let connection = midi_out
            .connect(port, "delaysyncrs-sysex")
            .map_err(|e| Error::DeviceNotFound(format!("{}: {}", name, e)))?;
        Ok(Self { name, connection })
    }
}

impl SysexOutput for MidirOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), OutputError> {
        debug!("Sending {} bytes to {}", bytes.len(), self.name);
        self.connection
            .send(bytes)
            .map_err(|e| OutputError::Send(e.to_string()))
    }
}

/// In-memory destination that records every message it is given.
///
/// Clones share the same record, so a test can keep one handle while the
/// connection owns another.
#[derive(Debug, Clone)]
pub struct RecordingOutput {
    name: String,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_after: Option<usize>,
}

impl RecordingOutput {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
        }
    }

    /// Accepts `count` messages, then fails every further send
    pub fn failing_after(name: &str, count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new(name)
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SysexOutput for RecordingOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), OutputError> {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(OutputError::Send(format!("{} rejected message", self.name)));
        }
        sent.push(bytes.to_vec());
        Ok(())
    }
}
