use super::{RealtimeMessage, TempoEstimator};
use crate::error::{Error, Result};
use log::{debug, info};
use midir::{Ignore, MidiInput, MidiInputConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
}

/// Attaches a [`TempoEstimator`] to a MIDI input port.
///
/// The estimator is moved into the midir callback while listening and handed
/// back, reset, by [`stop`](Self::stop). Subscribe to its events before
/// calling [`start`](Self::start).
pub struct ClockListener {
    connection: Option<MidiInputConnection<TempoEstimator>>,
    port_name: Option<String>,
}

impl Default for ClockListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockListener {
    pub fn new() -> Self {
        Self {
            connection: None,
            port_name: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        if self.connection.is_some() {
            ListenerState::Listening
        } else {
            ListenerState::Idle
        }
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Connects to the first input port whose name contains `device_name`.
    ///
    /// Fails with `UnsupportedTransport` if MIDI input cannot be opened and
    /// with `DeviceNotFound` if no port matches; in both cases nothing is
    /// attached and the estimator is dropped. A listener that is already
    /// running is stopped first.
    pub fn start(&mut self, device_name: &str, estimator: TempoEstimator) -> Result<()> {
        if self.connection.is_some() {
            self.stop();
        }

        let mut midi_in = MidiInput::new("delaysyncrs-in")
            .map_err(|e| Error::UnsupportedTransport(e.to_string()))?;
        midi_in.ignore(Ignore::None);

        let in_ports = midi_in.ports();
        let in_port = in_ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(device_name)
            })
            .ok_or_else(|| Error::DeviceNotFound(device_name.to_string()))?;
        let port_name = midi_in
            .port_name(in_port)
            .unwrap_or_else(|_| device_name.to_string());

        info!("Connecting to MIDI clock input: {}", port_name);
        let connection = midi_in
            .connect(
                in_port,
                "delaysyncrs-clock",
                |stamp, message, estimator| handle_raw(estimator, stamp, message),
                estimator,
            )
            .map_err(|e| Error::DeviceNotFound(format!("{}: {}", port_name, e)))?;

        self.connection = Some(connection);
        self.port_name = Some(port_name);
        Ok(())
    }

    /// Detaches from the port and returns the estimator with its timing reset
    pub fn stop(&mut self) -> Option<TempoEstimator> {
        let connection = self.connection.take()?;
        let (_midi_in, mut estimator) = connection.close();
        estimator.reset();
        if let Some(name) = self.port_name.take() {
            info!("Stopped listening to {}", name);
        }
        Some(estimator)
    }
}

impl Drop for ClockListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Input callback body: `stamp_us` is the midir timestamp in microseconds
pub fn handle_raw(estimator: &mut TempoEstimator, stamp_us: u64, data: &[u8]) {
    if let Some(message) = RealtimeMessage::parse(data) {
        if message != RealtimeMessage::Clock {
            debug!("Received MIDI message {:02X} at {} us", message.status(), stamp_us);
        }
        estimator.handle_message(message, stamp_us as f64 / 1000.0);
    }
}
