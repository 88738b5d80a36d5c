use super::codec;
use crate::config::SysexSettings;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::midi::output::SysexOutput;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SysexEvent {
    Connected(String),
    Disconnected,
    MessageSent { parameter: String, value: i32 },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysexEventKind {
    Connected,
    Disconnected,
    MessageSent,
    Failed,
}

impl Event for SysexEvent {
    type Kind = SysexEventKind;

    fn kind(&self) -> SysexEventKind {
        match self {
            SysexEvent::Connected(_) => SysexEventKind::Connected,
            SysexEvent::Disconnected => SysexEventKind::Disconnected,
            SysexEvent::MessageSent { .. } => SysexEventKind::MessageSent,
            SysexEvent::Failed(_) => SysexEventKind::Failed,
        }
    }
}

/// The last parameter update that was fully transmitted
#[derive(Debug, Clone, PartialEq)]
pub struct LastSent {
    pub parameter: String,
    pub value: i32,
    pub sent_at: DateTime<Local>,
}

/// Holds at most one selected output and sends parameter updates to it
pub struct SysexConnection<O: SysexOutput = Box<dyn SysexOutput>> {
    output: Option<O>,
    message_delay: Duration,
    last_sent: Option<LastSent>,
    events: EventBus<SysexEvent>,
}

impl<O: SysexOutput> Default for SysexConnection<O> {
    fn default() -> Self {
        Self::new(&SysexSettings::default())
    }
}

impl<O: SysexOutput> SysexConnection<O> {
    pub fn new(settings: &SysexSettings) -> Self {
        Self {
            output: None,
            message_delay: Duration::from_millis(settings.message_delay_ms),
            last_sent: None,
            events: EventBus::new(),
        }
    }

    pub fn events(&mut self) -> &mut EventBus<SysexEvent> {
        &mut self.events
    }

    /// Selects `output`, replacing any previous one. `None` is rejected with
    /// `InvalidDestination` and leaves the current selection untouched.
    pub fn connect(&mut self, output: Option<O>) -> Result<()> {
        let output = output.ok_or(Error::InvalidDestination)?;
        let name = output.name().to_string();
        info!("SysEx output connected: {}", name);
        self.output = Some(output);
        self.events.emit(&SysexEvent::Connected(name));
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(output) = self.output.take() {
            info!("SysEx output disconnected: {}", output.name());
        }
        self.events.emit(&SysexEvent::Disconnected);
    }

    pub fn is_connected(&self) -> bool {
        self.output.is_some()
    }

    pub fn output_name(&self) -> Option<&str> {
        self.output.as_ref().map(|o| o.name())
    }

    pub fn message_delay(&self) -> Duration {
        self.message_delay
    }

    pub fn last_sent(&self) -> Option<&LastSent> {
        self.last_sent.as_ref()
    }

    /// Encodes `parameter = value` and transmits each message in order,
    /// pausing `message_delay` after each one. The first failed message
    /// aborts the rest of the update.
    pub fn send(&mut self, parameter: &str, value: i32) -> Result<()> {
        let Some(output) = self.output.as_mut() else {
            return Err(Error::NotConnected);
        };

        let messages = codec::encode(parameter, value)?;
        if !messages.iter().all(|m| codec::is_wire_safe(m)) {
            warn!(
                "{}={} packs to bytes >= 0x80 inside the SysEx frame; hardware may truncate it",
                parameter, value
            );
        }
        for (index, message) in messages.iter().enumerate() {
            debug!(
                "Sending {} message {}/{}: {:02X?}",
                parameter,
                index + 1,
                messages.len(),
                message
            );
            if let Err(e) = output.send(message) {
                error!("Failed to send {}={}: {}", parameter, value, e);
                self.events.emit(&SysexEvent::Failed(e.to_string()));
                return Err(Error::Transmission(e));
            }
            if !self.message_delay.is_zero() {
                thread::sleep(self.message_delay);
            }
        }

        self.last_sent = Some(LastSent {
            parameter: parameter.to_string(),
            value,
            sent_at: Local::now(),
        });
        self.events.emit(&SysexEvent::MessageSent {
            parameter: parameter.to_string(),
            value,
        });
        Ok(())
    }

    /// Disconnects and drops every subscriber
    pub fn cleanup(&mut self) {
        self.disconnect();
        self.events.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::output::RecordingOutput;
    use std::sync::{Arc, Mutex};

    fn fast_connection() -> SysexConnection<RecordingOutput> {
        SysexConnection::new(&SysexSettings {
            message_delay_ms: 0,
        })
    }

    #[test]
    fn test_connect_none_is_invalid_destination() {
        let mut connection = fast_connection();
        assert!(matches!(connection.connect(None), Err(Error::InvalidDestination)));
        assert!(!connection.is_connected());
    }

    #[test]
    fn test_disconnect_clears_output() {
        let mut connection = fast_connection();
        connection
            .connect(Some(RecordingOutput::new("Mock Device 1")))
            .unwrap();
        assert_eq!(connection.output_name(), Some("Mock Device 1"));
        connection.disconnect();
        assert!(!connection.is_connected());
        assert!(matches!(connection.send("leftDelay", 1), Err(Error::NotConnected)));
    }

    #[test]
    fn test_send_records_last_update_and_notifies() {
        let recorder = RecordingOutput::new("Mock Device 1");
        let mut connection = fast_connection();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        connection
            .events()
            .subscribe(SysexEventKind::MessageSent, move |e| s.lock().unwrap().push(e.clone()));

        connection.connect(Some(recorder.clone())).unwrap();
        connection.send("reverbType", 3).unwrap();

        assert_eq!(recorder.sent_count(), 1);
        let last = connection.last_sent().unwrap();
        assert_eq!(last.parameter, "reverbType");
        assert_eq!(last.value, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SysexEvent::MessageSent {
                parameter: "reverbType".to_string(),
                value: 3
            }]
        );
    }

    #[test]
    fn test_validation_error_sends_nothing() {
        let recorder = RecordingOutput::new("Mock Device 1");
        let mut connection = fast_connection();
        connection.connect(Some(recorder.clone())).unwrap();

        assert!(matches!(
            connection.send("leftDelay", 2001),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            connection.send("feedback", 10),
            Err(Error::UnknownParameter(_))
        ));
        assert_eq!(recorder.sent_count(), 0);
        assert!(connection.last_sent().is_none());
    }
}
