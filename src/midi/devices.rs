//! MIDI port enumeration

use crate::error::{Error, Result};
#[cfg(not(feature = "test-mock"))]
use midir::{MidiInput, MidiOutput};

#[cfg(not(feature = "test-mock"))]
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("delaysyncrs-port-lister")
        .map_err(|e| Error::UnsupportedTransport(e.to_string()))?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect())
}

#[cfg(not(feature = "test-mock"))]
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("delaysyncrs-port-lister")
        .map_err(|e| Error::UnsupportedTransport(e.to_string()))?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

#[cfg(feature = "test-mock")]
pub fn list_input_ports() -> Result<Vec<String>> {
    Ok(vec!["Mock Device 1".to_string(), "Mock Device 2".to_string()])
}

#[cfg(feature = "test-mock")]
pub fn list_output_ports() -> Result<Vec<String>> {
    Ok(vec!["Mock Device 1".to_string(), "Mock Device 2".to_string()])
}

/// Returns the first port whose name contains `device_name`
pub fn find_port<'a>(ports: &'a [String], device_name: &str) -> Result<&'a str> {
    ports
        .iter()
        .find(|p| p.contains(device_name))
        .map(String::as_str)
        .ok_or_else(|| Error::DeviceNotFound(device_name.to_string()))
}
