//! SysEx message framing and 7-bit packing

use super::parameters::{lookup_parameter, validate_value, Encoding, ParameterDescriptor};
use super::{command, DEVICE_QUADRAVERB, MANUFACTURER_ALESIS, SYSEX_END, SYSEX_START};
use crate::error::{Error, Result};
use log::debug;

/// Number of logical bytes between the framing bytes of a change-parameter message
pub const PAYLOAD_LEN: usize = 8;

/// Packs the low 7 bits of each input byte into a contiguous little-endian
/// bit stream and emits it 8 bits at a time. A trailing partial byte is
/// emitted if any bits remain.
pub fn encode_7bit(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity((data.len() * 7).div_ceil(8));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer |= u32::from(byte & 0x7F) << bits;
        bits += 7;

        while bits >= 8 {
            result.push((buffer & 0xFF) as u8);
            buffer >>= 8;
            bits -= 8;
        }
    }

    if bits > 0 {
        result.push((buffer & 0xFF) as u8);
    }
    result
}

/// Inverse of [`encode_7bit`]: recovers `count` 7-bit values from a packed stream
pub fn decode_7bit(packed: &[u8], count: usize) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(count);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in packed {
        buffer |= u32::from(byte) << bits;
        bits += 8;

        while bits >= 7 && result.len() < count {
            result.push((buffer & 0x7F) as u8);
            buffer >>= 7;
            bits -= 7;
        }
    }

    if result.len() < count {
        return Err(Error::MalformedSysex(format!(
            "expected {} packed values, found {}",
            count,
            result.len()
        )));
    }
    Ok(result)
}

/// A single Quadraverb "change parameter" message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysexMessage {
    pub group: u8,
    pub address: u8,
    pub value: u8,
}

impl SysexMessage {
    pub fn change_parameter(group: u8, address: u8, value: u8) -> Self {
        Self {
            group: group & 0x7F,
            address: address & 0x7F,
            value: value & 0x7F,
        }
    }

    /// Logical bytes between `0xF0` and `0xF7`, before packing
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        let [m0, m1, m2] = MANUFACTURER_ALESIS;
        [
            m0,
            m1,
            m2,
            DEVICE_QUADRAVERB,
            command::CHANGE_PARAMETER,
            self.group,
            self.address,
            self.value,
        ]
    }

    /// Full logical message `F0 00 00 0E 02 01 gg aa vv F7`, before packing
    pub fn unpacked_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAYLOAD_LEN + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(&self.payload());
        bytes.push(SYSEX_END);
        bytes
    }

    /// Wire form: the payload 7-bit packed between the framing bytes.
    ///
    /// The packed stream uses all 8 bits, so the result is generally not
    /// 7-bit clean: a byte >= 0x80 inside the frame is a status byte to real
    /// MIDI hardware and ends the SysEx early. Check with [`is_wire_safe`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let packed = encode_7bit(&self.payload());
        let mut bytes = Vec::with_capacity(packed.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(&packed);
        bytes.push(SYSEX_END);
        bytes
    }

    /// Parses a wire message produced by [`to_bytes`](Self::to_bytes)
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let inner = match bytes {
            [SYSEX_START, inner @ .., SYSEX_END] => inner,
            _ => {
                return Err(Error::MalformedSysex(
                    "message must start with F0 and end with F7".to_string(),
                ))
            }
        };

        let payload = decode_7bit(inner, PAYLOAD_LEN)?;
        if payload[..3] != MANUFACTURER_ALESIS || payload[3] != DEVICE_QUADRAVERB {
            return Err(Error::MalformedSysex(format!(
                "unexpected manufacturer/device header {:02X?}",
                &payload[..4]
            )));
        }
        if payload[4] != command::CHANGE_PARAMETER {
            return Err(Error::MalformedSysex(format!(
                "unsupported command {:02X}",
                payload[4]
            )));
        }

        Ok(Self {
            group: payload[5],
            address: payload[6],
            value: payload[7],
        })
    }
}

/// Logical messages for an already validated value, in transmission order
pub fn messages_for(descriptor: &ParameterDescriptor, value: i32) -> Vec<SysexMessage> {
    match descriptor.encoding {
        Encoding::SingleByte { address } => {
            vec![SysexMessage::change_parameter(
                descriptor.group,
                address,
                (value & 0x7F) as u8,
            )]
        }
        Encoding::TwoByteMsbLsb { msb, lsb } => {
            let msb_value = ((value >> 8) & 0x7F) as u8;
            let lsb_value = (value & 0x7F) as u8;
            vec![
                SysexMessage::change_parameter(descriptor.group, msb, msb_value),
                SysexMessage::change_parameter(descriptor.group, lsb, lsb_value),
            ]
        }
    }
}

/// Looks up and validates the parameter, then returns each framed, packed
/// message to transmit, in order
pub fn encode(name: &str, value: i32) -> Result<Vec<Vec<u8>>> {
    let descriptor = lookup_parameter(name)?;
    validate_value(descriptor, value)?;

    let messages: Vec<Vec<u8>> = messages_for(descriptor, value)
        .iter()
        .map(SysexMessage::to_bytes)
        .collect();
    debug!("Encoded {}={} into {} message(s)", name, value, messages.len());
    Ok(messages)
}

/// True if no byte between the framing bytes has the high bit set
pub fn is_wire_safe(bytes: &[u8]) -> bool {
    match bytes {
        [SYSEX_START, inner @ .., SYSEX_END] => inner.iter().all(|b| b & 0x80 == 0),
        _ => false,
    }
}
