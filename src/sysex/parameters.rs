//! Quadraverb parameter table

use super::group;
use crate::error::{Error, Result};

/// How a parameter value is laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One message carrying `value & 0x7F` at `address`
    SingleByte { address: u8 },
    /// Two messages: `(value >> 8) & 0x7F` at `msb`, then `value & 0x7F` at `lsb`
    TwoByteMsbLsb { msb: u8, lsb: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub group: u8,
    pub encoding: Encoding,
    /// Inclusive `(min, max)`
    pub range: (i32, i32),
    /// Discrete labelled values; empty when any value in range is allowed
    pub enum_values: &'static [(&'static str, i32)],
}

impl ParameterDescriptor {
    pub fn is_enumerated(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Value for an enum label such as `"PLATE"`, case-insensitive
    pub fn enum_value(&self, label: &str) -> Option<i32> {
        self.enum_values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, value)| *value)
    }

    pub fn enum_label(&self, value: i32) -> Option<&'static str> {
        self.enum_values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name)
    }
}

const REVERB_TYPES: &[(&str, i32)] = &[
    ("ROOM", 0),
    ("HALL", 1),
    ("PLATE", 2),
    ("CHAMBER", 3),
    ("GATED", 4),
    ("REVERSE", 5),
    ("SPRING", 6),
    ("NONLINEAR", 7),
];

static PARAMETERS: [ParameterDescriptor; 4] = [
    ParameterDescriptor {
        name: "leftDelay",
        group: group::DELAY,
        encoding: Encoding::TwoByteMsbLsb { msb: 0x2A, lsb: 0x2B },
        range: (0, 2000),
        enum_values: &[],
    },
    ParameterDescriptor {
        name: "rightDelay",
        group: group::DELAY,
        encoding: Encoding::TwoByteMsbLsb { msb: 0x2C, lsb: 0x2D },
        range: (0, 2000),
        enum_values: &[],
    },
    ParameterDescriptor {
        name: "reverbType",
        group: group::GLOBAL,
        encoding: Encoding::SingleByte { address: 0x50 },
        range: (0, 7),
        enum_values: REVERB_TYPES,
    },
    ParameterDescriptor {
        name: "lowEQFrequency",
        group: group::EQ,
        encoding: Encoding::TwoByteMsbLsb { msb: 0x00, lsb: 0x01 },
        range: (20, 20000),
        enum_values: &[],
    },
];

pub fn lookup_parameter(name: &str) -> Result<&'static ParameterDescriptor> {
    PARAMETERS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::UnknownParameter(name.to_string()))
}

pub fn all_parameters() -> &'static [ParameterDescriptor] {
    &PARAMETERS
}

/// Checks `value` against the descriptor. Enumerated single-byte parameters
/// only accept their declared values (anything else is `InvalidEnumValue`,
/// including values outside the range); all others must lie within the range.
pub fn validate_value(descriptor: &ParameterDescriptor, value: i32) -> Result<()> {
    if matches!(descriptor.encoding, Encoding::SingleByte { .. }) && descriptor.is_enumerated() {
        if descriptor.enum_label(value).is_none() {
            return Err(Error::InvalidEnumValue {
                parameter: descriptor.name.to_string(),
                value,
                allowed: descriptor.enum_values.iter().map(|(_, v)| *v).collect(),
            });
        }
        return Ok(());
    }

    let (min, max) = descriptor.range;
    if value < min || value > max {
        return Err(Error::OutOfRange {
            parameter: descriptor.name.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
