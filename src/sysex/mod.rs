//! SysEx encoding and delivery for the Alesis Quadraverb
//!
//! - [`parameters`]: the static parameter table
//! - [`codec`]: 7-bit packing and message framing
//! - [`connection`]: output selection and timed multi-message sends
//! - [`queue`]: FIFO send queue drained by a single worker thread
//!
pub mod codec;
pub mod connection;
pub mod parameters;
pub mod queue;

pub use codec::{decode_7bit, encode, encode_7bit, is_wire_safe, SysexMessage};
pub use connection::{LastSent, SysexConnection, SysexEvent, SysexEventKind};
pub use parameters::{all_parameters, lookup_parameter, validate_value, Encoding, ParameterDescriptor};
pub use queue::{SendQueue, SendTicket};

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;
pub const MANUFACTURER_ALESIS: [u8; 3] = [0x00, 0x00, 0x0E];
pub const DEVICE_QUADRAVERB: u8 = 0x02;

pub mod command {
    pub const CHANGE_PARAMETER: u8 = 0x01;
    pub const REQUEST_PARAMETER: u8 = 0x02;
    pub const DUMP_REQUEST: u8 = 0x03;
    pub const DUMP_RESPONSE: u8 = 0x04;
}

pub mod group {
    pub const GLOBAL: u8 = 0x00;
    pub const ROUTING: u8 = 0x01;
    pub const DELAY: u8 = 0x02;
    pub const REVERB: u8 = 0x03;
    pub const EQ: u8 = 0x04;
}
