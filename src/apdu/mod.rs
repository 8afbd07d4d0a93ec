//! APDU (Application Protocol Data Unit) handling
//!
//! Command serialization and response deserialization for ISO 7816-4
//! APDUs as exchanged with the OpenPGP applet over PC/SC.

mod response;
mod status;

pub use response::Response;
pub use status::SW;

use thiserror::Error;

/// Errors that can occur while assembling or splitting APDUs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApduError {
    #[error("can not deserialize response: payload too short ({0} < 2)")]
    ResponseTooShort(usize),

    #[error("command data length {0} exceeds the length field")]
    DataTooLong(usize),
}

/// A command APDU sent to the applet
///
/// Serialized as `CLA INS P1 P2 [Lc data] Le`. With `extended_length`
/// set, Lc is encoded as `00 XX XX` (big-endian). With
/// `padding_indicator` set, the first data byte is a padding indicator
/// that is carried on the wire but not counted in Lc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte (CLA)
    pub cla: u8,
    /// Instruction byte (INS)
    pub ins: u8,
    /// Parameter 1 (P1)
    pub p1: u8,
    /// Parameter 2 (P2)
    pub p2: u8,
    /// Command data (may be empty)
    pub data: Vec<u8>,
    /// Expected response length (Le), 0 meaning maximum
    pub le: u8,
    /// Data starts with a padding indicator byte not counted in Lc
    pub padding_indicator: bool,
    /// Encode Lc with the 3-byte extended-length form
    pub extended_length: bool,
}

impl Command {
    /// Create a data-less command with just the header and Le
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: 0,
            padding_indicator: false,
            extended_length: false,
        }
    }

    /// Create a command carrying data
    pub fn with_data(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data,
            le: 0,
            padding_indicator: false,
            extended_length: false,
        }
    }

    /// Serialize the command for transmission
    pub fn serialize(&self) -> Result<Vec<u8>, ApduError> {
        let mut buf = Vec::with_capacity(self.data.len() + 8);
        buf.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);

        if !self.data.is_empty() {
            let mut lc = self.data.len();

            // the padding indicator byte travels with the data but is
            // not counted in the length the applet processes
            if self.padding_indicator {
                lc -= 1;
            }

            if self.extended_length {
                if lc > u16::MAX as usize {
                    return Err(ApduError::DataTooLong(lc));
                }
                buf.push(0x00);
                buf.extend_from_slice(&(lc as u16).to_be_bytes());
            } else {
                if lc > u8::MAX as usize {
                    return Err(ApduError::DataTooLong(lc));
                }
                buf.push(lc as u8);
            }

            buf.extend_from_slice(&self.data);
        }

        buf.push(self.le);
        Ok(buf)
    }
}

/// OpenPGP applet instruction bytes
pub mod ins {
    pub const SELECT: u8 = 0xA4;
    pub const GET_DATA: u8 = 0xCA;
    pub const VERIFY: u8 = 0x20;
    pub const PSO: u8 = 0x2A;
    pub const GET_RESPONSE: u8 = 0xC0;
}
