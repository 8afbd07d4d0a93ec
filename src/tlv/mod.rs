//! BER-TLV encoding and decoding
//!
//! The OpenPGP applet publishes its data objects as BER-TLV records,
//! some of them constructed (nested). This module reads those records
//! into a small tree and can re-encode the subset the tool consumes.

mod encoder;
mod parser;

pub use encoder::encode_tlv;
pub use parser::{find_tag, read_list, read_single, Tlv, TlvError};

/// Format a byte slice as contiguous upper-case hex
pub fn hexify(value: &[u8]) -> String {
    value.iter().map(|b| format!("{:02X}", b)).collect()
}
