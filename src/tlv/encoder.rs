//! BER-TLV encoder
//!
//! Re-encodes parsed records in minimal form. Used to flatten the
//! children of constructed data objects and to check parse fidelity
//! against captured applet responses.

use super::parser::Tlv;

/// Encode a record, recursing into children of constructed records
pub fn encode_tlv(tlv: &Tlv) -> Vec<u8> {
    let value: Vec<u8> = if tlv.subs.is_empty() {
        tlv.value.clone()
    } else {
        tlv.subs.iter().flat_map(encode_tlv).collect()
    };

    let mut out = encode_tag(tlv.tag);
    out.extend(encode_length(value.len()));
    out.extend(value);
    out
}

fn encode_tag(tag: u16) -> Vec<u8> {
    if tag > 0xFF {
        vec![(tag >> 8) as u8, tag as u8]
    } else {
        vec![tag as u8]
    }
}

fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        vec![length as u8]
    } else if length <= 0xFF {
        vec![0x81, length as u8]
    } else {
        vec![0x82, (length >> 8) as u8, length as u8]
    }
}
