//! New-format packet headers and the PKESK packet

use super::{PgpError, CIPHER_AES128, PUBKEY_ALGO_RSA, SESSION_KEY_LEN, TAG_PKESK};

/// Fixed key-info block of a v3 PKESK: version, key id, algorithm and
/// the MPI bit-length prefix
const PKESK_KEY_INFO_LEN: usize = 12;

/// A parsed new-format packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet tag (low five bits of the first octet)
    pub tag: u8,
    /// Number of header octets
    pub header_len: usize,
    /// Length of the packet body
    pub body_len: usize,
    /// Total packet length including the header octets
    pub total_len: usize,
}

/// Parse a new-format packet header
///
/// The first octet must have both framing bits set (`11xx xxxx`). The
/// length must use the one-octet (< 192) or two-octet ([192, 223])
/// form; partial lengths and the five-octet form are rejected.
pub fn read_header(data: &[u8]) -> Result<PacketHeader, PgpError> {
    if data.len() < 2 {
        return Err(PgpError::Truncated);
    }

    if data[0] & 0xC0 != 0xC0 {
        return Err(PgpError::MalformedHeader);
    }

    let (body_len, header_len) = match data[1] {
        len @ 0..=191 => (len as usize, 2),
        len @ 192..=223 => {
            if data.len() < 3 {
                return Err(PgpError::Truncated);
            }
            ((((len - 192) as usize) << 8 | data[2] as usize) + 192, 3)
        }
        _ => return Err(PgpError::UnsupportedLength),
    };

    Ok(PacketHeader {
        tag: data[0] & 0x1F,
        header_len,
        body_len,
        total_len: header_len + body_len,
    })
}

/// A parsed v3 Public-Key Encrypted Session Key packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkesk {
    pub version: u8,
    /// Key id of the (sub)key the session key is encrypted to
    pub key_id: u64,
    pub algorithm: u8,
    /// Bit length the MPI prefix reports for the ciphertext
    pub modulus_bits: u16,
    /// The RSA ciphertext block, exactly as DECIPHER consumes it
    pub ciphertext: Vec<u8>,
    /// Total packet length; the next packet starts here
    pub packet_len: usize,
}

/// Parse the PKESK packet at the start of an encrypted message
pub fn read_pkesk(msg: &[u8]) -> Result<Pkesk, PgpError> {
    let header = read_header(msg)?;
    if header.tag != TAG_PKESK {
        return Err(PgpError::UnexpectedPacket {
            expected: TAG_PKESK,
            found: header.tag,
        });
    }

    if msg.len() < header.total_len || header.body_len < PKESK_KEY_INFO_LEN {
        return Err(PgpError::Truncated);
    }
    let body = &msg[header.header_len..header.total_len];

    if body[0] != 3 {
        return Err(PgpError::UnsupportedPkeskVersion(body[0]));
    }
    if body[9] != PUBKEY_ALGO_RSA {
        return Err(PgpError::UnsupportedAlgorithm(body[9]));
    }

    Ok(Pkesk {
        version: body[0],
        key_id: u64::from_be_bytes(body[1..9].try_into().unwrap()),
        algorithm: body[9],
        modulus_bits: u16::from_be_bytes([body[10], body[11]]),
        ciphertext: body[PKESK_KEY_INFO_LEN..].to_vec(),
        packet_len: header.total_len,
    })
}

/// Validate a DECIPHER response and extract the AES-128 session key
///
/// The applet returns `cipher_id(1) | session_key(16) | checksum(2)`.
pub fn session_key_from_blob(blob: &[u8]) -> Result<[u8; SESSION_KEY_LEN], PgpError> {
    if blob.len() != 1 + SESSION_KEY_LEN + 2 {
        return Err(PgpError::SessionKeyLayout);
    }

    if blob[0] != CIPHER_AES128 {
        return Err(PgpError::UnsupportedCipher(blob[0]));
    }

    Ok(blob[1..1 + SESSION_KEY_LEN].try_into().unwrap())
}
