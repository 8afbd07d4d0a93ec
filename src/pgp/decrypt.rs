//! Symmetric decryption of the encrypted data packet
//!
//! Decrypts a SEIPD (tag 18) or SED (tag 9) packet with the AES-128
//! session key recovered from the token, verifies the SHA-1 MDC where
//! present, and extracts the Literal Data body.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::Aes128;
use sha1::{Digest, Sha1};

use super::packet::read_header;
use super::{PgpError, SESSION_KEY_LEN, TAG_LITERAL, TAG_SED, TAG_SEIPD};

type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

/// Cipher block size; the encrypted body opens with a random block plus
/// two repeated quick-check bytes
const PREFIX_LEN: usize = 18;

/// The MDC packet trailing the plaintext: `D3 14` plus a SHA-1 digest
const MDC_TRAILER_LEN: usize = 22;

const ZERO_IV: [u8; 16] = [0; 16];

/// Decrypt the encrypted data packet and return the literal body
///
/// `data` starts at the packet following the PKESK. The decrypted
/// stream is parsed with the same new-format reader until the Literal
/// Data packet is found. The MDC is verified before the body is
/// returned, so a successful return implies integrity for tag 18
/// messages.
pub fn read_encrypted_packets(
    data: &[u8],
    session_key: &[u8; SESSION_KEY_LEN],
) -> Result<Vec<u8>, PgpError> {
    let header = read_header(data)?;
    if data.len() < header.total_len {
        return Err(PgpError::Truncated);
    }
    let body = &data[header.header_len..header.total_len];

    let plaintext = match header.tag {
        TAG_SEIPD => {
            let (&version, ciphertext) = body.split_first().ok_or(PgpError::Truncated)?;
            if version != 1 {
                return Err(PgpError::UnsupportedSeipdVersion(version));
            }
            decrypt_seipd(ciphertext, session_key)?
        }
        TAG_SED => decrypt_sed(body, session_key)?,
        other => {
            return Err(PgpError::UnexpectedPacket {
                expected: TAG_SEIPD,
                found: other,
            })
        }
    };

    read_literal(&plaintext)
}

/// Tag 18: one CFB stream with a zero IV, MDC mandatory
fn decrypt_seipd(
    ciphertext: &[u8],
    session_key: &[u8; SESSION_KEY_LEN],
) -> Result<Vec<u8>, PgpError> {
    if ciphertext.len() < PREFIX_LEN + MDC_TRAILER_LEN {
        return Err(PgpError::Truncated);
    }

    let mut plain = ciphertext.to_vec();
    Aes128CfbDec::new(
        GenericArray::from_slice(session_key),
        GenericArray::from_slice(&ZERO_IV),
    )
    .decrypt(&mut plain);

    check_prefix(&plain)?;

    // the MDC covers everything up to and including its own D3 14 header
    let (content, digest) = plain.split_at(plain.len() - 20);
    if content[content.len() - 2..] != [0xD3, 0x14] {
        return Err(PgpError::MdcMismatch);
    }

    let mut hasher = Sha1::new();
    hasher.update(content);
    if hasher.finalize().as_slice() != digest {
        return Err(PgpError::MdcMismatch);
    }

    Ok(content[PREFIX_LEN..content.len() - 2].to_vec())
}

/// Tag 9: classic OpenPGP CFB, the stream resynchronizes after the
/// prefix using ciphertext bytes 2..18 as the new IV
fn decrypt_sed(
    ciphertext: &[u8],
    session_key: &[u8; SESSION_KEY_LEN],
) -> Result<Vec<u8>, PgpError> {
    if ciphertext.len() < PREFIX_LEN {
        return Err(PgpError::Truncated);
    }

    let mut prefix = ciphertext[..PREFIX_LEN].to_vec();
    Aes128CfbDec::new(
        GenericArray::from_slice(session_key),
        GenericArray::from_slice(&ZERO_IV),
    )
    .decrypt(&mut prefix);
    check_prefix(&prefix)?;

    let mut rest = ciphertext[PREFIX_LEN..].to_vec();
    Aes128CfbDec::new(
        GenericArray::from_slice(session_key),
        GenericArray::from_slice(&ciphertext[2..PREFIX_LEN]),
    )
    .decrypt(&mut rest);

    Ok(rest)
}

// The last two prefix bytes repeat the two before them; a mismatch
// means the session key did not decrypt this message.
fn check_prefix(prefix: &[u8]) -> Result<(), PgpError> {
    if prefix[PREFIX_LEN - 4..PREFIX_LEN - 2] != prefix[PREFIX_LEN - 2..PREFIX_LEN] {
        return Err(PgpError::SessionKeyMismatch);
    }
    Ok(())
}

/// Extract the content bytes of the Literal Data packet
fn read_literal(stream: &[u8]) -> Result<Vec<u8>, PgpError> {
    let header = read_header(stream)?;
    if header.tag != TAG_LITERAL {
        return Err(PgpError::UnexpectedInnerPacket);
    }
    if stream.len() < header.total_len {
        return Err(PgpError::Truncated);
    }
    let body = &stream[header.header_len..header.total_len];

    // format octet, filename length, filename, four date octets
    if body.len() < 2 {
        return Err(PgpError::Truncated);
    }
    let content_start = 2 + body[1] as usize + 4;
    if body.len() < content_start {
        return Err(PgpError::Truncated);
    }

    Ok(body[content_start..].to_vec())
}
