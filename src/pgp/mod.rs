//! OpenPGP message handling
//!
//! Parses the encrypted messages this tool consumes: a Public-Key
//! Encrypted Session Key packet (the RSA ciphertext the token
//! deciphers) followed by a symmetrically encrypted packet carrying the
//! literal plaintext. Only the new-format packet framing with two-octet
//! lengths is supported, which is what the encrypting tooling emits.

pub(crate) mod decrypt;
pub(crate) mod packet;

pub use decrypt::read_encrypted_packets;
pub use packet::{read_header, read_pkesk, session_key_from_blob, PacketHeader, Pkesk};

use thiserror::Error;

/// Packet tag of a Public-Key Encrypted Session Key packet
pub const TAG_PKESK: u8 = 1;
/// Packet tag of a Symmetrically Encrypted Data packet (no MDC)
pub const TAG_SED: u8 = 9;
/// Packet tag of a Literal Data packet
pub const TAG_LITERAL: u8 = 11;
/// Packet tag of a Sym. Encrypted Integrity Protected Data packet
pub const TAG_SEIPD: u8 = 18;

/// Public-key algorithm id for RSA
pub const PUBKEY_ALGO_RSA: u8 = 1;
/// Symmetric cipher id for AES-128
pub const CIPHER_AES128: u8 = 7;
/// AES-128 session key length
pub const SESSION_KEY_LEN: usize = 16;

/// Errors raised while parsing or decrypting an OpenPGP message
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PgpError {
    #[error("invalid PGP packet header, only new format supported")]
    MalformedHeader,

    #[error("invalid PGP packet length, expected two-octet length format")]
    UnsupportedLength,

    #[error("truncated PGP packet")]
    Truncated,

    #[error("invalid PGP packet type, expected tag {expected}, found tag {found}")]
    UnexpectedPacket { expected: u8, found: u8 },

    #[error("invalid PGP encrypted key packet, only version 3 supported")]
    UnsupportedPkeskVersion(u8),

    #[error("invalid PGP encrypted key packet, only RSA supported")]
    UnsupportedAlgorithm(u8),

    #[error("unable to decipher PGP session key")]
    SessionKeyLayout,

    #[error("unsupported cipher function, only AES-128-CFB supported")]
    UnsupportedCipher(u8),

    #[error("unsupported symmetrically encrypted packet version {0}")]
    UnsupportedSeipdVersion(u8),

    #[error("session key does not match the encrypted data")]
    SessionKeyMismatch,

    #[error("message integrity check failed")]
    MdcMismatch,

    #[error("unexpected PGP packet type encountered")]
    UnexpectedInnerPacket,
}
