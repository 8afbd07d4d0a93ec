//! Smart card access
//!
//! PC/SC session handling, the OpenPGP applet driver, and the registry
//! of admitted tokens with their cached metadata.

pub mod applet;
pub mod data_objects;
pub mod registry;
pub mod session;
pub mod token;

pub use registry::TokenRegistry;
pub use token::{PinBank, Token, TokenInfo, TokenOps};

use thiserror::Error;

use crate::apdu::ApduError;
use crate::tlv::TlvError;

/// Errors raised by the card stack
#[derive(Debug, Error)]
pub enum CardError {
    #[error("smart card error: {0}")]
    Pcsc(#[from] pcsc::Error),

    #[error(transparent)]
    Apdu(#[from] ApduError),

    #[error(transparent)]
    Tlv(#[from] TlvError),

    #[error("card command failed with status {sw1:02X} {sw2:02X}")]
    Unsuccessful { sw1: u8, sw2: u8 },

    #[error("could not get data object segment")]
    GetData,

    #[error("invalid PIN, {retries} {} remaining", retry_noun(.retries))]
    PinInvalid { retries: u8 },

    #[error("PIN bank locked, no retries remaining")]
    PinLocked,

    #[error("DECIPHER input is not a multiple of the cipher block size")]
    DecipherInput,

    #[error("malformed {0} data object")]
    MalformedDataObject(&'static str),

    #[error("no YubiKeys found")]
    NoTokens,
}

fn retry_noun(retries: &u8) -> &'static str {
    if *retries == 1 {
        "retry"
    } else {
        "retries"
    }
}
