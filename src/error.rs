//! Crate-level error type
//!
//! Module errors bubble up into this enum; `main` turns whatever
//! escapes into a `[fatal]` line and a non-zero exit.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pgp::PgpError;
use crate::scard::CardError;
use crate::vault::VaultError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Pgp(#[from] PgpError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encrypted unseal key is not base64 encoded")]
    NotBase64,

    #[error("decryption key {0:016X} could not be found on any token")]
    KeyNotOnAnyToken(u64),

    #[error("{0}")]
    PinFormat(&'static str),

    #[error("unseal key length is shorter than minimum 16 bytes")]
    PlaintextTooShort,

    #[error("unseal key length is longer than maximum 33 bytes")]
    PlaintextTooLong,

    #[error("unseal key is not valid UTF-8")]
    PlaintextEncoding,

    #[error("no unseal keys decrypted, cannot proceed")]
    NoKeysDecrypted,

    #[error("{host} - Vault server is not initialized")]
    ClusterUninitialized { host: String },

    #[error("no YubiKey matches serial number {0}")]
    UnknownSerial(String),

    #[error("no Vault servers in configuration")]
    NoServers,
}
