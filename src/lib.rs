//! vervet: unseal HashiCorp Vault with YubiKeys
//!
//! An operator tool that decrypts PGP-encrypted Vault unseal key
//! shares with RSA keys held on YubiKey OpenPGP applets, then submits
//! the plaintext shares to the cluster's HTTP API. The long-term
//! private key never leaves the token: the card performs the RSA
//! decryption of the session key, the tool finishes the symmetric
//! decryption in software.

pub mod apdu;
pub mod cli;
pub mod config;
pub mod error;
pub mod ops;
pub mod pgp;
pub mod printer;
pub mod scard;
pub mod tlv;
pub mod vault;

pub use error::{Error, Result};
