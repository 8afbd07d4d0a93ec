//! Vault remote API
//!
//! The small slice of the Vault system API this tool drives: seal
//! status, unseal, and the root-generation ceremony. `VaultApi` is the
//! seam the orchestrators program against; `VaultClient` is the HTTP
//! implementation.

mod client;
mod types;

pub use client::VaultClient;
pub use types::{GenerateRootStatus, SealStatus};

use thiserror::Error;

/// Errors raised while talking to a Vault server
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid Vault address: {0}")]
    Address(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("HTTP error: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("malformed Vault response: {0}")]
    Body(#[from] serde_json::Error),

    #[error("Vault returned status {status}: {}", .errors.join(", "))]
    Api { status: u16, errors: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The operations the cluster orchestrators need from a server
pub trait VaultApi {
    /// Query the seal status
    fn seal_status(&self) -> Result<SealStatus, VaultError>;

    /// Submit one unseal key share
    fn unseal(&self, share: &str) -> Result<SealStatus, VaultError>;

    /// Query the root-generation ceremony
    fn generate_root_status(&self) -> Result<GenerateRootStatus, VaultError>;

    /// Submit one share to the root-generation ceremony
    fn generate_root_update(
        &self,
        share: &str,
        nonce: &str,
    ) -> Result<GenerateRootStatus, VaultError>;
}
