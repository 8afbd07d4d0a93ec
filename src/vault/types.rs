//! Vault system API response bodies

use serde::Deserialize;

/// Response of `sys/seal-status` and `sys/unseal`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SealStatus {
    pub sealed: bool,
    #[serde(default)]
    pub initialized: bool,
    /// Unseal threshold
    #[serde(rename = "t", default)]
    pub threshold: u32,
    /// Number of key shares
    #[serde(rename = "n", default)]
    pub shares: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_id: String,
}

/// Response of `sys/generate-root/attempt` and `sys/generate-root/update`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRootStatus {
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub required: u32,
    #[serde(default)]
    pub pgp_fingerprint: String,
    #[serde(default)]
    pub encoded_root_token: String,
}

/// Error body Vault returns alongside non-2xx statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<String>,
}
