//! Configuration loading
//!
//! Clusters are declared in `$HOME/.vervet/vervet.toml` (or the file
//! given with `--config`) as `[cluster.<name>]` tables carrying the
//! server list, inline encrypted key shares and an optional key file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;

/// Upper bound on key file size
pub const MAX_KEY_FILE_SIZE: u64 = 8192;

/// Errors raised while loading configuration or key files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config for Vault cluster '{0}' not found")]
    UnknownCluster(String),

    #[error("home directory could not be determined")]
    NoHome,

    #[error("could not read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("key file {0} exceeds {MAX_KEY_FILE_SIZE} bytes")]
    KeyFileTooLarge(PathBuf),
}

/// The whole configuration file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cluster: BTreeMap<String, ClusterConfig>,
}

/// One `[cluster.<name>]` table
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Vault servers in unseal order
    pub servers: Vec<String>,
    /// Base64 encrypted key shares declared inline
    #[serde(default)]
    pub keys: Vec<String>,
    /// File with one base64 share per line, appended to `keys`
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

impl Config {
    /// Load the configuration from `path`, or from the default location
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit `--config` path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path()?, false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Look up a cluster by name
    pub fn cluster(&self, name: &str) -> Result<&ClusterConfig, ConfigError> {
        self.cluster
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCluster(name.to_string()))
    }
}

impl ClusterConfig {
    /// The effective share list: inline keys, then key-file lines,
    /// deduplicated preserving first occurrence
    ///
    /// Returns the unique shares and the number of duplicates dropped.
    pub fn effective_keys(&self) -> Result<(Vec<String>, usize), ConfigError> {
        let mut keys = self.keys.clone();
        if let Some(path) = &self.key_file {
            keys.extend(read_key_file(path)?);
        }

        let uniq = unique(&keys);
        let duplicates = keys.len() - uniq.len();
        Ok((uniq, duplicates))
    }
}

/// Default configuration path under the home directory
pub fn default_path() -> Result<PathBuf, ConfigError> {
    Ok(dirs::home_dir()
        .ok_or(ConfigError::NoHome)?
        .join(".vervet")
        .join("vervet.toml"))
}

/// Read a text key file: one base64 share per line, trimmed
pub fn read_key_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = read_bounded(path)?;
    let text = String::from_utf8_lossy(&raw);
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Read a binary key file holding one raw OpenPGP message
///
/// The message is re-encoded as base64 so that it flows through the
/// same share pipeline as configured keys.
pub fn read_binary_key_file(path: &Path) -> Result<String, ConfigError> {
    let raw = read_bounded(path)?;
    Ok(STANDARD.encode(raw))
}

fn read_bounded(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let to_err = |source| ConfigError::KeyFile {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(to_err)?;
    if meta.len() > MAX_KEY_FILE_SIZE {
        return Err(ConfigError::KeyFileTooLarge(path.to_path_buf()));
    }

    fs::read(path).map_err(to_err)
}

/// Stable deduplication: first occurrence wins, survivors keep order
pub fn unique(keys: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(keys.len());
    for key in keys {
        if !seen.contains(key) {
            seen.push(key.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cluster_tables() {
        let raw = r#"
            [cluster.production]
            servers = ["vault0.example.com", "vault1.example.com"]
            keys = ["c2hhcmUtb25l", "c2hhcmUtdHdv"]

            [cluster.staging]
            servers = ["staging.example.com"]
            keys = []
            key_file = "/etc/vervet/staging.keys"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.cluster.len(), 2);

        let prod = config.cluster("production").unwrap();
        assert_eq!(prod.servers.len(), 2);
        assert_eq!(prod.keys.len(), 2);
        assert!(prod.key_file.is_none());

        let staging = config.cluster("staging").unwrap();
        assert_eq!(
            staging.key_file.as_deref(),
            Some(Path::new("/etc/vervet/staging.keys"))
        );
    }

    #[test]
    fn unknown_cluster_is_an_error() {
        let config = Config::default();
        let err = config.cluster("nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "config for Vault cluster 'nope' not found"
        );
    }

    #[test]
    fn unique_preserves_first_occurrence() {
        let keys: Vec<String> = ["a", "b", "a", "c", "b", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique(&keys), vec!["a", "b", "c"]);
    }

    #[test]
    fn unique_never_reorders_survivors() {
        let keys: Vec<String> = ["z", "y", "z", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique(&keys), vec!["z", "y", "x"]);
    }

    #[test]
    fn effective_keys_counts_duplicates() {
        let cluster = ClusterConfig {
            servers: vec!["v".into()],
            keys: vec!["one".into(), "two".into(), "one".into()],
            key_file: None,
        };
        let (keys, duplicates) = cluster.effective_keys().unwrap();
        assert_eq!(keys, vec!["one", "two"]);
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn key_file_lines_trimmed() {
        let dir = std::env::temp_dir();
        let path = dir.join("vervet-test-keys");
        fs::write(&path, "  c2hhcmUtb25l \n\nc2hhcmUtdHdv\n").unwrap();

        let keys = read_key_file(&path).unwrap();
        assert_eq!(keys, vec!["c2hhcmUtb25l", "c2hhcmUtdHdv"]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn oversized_key_file_rejected() {
        let dir = std::env::temp_dir();
        let path = dir.join("vervet-test-oversized");
        fs::write(&path, vec![b'A'; MAX_KEY_FILE_SIZE as usize + 1]).unwrap();

        assert!(matches!(
            read_key_file(&path),
            Err(ConfigError::KeyFileTooLarge(_))
        ));

        fs::remove_file(&path).ok();
    }
}
