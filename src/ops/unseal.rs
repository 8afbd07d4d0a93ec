//! Unseal orchestration
//!
//! Feeds decrypted key shares to every server of a cluster in
//! declaration order, skipping servers that are already unsealed and
//! aborting on uninitialized ones.

use crate::error::Error;
use crate::printer::Printer;
use crate::vault::{SealStatus, VaultApi};

use super::listing::print_seal_status;

/// Outcome of unsealing one server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsealOutcome {
    Unsealed,
    AlreadyUnsealed,
    StillSealed,
}

/// Unseal every server in order; print the final status once, for the
/// last server
pub fn unseal_servers<V: VaultApi>(
    printer: &Printer,
    servers: &[(String, V)],
    keys: &[String],
) -> Result<(), Error> {
    for (index, (host, client)) in servers.iter().enumerate() {
        let (_, status) = unseal_server(printer, host, client, keys)?;

        if index == servers.len() - 1 {
            print_seal_status(printer, host, &status);
        }
    }

    Ok(())
}

/// Unseal a single server, returning the outcome and its final status
pub fn unseal_server<V: VaultApi>(
    printer: &Printer,
    host: &str,
    client: &V,
    keys: &[String],
) -> Result<(UnsealOutcome, SealStatus), Error> {
    let status = client.seal_status()?;

    if !status.initialized {
        return Err(Error::ClusterUninitialized {
            host: host.to_string(),
        });
    }

    if !status.sealed {
        printer.success(&format!(
            "{} - already unsealed, skipping unseal operation",
            host
        ));
        return Ok((UnsealOutcome::AlreadyUnsealed, status));
    }

    for key in keys {
        let progress = client.unseal(key)?;
        if !progress.sealed {
            break;
        }
    }

    let status = client.seal_status()?;
    if status.sealed {
        printer.warning(&format!(
            "{} - still sealed, unseal progress {}/{}",
            host, status.progress, status.threshold
        ));
        Ok((UnsealOutcome::StillSealed, status))
    } else {
        printer.success(&format!("{} - Vault unsealed", host));
        Ok((UnsealOutcome::Unsealed, status))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::vault::{GenerateRootStatus, VaultError};

    /// Scripted server: unseal calls count toward the threshold, state
    /// transitions once enough shares arrived
    pub(crate) struct MockVault {
        pub initialized: bool,
        pub threshold: u32,
        pub progress: RefCell<u32>,
        pub sealed: RefCell<bool>,
        pub unseal_calls: RefCell<Vec<String>>,
        pub root: RefCell<GenerateRootStatus>,
        pub root_updates: RefCell<Vec<(String, String)>>,
    }

    impl MockVault {
        pub(crate) fn sealed(threshold: u32) -> Self {
            Self {
                initialized: true,
                threshold,
                progress: RefCell::new(0),
                sealed: RefCell::new(true),
                unseal_calls: RefCell::new(Vec::new()),
                root: RefCell::new(GenerateRootStatus::default()),
                root_updates: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn unsealed() -> Self {
            let vault = Self::sealed(1);
            *vault.sealed.borrow_mut() = false;
            vault
        }

        fn status(&self) -> SealStatus {
            SealStatus {
                sealed: *self.sealed.borrow(),
                initialized: self.initialized,
                threshold: self.threshold,
                shares: self.threshold + 2,
                progress: *self.progress.borrow(),
                version: "1.15.2".into(),
                cluster_name: "vault-cluster-1".into(),
                cluster_id: "0aa21c11".into(),
            }
        }
    }

    impl VaultApi for MockVault {
        fn seal_status(&self) -> Result<SealStatus, VaultError> {
            Ok(self.status())
        }

        fn unseal(&self, share: &str) -> Result<SealStatus, VaultError> {
            self.unseal_calls.borrow_mut().push(share.to_string());
            let mut progress = self.progress.borrow_mut();
            *progress += 1;
            if *progress >= self.threshold {
                *self.sealed.borrow_mut() = false;
                *progress = 0;
            }
            drop(progress);
            Ok(self.status())
        }

        fn generate_root_status(&self) -> Result<GenerateRootStatus, VaultError> {
            Ok(self.root.borrow().clone())
        }

        fn generate_root_update(
            &self,
            share: &str,
            nonce: &str,
        ) -> Result<GenerateRootStatus, VaultError> {
            self.root_updates
                .borrow_mut()
                .push((share.to_string(), nonce.to_string()));
            let mut root = self.root.borrow_mut();
            root.progress += 1;
            if root.progress >= root.required {
                root.complete = true;
                root.encoded_root_token = "encoded-token".into();
            }
            Ok(root.clone())
        }
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("unseal-key-{}", i)).collect()
    }

    #[test]
    fn single_server_unseals_with_one_share() {
        let printer = Printer::new();
        let vault = MockVault::sealed(1);

        let (outcome, status) =
            unseal_server(&printer, "vault0:8200", &vault, &keys(1)).unwrap();
        assert_eq!(outcome, UnsealOutcome::Unsealed);
        assert!(!status.sealed);
        assert_eq!(vault.unseal_calls.borrow().len(), 1);
    }

    #[test]
    fn already_unsealed_server_performs_no_mutating_calls() {
        let printer = Printer::new();
        let vault = MockVault::unsealed();

        let (outcome, _) = unseal_server(&printer, "vault0:8200", &vault, &keys(3)).unwrap();
        assert_eq!(outcome, UnsealOutcome::AlreadyUnsealed);
        assert!(vault.unseal_calls.borrow().is_empty());
    }

    #[test]
    fn uninitialized_server_aborts() {
        let printer = Printer::new();
        let mut vault = MockVault::sealed(1);
        vault.initialized = false;

        let err = unseal_server(&printer, "vault0:8200", &vault, &keys(1)).unwrap_err();
        assert!(matches!(err, Error::ClusterUninitialized { .. }));
        assert!(vault.unseal_calls.borrow().is_empty());
    }

    #[test]
    fn feeding_stops_once_unsealed() {
        // threshold 2, three shares available: the third is not sent
        let printer = Printer::new();
        let vault = MockVault::sealed(2);

        let (outcome, _) = unseal_server(&printer, "vault0:8200", &vault, &keys(3)).unwrap();
        assert_eq!(outcome, UnsealOutcome::Unsealed);
        assert_eq!(
            vault.unseal_calls.borrow().as_slice(),
            &["unseal-key-0".to_string(), "unseal-key-1".to_string()]
        );
    }

    #[test]
    fn every_server_is_fed_in_order() {
        let printer = Printer::new();
        let servers = vec![
            ("vault0:8200".to_string(), MockVault::sealed(2)),
            ("vault1:8200".to_string(), MockVault::sealed(2)),
        ];

        unseal_servers(&printer, &servers, &keys(3)).unwrap();
        for (_, vault) in &servers {
            assert_eq!(vault.unseal_calls.borrow().len(), 2);
            assert!(!*vault.sealed.borrow());
        }
    }

    #[test]
    fn insufficient_shares_leave_server_sealed() {
        let printer = Printer::new();
        let vault = MockVault::sealed(3);

        let (outcome, status) =
            unseal_server(&printer, "vault0:8200", &vault, &keys(1)).unwrap();
        assert_eq!(outcome, UnsealOutcome::StillSealed);
        assert!(status.sealed);
        assert_eq!(status.progress, 1);
    }
}
