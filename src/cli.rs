//! Command line surface
//!
//! `vervet` streamlines Vault unseal operations by decrypting
//! PGP-encrypted unseal keys with the YubiKey OpenPGP applet.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, Config};
use crate::error::Error;
use crate::ops::{self, generate_root, listing, unseal};
use crate::printer::Printer;
use crate::scard::{TokenOps, TokenRegistry};
use crate::vault::VaultClient;

const DEFAULT_VAULT_PORT: u16 = 8200;

#[derive(Parser, Debug)]
#[command(
    name = "vervet",
    version,
    about = "A utility for unsealing HashiCorp Vault with YubiKeys",
    long_about = "Vervet is a CLI utility that streamlines Vault unseal operations. \
                  The tool decrypts PGP-encrypted Vault unseal keys using the YubiKey \
                  OpenPGP applet and submits them to the configured servers."
)]
pub struct Cli {
    /// Config file (default is $HOME/.vervet/vervet.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured clusters or connected YubiKeys
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Show details of a cluster or a YubiKey
    Show {
        #[command(subcommand)]
        target: ShowTarget,
    },
    /// Decrypt unseal keys and unseal Vault servers
    Unseal {
        #[command(subcommand)]
        target: UnsealTarget,
    },
    /// Advance a root token generation ceremony
    GenerateRoot {
        #[command(subcommand)]
        target: GenerateRootTarget,
    },
}

#[derive(Subcommand, Debug)]
enum ListTarget {
    /// Enumerate configured Vault clusters
    Clusters,
    /// Enumerate connected YubiKeys
    Yubikeys,
}

#[derive(Subcommand, Debug)]
enum ShowTarget {
    /// Cluster overview and remote seal status
    Cluster { name: String },
    /// Full details of one YubiKey
    Yubikey { serial: String },
}

#[derive(Subcommand, Debug)]
enum UnsealTarget {
    /// Decrypt a key file and unseal one server
    Server {
        host: String,
        key_file: PathBuf,

        /// Vault API port
        #[arg(short = 'p', long, default_value_t = DEFAULT_VAULT_PORT)]
        port: u16,

        /// Disable TLS
        #[arg(short = 'i', long)]
        insecure: bool,

        /// Key file holds binary PGP data instead of base64 text
        #[arg(short = 'b', long)]
        binary: bool,
    },
    /// Decrypt the configured shares and unseal every server
    Cluster { name: String },
}

#[derive(Subcommand, Debug)]
enum GenerateRootTarget {
    /// Advance the root ceremony on one server
    Server {
        host: String,
        key_file: PathBuf,

        /// Vault API port
        #[arg(short = 'p', long, default_value_t = DEFAULT_VAULT_PORT)]
        port: u16,

        /// Disable TLS
        #[arg(short = 'i', long)]
        insecure: bool,

        /// Nonce of the root generation attempt
        #[arg(short = 'n', long)]
        nonce: Option<String>,
    },
    /// Advance the root ceremony on the first server of a cluster
    Cluster {
        name: String,

        /// Nonce of the root generation attempt
        #[arg(short = 'n', long)]
        nonce: Option<String>,
    },
}

impl Cli {
    pub fn run(&self, printer: &Printer) -> Result<(), Error> {
        match &self.command {
            Commands::List { target } => match target {
                ListTarget::Clusters => {
                    let config = self.load_config()?;
                    listing::list_clusters(printer, &config)
                }
                ListTarget::Yubikeys => {
                    let registry = TokenRegistry::connect()?;
                    let infos: Vec<_> = registry.tokens().iter().map(|t| t.info()).collect();
                    listing::list_yubikeys(printer, &infos);
                    registry.disconnect();
                    Ok(())
                }
            },

            Commands::Show { target } => match target {
                ShowTarget::Cluster { name } => {
                    let config = self.load_config()?;
                    let servers = listing::show_cluster(printer, name, &config)?;
                    let client =
                        VaultClient::new(&servers[0], DEFAULT_VAULT_PORT, false)?;
                    listing::report_seal_status(printer, &client.host(), &client)
                }
                ShowTarget::Yubikey { serial } => {
                    let registry = TokenRegistry::connect()?;
                    let result = match registry.find_by_serial(serial) {
                        Some(token) => {
                            listing::show_yubikey(printer, token.info());
                            Ok(())
                        }
                        None => Err(Error::UnknownSerial(serial.clone())),
                    };
                    registry.disconnect();
                    result
                }
            },

            Commands::Unseal { target } => match target {
                UnsealTarget::Server {
                    host,
                    key_file,
                    port,
                    insecure,
                    binary,
                } => {
                    let shares = if *binary {
                        vec![config::read_binary_key_file(key_file)?]
                    } else {
                        config::read_key_file(key_file)?
                    };
                    let shares = dedupe(printer, shares);

                    let keys = ops::decrypt_with_tokens(printer, &shares)?;
                    let client = VaultClient::new(host, *port, *insecure)?;
                    let servers = vec![(client.host(), client)];
                    unseal::unseal_servers(printer, &servers, &keys)
                }
                UnsealTarget::Cluster { name } => {
                    let config = self.load_config()?;
                    let cluster = config.cluster(name)?;
                    if cluster.servers.is_empty() {
                        return Err(Error::NoServers);
                    }

                    let (shares, duplicates) = cluster.effective_keys()?;
                    report_duplicates(printer, duplicates);

                    let keys = ops::decrypt_with_tokens(printer, &shares)?;
                    let servers = cluster
                        .servers
                        .iter()
                        .map(|host| {
                            let client = VaultClient::new(host, DEFAULT_VAULT_PORT, false)?;
                            Ok((client.host(), client))
                        })
                        .collect::<Result<Vec<_>, Error>>()?;
                    unseal::unseal_servers(printer, &servers, &keys)
                }
            },

            Commands::GenerateRoot { target } => match target {
                GenerateRootTarget::Server {
                    host,
                    key_file,
                    port,
                    insecure,
                    nonce,
                } => {
                    let shares = dedupe(printer, config::read_key_file(key_file)?);
                    let keys = ops::decrypt_with_tokens(printer, &shares)?;
                    let client = VaultClient::new(host, *port, *insecure)?;
                    generate_root::generate_root(
                        printer,
                        &client.host(),
                        &client,
                        &keys,
                        nonce.as_deref(),
                    )
                }
                GenerateRootTarget::Cluster { name, nonce } => {
                    let config = self.load_config()?;
                    let cluster = config.cluster(name)?;
                    if cluster.servers.is_empty() {
                        return Err(Error::NoServers);
                    }

                    let (shares, duplicates) = cluster.effective_keys()?;
                    report_duplicates(printer, duplicates);

                    let keys = ops::decrypt_with_tokens(printer, &shares)?;
                    let client =
                        VaultClient::new(&cluster.servers[0], DEFAULT_VAULT_PORT, false)?;
                    generate_root::generate_root(
                        printer,
                        &client.host(),
                        &client,
                        &keys,
                        nonce.as_deref(),
                    )
                }
            },
        }
    }

    fn load_config(&self) -> Result<Config, Error> {
        Ok(Config::load(self.config.as_deref())?)
    }
}

fn dedupe(printer: &Printer, shares: Vec<String>) -> Vec<String> {
    let unique = config::unique(&shares);
    report_duplicates(printer, shares.len() - unique.len());
    unique
}

fn report_duplicates(printer: &Printer, duplicates: usize) {
    if duplicates > 0 {
        printer.info(&format!("removed {} duplicate key share(s)", duplicates));
    }
}
