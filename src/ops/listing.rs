//! Listing and status presentation
//!
//! Formats clusters, tokens and remote status blocks for the operator.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::Error;
use crate::printer::Printer;
use crate::scard::token::{AlgorithmAttributes, TokenInfo, ALGO_ID_ECDH, ALGO_ID_ECDSA};
use crate::vault::{GenerateRootStatus, SealStatus, VaultApi};

/// Enumerate configured clusters with key and duplicate counts
pub fn list_clusters(printer: &Printer, config: &Config) -> Result<(), Error> {
    if config.cluster.is_empty() {
        printer.info("no Vault clusters configured");
        return Ok(());
    }

    for (name, cluster) in &config.cluster {
        printer.header(name);
        printer.kv_slice("Server(s)", &cluster.servers);
        let (keys, duplicates) = cluster.effective_keys()?;
        printer.kv("Key(s)", key_count(keys.len() + duplicates, duplicates));
    }

    Ok(())
}

/// One line per admitted token plus its three subkeys
pub fn list_yubikeys(printer: &Printer, tokens: &[&TokenInfo]) {
    for info in tokens {
        printer.header(&format!(
            "{} (serial {})",
            info.reader_label,
            info.aid.serial_hex()
        ));
        printer.kv("Signature key", subkey_summary(&info.algo_sign, &info.fingerprints.sign));
        printer.kv("Encryption key", subkey_summary(&info.algo_enc, &info.fingerprints.enc));
        printer.kv(
            "Authentication key",
            subkey_summary(&info.algo_auth, &info.fingerprints.auth),
        );
    }
}

/// Cluster overview: servers and effective key count
pub fn show_cluster(printer: &Printer, name: &str, config: &Config) -> Result<Vec<String>, Error> {
    let cluster = config.cluster(name)?;
    if cluster.servers.is_empty() {
        return Err(Error::NoServers);
    }

    printer.header("Vault Cluster Status");
    printer.kv_slice("Server(s)", &cluster.servers);
    let (keys, duplicates) = cluster.effective_keys()?;
    printer.kv("Key(s)", key_count(keys.len() + duplicates, duplicates));

    Ok(cluster.servers.clone())
}

/// Full token details in card-status style
pub fn show_yubikey(printer: &Printer, info: &TokenInfo) {
    let aid = &info.aid;

    printer.kv("Reader ...........", &info.reader_label);
    printer.kv(
        "Application ID ...",
        format!(
            "{}{:02x}{}{}{}{}",
            hex::encode(aid.rid),
            aid.application,
            hex::encode(aid.version),
            hex::encode(aid.manufacturer),
            hex::encode(aid.serial),
            hex::encode(aid.rfu)
        ),
    );
    printer.kv("Application type .", "OpenPGP");
    printer.kv(
        "Version ..........",
        format!("{}.{}", aid.version[0], aid.version[1]),
    );
    printer.kv("Manufacturer .....", "Yubico");
    printer.kv("Serial number ....", aid.serial_hex());
    printer.kv(
        "Name of cardholder",
        info.cardholder.name.replace("<<", " "),
    );
    printer.kv("Language prefs ...", &info.cardholder.language_prefs);
    printer.kv(
        "Salutation .......",
        (info.cardholder.salutation as char).to_string(),
    );
    printer.kv(
        "Key attributes ...",
        format!(
            "{} {} {}",
            algo_summary(&info.algo_sign),
            algo_summary(&info.algo_enc),
            algo_summary(&info.algo_auth)
        ),
    );
    printer.kv(
        "Max. PIN lengths .",
        format!(
            "{} {} {}",
            info.pw_status.pw1_max_len, info.pw_status.pw1_max_len_rc, info.pw_status.pw3_max_len
        ),
    );
    printer.kv(
        "PIN retry counter ",
        format!(
            "{} {} {}",
            info.pw_status.pw1_retries, info.pw_status.pw1_rc_retries, info.pw_status.pw3_retries
        ),
    );
    printer.kv("Signature key ....", fmt_fingerprint(&info.fingerprints.sign));
    printer.kv("      created ....", fmt_timestamp(info.key_gen_dates.sign));
    printer.kv("Encryption key....", fmt_fingerprint(&info.fingerprints.enc));
    printer.kv("      created ....", fmt_timestamp(info.key_gen_dates.enc));
    printer.kv("Authentication key", fmt_fingerprint(&info.fingerprints.auth));
    printer.kv("      created ....", fmt_timestamp(info.key_gen_dates.auth));
}

/// Print the seal status block of one server
pub fn print_seal_status(printer: &Printer, host: &str, status: &SealStatus) {
    printer.kv("Vault server", host);

    if !status.initialized {
        printer.line("Vault server is not initialized");
        return;
    }

    if !status.sealed {
        printer.kv("Cluster name", &status.cluster_name);
        printer.kv("Cluster ID", &status.cluster_id);
    }

    let state = if status.sealed { "sealed" } else { "unsealed" };
    printer.kv("Seal status", state);
    printer.kv(
        "Key threshold/shares",
        format!("{}/{}", status.threshold, status.shares),
    );
    printer.kv(
        "Progress",
        format!("{}/{}", status.progress, status.threshold),
    );
    printer.kv("Version", &status.version);
}

/// Query and print the seal status of one server
pub fn report_seal_status<V: VaultApi>(
    printer: &Printer,
    host: &str,
    client: &V,
) -> Result<(), Error> {
    let status = client.seal_status()?;
    print_seal_status(printer, host, &status);
    Ok(())
}

/// Print the root-generation status block
pub fn print_generate_root_status(printer: &Printer, host: &str, status: &GenerateRootStatus) {
    printer.kv("Vault server", host);
    printer.kv("Started", status.started);
    printer.kv("Complete", status.complete);
    printer.kv(
        "Progress",
        format!("{}/{}", status.progress, status.required),
    );
    printer.kv("Nonce", &status.nonce);

    if !status.pgp_fingerprint.is_empty() {
        printer.kv("PGP fingerprint", &status.pgp_fingerprint);
    }
    if !status.encoded_root_token.is_empty() {
        printer.kv("Encoded root token", &status.encoded_root_token);
    }
}

fn key_count(total: usize, duplicates: usize) -> String {
    if duplicates > 0 {
        format!("{} ({} duplicates)", total, duplicates)
    } else {
        total.to_string()
    }
}

/// `rsa2048/1122334455667788` style subkey summary
fn subkey_summary(attrs: &AlgorithmAttributes, fingerprint: &[u8; 20]) -> String {
    format!(
        "{}/{}",
        algo_summary(attrs),
        hex::encode_upper(&fingerprint[12..20])
    )
}

fn algo_summary(attrs: &AlgorithmAttributes) -> String {
    if attrs.is_rsa() {
        format!("rsa{}", attrs.rsa_modulus_bits)
    } else {
        match attrs.id {
            ALGO_ID_ECDH => "ecdh".to_string(),
            ALGO_ID_ECDSA => "ecdsa".to_string(),
            other => format!("algo{}", other),
        }
    }
}

/// Fingerprint in the familiar 4-character groups with a wider gap in
/// the middle
fn fmt_fingerprint(fp: &[u8; 20]) -> String {
    let hex = hex::encode_upper(fp);
    let groups: Vec<&str> = (0..10).map(|i| &hex[i * 4..i * 4 + 4]).collect();
    format!("{}  {}", groups[..5].join(" "), groups[5..].join(" "))
}

fn fmt_timestamp(epoch: u32) -> String {
    DateTime::<Utc>::from_timestamp(epoch as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_grouping() {
        let fp: [u8; 20] = [
            0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6, 0x07, 0x18, 0x29, 0x3A, 0x4B, 0x5C, 0x6D, 0x7E,
            0x8F, 0x90, 0x01, 0x12, 0x23, 0x34,
        ];
        assert_eq!(
            fmt_fingerprint(&fp),
            "A1B2 C3D4 E5F6 0718 293A  4B5C 6D7E 8F90 0112 2334"
        );
    }

    #[test]
    fn subkey_summary_uses_key_id_tail() {
        let attrs = AlgorithmAttributes {
            id: crate::scard::token::ALGO_ID_RSA,
            rsa_modulus_bits: 2048,
            rsa_exponent_bits: 32,
            curve_oid: Vec::new(),
            import_format: 1,
        };
        let mut fp = [0u8; 20];
        fp[12..20].copy_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        assert_eq!(subkey_summary(&attrs, &fp), "rsa2048/1122334455667788");
    }

    #[test]
    fn key_counts() {
        assert_eq!(key_count(3, 0), "3");
        assert_eq!(key_count(5, 2), "5 (2 duplicates)");
    }

    #[test]
    fn timestamps_render_utc() {
        assert_eq!(fmt_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(fmt_timestamp(1_614_600_000), "2021-03-01 12:00:00 UTC");
    }
}
