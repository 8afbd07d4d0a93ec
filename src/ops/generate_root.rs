//! Root-generation orchestration
//!
//! Advances an already-initiated root token ceremony by feeding
//! decrypted key shares under the ceremony nonce.

use crate::error::Error;
use crate::printer::Printer;
use crate::vault::VaultApi;

use super::listing::print_generate_root_status;

/// Feed shares to the ceremony on one server
///
/// The ceremony is initiated out of band; if it has not been started
/// this reports a warning and performs no updates. The nonce is taken
/// from the remote ceremony state unless one is passed explicitly.
pub fn generate_root<V: VaultApi>(
    printer: &Printer,
    host: &str,
    client: &V,
    keys: &[String],
    nonce: Option<&str>,
) -> Result<(), Error> {
    let status = client.generate_root_status()?;

    if !status.started {
        printer.warning(&format!(
            "{} - root token generation process has not been started",
            host
        ));
        return Ok(());
    }

    let nonce = nonce.unwrap_or(&status.nonce).to_string();
    let mut latest = status;

    for key in keys {
        latest = client.generate_root_update(key, &nonce)?;
        printer.info(&format!(
            "{} - root generation progress {}/{}",
            host, latest.progress, latest.required
        ));

        if latest.complete {
            printer.success(&format!("{} - root token generation complete", host));
            break;
        }
    }

    print_generate_root_status(printer, host, &latest);
    Ok(())
}
