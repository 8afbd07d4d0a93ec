//! Operator workflows
//!
//! The decrypt coordinator, the unseal and root-generation
//! orchestrators, and the listing/status presentation they report
//! through.

pub mod decrypt;
pub mod generate_root;
pub mod listing;
pub mod unseal;

use crate::error::Error;
use crate::printer::Printer;
use crate::scard::TokenRegistry;

/// Connect the token registry, decrypt the shares, then tear the
/// registry down before any network traffic
///
/// Teardown (card reset, context release) runs on the error path too.
pub fn decrypt_with_tokens(printer: &Printer, shares: &[String]) -> Result<Vec<String>, Error> {
    let mut registry = TokenRegistry::connect()?;
    let result = decrypt::decrypt_shares(
        registry.tokens_mut(),
        shares,
        &mut decrypt::prompt_pin,
        printer,
    );
    registry.disconnect();
    result
}
