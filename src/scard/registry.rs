//! Token registry
//!
//! Owns the PC/SC context and the ordered set of admitted tokens.
//! Admission requires a present card, a successful SELECT of the
//! OpenPGP AID and a Yubico manufacturer id; everything else is
//! silently skipped.

use log::debug;
use once_cell::sync::Lazy;
use pcsc::Context;
use regex::Regex;

use super::token::{Token, TokenOps, YUBICO_MANUFACTURER};
use super::{applet, data_objects, session, CardError, TokenInfo};

// reader names carry a trailing slot index ("Yubico YubiKey CCID 00")
static READER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?) [0-9]{2}$").unwrap());

/// The connected tokens and the context they live in
pub struct TokenRegistry {
    // held for the lifetime of the tokens; released on drop
    _ctx: Context,
    tokens: Vec<Token>,
}

impl TokenRegistry {
    /// Establish the PC/SC context and admit every eligible token
    ///
    /// Readers are connected in enumeration order after the presence
    /// wait; metadata is read once per admitted token.
    pub fn connect() -> Result<Self, CardError> {
        let ctx = session::establish()?;
        let readers = session::list_readers(&ctx)?;
        let present = session::wait_until_present(&ctx, &readers)?;

        let mut tokens = Vec::new();
        for reader in &present {
            let card = session::connect(&ctx, reader)?;

            if !applet::select_openpgp(&card)? {
                continue;
            }

            let app_image = applet::get_data(&card, &data_objects::APPLICATION_RELATED_DATA)?;
            let cardholder_image =
                applet::get_data(&card, &data_objects::CARDHOLDER_RELATED_DATA)?;

            let label = strip_reader_suffix(&reader.to_string_lossy());
            let info = TokenInfo::parse(label, &app_image, &cardholder_image)?;

            if info.aid.manufacturer != YUBICO_MANUFACTURER {
                debug!(
                    "skipping non-Yubico OpenPGP card in reader {}",
                    info.reader_label
                );
                continue;
            }

            debug!(
                "admitted token {} in reader {}",
                info.aid.serial_hex(),
                info.reader_label
            );
            tokens.push(Token::new(card, info));
        }

        if tokens.is_empty() {
            return Err(CardError::NoTokens);
        }

        Ok(Self { _ctx: ctx, tokens })
    }

    /// Admitted tokens in reader order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Mutable access for operations that verify PINs or decipher
    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    /// Look a token up by its hex serial number
    pub fn find_by_serial(&self, serial: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.info().aid.serial_hex().eq_ignore_ascii_case(serial))
    }

    /// Look a token up by a 64-bit PGP key id
    pub fn find_by_key_id(&self, key_id: u64) -> Option<&Token> {
        self.tokens.iter().find(|t| t.holds_key_id(key_id))
    }

    /// Reset every card and release the context
    pub fn disconnect(mut self) {
        for token in self.tokens.drain(..) {
            token.release();
        }
        // context released when self drops
    }
}

fn strip_reader_suffix(reader: &str) -> String {
    READER_SUFFIX.replace(reader, "$1").into_owned()
}
