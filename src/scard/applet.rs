//! OpenPGP applet driver
//!
//! The four host-side operations this tool needs: SELECT, GET DATA
//! (with 61xx response chaining), VERIFY and PSO:DECIPHER. Every
//! operation is a blocking APDU round trip.

use log::debug;
use pcsc::Card;

use crate::apdu::{ins, Command};

use super::data_objects::{self, DataObject};
use super::session;
use super::token::PinBank;
use super::CardError;

/// OpenPGP applet AID
pub const OPENPGP_AID: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x24, 0x01];

/// AES block size; DECIPHER input must be a multiple of it
const CIPHER_BLOCK_SIZE: usize = 16;

/// Select the OpenPGP application
///
/// Returns `Ok(false)` if the card rejects the AID; such readers are
/// skipped rather than treated as an error.
pub fn select_openpgp(card: &Card) -> Result<bool, CardError> {
    let cmd = Command::with_data(0x00, ins::SELECT, 0x04, 0x00, OPENPGP_AID.to_vec());
    let response = session::transmit(card, &cmd)?;

    if !response.is_success() {
        debug!(
            "SELECT rejected with status {:02X} {:02X}, not an OpenPGP card",
            response.sw1, response.sw2
        );
        return Ok(false);
    }

    Ok(true)
}

/// Read a data object, following the 61xx response-chaining protocol
pub fn get_data(card: &Card, object: &DataObject) -> Result<Vec<u8>, CardError> {
    let cmd = Command::new(0x00, ins::GET_DATA, object.tag_p1(), object.tag_p2());
    let mut response = session::transmit(card, &cmd)?;
    let mut data = response.data.clone();

    while !response.is_success() {
        if response.more_data().is_none() {
            return Err(CardError::GetData);
        }

        let chain = Command::new(0x00, ins::GET_RESPONSE, 0x00, 0x00);
        response = session::transmit(card, &chain)?;
        data.extend_from_slice(&response.data);
    }

    Ok(data)
}

/// Verify a PIN against the given bank
///
/// On rejection the PW-status object is consulted so the caller learns
/// how many retries the bank has left.
pub fn verify_pin(card: &Card, bank: PinBank, pin: &[u8]) -> Result<(), CardError> {
    let cmd = Command::with_data(0x00, ins::VERIFY, 0x00, bank.p2(), pin.to_vec());
    let response = session::transmit(card, &cmd)?;

    if !response.is_success() {
        let retries = pw1_retries(card)?;
        return Err(CardError::PinInvalid { retries });
    }

    Ok(())
}

/// Decrypt an RSA ciphertext block with the key in the decryption slot
///
/// The RSA padding indicator byte 0x00 is prepended; extended length
/// fields are used since the ciphertext exceeds a short Lc. Callers
/// validate the session-key layout of the returned bytes.
pub fn decipher(card: &Card, ciphertext: &[u8]) -> Result<Vec<u8>, CardError> {
    if ciphertext.is_empty() || ciphertext.len() % CIPHER_BLOCK_SIZE != 0 {
        return Err(CardError::DecipherInput);
    }

    let mut data = Vec::with_capacity(ciphertext.len() + 1);
    data.push(0x00);
    data.extend_from_slice(ciphertext);

    let mut cmd = Command::with_data(0x00, ins::PSO, 0x80, 0x86, data);
    cmd.padding_indicator = true;
    cmd.extended_length = true;

    let response = session::transmit(card, &cmd)?;
    if !response.is_success() {
        return Err(CardError::Unsuccessful {
            sw1: response.sw1,
            sw2: response.sw2,
        });
    }

    Ok(response.data)
}

/// Read the PW1 retry counter from the PW-status data object
fn pw1_retries(card: &Card) -> Result<u8, CardError> {
    let status = get_data(card, &data_objects::PW_STATUS)?;
    status
        .get(4)
        .copied()
        .ok_or(CardError::MalformedDataObject("password status"))
}
