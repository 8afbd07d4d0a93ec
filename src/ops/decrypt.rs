//! Decrypt coordinator
//!
//! Turns base64 shares into plaintext unseal keys: route the PKESK to
//! the token holding the key, verify the decryption PIN (cached per
//! token for the session), DECIPHER the session key on the token, then
//! decrypt the symmetric packet in software.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zeroize::Zeroizing;

use crate::error::Error;
use crate::pgp;
use crate::printer::Printer;
use crate::scard::{CardError, PinBank, TokenOps};

/// Minimum plaintext unseal key length in raw bytes
pub const UNSEAL_KEY_MIN: usize = 16;
/// Maximum plaintext unseal key length in raw bytes
pub const UNSEAL_KEY_MAX: usize = 33;

/// A PIN source; the interactive one prompts on the terminal
pub type PinPrompt<'a> = &'a mut dyn FnMut() -> Result<Zeroizing<Vec<u8>>, Error>;

/// Result of decrypting one message
#[derive(Debug)]
pub struct MessageDetails {
    /// The message carried an encrypted session key
    pub is_encrypted: bool,
    /// Key id the session key was encrypted to
    pub decrypted_with: u64,
    /// Fingerprint of the matching subkey, upper-case hex
    pub fingerprint: String,
    /// Serial of the token that deciphered the session key
    pub token_serial: String,
    /// The literal-data plaintext
    pub body: Vec<u8>,
}

/// Decrypt a binary OpenPGP message with whichever token owns its key
///
/// Performs a single VERIFY attempt; an invalid PIN surfaces as
/// `CardError::PinInvalid` carrying the remaining retries, and the
/// caller decides whether to prompt again.
pub fn read_message<T: TokenOps>(
    tokens: &mut [T],
    msg: &[u8],
    prompt: PinPrompt,
) -> Result<MessageDetails, Error> {
    let pkesk = pgp::read_pkesk(msg)?;

    let token = tokens
        .iter_mut()
        .find(|t| t.holds_key_id(pkesk.key_id))
        .ok_or(Error::KeyNotOnAnyToken(pkesk.key_id))?;

    // PIN format violations surface from the prompt before any card
    // contact; a cached PIN was already verified this session
    let pin = match token.cached_pin(PinBank::Decryption) {
        Some(pin) => pin,
        None => prompt()?,
    };

    token.verify_pin(PinBank::Decryption, &pin)?;
    token.cache_pin(PinBank::Decryption, &pin);

    let blob = token.decipher(&pkesk.ciphertext)?;
    let session_key = pgp::session_key_from_blob(&blob)?;

    let body = pgp::read_encrypted_packets(&msg[pkesk.packet_len..], &session_key)?;

    let info = token.info();
    let fingerprint = info
        .fingerprints
        .iter()
        .find(|fp| u64::from_be_bytes(fp[12..20].try_into().unwrap()) == pkesk.key_id)
        .map(hex::encode_upper)
        .unwrap_or_default();

    Ok(MessageDetails {
        is_encrypted: true,
        decrypted_with: pkesk.key_id,
        fingerprint,
        token_serial: info.aid.serial_hex(),
        body,
    })
}

/// Decrypt one base64 share into a plaintext unseal key
///
/// Re-prompts on an invalid PIN while the bank has retries left; an
/// exhausted bank aborts with `PinLocked`.
pub fn decrypt_share<T: TokenOps>(
    tokens: &mut [T],
    share: &str,
    prompt: PinPrompt,
    printer: &Printer,
) -> Result<String, Error> {
    let msg = STANDARD
        .decode(share.trim())
        .map_err(|_| Error::NotBase64)?;

    loop {
        match read_message(tokens, &msg, prompt) {
            Ok(details) => {
                let key = validate_unseal_key(details.body)?;
                printer.success(&format!(
                    "decrypted unseal key with PGP key {} (YubiKey {})",
                    details.fingerprint, details.token_serial
                ));
                return Ok(key);
            }
            Err(Error::Card(CardError::PinInvalid { retries })) => {
                if retries == 0 {
                    return Err(CardError::PinLocked.into());
                }
                printer.error(&CardError::PinInvalid { retries }.to_string());
            }
            Err(err) => return Err(err),
        }
    }
}

/// Decrypt every share, reporting and skipping per-share failures
///
/// Fails only if no share decrypted, or on a terminal condition (an
/// unknown key, a locked PIN bank, card transport trouble).
pub fn decrypt_shares<T: TokenOps>(
    tokens: &mut [T],
    shares: &[String],
    prompt: PinPrompt,
    printer: &Printer,
) -> Result<Vec<String>, Error> {
    let mut keys = Vec::new();

    for share in shares {
        match decrypt_share(tokens, share, prompt, printer) {
            Ok(key) => keys.push(key),
            Err(err) if is_share_failure(&err) => printer.warning(&err.to_string()),
            Err(err) => return Err(err),
        }
    }

    if keys.is_empty() {
        return Err(Error::NoKeysDecrypted);
    }

    printer.success(&format!(
        "decrypted {} of {} unseal key(s)",
        keys.len(),
        shares.len()
    ));
    Ok(keys)
}

/// The plaintext encodes hex characters, so the raw key length is half
/// the body length; enforce the gate before accepting the share.
fn validate_unseal_key(body: Vec<u8>) -> Result<String, Error> {
    let raw_len = body.len() / 2;
    if raw_len < UNSEAL_KEY_MIN {
        return Err(Error::PlaintextTooShort);
    }
    if raw_len > UNSEAL_KEY_MAX {
        return Err(Error::PlaintextTooLong);
    }

    String::from_utf8(body).map_err(|_| Error::PlaintextEncoding)
}

// Failures that skip the share; anything else aborts the invocation.
fn is_share_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::NotBase64
            | Error::Pgp(_)
            | Error::PlaintextTooShort
            | Error::PlaintextTooLong
            | Error::PlaintextEncoding
            | Error::PinFormat(_)
            | Error::Card(CardError::DecipherInput)
    )
}

/// Read the decryption PIN from the terminal
///
/// Bank-2 PINs are 6 to 127 characters, digits only; violations are
/// rejected before the card is contacted.
pub fn prompt_pin() -> Result<Zeroizing<Vec<u8>>, Error> {
    let pin = Zeroizing::new(rpassword::prompt_password("Enter YubiKey OpenPGP PIN: ")?);
    validate_pin(pin.as_bytes())?;
    Ok(Zeroizing::new(pin.as_bytes().to_vec()))
}

fn validate_pin(pin: &[u8]) -> Result<(), Error> {
    if pin.len() < 6 || pin.len() > 127 {
        return Err(Error::PinFormat("expected PIN length of 6-127 characters"));
    }

    if pin.iter().any(|b| !b.is_ascii_digit()) {
        return Err(Error::PinFormat("only digits 0-9 are valid PIN characters"));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pgp::PgpError;
    use crate::scard::token::tests::test_info;
    use crate::scard::TokenInfo;

    pub(crate) const KEY_ID: u64 = 0xA1B2C3D4E5F60718;
    pub(crate) const SESSION_KEY: [u8; 16] = crate::pgp::decrypt::tests::TEST_KEY;
    pub(crate) const GOOD_PIN: &[u8] = b"123456";

    pub(crate) struct MockToken {
        pub(crate) info: TokenInfo,
        pub(crate) cached: Option<Zeroizing<Vec<u8>>>,
        pub(crate) retries: u8,
        pub(crate) verify_calls: usize,
        pub(crate) decipher_calls: usize,
        pub(crate) blob: Vec<u8>,
    }

    impl MockToken {
        pub(crate) fn new(enc_fp_tail: u64) -> Self {
            let mut blob = vec![crate::pgp::CIPHER_AES128];
            blob.extend_from_slice(&SESSION_KEY);
            blob.extend_from_slice(&[0x00, 0x00]);

            Self {
                info: test_info([0xAA, 0xBB, 0xCC, 0xDD], enc_fp_tail),
                cached: None,
                retries: 3,
                verify_calls: 0,
                decipher_calls: 0,
                blob,
            }
        }
    }

    impl TokenOps for MockToken {
        fn info(&self) -> &TokenInfo {
            &self.info
        }

        fn cached_pin(&self, _bank: PinBank) -> Option<Zeroizing<Vec<u8>>> {
            self.cached.clone()
        }

        fn cache_pin(&mut self, _bank: PinBank, pin: &[u8]) {
            self.cached = Some(Zeroizing::new(pin.to_vec()));
        }

        fn verify_pin(&mut self, _bank: PinBank, pin: &[u8]) -> Result<(), CardError> {
            self.verify_calls += 1;
            if pin == GOOD_PIN {
                return Ok(());
            }
            self.retries -= 1;
            Err(CardError::PinInvalid {
                retries: self.retries,
            })
        }

        fn decipher(&mut self, _ciphertext: &[u8]) -> Result<Vec<u8>, CardError> {
            self.decipher_calls += 1;
            Ok(self.blob.clone())
        }
    }

    pub(crate) fn share_for(key_id: u64, content: &[u8]) -> String {
        let mut msg = crate::pgp::packet::tests::encode_pkesk(key_id, &[0x42; 256]);
        msg.extend(crate::pgp::decrypt::tests::encode_seipd(content, &SESSION_KEY));
        STANDARD.encode(msg)
    }

    pub(crate) fn good_pin() -> Result<Zeroizing<Vec<u8>>, Error> {
        Ok(Zeroizing::new(GOOD_PIN.to_vec()))
    }

    #[test]
    fn share_decrypts_end_to_end() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let share = share_for(KEY_ID, content);

        let keys = decrypt_shares(&mut tokens, &[share], &mut good_pin, &Printer::new()).unwrap();
        assert_eq!(keys, vec![String::from_utf8_lossy(content).to_string()]);
        assert_eq!(tokens[0].verify_calls, 1);
        assert_eq!(tokens[0].decipher_calls, 1);
    }

    #[test]
    fn message_details_name_fingerprint_and_serial() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let msg = STANDARD
            .decode(share_for(KEY_ID, content))
            .unwrap();

        let details = read_message(&mut tokens, &msg, &mut good_pin).unwrap();
        assert!(details.is_encrypted);
        assert_eq!(details.decrypted_with, KEY_ID);
        assert_eq!(details.token_serial, "aabbccdd");
        assert!(details.fingerprint.ends_with("A1B2C3D4E5F60718"));
        assert_eq!(details.body, content);
    }

    #[test]
    fn pin_is_cached_across_shares() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let shares = vec![share_for(KEY_ID, content), share_for(KEY_ID, content)];

        let mut prompts = 0;
        let mut prompt = || {
            prompts += 1;
            good_pin()
        };

        let keys = decrypt_shares(&mut tokens, &shares, &mut prompt, &Printer::new()).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(prompts, 1);
        assert_eq!(tokens[0].verify_calls, 2);
    }

    #[test]
    fn unknown_key_id_is_terminal() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let share = share_for(0xDEADBEEFDEADBEEF, content);

        let err =
            decrypt_shares(&mut tokens, &[share], &mut good_pin, &Printer::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "decryption key DEADBEEFDEADBEEF could not be found on any token"
        );
        assert_eq!(tokens[0].verify_calls, 0);
    }

    #[test]
    fn wrong_pin_decrements_until_locked() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let share = share_for(KEY_ID, content);

        let mut prompt = || -> Result<Zeroizing<Vec<u8>>, Error> {
            Ok(Zeroizing::new(b"000000".to_vec()))
        };
        let err =
            decrypt_shares(&mut tokens, &[share], &mut prompt, &Printer::new()).unwrap_err();

        assert_eq!(err.to_string(), "PIN bank locked, no retries remaining");
        // three attempts burned the three retries, and the coordinator
        // never reached DECIPHER
        assert_eq!(tokens[0].verify_calls, 3);
        assert_eq!(tokens[0].decipher_calls, 0);
    }

    #[test]
    fn wrong_pin_then_correct_pin_recovers() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let share = share_for(KEY_ID, content);

        let mut attempts = 0;
        let mut prompt = || {
            attempts += 1;
            if attempts == 1 {
                Ok(Zeroizing::new(b"999999".to_vec()))
            } else {
                good_pin()
            }
        };

        let key = decrypt_share(&mut tokens, &share, &mut prompt, &Printer::new()).unwrap();
        assert_eq!(key.len(), 48);
        assert_eq!(tokens[0].verify_calls, 2);
        assert_eq!(tokens[0].retries, 2);
    }

    #[test]
    fn undecryptable_shares_are_skipped_not_fatal() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let shares = vec!["!!! not base64 !!!".to_string(), share_for(KEY_ID, content)];

        let keys = decrypt_shares(&mut tokens, &shares, &mut good_pin, &Printer::new()).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn all_shares_failing_is_fatal() {
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let shares = vec!["AAAA".to_string()];

        let err =
            decrypt_shares(&mut tokens, &shares, &mut good_pin, &Printer::new()).unwrap_err();
        assert!(matches!(err, Error::NoKeysDecrypted));
    }

    #[test]
    fn plaintext_length_gate() {
        // 30 characters -> 15 raw bytes, below the minimum
        let short = vec![b'a'; 30];
        assert!(matches!(
            validate_unseal_key(short),
            Err(Error::PlaintextTooShort)
        ));

        // 68 characters -> 34 raw bytes, above the maximum
        let long = vec![b'a'; 68];
        assert!(matches!(
            validate_unseal_key(long),
            Err(Error::PlaintextTooLong)
        ));

        // 32 and 66 characters are the inclusive bounds
        assert!(validate_unseal_key(vec![b'a'; 32]).is_ok());
        assert!(validate_unseal_key(vec![b'a'; 66]).is_ok());
    }

    #[test]
    fn short_plaintext_skips_share() {
        let mut tokens = vec![MockToken::new(KEY_ID)];
        let shares = vec![
            share_for(KEY_ID, b"deadbeef"),
            share_for(KEY_ID, b"a1b2c3d4e5f6071801020304050607080910111213141516"),
        ];

        let keys = decrypt_shares(&mut tokens, &shares, &mut good_pin, &Printer::new()).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn wrong_cipher_id_in_blob_skips_share() {
        let content = b"a1b2c3d4e5f6071801020304050607080910111213141516";
        let mut tokens = vec![MockToken::new(KEY_ID)];
        tokens[0].blob[0] = 9; // AES-256

        let msg = STANDARD.decode(share_for(KEY_ID, content)).unwrap();
        let err = read_message(&mut tokens, &msg, &mut good_pin).unwrap_err();
        assert!(matches!(err, Error::Pgp(PgpError::UnsupportedCipher(9))));
        assert!(is_share_failure(&err));
    }

    #[test]
    fn pin_format_rules() {
        assert!(validate_pin(b"123456").is_ok());
        assert!(validate_pin(b"12345").is_err());
        assert!(validate_pin(&[b'1'; 128]).is_err());
        assert!(validate_pin(b"12345a").is_err());
        assert!(validate_pin(&[b'9'; 127]).is_ok());
    }
}
