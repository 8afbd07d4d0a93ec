//! Token metadata and capabilities
//!
//! A token is a card that passed admission: OpenPGP applet selected and
//! manufactured by Yubico. Its application and cardholder data objects
//! are read once at admission and cached here, together with a per-bank
//! PIN cache that lives no longer than the registry session.

use pcsc::{Card, Disposition};
use zeroize::Zeroizing;

use crate::tlv;

use super::applet;
use super::data_objects as objects;
use super::CardError;

/// Algorithm id for RSA in the algorithm-attributes data object
pub const ALGO_ID_RSA: u8 = 1;
/// Algorithm id for ECDH
pub const ALGO_ID_ECDH: u8 = 12;
/// Algorithm id for ECDSA
pub const ALGO_ID_ECDSA: u8 = 13;

/// Manufacturer field of Yubico devices
pub const YUBICO_MANUFACTURER: [u8; 2] = [0x00, 0x06];

/// Parsed Application Identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aid {
    pub rid: [u8; 5],
    pub application: u8,
    pub version: [u8; 2],
    pub manufacturer: [u8; 2],
    pub serial: [u8; 4],
    pub rfu: [u8; 2],
}

impl Aid {
    fn parse(data: &[u8]) -> Result<Self, CardError> {
        if data.len() < 16 {
            return Err(CardError::MalformedDataObject("AID"));
        }

        Ok(Self {
            rid: data[0..5].try_into().unwrap(),
            application: data[5],
            version: data[6..8].try_into().unwrap(),
            manufacturer: data[8..10].try_into().unwrap(),
            serial: data[10..14].try_into().unwrap(),
            rfu: data[14..16].try_into().unwrap(),
        })
    }

    /// Card serial as lower-case hex, the form used for lookups
    pub fn serial_hex(&self) -> String {
        hex::encode(self.serial)
    }
}

/// One slot's algorithm attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlgorithmAttributes {
    pub id: u8,
    pub rsa_modulus_bits: u16,
    pub rsa_exponent_bits: u16,
    pub curve_oid: Vec<u8>,
    pub import_format: u8,
}

impl AlgorithmAttributes {
    fn parse(data: &[u8]) -> Result<Self, CardError> {
        let mut attrs = Self::default();
        let (&id, rest) = data
            .split_first()
            .ok_or(CardError::MalformedDataObject("algorithm attributes"))?;
        attrs.id = id;

        match id {
            ALGO_ID_RSA => {
                if rest.len() < 5 {
                    return Err(CardError::MalformedDataObject("algorithm attributes"));
                }
                attrs.rsa_modulus_bits = u16::from_be_bytes([rest[0], rest[1]]);
                attrs.rsa_exponent_bits = u16::from_be_bytes([rest[2], rest[3]]);
                attrs.import_format = rest[4];
            }
            ALGO_ID_ECDH | ALGO_ID_ECDSA => {
                let (&fmt, oid) = rest
                    .split_last()
                    .ok_or(CardError::MalformedDataObject("algorithm attributes"))?;
                attrs.curve_oid = oid.to_vec();
                attrs.import_format = fmt;
            }
            _ => {}
        }

        Ok(attrs)
    }

    /// Whether the slot holds an RSA key usable by this tool
    pub fn is_rsa(&self) -> bool {
        self.id == ALGO_ID_RSA
    }
}

/// The PW status bytes (data object 0xC4)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PwStatus {
    pub pw1_validity: u8,
    pub pw1_max_len: u8,
    pub pw1_max_len_rc: u8,
    pub pw3_max_len: u8,
    pub pw1_retries: u8,
    pub pw1_rc_retries: u8,
    pub pw3_retries: u8,
}

impl PwStatus {
    fn parse(data: &[u8]) -> Result<Self, CardError> {
        if data.len() < 7 {
            return Err(CardError::MalformedDataObject("password status"));
        }

        Ok(Self {
            pw1_validity: data[0],
            pw1_max_len: data[1],
            pw1_max_len_rc: data[2],
            pw3_max_len: data[3],
            pw1_retries: data[4],
            pw1_rc_retries: data[5],
            pw3_retries: data[6],
        })
    }
}

/// The three 20-byte key fingerprints (data object 0xC5)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprints {
    pub sign: [u8; 20],
    pub enc: [u8; 20],
    pub auth: [u8; 20],
}

impl Fingerprints {
    fn parse(data: &[u8]) -> Result<Self, CardError> {
        if data.len() < 60 {
            return Err(CardError::MalformedDataObject("fingerprints"));
        }

        Ok(Self {
            sign: data[0..20].try_into().unwrap(),
            enc: data[20..40].try_into().unwrap(),
            auth: data[40..60].try_into().unwrap(),
        })
    }

    /// Iterate the three fingerprints in slot order
    pub fn iter(&self) -> impl Iterator<Item = &[u8; 20]> {
        [&self.sign, &self.enc, &self.auth].into_iter()
    }
}

/// Key-pair generation timestamps, seconds since the epoch (0xCD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyGenDates {
    pub sign: u32,
    pub enc: u32,
    pub auth: u32,
}

impl KeyGenDates {
    fn parse(data: &[u8]) -> Result<Self, CardError> {
        if data.len() < 12 {
            return Err(CardError::MalformedDataObject("key generation dates"));
        }

        let stamp = |i: usize| u32::from_be_bytes(data[i..i + 4].try_into().unwrap());
        Ok(Self {
            sign: stamp(0),
            enc: stamp(4),
            auth: stamp(8),
        })
    }
}

/// Cardholder related data (0x65)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cardholder {
    pub name: String,
    pub language_prefs: String,
    pub salutation: u8,
}

/// The cached metadata of an admitted token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Reader name with its trailing index stripped
    pub reader_label: String,
    pub aid: Aid,
    pub algo_sign: AlgorithmAttributes,
    pub algo_enc: AlgorithmAttributes,
    pub algo_auth: AlgorithmAttributes,
    pub pw_status: PwStatus,
    pub fingerprints: Fingerprints,
    pub key_gen_dates: KeyGenDates,
    pub cardholder: Cardholder,
}

impl TokenInfo {
    /// Parse the application and cardholder related data images
    pub fn parse(
        reader_label: String,
        app_image: &[u8],
        cardholder_image: &[u8],
    ) -> Result<Self, CardError> {
        let field = |tag: u16, name: &'static str| -> Result<Vec<u8>, CardError> {
            tlv::find_tag(app_image, tag)?.ok_or(CardError::MalformedDataObject(name))
        };

        let aid = Aid::parse(&field(objects::AID.tag, "AID")?)?;
        let algo_sign =
            AlgorithmAttributes::parse(&field(objects::ALGO_ATTR_SIGN.tag, "algorithm attributes")?)?;
        let algo_enc =
            AlgorithmAttributes::parse(&field(objects::ALGO_ATTR_ENC.tag, "algorithm attributes")?)?;
        let algo_auth =
            AlgorithmAttributes::parse(&field(objects::ALGO_ATTR_AUTH.tag, "algorithm attributes")?)?;
        let pw_status = PwStatus::parse(&field(objects::PW_STATUS.tag, "password status")?)?;
        let fingerprints = Fingerprints::parse(&field(objects::FINGERPRINTS.tag, "fingerprints")?)?;
        let key_gen_dates =
            KeyGenDates::parse(&field(objects::KEY_GEN_DATES.tag, "key generation dates")?)?;

        let text = |tag: u16| -> Result<String, CardError> {
            Ok(tlv::find_tag(cardholder_image, tag)?
                .map(|v| String::from_utf8_lossy(&v).into_owned())
                .unwrap_or_default())
        };
        let cardholder = Cardholder {
            name: text(objects::NAME.tag)?,
            language_prefs: text(objects::LANGUAGE_PREFS.tag)?,
            salutation: tlv::find_tag(cardholder_image, objects::SALUTATION.tag)?
                .and_then(|v| v.first().copied())
                .unwrap_or(0),
        };

        Ok(Self {
            reader_label,
            aid,
            algo_sign,
            algo_enc,
            algo_auth,
            pw_status,
            fingerprints,
            key_gen_dates,
            cardholder,
        })
    }

    /// Whether any of the three subkeys matches the 64-bit PGP key id
    ///
    /// The key id is the big-endian tail of the 20-byte fingerprint.
    pub fn holds_key_id(&self, key_id: u64) -> bool {
        self.fingerprints
            .iter()
            .any(|fp| u64::from_be_bytes(fp[12..20].try_into().unwrap()) == key_id)
    }
}

/// The PIN banks of the OpenPGP applet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinBank {
    /// PW1 for signing (VERIFY P2 = 0x81)
    Signing,
    /// PW1 for decryption and authentication (P2 = 0x82)
    Decryption,
    /// PW3, the admin PIN (P2 = 0x83)
    Admin,
}

impl PinBank {
    /// Bank number 1..3
    pub fn number(self) -> u8 {
        match self {
            PinBank::Signing => 1,
            PinBank::Decryption => 2,
            PinBank::Admin => 3,
        }
    }

    /// P2 of a VERIFY command for this bank
    pub fn p2(self) -> u8 {
        0x80 + self.number()
    }

    fn index(self) -> usize {
        (self.number() - 1) as usize
    }
}

/// Verified PINs, one slot per bank, wiped on drop
#[derive(Default)]
struct PinCache {
    banks: [Option<Zeroizing<Vec<u8>>>; 3],
}

impl PinCache {
    fn get(&self, bank: PinBank) -> Option<Zeroizing<Vec<u8>>> {
        self.banks[bank.index()].clone()
    }

    fn set(&mut self, bank: PinBank, pin: &[u8]) {
        self.banks[bank.index()] = Some(Zeroizing::new(pin.to_vec()));
    }
}

/// The capability set the decrypt coordinator needs from a token
///
/// Only one implementation exists, but the seam keeps the coordinator
/// testable without hardware.
pub trait TokenOps {
    /// Cached metadata read at admission
    fn info(&self) -> &TokenInfo;

    /// Whether one of the subkeys matches the PGP key id
    fn holds_key_id(&self, key_id: u64) -> bool {
        self.info().holds_key_id(key_id)
    }

    /// PIN previously verified for this bank, if any
    fn cached_pin(&self, bank: PinBank) -> Option<Zeroizing<Vec<u8>>>;

    /// Remember a PIN after a successful VERIFY
    fn cache_pin(&mut self, bank: PinBank, pin: &[u8]);

    /// VERIFY the PIN against the bank
    fn verify_pin(&mut self, bank: PinBank, pin: &[u8]) -> Result<(), CardError>;

    /// Run PSO:DECIPHER over the RSA ciphertext
    fn decipher(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CardError>;
}

/// An admitted token: the exclusive card handle plus cached state
pub struct Token {
    card: Card,
    info: TokenInfo,
    pins: PinCache,
}

impl Token {
    pub(crate) fn new(card: Card, info: TokenInfo) -> Self {
        Self {
            card,
            info,
            pins: PinCache::default(),
        }
    }

    /// Reset and disconnect the card
    pub(crate) fn release(self) {
        if let Err((_, err)) = self.card.disconnect(Disposition::ResetCard) {
            log::warn!("failed to reset card on disconnect: {}", err);
        }
    }
}

impl TokenOps for Token {
    fn info(&self) -> &TokenInfo {
        &self.info
    }

    fn cached_pin(&self, bank: PinBank) -> Option<Zeroizing<Vec<u8>>> {
        self.pins.get(bank)
    }

    fn cache_pin(&mut self, bank: PinBank, pin: &[u8]) {
        self.pins.set(bank, pin);
    }

    fn verify_pin(&mut self, bank: PinBank, pin: &[u8]) -> Result<(), CardError> {
        applet::verify_pin(&self.card, bank, pin)
    }

    fn decipher(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CardError> {
        applet::decipher(&self.card, ciphertext)
    }
}
