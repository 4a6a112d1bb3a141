//! Authenticated encryption of small payloads into URL-safe opaque strings.
//!
//! Every sealed value is `base64url(nonce || ciphertext || tag)` where the
//! nonce is 24 random bytes and the cipher is XChaCha20-Poly1305. The same
//! primitive protects pagination cursors, OAuth `state` values and session
//! cookies, so nothing in those payloads can be read or forged without the
//! key.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use thiserror::Error;

/// Length of the random nonce prefixed to every sealed value.
pub const NONCE_SIZE: usize = 24;

/// Length of the symmetric key.
pub const KEY_SIZE: usize = 32;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors returned when opening a sealed value or loading a key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpaqueError {
    #[error("opaque value too short to contain a nonce")]
    TooShort,

    #[error("opaque value is invalid or was tampered with")]
    InvalidInput,

    #[error("failed to seal value")]
    Seal,

    #[error("secret key must be 32 bytes encoded as 64 hex characters")]
    InvalidKey,
}

/// 32-byte symmetric key. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh key from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parses a key from exactly 64 hex characters.
    pub fn from_hex(encoded: &str) -> Result<Self, OpaqueError> {
        let decoded = hex::decode(encoded.trim()).map_err(|_| OpaqueError::InvalidKey)?;
        let bytes: [u8; KEY_SIZE] = decoded.try_into().map_err(|_| OpaqueError::InvalidKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Seals and opens values under one key. Cheap to clone.
#[derive(Clone)]
pub struct OpaqueCodec {
    cipher: XChaCha20Poly1305,
}

impl OpaqueCodec {
    pub fn new(key: &SecretKey) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, OpaqueError> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| OpaqueError::Seal)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_LENIENT.encode(out))
    }

    /// Decrypts and authenticates a value produced by [`OpaqueCodec::seal`].
    pub fn open(&self, opaque: &str) -> Result<Vec<u8>, OpaqueError> {
        let raw = URL_SAFE_LENIENT
            .decode(opaque.as_bytes())
            .map_err(|_| OpaqueError::InvalidInput)?;
        if raw.len() < NONCE_SIZE {
            return Err(OpaqueError::TooShort);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);

        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| OpaqueError::InvalidInput)
    }

    pub fn seal_str(&self, plaintext: &str) -> Result<String, OpaqueError> {
        self.seal(plaintext.as_bytes())
    }

    pub fn open_str(&self, opaque: &str) -> Result<String, OpaqueError> {
        String::from_utf8(self.open(opaque)?).map_err(|_| OpaqueError::InvalidInput)
    }
}

impl fmt::Debug for OpaqueCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueCodec").finish_non_exhaustive()
    }
}
