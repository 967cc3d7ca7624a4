//! Per-field AES-256-GCM encryption bound to the session.
//!
//! This module provides:
//! - [`SealingKey`] / [`OpeningKey`] — the session key restricted to one direction
//! - [`SessionAad`] — SHA-256 of the session id, used as associated data
//! - [`encrypt`] — seal one field value with a random 96-bit IV
//! - [`encrypt_parts`] — seal each part of a composite value independently
//! - [`decrypt`] — relay-side authentication and decryption
//!
//! # Wire Format
//!
//! ```json
//! { "iv": "<base64, 12 bytes>", "value": "<base64, ciphertext || 16-byte tag>" }
//! ```
//!
//! This matches the WebCrypto `AES-GCM` output layout, so a browser relay can
//! decrypt with `crypto.subtle.decrypt` directly.

use crate::error::CryptoError;
use crate::key_exchange::SESSION_KEY_LEN;
use crate::memory::{SecretBuffer, SecretBytes};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::{aead, digest};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// AES-256-GCM nonce length in bytes (96 bits).
pub const IV_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Session digest length (SHA-256).
pub const SESSION_AAD_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Session key usable for encryption only.
pub struct SealingKey {
    bytes: SecretBytes<SESSION_KEY_LEN>,
}

impl SealingKey {
    pub(crate) const fn from_secret(bytes: SecretBytes<SESSION_KEY_LEN>) -> Self {
        Self { bytes }
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(***)")
    }
}

/// Session key usable for decryption only.
pub struct OpeningKey {
    bytes: SecretBytes<SESSION_KEY_LEN>,
}

impl OpeningKey {
    pub(crate) const fn from_secret(bytes: SecretBytes<SESSION_KEY_LEN>) -> Self {
        Self { bytes }
    }
}

impl std::fmt::Debug for OpeningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OpeningKey(***)")
    }
}

fn aes_key(bytes: &SecretBytes<SESSION_KEY_LEN>) -> Result<aead::LessSafeKey, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, bytes.expose())
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Associated data
// ---------------------------------------------------------------------------

/// SHA-256 digest of the session id, computed once per session.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionAad([u8; SESSION_AAD_LEN]);

impl SessionAad {
    /// Digest `session_id` (UTF-8 bytes).
    #[must_use]
    pub fn from_session_id(session_id: &str) -> Self {
        let d = digest::digest(&digest::SHA256, session_id.as_bytes());
        let mut out = [0u8; SESSION_AAD_LEN];
        out.copy_from_slice(d.as_ref());
        Self(out)
    }

    /// The digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_AAD_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionAad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionAad({})", data_encoding::HEXLOWER.encode(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Sealed field
// ---------------------------------------------------------------------------

/// One encrypted field value as it crosses the frame boundary.
#[must_use = "encrypted data must be transmitted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedField {
    /// Random 96-bit nonce, unique per encryption.
    #[serde(with = "b64_iv")]
    pub iv: [u8; IV_LEN],
    /// Ciphertext followed by the 128-bit tag.
    #[serde(with = "b64_bytes")]
    pub value: Vec<u8>,
}

mod b64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&data_encoding::BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        data_encoding::BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod b64_iv {
    use super::IV_LEN;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(iv: &[u8; IV_LEN], s: S) -> Result<S::Ok, S::Error> {
        super::b64_bytes::serialize(iv, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; IV_LEN], D::Error> {
        let bytes = super::b64_bytes::deserialize(d)?;
        <[u8; IV_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!("iv must be {IV_LEN} bytes, got {}", bytes.len()))
        })
    }
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Encrypt one field value with a fresh random IV.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if the AEAD operation fails.
pub fn encrypt(
    plaintext: &[u8],
    key: &SealingKey,
    aad: &SessionAad,
) -> Result<SealedField, CryptoError> {
    let cipher = aes_key(&key.bytes)?;

    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::Encryption(format!("CSPRNG fill failed: {e}")))?;
    let nonce = aead::Nonce::assume_unique_for_key(iv);

    let mut in_out = plaintext.to_vec();
    if cipher
        .seal_in_place_append_tag(nonce, aead::Aad::from(aad.as_bytes()), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".into(),
        ));
    }

    Ok(SealedField { iv, value: in_out })
}

/// Encrypt each part of a composite value separately, preserving order.
///
/// Used for the expiry field (month, year) so the relay can accept or reject
/// each half on its own.
///
/// # Errors
///
/// Returns the first `CryptoError::Encryption` encountered.
pub fn encrypt_parts<P: AsRef<[u8]>>(
    parts: &[P],
    key: &SealingKey,
    aad: &SessionAad,
) -> Result<Vec<SealedField>, CryptoError> {
    parts
        .iter()
        .map(|part| encrypt(part.as_ref(), key, aad))
        .collect()
}

/// Authenticate and decrypt a sealed field.
///
/// # Errors
///
/// Returns `CryptoError::Decryption` if the value is shorter than a tag or
/// authentication fails (tampered IV/ciphertext/tag, wrong key, wrong AAD).
pub fn decrypt(
    sealed: &SealedField,
    key: &OpeningKey,
    aad: &SessionAad,
) -> Result<SecretBuffer, CryptoError> {
    if sealed.value.len() < TAG_LEN {
        return Err(CryptoError::Decryption);
    }
    let cipher = aes_key(&key.bytes)?;
    let nonce = aead::Nonce::assume_unique_for_key(sealed.iv);

    let mut buf = sealed.value.clone();
    let plaintext = cipher
        .open_in_place(nonce, aead::Aad::from(aad.as_bytes()), &mut buf)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext);
    buf.zeroize();
    result
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
