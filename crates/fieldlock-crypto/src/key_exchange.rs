//! Ephemeral ECDH P-256 key agreement and HKDF-SHA256 session key derivation.
//!
//! This module provides:
//! - [`generate_ephemeral_keypair`] — fresh P-256 agreement key pair per session
//! - [`derive_session_key`] — ECDH with the counterpart, then HKDF
//! - [`derive_key_material`] — the HKDF step alone (empty salt, caller info)
//!
//! # Key Schedule
//!
//! ```text
//! ECDH(own_private, counterpart_public) ──► HKDF-SHA256(salt = "", info = session_id) ──► 32-byte AES key
//! ```
//!
//! Binding `info` to the session id means even a reused key pair yields a
//! different key per session. The private key is consumed by the agreement
//! and cannot be used a second time.

use crate::error::CryptoError;
use crate::field_cipher::{OpeningKey, SealingKey};
use crate::memory::SecretBytes;
use ring::agreement::{self, EphemeralPrivateKey, UnparsedPublicKey};
use ring::hkdf;
use ring::rand::SystemRandom;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Uncompressed SEC1 P-256 public key length.
pub const AGREEMENT_PUBLIC_KEY_LEN: usize = 65;

/// Derived session key length (AES-256).
pub const SESSION_KEY_LEN: usize = 32;

/// HKDF salt: intentionally empty (RFC 5869 treats it as `HashLen` zero bytes).
const HKDF_SALT: &[u8] = &[];

/// Marker type for `ring::hkdf::Prk::expand` — requests 32-byte output.
struct SessionKeyLen;

impl hkdf::KeyType for SessionKeyLen {
    fn len(&self) -> usize {
        SESSION_KEY_LEN
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One session's ECDH key pair.
///
/// The private half never leaves this value and is consumed by
/// [`derive_session_key`]. The public half is safe to transmit.
pub struct EphemeralKeyPair {
    private: EphemeralPrivateKey,
    public: [u8; AGREEMENT_PUBLIC_KEY_LEN],
}

impl EphemeralKeyPair {
    /// The exported public key (`0x04 || X || Y`).
    #[must_use]
    pub const fn public_key(&self) -> &[u8; AGREEMENT_PUBLIC_KEY_LEN] {
        &self.public
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EphemeralKeyPair(***)")
    }
}

/// Derived key bytes, not yet bound to a usage direction.
///
/// Convert with [`SessionKeyMaterial::into_sealing`] on the frame side or
/// [`SessionKeyMaterial::into_opening`] on the relay side.
pub struct SessionKeyMaterial {
    bytes: SecretBytes<SESSION_KEY_LEN>,
}

impl SessionKeyMaterial {
    /// Raw key bytes, for comparison in tests and key-schedule checks.
    #[must_use]
    pub const fn expose(&self) -> &[u8; SESSION_KEY_LEN] {
        self.bytes.expose()
    }

    /// Restrict the key to encryption.
    #[must_use]
    pub fn into_sealing(self) -> SealingKey {
        SealingKey::from_secret(self.bytes)
    }

    /// Restrict the key to decryption.
    #[must_use]
    pub fn into_opening(self) -> OpeningKey {
        OpeningKey::from_secret(self.bytes)
    }
}

impl std::fmt::Debug for SessionKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeyMaterial(***)")
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Generate a fresh ECDH P-256 key pair.
///
/// # Errors
///
/// Returns `CryptoError::KeyAgreement` if the system RNG or key generation fails.
pub fn generate_ephemeral_keypair() -> Result<EphemeralKeyPair, CryptoError> {
    let rng = SystemRandom::new();
    let private = EphemeralPrivateKey::generate(&agreement::ECDH_P256, &rng)
        .map_err(|_| CryptoError::KeyAgreement("P-256 key generation failed".into()))?;
    let public_key = private
        .compute_public_key()
        .map_err(|_| CryptoError::KeyAgreement("P-256 public key export failed".into()))?;

    let mut public = [0u8; AGREEMENT_PUBLIC_KEY_LEN];
    if public_key.as_ref().len() != AGREEMENT_PUBLIC_KEY_LEN {
        return Err(CryptoError::KeyAgreement(format!(
            "unexpected public key length: {} bytes",
            public_key.as_ref().len()
        )));
    }
    public.copy_from_slice(public_key.as_ref());

    Ok(EphemeralKeyPair { private, public })
}

/// Agree on a shared secret with `counterpart_public` and derive the session key.
///
/// Consumes `own` so the private key cannot be reused.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the counterpart key has the
/// wrong length, `CryptoError::KeyAgreement` if it is not a valid P-256 point,
/// or `CryptoError::KeyDerivation` if HKDF fails.
pub fn derive_session_key(
    own: EphemeralKeyPair,
    counterpart_public: &[u8],
    info: &[u8],
) -> Result<SessionKeyMaterial, CryptoError> {
    if counterpart_public.len() != AGREEMENT_PUBLIC_KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "counterpart public key: {} bytes (expected {AGREEMENT_PUBLIC_KEY_LEN})",
            counterpart_public.len()
        )));
    }
    let peer = UnparsedPublicKey::new(&agreement::ECDH_P256, counterpart_public);
    agreement::agree_ephemeral(own.private, &peer, |shared| {
        derive_key_material(shared, info)
    })
    .map_err(|_| CryptoError::KeyAgreement("ECDH agreement failed".into()))?
}

/// HKDF-SHA256 with an empty salt, expanding `shared_secret` under `info`.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if expansion fails.
pub fn derive_key_material(
    shared_secret: &[u8],
    info: &[u8],
) -> Result<SessionKeyMaterial, CryptoError> {
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT);
    let prk = salt.extract(shared_secret);
    let info_parts = [info];
    let okm = prk
        .expand(&info_parts, SessionKeyLen)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expansion failed".into()))?;

    let mut key_bytes = [0u8; SESSION_KEY_LEN];
    okm.fill(&mut key_bytes)
        .map_err(|_| CryptoError::KeyDerivation("HKDF fill failed".into()))?;

    let bytes = SecretBytes::new(key_bytes);
    key_bytes.zeroize();
    Ok(SessionKeyMaterial { bytes })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
