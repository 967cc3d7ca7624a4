//! Counterpart key pinning: ECDSA P-256 / SHA-256.
//!
//! The relay's ECDH public key reaches the frame through the embedding page,
//! which is not trusted. The relay therefore signs that key with a pinning
//! key whose public half is compiled into the frame's configuration. This
//! module provides:
//! - [`TrustedKeySet`] — immutable set of verification-only pinning keys
//! - [`verify`] — accept a signee only if some trusted key signed it
//! - [`PinningSigner`] — the relay/build-time side that produces signatures
//!
//! Signatures use the fixed-width `r || s` encoding (64 bytes), which is what
//! WebCrypto emits for ECDSA.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, KeyPair, UnparsedPublicKey};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Uncompressed SEC1 P-256 point length (`0x04 || X || Y`).
pub const PINNING_PUBLIC_KEY_LEN: usize = 65;

/// Fixed-width ECDSA P-256 signature length (`r || s`).
pub const PINNING_SIGNATURE_LEN: usize = 64;

/// SEC1 tag for an uncompressed point.
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

// ---------------------------------------------------------------------------
// TrustedKeySet
// ---------------------------------------------------------------------------

/// Verification-only pinning keys, fixed at construction.
///
/// There are no mutators: a session receives the set already materialized and
/// can only read it. Cloning is cheap enough for per-session injection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrustedKeySet {
    keys: Vec<[u8; PINNING_PUBLIC_KEY_LEN]>,
}

impl TrustedKeySet {
    /// Build a set from raw uncompressed P-256 public keys.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if any key is not a 65-byte
    /// uncompressed point.
    pub fn new<I, K>(keys: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let keys = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| parse_public_key(index, key.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Number of pinned keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if nothing is pinned (every verification will fail).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the pinned public keys.
    pub fn iter(&self) -> impl Iterator<Item = &[u8; PINNING_PUBLIC_KEY_LEN]> {
        self.keys.iter()
    }
}

fn parse_public_key(index: usize, key: &[u8]) -> Result<[u8; PINNING_PUBLIC_KEY_LEN], CryptoError> {
    if key.len() != PINNING_PUBLIC_KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "trusted key #{index}: {} bytes (expected {PINNING_PUBLIC_KEY_LEN})",
            key.len()
        )));
    }
    if key.first() != Some(&UNCOMPRESSED_POINT_TAG) {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "trusted key #{index}: not an uncompressed SEC1 point"
        )));
    }
    let mut out = [0u8; PINNING_PUBLIC_KEY_LEN];
    out.copy_from_slice(key);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify that `signature` over `signee` was produced by one of `trusted`.
///
/// Keys are tried in order and the first successful verification wins. There
/// is no fallback: an unverified signee is never accepted.
///
/// # Errors
///
/// Returns `CryptoError::Pinning` if no trusted key verifies the signature,
/// including when the set is empty or the signature has the wrong length.
pub fn verify(trusted: &TrustedKeySet, signature: &[u8], signee: &[u8]) -> Result<(), CryptoError> {
    if signature.len() != PINNING_SIGNATURE_LEN {
        return Err(CryptoError::Pinning);
    }
    let matched = trusted.iter().any(|key| {
        UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_FIXED, key)
            .verify(signee, signature)
            .is_ok()
    });
    if matched {
        Ok(())
    } else {
        Err(CryptoError::Pinning)
    }
}

// ---------------------------------------------------------------------------
// Signer (relay / build-time side)
// ---------------------------------------------------------------------------

/// ECDSA P-256 signing key used to vouch for a relay's agreement key.
///
/// Never shipped to the frame; only its public key is pinned there.
pub struct PinningSigner {
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
}

impl PinningSigner {
    /// Generate a fresh signing key, returned as PKCS#8 for storage.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if generation fails.
    pub fn generate_pkcs8() -> Result<SecretBuffer, CryptoError> {
        let rng = SystemRandom::new();
        let document =
            EcdsaKeyPair::generate_pkcs8(&signature::ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
                .map_err(|_| {
                    CryptoError::InvalidKeyMaterial("P-256 signing key generation failed".into())
                })?;
        SecretBuffer::new(document.as_ref())
    }

    /// Load a signer from PKCS#8 bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if the document is rejected.
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&signature::ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
                .map_err(|e| CryptoError::InvalidKeyMaterial(format!("PKCS#8 rejected: {e}")))?;
        Ok(Self { key_pair, rng })
    }

    /// Generate a signer in one step (tests, tooling).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if generation fails.
    pub fn generate() -> Result<Self, CryptoError> {
        let pkcs8 = Self::generate_pkcs8()?;
        Self::from_pkcs8(pkcs8.expose())
    }

    /// The public key to pin in the frame configuration.
    #[must_use]
    pub fn public_key(&self) -> [u8; PINNING_PUBLIC_KEY_LEN] {
        let mut out = [0u8; PINNING_PUBLIC_KEY_LEN];
        out.copy_from_slice(self.key_pair.public_key().as_ref());
        out
    }

    /// Sign `message` (a relay's ECDH public key).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if signing fails.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; PINNING_SIGNATURE_LEN], CryptoError> {
        let sig = self
            .key_pair
            .sign(&self.rng, message)
            .map_err(|_| CryptoError::InvalidKeyMaterial("ECDSA signing failed".into()))?;
        let mut out = [0u8; PINNING_SIGNATURE_LEN];
        out.copy_from_slice(sig.as_ref());
        Ok(out)
    }
}

impl std::fmt::Debug for PinningSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PinningSigner(***)")
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
