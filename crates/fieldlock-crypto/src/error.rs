//! Cryptographic error types for `fieldlock-crypto`.

use thiserror::Error;

/// Failure of a pinning, agreement, derivation or AEAD step.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The counterpart key signature did not verify against any pinned key.
    #[error("pinning failure: signature does not match any trusted key")]
    Pinning,

    /// ECDH key generation or agreement failure (P-256).
    #[error("key agreement error: {0}")]
    KeyAgreement(String),

    /// HKDF expansion failure.
    #[error("HKDF session key expansion failed: {0}")]
    KeyDerivation(String),

    /// Field encryption failure (AES-256-GCM).
    #[error("field encryption failed: {0}")]
    Encryption(String),

    /// GCM tag did not verify for this sealed field.
    #[error("field decryption failed: iv, value, key or session AAD mismatch")]
    Decryption,

    /// Invalid key material (wrong length, not a curve point, bad PKCS#8).
    #[error("unusable key material: {0}")]
    InvalidKeyMaterial(String),

    /// Secure memory allocation failure.
    #[error("cannot protect secret memory: {0}")]
    SecureMemory(String),
}
