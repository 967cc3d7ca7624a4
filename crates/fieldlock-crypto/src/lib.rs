//! `fieldlock-crypto` — Cryptographic primitives for the FIELDLOCK card frame.
//!
//! Zero async, zero DOM, zero network: everything here is a pure function of
//! its inputs plus the system RNG, so the frame and the relay share one
//! audited implementation.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod pinning;

pub mod key_exchange;

pub mod field_cipher;

pub mod relay;

pub use error::CryptoError;
pub use field_cipher::{
    decrypt, encrypt, encrypt_parts, OpeningKey, SealedField, SealingKey, SessionAad, IV_LEN,
    TAG_LEN,
};
pub use key_exchange::{
    derive_key_material, derive_session_key, generate_ephemeral_keypair, EphemeralKeyPair,
    SessionKeyMaterial, AGREEMENT_PUBLIC_KEY_LEN, SESSION_KEY_LEN,
};
pub use memory::{SecretBuffer, SecretBytes};
pub use pinning::{verify, PinningSigner, TrustedKeySet, PINNING_PUBLIC_KEY_LEN, PINNING_SIGNATURE_LEN};
pub use relay::{RelayHandshake, RelaySession};
