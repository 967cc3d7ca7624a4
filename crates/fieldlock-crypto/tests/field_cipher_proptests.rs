#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for per-field AES-256-GCM.

use fieldlock_crypto::field_cipher::{decrypt, encrypt, SessionAad};
use fieldlock_crypto::key_exchange::derive_key_material;
use proptest::prelude::*;

proptest! {
    /// Decrypting what was encrypted, with the same key and AAD, returns the
    /// original plaintext exactly.
    #[test]
    fn encrypt_decrypt_roundtrip(
        plaintext in "[0-9]{0,19}",
        session_id in "[ -~]{1,64}",
    ) {
        let sealing = derive_key_material(&[0x42; 32], b"prop").unwrap().into_sealing();
        let opening = derive_key_material(&[0x42; 32], b"prop").unwrap().into_opening();
        let aad = SessionAad::from_session_id(&session_id);

        let sealed = encrypt(plaintext.as_bytes(), &sealing, &aad).unwrap();
        let opened = decrypt(&sealed, &opening, &aad).unwrap();
        prop_assert_eq!(opened.expose(), plaintext.as_bytes());
    }

    /// Any single-byte corruption of the sealed value is detected.
    #[test]
    fn corrupted_value_is_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 0..64),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let sealing = derive_key_material(&[0x42; 32], b"prop").unwrap().into_sealing();
        let opening = derive_key_material(&[0x42; 32], b"prop").unwrap().into_opening();
        let aad = SessionAad::from_session_id("session");

        let mut sealed = encrypt(&plaintext, &sealing, &aad).unwrap();
        let idx = position.index(sealed.value.len());
        sealed.value[idx] ^= mask;
        prop_assert!(decrypt(&sealed, &opening, &aad).is_err());
    }
}
