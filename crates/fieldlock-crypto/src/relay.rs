//! Relay side of the collection protocol (the party holding the opening key).
//!
//! # Protocol
//!
//! 1. Relay: [`RelayHandshake::begin`] → ephemeral ECDH key + pinning signature
//! 2. Relay hands `public_key` / `signature` to the embedding page, which puts
//!    them in the frame URL as `pk` / `sig`
//! 3. Frame: verifies the pin, derives its sealing key, announces its own key
//! 4. Relay: [`RelayHandshake::complete`] with the frame's key → [`RelaySession`]
//! 5. Relay: [`RelaySession::open`] per received `encrypted[*]` entry

use crate::error::CryptoError;
use crate::field_cipher::{decrypt, OpeningKey, SealedField, SessionAad};
use crate::key_exchange::{
    derive_session_key, generate_ephemeral_keypair, EphemeralKeyPair, AGREEMENT_PUBLIC_KEY_LEN,
};
use crate::memory::SecretBuffer;
use crate::pinning::{PinningSigner, PINNING_SIGNATURE_LEN};

/// Relay key material before the frame has answered.
#[derive(Debug)]
pub struct RelayHandshake {
    key_pair: EphemeralKeyPair,
    signature: [u8; PINNING_SIGNATURE_LEN],
}

impl RelayHandshake {
    /// Generate the relay's ephemeral key and sign it with `signer`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyAgreement` on key generation failure or
    /// `CryptoError::InvalidKeyMaterial` if signing fails.
    pub fn begin(signer: &PinningSigner) -> Result<Self, CryptoError> {
        let key_pair = generate_ephemeral_keypair()?;
        let signature = signer.sign(key_pair.public_key())?;
        Ok(Self {
            key_pair,
            signature,
        })
    }

    /// The relay's ECDH public key (`pk`).
    #[must_use]
    pub const fn public_key(&self) -> &[u8; AGREEMENT_PUBLIC_KEY_LEN] {
        self.key_pair.public_key()
    }

    /// Pinning signature over [`Self::public_key`] (`sig`).
    #[must_use]
    pub const fn signature(&self) -> &[u8; PINNING_SIGNATURE_LEN] {
        &self.signature
    }

    /// Finish the exchange using the frame's announced public key.
    ///
    /// # Errors
    ///
    /// Propagates key agreement and derivation errors.
    pub fn complete(
        self,
        frame_public_key: &[u8],
        session_id: &str,
    ) -> Result<RelaySession, CryptoError> {
        let key = derive_session_key(self.key_pair, frame_public_key, session_id.as_bytes())?
            .into_opening();
        Ok(RelaySession {
            key,
            aad: SessionAad::from_session_id(session_id),
        })
    }
}

/// Established relay session: decrypt-only.
#[derive(Debug)]
pub struct RelaySession {
    key: OpeningKey,
    aad: SessionAad,
}

impl RelaySession {
    /// Decrypt one sealed field value.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decryption` if authentication fails.
    pub fn open(&self, sealed: &SealedField) -> Result<SecretBuffer, CryptoError> {
        decrypt(sealed, &self.key, &self.aad)
    }

    /// Decrypt every part of a change message, in order.
    ///
    /// # Errors
    ///
    /// Returns the first decryption failure.
    pub fn open_all(&self, sealed: &[SealedField]) -> Result<Vec<SecretBuffer>, CryptoError> {
        sealed.iter().map(|s| self.open(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_cipher::encrypt;
    use crate::pinning::{verify, TrustedKeySet};

    #[test]
    fn relay_signature_verifies_against_pinned_key() {
        let signer = PinningSigner::generate().unwrap();
        let trusted = TrustedKeySet::new([signer.public_key()]).unwrap();
        let handshake = RelayHandshake::begin(&signer).unwrap();
        verify(&trusted, handshake.signature(), handshake.public_key()).unwrap();
    }

    #[test]
    fn relay_opens_frame_ciphertext() {
        let signer = PinningSigner::generate().unwrap();
        let handshake = RelayHandshake::begin(&signer).unwrap();
        let relay_pub = *handshake.public_key();

        let frame = generate_ephemeral_keypair().unwrap();
        let frame_pub = *frame.public_key();
        let sealing = derive_session_key(frame, &relay_pub, b"sess-42")
            .unwrap()
            .into_sealing();
        let aad = SessionAad::from_session_id("sess-42");
        let sealed = encrypt(b"4242424242424242", &sealing, &aad).unwrap();

        let relay = handshake.complete(&frame_pub, "sess-42").unwrap();
        assert_eq!(relay.open(&sealed).unwrap().expose(), b"4242424242424242");
    }

    #[test]
    fn relay_with_wrong_session_id_cannot_open() {
        let signer = PinningSigner::generate().unwrap();
        let handshake = RelayHandshake::begin(&signer).unwrap();
        let relay_pub = *handshake.public_key();

        let frame = generate_ephemeral_keypair().unwrap();
        let frame_pub = *frame.public_key();
        let sealing = derive_session_key(frame, &relay_pub, b"sess-a")
            .unwrap()
            .into_sealing();
        let sealed = encrypt(b"123", &sealing, &SessionAad::from_session_id("sess-a")).unwrap();

        let relay = handshake.complete(&frame_pub, "sess-b").unwrap();
        assert!(relay.open(&sealed).is_err());
    }
}
