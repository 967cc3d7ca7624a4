//! Frame error types for `fieldlock-frame`.

use fieldlock_crypto::CryptoError;
use thiserror::Error;

/// Errors produced while running a collection session.
///
/// Every variant is session-fatal once it reaches the
/// [`SessionController`](crate::session::SessionController).
#[derive(Debug, Error)]
pub enum FrameError {
    /// A required handshake parameter is absent.
    #[error("missing handshake parameter: {0}")]
    ParameterMissing(&'static str),

    /// A handshake parameter is present but malformed (bad base64, bad origin).
    #[error("invalid handshake parameter {name}: {reason}")]
    InvalidParameter {
        /// Query parameter name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// `input_type` names a field this frame does not collect.
    #[error("unsupported field type: {0}")]
    UnsupportedFieldType(String),

    /// The counterpart key was not signed by any pinned key.
    #[error("counterpart key pinning failed")]
    Pinning,

    /// Cryptographic operation failed (delegated from `fieldlock-crypto`).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Field encryption failed while processing a change.
    #[error("field encryption failed: {0}")]
    Encryption(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The message bridge could not deliver or encode a message.
    #[error("message bridge error: {0}")]
    Bridge(String),

    /// An operation was attempted in a state that does not allow it.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl FrameError {
    /// Short code rendered in the inline failure indicator.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ParameterMissing(_) | Self::InvalidParameter { .. } => "E_PARAM",
            Self::UnsupportedFieldType(_) => "E_TYPE",
            Self::Pinning | Self::Crypto(CryptoError::Pinning) => "E_PIN",
            Self::Crypto(_) | Self::Encryption(_) => "E_CRYPTO",
            Self::Config(_) => "E_CONFIG",
            Self::Bridge(_) => "E_BRIDGE",
            Self::InvalidState(_) => "E_STATE",
        }
    }
}
