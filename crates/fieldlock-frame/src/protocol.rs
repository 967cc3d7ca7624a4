//! Cross-frame message protocol.
//!
//! Outbound (frame → embedder), discriminated by `type`:
//!
//! | type          | payload                                                          |
//! |---------------|------------------------------------------------------------------|
//! | `ready`       | `ecdhPublicKey`                                                  |
//! | `change`      | `encrypted`, `empty`, `valid`, `validationErrorCodes`, `cardBrand` |
//! | `focus`       | none                                                             |
//! | `blur`        | none                                                             |
//! | `failed_init` | none (broadcast)                                                 |
//!
//! Inbound (embedder → frame): `focus`, `blur`.

use fieldlock_crypto::SealedField;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::validation::{CardBrand, ValidationErrorCode, ValidationResult};

/// Messages the frame posts to its embedder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Key exchange finished; carries the frame's base64 ECDH public key.
    #[serde(rename_all = "camelCase")]
    Ready { ecdh_public_key: String },

    /// The field value changed.
    #[serde(rename_all = "camelCase")]
    Change {
        encrypted: Vec<SealedField>,
        empty: bool,
        valid: bool,
        validation_error_codes: Vec<ValidationErrorCode>,
        card_brand: Option<CardBrand>,
    },

    Focus,
    Blur,

    /// Initialization failed; sent to any origin.
    FailedInit,
}

impl OutboundMessage {
    /// Build a `change` from the sealed parts and a fresh validation result.
    #[must_use]
    pub fn change(encrypted: Vec<SealedField>, validation: ValidationResult) -> Self {
        let ValidationResult {
            empty,
            valid,
            error_codes,
            card_brand,
        } = validation;
        Self::Change {
            encrypted,
            empty,
            valid,
            validation_error_codes: error_codes,
            card_brand,
        }
    }

    /// The `type` discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Change { .. } => "change",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::FailedInit => "failed_init",
        }
    }

    /// Serialize to the JSON posted across frames.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Bridge` if serialization fails.
    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self)
            .map_err(|e| FrameError::Bridge(format!("cannot encode {}: {e}", self.kind())))
    }
}

/// Commands the embedder may send the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundCommand {
    Focus,
    Blur,
}

impl InboundCommand {
    /// Parse an inbound JSON message. Unknown `type`s are errors.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Bridge` if the message is not a known command.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        serde_json::from_str(raw).map_err(|e| FrameError::Bridge(format!("unrecognized message: {e}")))
    }
}
