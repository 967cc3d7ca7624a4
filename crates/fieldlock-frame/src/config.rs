//! Frame configuration — pinned keys and appearance limits.
//!
//! In production this JSON is generated by the bundling step and embedded in
//! the frame; the runtime only ever reads it. Every field has a default so a
//! partial document still loads. An empty `trustedKeys` list is valid JSON
//! but makes every handshake fail pinning.

use std::fs;
use std::path::Path;

use fieldlock_crypto::TrustedKeySet;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

// ── Top-level configuration ────────────────────────────────────────

/// Immutable per-deployment frame configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfig {
    /// Pinned ECDSA P-256 public keys, base64 of the uncompressed point.
    #[serde(default)]
    pub trusted_keys: Vec<String>,

    /// Caps applied to the optional `appearance` handshake parameter.
    #[serde(default)]
    pub appearance: AppearanceLimits,
}

// ── Appearance limits ──────────────────────────────────────────────

/// Length caps for host-supplied styling values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceLimits {
    /// Maximum characters accepted for `fontFamily`.
    #[serde(default = "default_max_font_family_len")]
    pub max_font_family_len: usize,

    /// Maximum characters accepted for `fontSize`.
    #[serde(default = "default_max_font_size_len")]
    pub max_font_size_len: usize,
}

impl Default for AppearanceLimits {
    fn default() -> Self {
        Self {
            max_font_family_len: default_max_font_family_len(),
            max_font_size_len: default_max_font_size_len(),
        }
    }
}

const fn default_max_font_family_len() -> usize {
    64
}
const fn default_max_font_size_len() -> usize {
    8
}

// ── Loading ────────────────────────────────────────────────────────

impl FrameConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Config` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, FrameError> {
        serde_json::from_str(json).map_err(|e| FrameError::Config(format!("invalid JSON: {e}")))
    }

    /// Read and parse a configuration file.
    ///
    /// A missing or corrupt file is an error, never an empty default.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, FrameError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| FrameError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Decode the pinned keys into a verification-only set.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Config` if a key is not base64 or not a valid
    /// uncompressed P-256 point encoding.
    pub fn trusted_key_set(&self) -> Result<TrustedKeySet, FrameError> {
        let decoded = self
            .trusted_keys
            .iter()
            .enumerate()
            .map(|(i, encoded)| {
                data_encoding::BASE64
                    .decode(encoded.trim().as_bytes())
                    .map_err(|e| FrameError::Config(format!("trusted key #{i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        TrustedKeySet::new(decoded).map_err(|e| FrameError::Config(e.to_string()))
    }
}
