//! `fieldlock-frame` — Secure card-field collection frame for FIELDLOCK.
//!
//! One frame collects one card field (number, expiry or CVN). It pins the
//! relay's key, derives a per-session AES-256-GCM key, formats and validates
//! every edit, and posts only encrypted values to its embedder.
//!
//! Cryptography lives in `fieldlock-crypto`; this crate owns the protocol,
//! the state machine and the edit pipeline.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod bridge;
pub mod config;
pub mod driver;
pub mod error;
pub mod formatting;
pub mod params;
pub mod protocol;
pub mod session;
pub mod surface;
pub mod validation;

pub use bridge::{
    ChannelTransport, FrameTransport, InboundRegistry, MessageBridge, PostedMessage,
    RecordingTransport, TargetOrigin,
};
pub use config::{AppearanceLimits, FrameConfig};
pub use driver::{event_channel, run_session, EVENT_QUEUE_CAPACITY};
pub use error::FrameError;
pub use formatting::{EditEvent, EditOutcome, FieldFormatter, FieldValue, Selection};
pub use params::{Appearance, FieldType, HandshakeParameters};
pub use protocol::{InboundCommand, OutboundMessage};
pub use session::{FrameEvent, SessionController, SessionState};
pub use surface::{FieldSurface, HeadlessSurface};
pub use validation::{validate, CardBrand, ValidationErrorCode, ValidationResult, YearMonth};
