//! Session controller: handshake, change processing, failure path.
//!
//! ```text
//! Initializing ─► PinVerified ─► KeyDerived ─► Ready ⇄ Processing
//!      │               │              │          │
//!      └───────────────┴──────────────┴──────────┴──► Failed (terminal)
//! ```
//!
//! Every error that reaches the controller is fatal: the surface shows an
//! inline code, `failed_init` is broadcast, key material is dropped, and
//! later events are ignored.

use std::fmt;

use fieldlock_crypto::{
    derive_session_key, encrypt_parts, generate_ephemeral_keypair, verify, SealingKey,
    SessionAad, TrustedKeySet,
};

use crate::bridge::{FrameTransport, InboundRegistry, MessageBridge};
use crate::config::{AppearanceLimits, FrameConfig};
use crate::error::FrameError;
use crate::formatting::{EditEvent, EditOutcome, FieldFormatter};
use crate::params::{FieldType, HandshakeParameters};
use crate::protocol::{InboundCommand, OutboundMessage};
use crate::surface::FieldSurface;
use crate::validation::{self, YearMonth};

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Lifecycle of one frame session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    PinVerified,
    KeyDerived,
    Ready,
    Processing,
    Failed,
}

/// Everything that can happen to a running frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// The user edited the field.
    Edit(EditEvent),
    /// The input gained focus natively.
    NativeFocus,
    /// The input lost focus natively.
    NativeBlur,
    /// A message arrived from another window.
    Inbound { origin: String, data: String },
}

/// Key material and field state that exist only after a successful handshake.
struct SessionContext {
    session_id: String,
    field_type: FieldType,
    key: SealingKey,
    aad: SessionAad,
    formatter: FieldFormatter,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Drives one frame from handshake to teardown.
pub struct SessionController<T, S> {
    trusted: TrustedKeySet,
    limits: AppearanceLimits,
    bridge: MessageBridge<T>,
    surface: S,
    inbound: InboundRegistry<S>,
    state: SessionState,
    context: Option<SessionContext>,
    seq: u64,
    clock: fn() -> YearMonth,
}

impl<T, S> fmt::Debug for SessionController<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("trusted_keys", &self.trusted.len())
            .field("seq", &self.seq)
            .field(
                "session_id",
                &self.context.as_ref().map(|c| c.session_id.as_str()),
            )
            .finish_non_exhaustive()
    }
}

impl<T, S> SessionController<T, S>
where
    T: FrameTransport + 'static,
    S: FieldSurface + 'static,
{
    /// Create a controller in `Initializing` with focus/blur commands wired
    /// to the surface.
    pub fn new(trusted: TrustedKeySet, limits: AppearanceLimits, transport: T, surface: S) -> Self {
        let mut inbound = InboundRegistry::new();
        inbound.on(InboundCommand::Focus, |s: &mut S| s.focus());
        inbound.on(InboundCommand::Blur, |s: &mut S| s.blur());
        Self {
            trusted,
            limits,
            bridge: MessageBridge::new(transport),
            surface,
            inbound,
            state: SessionState::Initializing,
            context: None,
            seq: 0,
            clock: YearMonth::current_utc,
        }
    }

    /// Create a controller from a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Config` if a pinned key cannot be decoded.
    pub fn from_config(config: &FrameConfig, transport: T, surface: S) -> Result<Self, FrameError> {
        Ok(Self::new(
            config.trusted_key_set()?,
            config.appearance.clone(),
            transport,
            surface,
        ))
    }

    /// Replace the clock used for expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> YearMonth) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub const fn bridge(&self) -> &MessageBridge<T> {
        &self.bridge
    }

    /// `true` once a sealing key exists and the session has not failed.
    #[must_use]
    pub const fn has_session_key(&self) -> bool {
        self.context.is_some()
    }

    /// Current display value of the field, if the session is established.
    #[must_use]
    pub fn display(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.formatter.display())
    }

    /// Register an extra handler for an inbound command.
    pub fn on_inbound<F>(&mut self, command: InboundCommand, handler: F)
    where
        F: FnMut(&mut S) + Send + 'static,
    {
        self.inbound.on(command, handler);
    }

    // -- handshake ---------------------------------------------------------

    /// Run the handshake from the frame URL query string and announce
    /// readiness.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the session. The session is `Failed`
    /// afterwards and `failed_init` has been broadcast.
    pub fn start(&mut self, query: &str) -> Result<(), FrameError> {
        if self.state != SessionState::Initializing {
            return Err(FrameError::InvalidState(format!(
                "start called in {:?}",
                self.state
            )));
        }
        self.handshake(query).map_err(|e| self.fail(e))
    }

    fn handshake(&mut self, query: &str) -> Result<(), FrameError> {
        let params = HandshakeParameters::from_query(query, &self.limits)?;
        let _span = tracing::info_span!(
            "session",
            session_id = %params.session_id,
            field_type = %params.field_type,
        )
        .entered();
        self.bridge.bind(params.embedder_origin.clone());

        verify(&self.trusted, &params.signature, &params.counterpart_public_key)
            .map_err(|_| FrameError::Pinning)?;
        self.state = SessionState::PinVerified;
        tracing::info!("counterpart key pinned");

        let key_pair = generate_ephemeral_keypair()?;
        let own_public = *key_pair.public_key();
        let key = derive_session_key(
            key_pair,
            &params.counterpart_public_key,
            params.session_id.as_bytes(),
        )?
        .into_sealing();
        let aad = SessionAad::from_session_id(&params.session_id);
        self.state = SessionState::KeyDerived;

        self.surface.apply_appearance(&params.appearance);
        self.context = Some(SessionContext {
            formatter: FieldFormatter::new(params.field_type),
            field_type: params.field_type,
            session_id: params.session_id,
            key,
            aad,
        });

        self.bridge.send(&OutboundMessage::Ready {
            ecdh_public_key: data_encoding::BASE64.encode(&own_public),
        })?;
        self.state = SessionState::Ready;
        tracing::info!("session ready");
        Ok(())
    }

    // -- events ------------------------------------------------------------

    /// Process one event to completion.
    ///
    /// Events before `Ready` and after `Failed` are ignored.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the session.
    pub fn handle_event(&mut self, event: FrameEvent) -> Result<(), FrameError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Failed => {
                tracing::debug!("session failed, event ignored");
                return Ok(());
            }
            state => {
                tracing::debug!(?state, "session not ready, event ignored");
                return Ok(());
            }
        }

        match event {
            FrameEvent::Edit(edit) => self.process_edit(edit).map_err(|e| self.fail(e)),
            FrameEvent::NativeFocus => self
                .bridge
                .send(&OutboundMessage::Focus)
                .map_err(|e| self.fail(e)),
            FrameEvent::NativeBlur => self
                .bridge
                .send(&OutboundMessage::Blur)
                .map_err(|e| self.fail(e)),
            FrameEvent::Inbound { origin, data } => {
                if let Some(command) = self.bridge.accept(&origin, &data) {
                    self.inbound.dispatch(command, &mut self.surface);
                }
                Ok(())
            }
        }
    }

    fn process_edit(&mut self, edit: EditEvent) -> Result<(), FrameError> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| FrameError::InvalidState("ready without session key".into()))?;

        self.seq = self.seq.saturating_add(1);
        let _span = tracing::debug_span!(
            "change",
            seq = self.seq,
            session_id = %context.session_id,
            field_type = %context.field_type,
        )
        .entered();

        self.state = SessionState::Processing;
        let outcome = context.formatter.apply(edit);
        let value = match outcome {
            EditOutcome::Rejected => {
                tracing::debug!("edit rejected");
                self.state = SessionState::Ready;
                return Ok(());
            }
            EditOutcome::CursorMoved => {
                self.surface
                    .render(context.formatter.display(), context.formatter.selection());
                self.state = SessionState::Ready;
                return Ok(());
            }
            EditOutcome::Changed(value) => value,
        };
        self.surface
            .render(context.formatter.display(), context.formatter.selection());

        let today = (self.clock)();
        let result = validation::validate(context.field_type, context.formatter.display(), today);
        let encrypted = encrypt_parts(&value.parts(), &context.key, &context.aad)
            .map_err(|e| FrameError::Encryption(e.to_string()))?;
        tracing::debug!(
            parts = encrypted.len(),
            valid = result.valid,
            empty = result.empty,
            "field changed"
        );

        self.bridge.send(&OutboundMessage::change(encrypted, result))?;
        self.state = SessionState::Ready;
        Ok(())
    }

    // -- failure -----------------------------------------------------------

    /// Enter `Failed`, show the inline code and broadcast `failed_init`.
    fn fail(&mut self, err: FrameError) -> FrameError {
        let code = err.code();
        tracing::error!(code, error = %err, "session failed");
        self.state = SessionState::Failed;
        self.context = None;
        self.surface.render_failure(code);
        if let Err(e) = self.bridge.broadcast_failure() {
            tracing::error!("failed_init broadcast failed: {e}");
        }
        err
    }
}
