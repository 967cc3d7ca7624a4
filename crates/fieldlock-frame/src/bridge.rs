//! Origin-checked message channel between the frame and its embedder.
//!
//! This module provides:
//! - [`FrameTransport`] — the `postMessage` seam
//! - [`MessageBridge`] — outbound to the embedder origin only, `failed_init`
//!   broadcast to `*`, inbound accepted only from the embedder origin
//! - [`InboundRegistry`] — callbacks keyed by [`InboundCommand`]
//! - [`ChannelTransport`] / [`RecordingTransport`] — in-process transports

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::error::FrameError;
use crate::protocol::{InboundCommand, OutboundMessage};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Where a message may be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Only a window whose origin equals this value.
    Exact(String),
    /// Any origin (`*`).
    Any,
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(origin) => f.write_str(origin),
            Self::Any => f.write_str("*"),
        }
    }
}

/// One posted message as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub target: TargetOrigin,
    pub body: String,
}

/// Delivers serialized messages to the parent window.
pub trait FrameTransport {
    /// Post `body` restricted to `target`.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Bridge` if the message cannot be delivered.
    fn post(&self, body: &str, target: &TargetOrigin) -> Result<(), FrameError>;
}

/// Transport backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<PostedMessage>,
}

impl ChannelTransport {
    /// Create a transport and the receiving end the embedder side reads.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PostedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FrameTransport for ChannelTransport {
    fn post(&self, body: &str, target: &TargetOrigin) -> Result<(), FrameError> {
        self.tx
            .send(PostedMessage {
                target: target.clone(),
                body: body.to_string(),
            })
            .map_err(|_| FrameError::Bridge("embedder channel closed".into()))
    }
}

/// Transport that keeps every posted message. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    posted: Arc<Mutex<Vec<PostedMessage>>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything posted so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FrameTransport for RecordingTransport {
    fn post(&self, body: &str, target: &TargetOrigin) -> Result<(), FrameError> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PostedMessage {
                target: target.clone(),
                body: body.to_string(),
            });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Typed, origin-restricted wrapper around a [`FrameTransport`].
#[derive(Debug)]
pub struct MessageBridge<T> {
    transport: T,
    embedder_origin: Option<String>,
}

impl<T: FrameTransport> MessageBridge<T> {
    /// A bridge that can only broadcast until [`Self::bind`] is called.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            embedder_origin: None,
        }
    }

    /// Fix the embedder origin for the rest of the session.
    pub fn bind(&mut self, embedder_origin: String) {
        self.embedder_origin = Some(embedder_origin);
    }

    #[must_use]
    pub fn embedder_origin(&self) -> Option<&str> {
        self.embedder_origin.as_deref()
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Post `message` to the embedder origin.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Bridge` if no origin is bound yet, or if
    /// encoding or delivery fails.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), FrameError> {
        let origin = self
            .embedder_origin
            .as_ref()
            .ok_or_else(|| FrameError::Bridge(format!("no embedder origin for {}", message.kind())))?;
        let body = message.to_json()?;
        tracing::debug!(kind = message.kind(), origin = %origin, "posting message");
        self.transport.post(&body, &TargetOrigin::Exact(origin.clone()))
    }

    /// Post `failed_init` to every origin.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Bridge` if encoding or delivery fails.
    pub fn broadcast_failure(&self) -> Result<(), FrameError> {
        let body = OutboundMessage::FailedInit.to_json()?;
        self.transport.post(&body, &TargetOrigin::Any)
    }

    /// Check an inbound message's origin and parse it.
    ///
    /// Returns `None` (and logs a warning) for foreign origins, messages
    /// received before an origin is bound, and anything unparseable.
    #[must_use]
    pub fn accept(&self, origin: &str, raw: &str) -> Option<InboundCommand> {
        let Some(expected) = self.embedder_origin.as_deref() else {
            tracing::warn!(origin, "inbound message before handshake, dropped");
            return None;
        };
        if origin != expected {
            tracing::warn!(origin, expected, "inbound message from foreign origin, dropped");
            return None;
        }
        match InboundCommand::parse(raw) {
            Ok(command) => Some(command),
            Err(e) => {
                tracing::warn!(origin, "inbound message dropped: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound dispatch
// ---------------------------------------------------------------------------

type Handler<C> = Box<dyn FnMut(&mut C) + Send>;

/// Callbacks for inbound commands, run against a context `C`.
pub struct InboundRegistry<C> {
    handlers: HashMap<InboundCommand, Handler<C>>,
}

impl<C> Default for InboundRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for InboundRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRegistry")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> InboundRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `command`, replacing any previous one.
    pub fn on<F>(&mut self, command: InboundCommand, handler: F)
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.handlers.insert(command, Box::new(handler));
    }

    /// Run the handler for `command`. Returns `false` if none is registered.
    pub fn dispatch(&mut self, command: InboundCommand, context: &mut C) -> bool {
        match self.handlers.get_mut(&command) {
            Some(handler) => {
                handler(context);
                true
            }
            None => {
                tracing::debug!(?command, "no handler registered");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBEDDER: &str = "https://shop.example";

    fn bound() -> MessageBridge<RecordingTransport> {
        let mut bridge = MessageBridge::new(RecordingTransport::new());
        bridge.bind(EMBEDDER.into());
        bridge
    }

    #[test]
    fn send_targets_embedder_only() {
        let bridge = bound();
        bridge.send(&OutboundMessage::Focus).unwrap();
        let posted = bridge.transport().messages();
        assert_eq!(
            posted,
            vec![PostedMessage {
                target: TargetOrigin::Exact(EMBEDDER.into()),
                body: r#"{"type":"focus"}"#.into(),
            }]
        );
    }

    #[test]
    fn send_before_bind_fails() {
        let bridge = MessageBridge::new(RecordingTransport::new());
        let err = bridge.send(&OutboundMessage::Blur).unwrap_err();
        assert_eq!(err.code(), "E_BRIDGE");
        assert!(bridge.transport().messages().is_empty());
    }

    #[test]
    fn failure_is_broadcast_even_unbound() {
        let bridge = MessageBridge::new(RecordingTransport::new());
        bridge.broadcast_failure().unwrap();
        let posted = bridge.transport().messages();
        assert_eq!(posted[0].target, TargetOrigin::Any);
        assert_eq!(posted[0].target.to_string(), "*");
        assert_eq!(posted[0].body, r#"{"type":"failed_init"}"#);
    }

    #[test]
    fn accept_checks_exact_origin() {
        let bridge = bound();
        assert_eq!(
            bridge.accept(EMBEDDER, r#"{"type":"focus"}"#),
            Some(InboundCommand::Focus)
        );
        assert_eq!(bridge.accept("https://evil.example", r#"{"type":"focus"}"#), None);
        assert_eq!(bridge.accept("https://shop.example:443", r#"{"type":"focus"}"#), None);
        assert_eq!(bridge.accept("http://shop.example", r#"{"type":"blur"}"#), None);
    }

    #[test]
    fn accept_drops_garbage_and_unbound() {
        assert_eq!(bound().accept(EMBEDDER, "{}"), None);
        assert_eq!(bound().accept(EMBEDDER, r#"{"type":"ready"}"#), None);
        let unbound = MessageBridge::new(RecordingTransport::new());
        assert_eq!(unbound.accept(EMBEDDER, r#"{"type":"focus"}"#), None);
    }

    #[test]
    fn registry_dispatches_by_command() {
        let mut registry: InboundRegistry<Vec<&'static str>> = InboundRegistry::new();
        registry.on(InboundCommand::Focus, |log| log.push("focus"));
        let mut log = Vec::new();
        assert!(registry.dispatch(InboundCommand::Focus, &mut log));
        assert!(!registry.dispatch(InboundCommand::Blur, &mut log));
        assert_eq!(log, vec!["focus"]);
    }

    #[test]
    fn channel_transport_delivers_in_order() {
        let (transport, mut rx) = ChannelTransport::channel();
        transport.post("a", &TargetOrigin::Any).unwrap();
        transport.post("b", &TargetOrigin::Exact(EMBEDDER.into())).unwrap();
        assert_eq!(rx.try_recv().unwrap().body, "a");
        assert_eq!(rx.try_recv().unwrap().body, "b");
        drop(rx);
        assert!(transport.post("c", &TargetOrigin::Any).is_err());
    }
}
