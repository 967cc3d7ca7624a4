//! Async event loop for one session.
//!
//! Events are taken from a bounded tokio channel and each one is processed
//! to completion before the next is received, so `change` messages leave in
//! keystroke order.

use tokio::sync::mpsc;

use crate::bridge::FrameTransport;
use crate::session::{FrameEvent, SessionController};
use crate::surface::FieldSurface;

/// Default capacity for [`event_channel`].
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Create the event queue feeding [`run_session`].
#[must_use]
pub fn event_channel(capacity: usize) -> (mpsc::Sender<FrameEvent>, mpsc::Receiver<FrameEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Run the handshake, then process events until every sender is dropped.
///
/// A failed handshake or a fatal error does not stop the loop: the
/// controller ignores later events, and the queue is drained. The
/// controller is returned for inspection.
pub async fn run_session<T, S>(
    mut controller: SessionController<T, S>,
    query: String,
    mut events: mpsc::Receiver<FrameEvent>,
) -> SessionController<T, S>
where
    T: FrameTransport + 'static,
    S: FieldSurface + 'static,
{
    if let Err(e) = controller.start(&query) {
        tracing::debug!(code = e.code(), "handshake did not complete");
    }

    while let Some(event) = events.recv().await {
        if let Err(e) = controller.handle_event(event) {
            tracing::debug!(code = e.code(), "event ended the session");
        }
    }

    tracing::info!(state = ?controller.state(), "event queue closed");
    controller
}
