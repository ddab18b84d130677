//! Listener registration and lifecycle flags.
//!
//! Holds at most one delivery target (the application's `onMessageReceived`
//! registration) plus the foreground/background flag and the
//! immediate-delivery policy. The coordinator reads all three under its lock
//! to decide whether an event is delivered now or buffered.

use crate::event::Payload;
use crate::subscription::{self, MessageStream, Publisher};

/// Foreground/background state and delivery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    in_background: bool,
    immediate_delivery: bool,
}

impl LifecycleState {
    /// Start in the background until the host reports a resume.
    pub fn new(immediate_delivery: bool) -> Self {
        Self {
            in_background: true,
            immediate_delivery,
        }
    }

    /// Whether the app is currently backgrounded.
    pub fn in_background(&self) -> bool {
        self.in_background
    }

    /// Whether payloads are delivered even while backgrounded.
    pub fn immediate_delivery(&self) -> bool {
        self.immediate_delivery
    }

    /// Whether lifecycle alone forces buffering.
    pub fn holds_delivery(&self) -> bool {
        self.in_background && !self.immediate_delivery
    }
}

/// The single live delivery target plus lifecycle flags.
#[derive(Debug)]
pub(crate) struct ListenerRegistration {
    target: Option<Publisher<Payload>>,
    lifecycle: LifecycleState,
}

impl ListenerRegistration {
    pub(crate) fn new(immediate_delivery: bool) -> Self {
        Self {
            target: None,
            lifecycle: LifecycleState::new(immediate_delivery),
        }
    }

    /// Register a new target, discarding the previous one unflushed.
    pub(crate) fn register(&mut self) -> MessageStream {
        let (publisher, stream) = subscription::channel();
        if let Some(old) = self.target.replace(publisher) {
            log::info!(
                "[Delivery] Listener {} replaced by {}",
                old.id(),
                stream.id()
            );
        } else {
            log::info!("[Delivery] Listener {} registered", stream.id());
        }
        stream
    }

    /// Drop the target. Returns whether one was registered.
    pub(crate) fn clear(&mut self) -> bool {
        self.target.take().is_some()
    }

    pub(crate) fn target(&self) -> Option<&Publisher<Payload>> {
        self.target.as_ref()
    }

    pub(crate) fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub(crate) fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub(crate) fn set_in_background(&mut self, in_background: bool) {
        self.lifecycle.in_background = in_background;
    }

    /// Whether an arriving event may go straight to the target.
    pub(crate) fn can_deliver_now(&self) -> bool {
        self.has_target() && !self.lifecycle.holds_delivery()
    }
}
