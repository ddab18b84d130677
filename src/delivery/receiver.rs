//! Side-channel message receivers.
//!
//! Host-specific extensions can claim categories of messages (silent data
//! pushes, for instance) before the coordinator buffers or delivers them.
//! Receivers are consulted in registration order; the first one that
//! accepts an event consumes it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::event::NotificationEvent;

/// An extension that may intercept inbound events.
pub trait MessageReceiver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "receiver"
    }

    /// Whether this receiver wants `event`.
    fn can_handle(&self, event: &NotificationEvent) -> bool;

    /// Take ownership of an accepted event.
    fn handle(&self, event: NotificationEvent);
}

/// Ordered set of receivers.
#[derive(Default)]
pub(crate) struct ReceiverRegistry {
    receivers: RwLock<Vec<Arc<dyn MessageReceiver>>>,
}

impl std::fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &self.len())
            .finish()
    }
}

impl ReceiverRegistry {
    pub(crate) fn register(&self, receiver: Arc<dyn MessageReceiver>) {
        log::debug!("[Delivery] Registered receiver '{}'", receiver.name());
        self.write().push(receiver);
    }

    pub(crate) fn clear(&self) {
        self.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    /// Offer `event` to each receiver in turn.
    ///
    /// Returns the event back if nobody took it. A receiver that panics in
    /// `can_handle` is skipped; one that panics in `handle` has consumed the
    /// event.
    pub(crate) fn offer(&self, event: NotificationEvent) -> Result<(), NotificationEvent> {
        // Snapshot so receivers may register others without deadlocking.
        let receivers: Vec<Arc<dyn MessageReceiver>> = self.read().clone();

        for receiver in receivers {
            let accepts = panic::catch_unwind(AssertUnwindSafe(|| receiver.can_handle(&event)))
                .unwrap_or_else(|_| {
                    log::error!("[Delivery] Receiver '{}' panicked in can_handle", receiver.name());
                    false
                });
            if !accepts {
                continue;
            }

            log::debug!("[Delivery] Event handled by receiver '{}'", receiver.name());
            if panic::catch_unwind(AssertUnwindSafe(|| receiver.handle(event))).is_err() {
                log::error!("[Delivery] Receiver '{}' panicked in handle", receiver.name());
            }
            return Ok(());
        }

        Err(event)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn MessageReceiver>>> {
        self.receivers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn MessageReceiver>>> {
        self.receivers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
