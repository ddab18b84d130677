//! Push transport seam.
//!
//! The transport SDK that talks to the push service lives outside this
//! crate. It is consumed through the [`PushTransport`] trait for one-shot
//! operations, and it pushes inbound events (messages, refreshed tokens,
//! installation id changes) through a [`TransportSink`] from any thread.
//!
//! # Architecture
//!
//! ```text
//! push service ──> transport SDK ──> TransportSink::message()
//!                                        │
//!                                        ├──> DeliveryCoordinator (buffer | deliver)
//!                                        │
//!                  TransportSink::token() ──> IdentityTracker (subscriber | drop)
//! ```

// Rust guideline compliant 2026-02

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::delivery::{DeliveryCoordinator, Disposition};
use crate::event::NotificationEvent;
use crate::identity::IdentityTracker;

pub use memory::MemoryTransport;

/// A failure reported by the push transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Wrap a transport failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A failure the transport gave no message for.
    pub fn unknown() -> Self {
        Self::new("Task failed for unknown reason")
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// One-shot operations offered by the push transport.
///
/// Every call completes exactly once with a value or a [`TransportError`].
/// None of them can be cancelled mid-flight.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Subscribe this installation to a topic.
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Unsubscribe this installation from a topic.
    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Fetch the messaging token. `None` when the transport has none yet.
    async fn get_token(&self) -> Result<Option<String>, TransportError>;

    /// Invalidate the messaging token.
    async fn delete_token(&self) -> Result<(), TransportError>;

    /// Whether the transport initializes itself automatically at startup.
    async fn is_auto_init_enabled(&self) -> Result<bool, TransportError>;

    /// Enable or disable automatic initialization.
    async fn set_auto_init_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    /// Fetch the installation id.
    async fn get_installation_id(&self) -> Result<String, TransportError>;

    /// Fetch the installation auth token, optionally forcing a refresh.
    async fn get_installation_token(&self, force_refresh: bool) -> Result<String, TransportError>;

    /// Delete the installation. A later fetch establishes a fresh identity.
    async fn delete_installation(&self) -> Result<(), TransportError>;
}

/// Inbound entry points for the transport. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct TransportSink {
    coordinator: DeliveryCoordinator,
    identity: Arc<IdentityTracker>,
}

impl TransportSink {
    pub(crate) fn new(coordinator: DeliveryCoordinator, identity: Arc<IdentityTracker>) -> Self {
        Self {
            coordinator,
            identity,
        }
    }

    /// A message arrived from the push service.
    pub fn message(&self, event: NotificationEvent) -> Disposition {
        self.coordinator.message_received(event)
    }

    /// The transport issued a new messaging token.
    pub fn token(&self, token: impl Into<String>) {
        self.identity.token_refreshed(token.into());
    }

    /// The installation id changed.
    pub fn installation_id(&self, installation_id: impl Into<String>) {
        self.identity.installation_id_changed(installation_id.into());
    }
}
