//! Installation identity and token refresh notifications.
//!
//! Fetches go straight to the push transport; nothing is served from a
//! local cache. The tracker remembers the last values it saw only so the
//! host can inspect them, and forgets them when the installation is
//! deleted.
//!
//! Token refreshes pushed by the transport reach the single registered
//! subscriber. With no subscriber they are dropped, and a subscriber that
//! registers later does not see them. This differs on purpose from
//! notification delivery, which buffers.

// Rust guideline compliant 2026-02

use std::sync::{Arc, Mutex};

use crate::error::BridgeError;
use crate::script_queue::{GlobalCall, PendingScriptQueue};
use crate::subscription::{self, Publisher, TokenStream};
use crate::transport::PushTransport;
use crate::ui::UiHandle;

/// Last identity values observed from the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Installation id, once resolved.
    pub installation_id: Option<String>,
    /// Installation auth token, once resolved.
    pub installation_token: Option<String>,
}

#[derive(Debug, Default)]
struct IdentityState {
    record: IdentityRecord,
    token_subscriber: Option<Publisher<Result<String, BridgeError>>>,
}

/// Tracks the installation identity and the token refresh subscriber.
pub struct IdentityTracker {
    transport: Arc<dyn PushTransport>,
    state: Arc<Mutex<IdentityState>>,
    scripts: Arc<PendingScriptQueue>,
    ui: UiHandle,
}

impl std::fmt::Debug for IdentityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityTracker")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl IdentityTracker {
    /// Create a tracker over `transport`.
    pub fn new(
        transport: Arc<dyn PushTransport>,
        scripts: Arc<PendingScriptQueue>,
        ui: UiHandle,
    ) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(IdentityState::default())),
            scripts,
            ui,
        }
    }

    /// Fetch the messaging token.
    pub async fn get_token(&self) -> Result<Option<String>, BridgeError> {
        Ok(self.transport.get_token().await?)
    }

    /// Fetch the installation id.
    pub async fn get_installation_id(&self) -> Result<String, BridgeError> {
        let id = self.transport.get_installation_id().await?;
        self.lock().record.installation_id = Some(id.clone());
        Ok(id)
    }

    /// Fetch the installation auth token without forcing a refresh.
    pub async fn get_installation_token(&self) -> Result<String, BridgeError> {
        let token = self.transport.get_installation_token(false).await?;
        self.lock().record.installation_token = Some(token.clone());
        Ok(token)
    }

    /// Delete the installation and forget the tracked values.
    pub async fn delete_installation(&self) -> Result<(), BridgeError> {
        self.transport.delete_installation().await?;
        self.lock().record = IdentityRecord::default();
        log::info!("[Identity] Installation deleted");
        Ok(())
    }

    /// Register the token refresh subscriber, replacing any previous one.
    ///
    /// The current token is fetched and pushed to the new subscriber; if
    /// that fetch fails the subscriber receives the error instead.
    pub async fn on_token_refresh(&self) -> TokenStream {
        let (publisher, stream) = subscription::channel();
        if self.lock().token_subscriber.replace(publisher).is_some() {
            log::info!("[Identity] Token subscriber replaced by {}", stream.id());
        }

        match self.transport.get_token().await {
            Ok(Some(token)) => self.token_refreshed(token),
            Ok(None) => log::debug!("[Identity] No token yet for new subscriber"),
            Err(e) => self.push_to_subscriber(Err(e.into())),
        }
        stream
    }

    /// The transport issued a new token.
    pub fn token_refreshed(&self, token: String) {
        self.push_to_subscriber(Ok(token));
    }

    /// The transport reported a new installation id.
    pub fn installation_id_changed(&self, installation_id: String) {
        log::info!("[Identity] Installation id changed");
        self.scripts
            .enqueue_or_run(GlobalCall::installation_id_changed(&installation_id));
        self.lock().record.installation_id = Some(installation_id);
    }

    /// Drop the token subscriber.
    pub fn clear_subscriber(&self) {
        if self.lock().token_subscriber.take().is_some() {
            log::info!("[Identity] Token subscriber cleared");
        }
    }

    /// Whether a token subscriber is registered.
    pub fn has_subscriber(&self) -> bool {
        self.lock().token_subscriber.is_some()
    }

    /// Last observed identity values.
    pub fn record(&self) -> IdentityRecord {
        self.lock().record.clone()
    }

    /// Deliver on the UI thread to whichever subscriber is current then.
    fn push_to_subscriber(&self, value: Result<String, BridgeError>) {
        if !self.has_subscriber() {
            log::debug!("[Identity] No token subscriber, dropping refresh");
            return;
        }

        let state = Arc::clone(&self.state);
        self.ui.post(move || {
            let state = crate::lock_or_recover(&state);
            match &state.token_subscriber {
                Some(subscriber) => {
                    if !subscriber.send(value) {
                        log::warn!("[Identity] Token subscriber {} is closed", subscriber.id());
                    }
                }
                None => log::debug!("[Identity] Token subscriber gone, dropping refresh"),
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IdentityState> {
        crate::lock_or_recover(&self.state)
    }
}
