//! The host bridge facade.
//!
//! [`Bridge`] owns every component and exposes the operations the host
//! script can invoke, plus the lifecycle signals the host platform sends.
//! String-named invocations go through [`Action`] and come back as a
//! [`Reply`].
//!
//! # Startup
//!
//! Building a bridge spawns the UI thread, creates the default channel and,
//! if the process was launched from a notification, buffers that
//! notification so the first listener to register receives it.
//!
//! # Lifecycle
//!
//! | Signal              | Effect                                        |
//! |---------------------|-----------------------------------------------|
//! | `on_pause`          | mark backgrounded                             |
//! | `on_resume`         | mark foregrounded, flush if a listener exists |
//! | `on_reset`          | drop the listener and the token subscriber    |
//! | `on_new_intent`     | treat a notification tap like a cold start    |
//! | `on_page_finished`  | run global calls queued for the surface       |
//! | `shutdown`          | reset, then stop the UI thread                |

// Rust guideline compliant 2026-02

pub mod action;

use std::sync::Arc;

use crate::channels::{Channel, ChannelInfo, ChannelOptions, ChannelRegistry};
use crate::config::Config;
use crate::delivery::{DeliveryCoordinator, Disposition, LifecycleState, MessageReceiver};
use crate::error::BridgeError;
use crate::event::NotificationEvent;
use crate::host::{HostCapabilities, NoRuntimePermissions};
use crate::identity::{IdentityRecord, IdentityTracker};
use crate::script_queue::{LoggingSurface, PendingScriptQueue, PresentationSurface};
use crate::subscription::{MessageStream, TokenStream};
use crate::transport::{PushTransport, TransportSink};
use crate::ui::{UiHandle, UiThread};

pub use action::{Action, Reply};

/// Builder for [`Bridge`]. A push transport is required; everything else
/// has a default.
pub struct BridgeBuilder {
    config: Config,
    transport: Option<Arc<dyn PushTransport>>,
    host: Arc<dyn HostCapabilities>,
    surface: Arc<dyn PresentationSurface>,
    launch_extras: Option<NotificationEvent>,
}

impl std::fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("config", &self.config)
            .field("has_transport", &self.transport.is_some())
            .field("launch_extras", &self.launch_extras)
            .finish_non_exhaustive()
    }
}

impl BridgeBuilder {
    /// Start from a configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            host: Arc::new(NoRuntimePermissions),
            surface: Arc::new(LoggingSurface),
            launch_extras: None,
        }
    }

    /// The push transport SDK.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Host permission and tray capabilities.
    #[must_use]
    pub fn host(mut self, host: Arc<dyn HostCapabilities>) -> Self {
        self.host = host;
        self
    }

    /// Where global calls are evaluated.
    #[must_use]
    pub fn surface(mut self, surface: Arc<dyn PresentationSurface>) -> Self {
        self.surface = surface;
        self
    }

    /// Extras the process was launched with.
    #[must_use]
    pub fn launch_extras(mut self, extras: NotificationEvent) -> Self {
        self.launch_extras = Some(extras);
        self
    }

    /// Spawn the UI thread and wire the components together.
    pub fn build(self) -> Result<Bridge, BridgeError> {
        let transport = self
            .transport
            .ok_or_else(|| BridgeError::invalid_argument("a push transport is required"))?;

        let ui = UiThread::spawn();
        let coordinator =
            DeliveryCoordinator::new(self.config.immediate_payload_delivery, ui.handle());
        let scripts = Arc::new(PendingScriptQueue::new(
            self.surface,
            self.config.script_namespace.clone(),
            ui.handle(),
        ));
        let identity = Arc::new(IdentityTracker::new(
            Arc::clone(&transport),
            Arc::clone(&scripts),
            ui.handle(),
        ));
        let channels = ChannelRegistry::new(
            self.config.default_channel_id.clone(),
            self.config.channels_supported,
        );

        let bridge = Bridge {
            config: self.config,
            coordinator,
            channels,
            identity,
            scripts,
            transport,
            host: self.host,
            ui,
        };

        if let Some(extras) = self.launch_extras {
            bridge.coordinator.launch_event(extras);
        }
        bridge
            .channels
            .ensure_default_channel(&bridge.config.default_channel_name)?;

        log::info!(
            "[Bridge] Initialized (immediate delivery: {}, channels supported: {})",
            bridge.config.immediate_payload_delivery,
            bridge.config.channels_supported
        );
        Ok(bridge)
    }
}

/// The bridge between the push transport, the host and the application.
pub struct Bridge {
    config: Config,
    coordinator: DeliveryCoordinator,
    channels: ChannelRegistry,
    identity: Arc<IdentityTracker>,
    scripts: Arc<PendingScriptQueue>,
    transport: Arc<dyn PushTransport>,
    host: Arc<dyn HostCapabilities>,
    ui: UiThread,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Start building a bridge.
    pub fn builder(config: Config) -> BridgeBuilder {
        BridgeBuilder::new(config)
    }

    /// The configuration the bridge was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Entry points for the transport to push inbound events.
    pub fn transport_sink(&self) -> TransportSink {
        TransportSink::new(self.coordinator.clone(), Arc::clone(&self.identity))
    }

    /// Handle for the UI thread, e.g. to wait for posted deliveries.
    pub fn ui(&self) -> UiHandle {
        self.ui.handle()
    }

    // === Messages and tokens ===

    /// Register the message listener and receive anything buffered so far.
    pub fn on_message_received(&self) -> MessageStream {
        self.coordinator.register_listener()
    }

    /// Register the token refresh subscriber.
    pub async fn on_token_refresh(&self) -> TokenStream {
        self.identity.on_token_refresh().await
    }

    /// Fetch the messaging token.
    pub async fn get_token(&self) -> Result<Option<String>, BridgeError> {
        self.identity.get_token().await
    }

    /// Fetch the installation id (`getId`).
    pub async fn get_id(&self) -> Result<String, BridgeError> {
        self.identity.get_installation_id().await
    }

    /// Fetch the installation id.
    pub async fn get_installation_id(&self) -> Result<String, BridgeError> {
        self.identity.get_installation_id().await
    }

    /// Fetch the installation auth token.
    pub async fn get_installation_token(&self) -> Result<String, BridgeError> {
        self.identity.get_installation_token().await
    }

    /// Subscribe to a topic.
    pub async fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        let topic = require_topic(topic)?;
        self.transport.subscribe(topic).await?;
        log::info!("[Bridge] Subscribed to topic '{topic}'");
        Ok(())
    }

    /// Unsubscribe from a topic.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), BridgeError> {
        let topic = require_topic(topic)?;
        self.transport.unsubscribe(topic).await?;
        log::info!("[Bridge] Unsubscribed from topic '{topic}'");
        Ok(())
    }

    /// Invalidate the messaging token.
    pub async fn unregister(&self) -> Result<(), BridgeError> {
        self.transport.delete_token().await?;
        log::info!("[Bridge] Messaging token deleted");
        Ok(())
    }

    /// Delete the installation.
    pub async fn delete_installation_id(&self) -> Result<(), BridgeError> {
        self.identity.delete_installation().await
    }

    /// Last identity values seen from the transport.
    pub fn identity_record(&self) -> IdentityRecord {
        self.identity.record()
    }

    /// Whether the transport initializes automatically.
    pub async fn is_auto_init_enabled(&self) -> Result<bool, BridgeError> {
        Ok(self.transport.is_auto_init_enabled().await?)
    }

    /// Enable or disable automatic initialization.
    pub async fn set_auto_init_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        Ok(self.transport.set_auto_init_enabled(enabled).await?)
    }

    // === Channels ===

    /// Create or replace a channel.
    pub fn create_channel(&self, options: &ChannelOptions) -> Result<(), BridgeError> {
        self.channels.upsert_channel(options)
    }

    /// Delete a channel. Unknown ids succeed.
    pub fn delete_channel(&self, id: &str) -> Result<(), BridgeError> {
        self.channels.delete_channel(id)
    }

    /// All channels as `{id, name}`.
    pub fn list_channels(&self) -> Vec<ChannelInfo> {
        self.channels.list_channels()
    }

    /// Replace the default channel.
    pub fn set_default_channel(&self, options: &ChannelOptions) -> Result<(), BridgeError> {
        self.channels.set_default_channel(options)
    }

    /// Full attributes of one channel.
    pub fn channel(&self, id: &str) -> Option<Channel> {
        self.channels.channel(id)
    }

    /// The sound URI a channel plays, resolved against the app package.
    pub fn channel_sound_uri(&self, id: &str) -> Option<String> {
        self.channels
            .channel(id)
            .map(|channel| channel.sound.uri(&self.config.package_name))
    }

    // === Permissions and tray ===

    /// Whether notifications can currently be shown.
    pub fn has_permission(&self) -> bool {
        self.host.notifications_enabled()
            && (!self.host.requires_runtime_permission() || self.host.has_runtime_permission())
    }

    /// Ask for the notification permission if it is needed and missing.
    ///
    /// A failed prompt counts as denied.
    pub async fn grant_permission(&self) -> bool {
        if !self.host.requires_runtime_permission() || self.host.has_runtime_permission() {
            return true;
        }

        log::info!("[Bridge] Requesting notification permission");
        match self.host.request_runtime_permission().await {
            Ok(granted) => {
                log::info!("[Bridge] Notification permission granted: {granted}");
                granted
            }
            Err(e) => {
                log::warn!("[Bridge] Permission request failed: {e:#}");
                false
            }
        }
    }

    /// Remove every posted notification from the tray.
    pub fn clear_all_notifications(&self) {
        if let Err(e) = self.host.clear_all_notifications() {
            log::warn!("[Bridge] Failed to clear notifications: {e:#}");
        }
    }

    // === Side channels ===

    /// Add a receiver that may claim events before the listener sees them.
    pub fn register_receiver(&self, receiver: Arc<dyn MessageReceiver>) {
        self.coordinator.register_receiver(receiver);
    }

    /// Remove every side-channel receiver.
    pub fn clear_receivers(&self) {
        self.coordinator.clear_receivers();
    }

    /// Number of events waiting for delivery.
    pub fn pending_messages(&self) -> usize {
        self.coordinator.pending_len()
    }

    /// Current lifecycle flags.
    pub fn lifecycle(&self) -> LifecycleState {
        self.coordinator.lifecycle()
    }

    // === Lifecycle signals ===

    /// The app moved to the background.
    pub fn on_pause(&self) {
        log::debug!("[Bridge] Paused");
        self.coordinator.app_paused();
    }

    /// The app came to the foreground. Returns how many buffered events were flushed.
    pub fn on_resume(&self) -> usize {
        log::debug!("[Bridge] Resumed");
        self.coordinator.app_resumed()
    }

    /// The host script was reloaded; its registrations are gone.
    pub fn on_reset(&self) {
        log::info!("[Bridge] Reset");
        self.coordinator.reset();
        self.identity.clear_subscriber();
    }

    /// A new intent reached the running app.
    pub fn on_new_intent(&self, extras: NotificationEvent) -> Option<Disposition> {
        self.coordinator.launch_event(extras)
    }

    /// The presentation surface finished loading. Returns how many queued calls ran.
    pub fn on_page_finished(&self) -> usize {
        self.scripts.mark_ready_and_flush()
    }

    /// Reset, then stop the UI thread after it drains.
    pub fn shutdown(&mut self) {
        self.on_reset();
        self.ui.shutdown();
        log::info!("[Bridge] Shut down");
    }
}

fn require_topic(topic: &str) -> Result<&str, BridgeError> {
    if topic.is_empty() {
        return Err(BridgeError::invalid_argument("topic must not be empty"));
    }
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn bridge() -> Bridge {
        Bridge::builder(Config::default())
            .transport(Arc::new(MemoryTransport::with_token("tok")))
            .build()
            .unwrap()
    }

    struct PromptingHost {
        held: AtomicBool,
        answer: bool,
    }

    #[async_trait]
    impl HostCapabilities for PromptingHost {
        fn requires_runtime_permission(&self) -> bool {
            true
        }

        fn has_runtime_permission(&self) -> bool {
            self.held.load(Ordering::SeqCst)
        }

        async fn request_runtime_permission(&self) -> anyhow::Result<bool> {
            self.held.store(self.answer, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    #[test]
    fn test_build_requires_transport() {
        let err = Bridge::builder(Config::default()).build().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_default_channel_created_on_build() {
        let bridge = bridge();
        let channels = bridge.list_channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "fcm_default_channel");
        assert_eq!(channels[0].name, "Default");
    }

    #[test]
    fn test_sound_uri_uses_package_name() {
        let bridge = bridge();
        let mut options = ChannelOptions::new("ring", "Ring");
        options.sound = Some("chime".to_string());
        bridge.create_channel(&options).unwrap();

        assert_eq!(
            bridge.channel_sound_uri("ring").as_deref(),
            Some("android.resource://com.example.app/raw/chime")
        );
        assert_eq!(
            bridge.channel_sound_uri("fcm_default_channel").as_deref(),
            Some("content://settings/system/notification_sound")
        );
        assert_eq!(bridge.channel_sound_uri("missing"), None);
    }

    #[tokio::test]
    async fn test_default_host_grants_permission() {
        let bridge = bridge();
        assert!(bridge.has_permission());
        assert!(bridge.grant_permission().await);
    }

    #[tokio::test]
    async fn test_runtime_permission_prompt() {
        let host = Arc::new(PromptingHost {
            held: AtomicBool::new(false),
            answer: true,
        });
        let bridge = Bridge::builder(Config::default())
            .transport(Arc::new(MemoryTransport::new()))
            .host(host)
            .build()
            .unwrap();

        assert!(!bridge.has_permission());
        assert!(bridge.grant_permission().await);
        assert!(bridge.has_permission());
        // Already held: answers without prompting again.
        assert!(bridge.grant_permission().await);
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let host = Arc::new(PromptingHost {
            held: AtomicBool::new(false),
            answer: false,
        });
        let bridge = Bridge::builder(Config::default())
            .transport(Arc::new(MemoryTransport::new()))
            .host(host)
            .build()
            .unwrap();

        assert!(!bridge.grant_permission().await);
        assert!(!bridge.has_permission());
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let bridge = bridge();
        assert!(matches!(
            bridge.subscribe("").await,
            Err(BridgeError::InvalidArgument(_))
        ));
        bridge.subscribe("news").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_clears_both_registrations() {
        let bridge = bridge();
        let mut messages = bridge.on_message_received();
        let mut tokens = bridge.on_token_refresh().await;

        bridge.on_reset();
        assert!(messages.recv().await.is_none());
        while let Some(value) = tokens.recv().await {
            assert_eq!(value.unwrap(), "tok");
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_delivery() {
        let mut bridge = bridge();
        bridge.shutdown();

        let sink = bridge.transport_sink();
        sink.message(NotificationEvent::new().with("google.message_id", "late"));
        assert_eq!(bridge.pending_messages(), 1);

        let mut stream = bridge.on_message_received();
        assert_eq!(bridge.on_resume(), 0);
        assert_eq!(bridge.pending_messages(), 1);
        assert!(stream.try_recv().is_none());
    }
}
