//! Notification channel registry.
//!
//! Channels are named delivery categories with presentation attributes.
//! Creation is create-or-replace by id; deletion is idempotent. One id is
//! the default channel: it is created at startup from configuration and can
//! be swapped with [`ChannelRegistry::set_default_channel`].
//!
//! # Platforms without channels
//!
//! When channels are unsupported every mutation still validates its input
//! and then reports success without storing anything, and listings are
//! empty. Callers do not need to special-case the platform.

// Rust guideline compliant 2026-02

pub mod options;

use std::sync::Mutex;

use crate::error::BridgeError;

pub use options::{
    Channel, ChannelInfo, ChannelOptions, ChannelSound, Importance, Vibration, Visibility,
};

#[derive(Debug)]
struct RegistryState {
    /// Creation order; a replaced channel keeps its slot.
    channels: Vec<Channel>,
    default_id: String,
}

/// Registry of notification channels.
#[derive(Debug)]
pub struct ChannelRegistry {
    state: Mutex<RegistryState>,
    supported: bool,
}

impl ChannelRegistry {
    /// Create an empty registry whose default channel id is `default_id`.
    pub fn new(default_id: impl Into<String>, supported: bool) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                channels: Vec::new(),
                default_id: default_id.into(),
            }),
            supported,
        }
    }

    /// Whether this platform has channels at all.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Create the default channel with default attributes.
    pub fn ensure_default_channel(&self, name: &str) -> Result<(), BridgeError> {
        let id = self.default_channel_id();
        self.upsert_channel(&ChannelOptions::new(id, name))
    }

    /// Create or replace a channel.
    pub fn upsert_channel(&self, options: &ChannelOptions) -> Result<(), BridgeError> {
        let channel = options.validate()?;
        if !self.supported {
            log::debug!("[Channels] Channels unsupported, skipping '{}'", channel.id);
            return Ok(());
        }

        let mut state = self.lock();
        if channel.id == state.default_id {
            if !channel.importance.is_visible() {
                log::warn!(
                    "[Channels] Default channel '{}' set to invisible importance",
                    channel.id
                );
            }
            log::info!("[Channels] Default channel '{}' is active", channel.id);
        }

        match state.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(slot) => {
                log::debug!("[Channels] Replaced channel '{}'", channel.id);
                *slot = channel;
            }
            None => {
                log::debug!("[Channels] Created channel '{}'", channel.id);
                state.channels.push(channel);
            }
        }
        Ok(())
    }

    /// Delete a channel. Deleting an unknown id succeeds.
    pub fn delete_channel(&self, id: &str) -> Result<(), BridgeError> {
        if !self.supported {
            return Ok(());
        }

        let mut state = self.lock();
        let before = state.channels.len();
        state.channels.retain(|c| c.id != id);
        if state.channels.len() < before {
            log::debug!("[Channels] Deleted channel '{id}'");
        }
        Ok(())
    }

    /// All channels as `{id, name}` in creation order.
    pub fn list_channels(&self) -> Vec<ChannelInfo> {
        self.lock().channels.iter().map(ChannelInfo::from).collect()
    }

    /// Replace the default channel: delete the current one, then create from `options`.
    ///
    /// On success the default id moves to the new channel's id, so a later
    /// call deletes that channel rather than the one from configuration.
    ///
    /// The two steps are not atomic. If creation fails the old default is
    /// already gone and no default channel exists until one is created.
    pub fn set_default_channel(&self, options: &ChannelOptions) -> Result<(), BridgeError> {
        let previous = self.default_channel_id();
        self.delete_channel(&previous)?;

        if let Err(e) = self.upsert_channel(options) {
            log::warn!("[Channels] Default channel '{previous}' deleted but replacement failed: {e}");
            return Err(e);
        }

        if let Some(id) = options.id.as_deref() {
            if id != previous {
                log::info!("[Channels] Default channel id changed '{previous}' -> '{id}'");
                self.lock().default_id = id.to_string();
            }
        }
        Ok(())
    }

    /// Look up a channel by id.
    pub fn channel(&self, id: &str) -> Option<Channel> {
        self.lock().channels.iter().find(|c| c.id == id).cloned()
    }

    /// Whether a channel with this id exists.
    pub fn channel_exists(&self, id: &str) -> bool {
        self.lock().channels.iter().any(|c| c.id == id)
    }

    /// The configured default channel id.
    pub fn default_channel_id(&self) -> String {
        self.lock().default_id.clone()
    }

    /// The default channel, if it currently exists.
    pub fn default_channel(&self) -> Option<Channel> {
        let state = self.lock();
        state
            .channels
            .iter()
            .find(|c| c.id == state.default_id)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        crate::lock_or_recover(&self.state)
    }
}
