//! Host platform capabilities.
//!
//! Whether the host exposes a runtime notification permission, and how to
//! prompt for it, is decided once when the bridge is built by choosing a
//! [`HostCapabilities`] implementation. The default one reports that no
//! runtime permission exists and notifications are enabled.

use async_trait::async_trait;

/// Permission and tray operations supplied by the host.
#[async_trait]
pub trait HostCapabilities: Send + Sync {
    /// Whether the user has notifications enabled for this app.
    fn notifications_enabled(&self) -> bool {
        true
    }

    /// Whether posting notifications needs a runtime permission grant.
    fn requires_runtime_permission(&self) -> bool {
        false
    }

    /// Whether the runtime permission is currently held.
    fn has_runtime_permission(&self) -> bool {
        true
    }

    /// Prompt the user for the runtime permission. Resolves once they answer.
    async fn request_runtime_permission(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Remove every notification this app has posted to the tray.
    fn clear_all_notifications(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hosts without runtime notification permissions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRuntimePermissions;

impl HostCapabilities for NoRuntimePermissions {}
