//! Pushbridge - push notification delivery bridge.
//!
//! This crate sits between a platform push transport and an application
//! script host. It delivers inbound notifications to the single registered
//! listener, buffering them while the listener is absent or the app is in
//! the background, and never drops one for lack of a listener.
//!
//! # Architecture
//!
//! - **Bridge** - Facade the host talks to; owns everything below
//! - **Delivery** - Deliver-or-buffer coordinator with ordered flushes
//! - **Channels** - Notification channel registry
//! - **Identity** - Installation identity and token refresh subscriber
//! - **Script queue** - Global calls held until the surface is ready
//! - **UI thread** - Single thread all deliveries run on
//!
//! # Modules
//!
//! - [`bridge`] - Bridge facade, actions and lifecycle signals
//! - [`transport`] - Push transport trait and inbound sink
//! - [`config`] - Configuration loading/saving

// Library modules
pub mod bridge;
pub mod channels;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod host;
pub mod identity;
pub mod script_queue;
pub mod subscription;
pub mod transport;
pub mod ui;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use bridge::{Action, Bridge, BridgeBuilder, Reply};
pub use channels::{ChannelInfo, ChannelOptions};
pub use config::Config;
pub use delivery::{Disposition, MessageReceiver};
pub use error::BridgeError;
pub use event::{EventValue, NotificationEvent, Payload};
pub use host::HostCapabilities;
pub use script_queue::PresentationSurface;
pub use subscription::{MessageStream, TokenStream};
pub use transport::{MemoryTransport, PushTransport, TransportError, TransportSink};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovering poisoned lock");
        PoisonError::into_inner(poisoned)
    })
}
