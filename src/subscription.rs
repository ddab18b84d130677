//! Keep-alive subscriptions handed to the application.
//!
//! A registration such as `onMessageReceived` or `onTokenRefresh` is a
//! long-lived callback: the application registers once and then receives
//! any number of values. Here that is a [`Subscription`], the receiving
//! half of an unbounded channel that implements [`Stream`]. The bridge
//! holds the matching [`Publisher`].
//!
//! Replacing or clearing a registration drops the publisher, which ends
//! the stream (`recv()` returns `None`).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::BridgeError;
use crate::event::Payload;

/// Stream of delivered notification payloads.
pub type MessageStream = Subscription<Payload>;

/// Stream of refreshed tokens (or the error from the initial fetch).
pub type TokenStream = Subscription<Result<String, BridgeError>>;

/// Create a connected publisher/subscription pair.
pub(crate) fn channel<T>() -> (Publisher<T>, Subscription<T>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    (Publisher { id, tx }, Subscription { id, rx })
}

/// Sending half, owned by the bridge.
#[derive(Debug)]
pub(crate) struct Publisher<T> {
    id: Uuid,
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Publisher<T> {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Push a value while keeping the registration open.
    ///
    /// Returns `false` if the application dropped its subscription.
    pub(crate) fn send(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Receiving half, owned by the application.
#[derive(Debug)]
pub struct Subscription<T> {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Registration id, as it appears in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next value. `None` once the registration was replaced or reset.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a value if one is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
