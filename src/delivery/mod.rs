//! Notification delivery coordinator.
//!
//! Receives raw events from the push transport and either delivers them to
//! the application's registered listener right away or buffers them until
//! delivery becomes possible. Nothing is dropped for lack of a listener.
//!
//! # Decision
//!
//! ```text
//! event ──> receivers claim it? ── yes ──> handled, done
//!               │ no
//!               v
//!   no listener, or (backgrounded and immediate delivery off)?
//!               │ yes                         │ no
//!               v                             v
//!        append to buffer             post delivery to UI thread
//! ```
//!
//! # Flushes
//!
//! The whole buffer is drained oldest-first when a listener registers, and
//! when the app resumes while a listener exists. A flush with no listener
//! leaves the buffer untouched.
//!
//! # Ordering
//!
//! Registration, lifecycle flags, the buffer and the in-flight queue sit
//! behind one mutex. A dispatched event moves to the in-flight queue and a
//! delivery job is posted to the UI thread while that lock is held; each
//! job takes the oldest in-flight event. The UI thread therefore sees
//! events in arrival order no matter which worker thread they came in on.
//!
//! In-flight events are always older than buffered ones. When the listener
//! is reset, or a job finds none, or the UI thread has stopped, the
//! in-flight events go back to the front of the buffer in order.
//!
//! # Failures
//!
//! An event that cannot be formatted, or whose listener has gone away, is
//! logged and dropped. Delivery is not retried; the rest of a flush
//! continues.

// Rust guideline compliant 2026-02

pub mod receiver;
pub mod registration;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::event::NotificationEvent;
use crate::subscription::MessageStream;
use crate::ui::UiHandle;

pub use receiver::MessageReceiver;
pub use registration::LifecycleState;

use receiver::ReceiverRegistry;
use registration::ListenerRegistration;

/// What happened to an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A side-channel receiver consumed it.
    Handled,
    /// Appended to the buffer.
    Buffered,
    /// Posted for delivery to the current listener.
    Dispatched,
}

#[derive(Debug)]
struct CoordinatorState {
    registration: ListenerRegistration,
    buffer: VecDeque<NotificationEvent>,
    /// Dispatched, waiting for their UI job. Oldest first.
    in_flight: VecDeque<NotificationEvent>,
}

impl CoordinatorState {
    /// Put every in-flight event back at the front of the buffer.
    fn requeue_in_flight(&mut self) -> usize {
        let count = self.in_flight.len();
        while let Some(event) = self.in_flight.pop_back() {
            self.buffer.push_front(event);
        }
        count
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<CoordinatorState>,
    receivers: ReceiverRegistry,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, CoordinatorState> {
        crate::lock_or_recover(&self.state)
    }
}

/// Buffers and delivers notification events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeliveryCoordinator {
    shared: Arc<Shared>,
    ui: UiHandle,
}

impl DeliveryCoordinator {
    /// Create a coordinator that delivers on `ui`.
    ///
    /// `immediate_delivery` is fixed for the coordinator's lifetime.
    pub fn new(immediate_delivery: bool, ui: UiHandle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CoordinatorState {
                    registration: ListenerRegistration::new(immediate_delivery),
                    buffer: VecDeque::new(),
                    in_flight: VecDeque::new(),
                }),
                receivers: ReceiverRegistry::default(),
            }),
            ui,
        }
    }

    /// Handle an event from the transport. Callable from any thread.
    pub fn message_received(&self, event: NotificationEvent) -> Disposition {
        let Err(event) = self.shared.receivers.offer(event) else {
            return Disposition::Handled;
        };

        let mut state = self.shared.lock();
        // Older events still in the buffer go first.
        if state.registration.can_deliver_now() && state.buffer.is_empty() {
            if self.dispatch(&mut state, event) {
                return Disposition::Dispatched;
            }
            return Disposition::Buffered;
        }

        state.buffer.push_back(event);
        log::debug!(
            "[Delivery] Buffered event ({} pending, listener={}, background={})",
            state.buffer.len(),
            state.registration.has_target(),
            state.registration.lifecycle().in_background()
        );
        Disposition::Buffered
    }

    /// Handle a notification carried by the launch or a later intent.
    ///
    /// Only transport messages are considered; they are tagged as a
    /// background tap and take the normal path. Returns `None` for anything
    /// else.
    pub fn launch_event(&self, mut event: NotificationEvent) -> Option<Disposition> {
        if !event.is_transport_message() {
            return None;
        }
        event.tag_background_tap();
        log::info!("[Delivery] Notification found in launch context");
        Some(self.message_received(event))
    }

    /// Register the application's listener and flush the buffer to it.
    ///
    /// Any previous listener is discarded without being flushed.
    pub fn register_listener(&self) -> MessageStream {
        let mut state = self.shared.lock();
        let stream = state.registration.register();
        self.flush_locked(&mut state);
        stream
    }

    /// Drain the buffer through the current listener.
    ///
    /// Returns how many events were posted. No-op without a listener.
    pub fn flush(&self) -> usize {
        let mut state = self.shared.lock();
        self.flush_locked(&mut state)
    }

    /// The host moved the app to the background.
    pub fn app_paused(&self) {
        self.shared.lock().registration.set_in_background(true);
    }

    /// The host brought the app to the foreground. Flushes if a listener exists.
    pub fn app_resumed(&self) -> usize {
        let mut state = self.shared.lock();
        state.registration.set_in_background(false);
        if state.registration.has_target() {
            self.flush_locked(&mut state)
        } else {
            0
        }
    }

    /// Drop the listener. Buffered and in-flight events stay buffered.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        if state.registration.clear() {
            log::info!("[Delivery] Listener cleared");
        }
        let requeued = state.requeue_in_flight();
        if requeued > 0 {
            log::debug!("[Delivery] Returned {requeued} in-flight event(s) to the buffer");
        }
    }

    /// Add a side-channel receiver.
    pub fn register_receiver(&self, receiver: Arc<dyn MessageReceiver>) {
        self.shared.receivers.register(receiver);
    }

    /// Remove all side-channel receivers.
    pub fn clear_receivers(&self) {
        self.shared.receivers.clear();
    }

    /// Number of buffered events.
    pub fn pending_len(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Whether a listener is registered.
    pub fn has_listener(&self) -> bool {
        self.shared.lock().registration.has_target()
    }

    /// Current lifecycle flags.
    pub fn lifecycle(&self) -> LifecycleState {
        self.shared.lock().registration.lifecycle()
    }

    fn flush_locked(&self, state: &mut CoordinatorState) -> usize {
        if !state.registration.has_target() || state.buffer.is_empty() {
            return 0;
        }

        log::info!("[Delivery] Flushing {} buffered event(s)", state.buffer.len());
        let mut events = std::mem::take(&mut state.buffer).into_iter();
        let mut posted = 0;
        while let Some(event) = events.next() {
            if !self.dispatch(state, event) {
                // Requeued events lead; the rest follow in order.
                state.buffer.extend(events);
                break;
            }
            posted += 1;
        }
        posted
    }

    /// Move one event in flight and post its delivery. Callers hold the
    /// state lock.
    ///
    /// Returns `false` if the UI thread has stopped; every in-flight event
    /// is then back in the buffer.
    fn dispatch(&self, state: &mut CoordinatorState, event: NotificationEvent) -> bool {
        state.in_flight.push_back(event);
        let shared = Arc::clone(&self.shared);
        if self.ui.post(move || deliver(&shared)) {
            return true;
        }
        let requeued = state.requeue_in_flight();
        log::warn!("[Delivery] UI thread unavailable, kept {requeued} event(s) buffered");
        false
    }
}

/// Runs on the UI thread. Delivers the oldest in-flight event, if any.
fn deliver(shared: &Shared) {
    let mut guard = shared.lock();
    let state = &mut *guard;
    let Some(event) = state.in_flight.pop_front() else {
        return;
    };
    let Some(target) = state.registration.target() else {
        log::debug!("[Delivery] Listener gone before delivery, re-buffering");
        state.in_flight.push_front(event);
        state.requeue_in_flight();
        return;
    };

    match event.to_payload() {
        Ok(payload) => {
            if !target.send(payload) {
                log::warn!("[Delivery] Listener {} is closed, dropping event", target.id());
            }
        }
        Err(e) => log::error!("[Delivery] Dropping event: {e}"),
    }
}
