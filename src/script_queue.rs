//! Global calls into the presentation surface, held until it is ready.
//!
//! Background initialization can finish before the surface (the web view
//! hosting the application script) can accept calls. Calls made before
//! then are queued; the first time the surface reports ready they run in
//! order, once, and the queue is retired. After that every call runs
//! immediately.

// Rust guideline compliant 2026-02

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::ui::UiHandle;

/// Receives rendered script calls on the UI thread.
pub trait PresentationSurface: Send + Sync {
    /// Evaluate one script statement.
    fn evaluate(&self, script: &str) -> anyhow::Result<()>;
}

/// A surface that only logs what it would have run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSurface;

impl PresentationSurface for LoggingSurface {
    fn evaluate(&self, script: &str) -> anyhow::Result<()> {
        log::info!("[Scripts] {script}");
        Ok(())
    }
}

/// A call to a function in the application's global namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalCall {
    /// Function name, relative to the namespace.
    pub function: String,
    /// Arguments, JSON-encoded when rendered.
    pub args: Vec<Value>,
}

impl GlobalCall {
    /// A call with arbitrary arguments.
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// Notify the application that the installation id changed.
    pub fn installation_id_changed(installation_id: &str) -> Self {
        Self::new(
            "_onInstallationIdChangeCallback",
            vec![Value::String(installation_id.to_string())],
        )
    }

    /// Render as `<namespace><function>(<args>)`. Arguments are JSON so
    /// strings are always quoted and escaped.
    pub fn to_script(&self, namespace: &str) -> String {
        let args: Vec<String> = self.args.iter().map(Value::to_string).collect();
        format!("{namespace}{}({})", self.function, args.join(","))
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: bool,
    pending: Vec<GlobalCall>,
}

/// Queue of global calls waiting for the surface.
pub struct PendingScriptQueue {
    state: Mutex<QueueState>,
    surface: Arc<dyn PresentationSurface>,
    namespace: String,
    ui: UiHandle,
}

impl std::fmt::Debug for PendingScriptQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingScriptQueue")
            .field("state", &self.state)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PendingScriptQueue {
    /// Create a queue that runs calls on `surface` via the UI thread.
    pub fn new(
        surface: Arc<dyn PresentationSurface>,
        namespace: impl Into<String>,
        ui: UiHandle,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            surface,
            namespace: namespace.into(),
            ui,
        }
    }

    /// Run `call` now if the surface is ready, otherwise queue it.
    pub fn enqueue_or_run(&self, call: GlobalCall) {
        let mut state = crate::lock_or_recover(&self.state);
        if state.ready {
            self.run(&call);
        } else {
            log::debug!("[Scripts] Surface not ready, queueing {}", call.function);
            state.pending.push(call);
        }
    }

    /// Mark the surface ready and run everything queued, in order.
    ///
    /// Returns how many calls were flushed. Later invocations flush nothing.
    pub fn mark_ready_and_flush(&self) -> usize {
        let mut state = crate::lock_or_recover(&self.state);
        if state.ready {
            return 0;
        }
        state.ready = true;

        let pending = std::mem::take(&mut state.pending);
        if pending.is_empty() {
            log::debug!("[Scripts] No pending global calls");
        } else {
            log::info!("[Scripts] Executing {} pending global call(s)", pending.len());
        }
        for call in &pending {
            self.run(call);
        }
        pending.len()
    }

    /// Whether the surface has reported ready.
    pub fn is_ready(&self) -> bool {
        crate::lock_or_recover(&self.state).ready
    }

    /// Number of queued calls.
    pub fn pending_len(&self) -> usize {
        crate::lock_or_recover(&self.state).pending.len()
    }

    /// Post one call to the UI thread. Callers hold the state lock.
    fn run(&self, call: &GlobalCall) {
        let script = call.to_script(&self.namespace);
        let surface = Arc::clone(&self.surface);
        self.ui.post(move || {
            if let Err(e) = surface.evaluate(&script) {
                log::error!("[Scripts] Failed to evaluate '{script}': {e}");
            }
        });
    }
}
