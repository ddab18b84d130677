//! The single presentation thread.
//!
//! Every operation that touches the application's presentation surface
//! (pushing a payload to the delivery target, pushing a token to the
//! refresh subscriber, executing a global script call) is marshalled onto
//! one dedicated thread. Jobs run strictly in the order they were posted.
//!
//! A job that panics is logged and the thread keeps serving later jobs.

// Rust guideline compliant 2026-02

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;

/// A unit of work for the UI thread.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle for posting jobs to the UI thread.
#[derive(Clone)]
pub struct UiHandle {
    job_tx: std_mpsc::Sender<UiJob>,
}

impl std::fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiHandle").finish_non_exhaustive()
    }
}

impl UiHandle {
    /// Queue a job. Returns `false` if the UI thread has stopped.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if self.job_tx.send(Box::new(job)).is_err() {
            log::warn!("[Ui] UI thread stopped, dropping job");
            return false;
        }
        true
    }

    /// Wait until every job posted before this call has run.
    pub async fn barrier(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.post(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.await;
        }
    }
}

/// Owner of the UI thread.
pub struct UiThread {
    handle: UiHandle,
    /// Shutdown flag shared with the thread.
    shutdown: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for UiThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiThread")
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl UiThread {
    /// Spawn the UI thread.
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = std_mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread_handle = thread::Builder::new()
            .name("pushbridge-ui".to_string())
            .spawn(move || Self::run_loop(&job_rx, &shutdown_clone))
            .map_err(|e| log::error!("[Ui] Failed to spawn UI thread: {e}"))
            .ok();

        Self {
            handle: UiHandle { job_tx },
            shutdown,
            thread_handle,
        }
    }

    /// A handle for posting jobs.
    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    /// Run remaining jobs, then stop the thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[Ui] UI thread exited abnormally");
            }
        }
    }

    fn run_loop(job_rx: &std_mpsc::Receiver<UiJob>, shutdown: &AtomicBool) {
        log::debug!("[Ui] UI thread started");

        loop {
            if shutdown.load(Ordering::SeqCst) {
                while let Ok(job) = job_rx.try_recv() {
                    Self::run_job(job);
                }
                log::debug!("[Ui] UI thread shutting down");
                break;
            }

            match job_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(job) => Self::run_job(job),
                Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn run_job(job: UiJob) {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("[Ui] Job panicked; continuing with next job");
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
