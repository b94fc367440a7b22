use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::error::TapError;
use crate::processing::cadence::Signal;

/// Sets the exit acknowledgment and releases the live-worker count when the
/// worker body returns or unwinds.
struct ExitGuard {
    exited: Arc<Signal>,
    live: Option<Arc<AtomicUsize>>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.fetch_sub(1, Ordering::SeqCst);
        }
        self.exited.set();
    }
}

/// Dedicated background thread with a shutdown signal and a bounded stop.
///
/// The body receives the shutdown [`Signal`] and must return once it is set.
/// [`Worker::stop`] waits at most the given timeout for the body to
/// acknowledge; a worker that misses the deadline is detached.
pub struct Worker<T> {
    name: String,
    handle: Option<thread::JoinHandle<T>>,
    shutdown: Arc<Signal>,
    exited: Arc<Signal>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, TapError>
    where
        F: FnOnce(&Signal) -> T + Send + 'static,
    {
        Self::spawn_counted(name, None, body)
    }

    /// Spawn and keep `live` incremented for as long as the thread runs.
    pub fn spawn_counted<F>(name: &str, live: Option<Arc<AtomicUsize>>, body: F) -> Result<Self, TapError>
    where
        F: FnOnce(&Signal) -> T + Send + 'static,
    {
        let shutdown = Arc::new(Signal::new());
        let exited = Arc::new(Signal::new());

        if let Some(live) = &live {
            live.fetch_add(1, Ordering::SeqCst);
        }
        let guard = ExitGuard {
            exited: Arc::clone(&exited),
            live,
        };

        let thread_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let _guard = guard;
            body(&thread_shutdown)
        });

        // On spawn failure the closure, and the guard with it, was dropped.
        let handle = handle.map_err(|e| TapError::ResourceUnavailable(format!("failed to spawn {}: {}", name, e)))?;

        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            shutdown,
            exited,
        })
    }

    /// Whether the body has returned.
    pub fn is_finished(&self) -> bool {
        self.exited.is_set()
    }

    /// Ask the body to return without waiting for it.
    pub fn request_stop(&self) {
        self.shutdown.set();
    }

    /// Signal shutdown and wait up to `timeout` for the body's result.
    pub fn stop(mut self, timeout: Duration) -> Result<T, TapError> {
        self.shutdown.set();
        let Some(handle) = self.handle.take() else {
            return Err(TapError::ProcessingFailed(format!("{} already stopped", self.name)));
        };

        if !self.exited.wait_timeout(timeout) {
            log::error!("{} did not exit within {:?}, abandoning it", self.name, timeout);
            drop(handle);
            return Err(TapError::Timeout);
        }

        handle
            .join()
            .map_err(|_| TapError::ProcessingFailed(format!("{} panicked", self.name)))
    }
}

impl<T> Drop for Worker<T> {
    fn drop(&mut self) {
        // Dropping without stop() detaches the thread after asking it to exit.
        self.shutdown.set();
    }
}
