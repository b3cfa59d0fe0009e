//! Standard runtime services backed by Rust's `std` library.
//!
//! A Trellis [`Runtime`] never drains its own task queue. [`StdScheduler`]
//! remembers that deferred work was queued, and [`StdRuntime::pump`] drains
//! it once the host's current unit of work is over.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use trellis_core::{RenderError, Runtime, RuntimeHandle, RuntimeOptions, RuntimeScheduler};

#[derive(Default)]
pub struct StdScheduler {
    flush_requested: AtomicBool,
    requests: AtomicU64,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a flush has been requested since the last call.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    /// Flush requests received over the scheduler's lifetime.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "flush_requested",
                &self.flush_requested.load(Ordering::SeqCst),
            )
            .field("requests", &self.request_count())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_flush(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.flush_requested.store(true, Ordering::SeqCst);
    }
}

/// A [`Runtime`] wired to a [`StdScheduler`].
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a runtime configured from the process environment.
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::from_env())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let scheduler = Arc::new(StdScheduler::new());
        let runtime = Runtime::with_options(scheduler.clone(), options);
        Self { scheduler, runtime }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Drains the task queue if a flush was requested since the last call.
    /// Returns whether any work was attempted.
    ///
    /// A failed drain leaves the remaining tasks queued and re-arms the
    /// request, so the next call retries them.
    pub fn pump(&self) -> Result<bool, RenderError> {
        if !self.scheduler.take_flush_request() {
            return Ok(false);
        }
        log::trace!("draining runtime task queue");
        if let Err(err) = self.runtime.run_until_idle() {
            if self.runtime.has_pending_tasks() {
                self.scheduler.flush_requested.store(true, Ordering::SeqCst);
            }
            return Err(err);
        }
        Ok(true)
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .finish()
    }
}
