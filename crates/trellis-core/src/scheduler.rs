use std::rc::Rc;

use crate::error::RenderError;
use crate::root::RootId;
use crate::runtime::RuntimeInner;

/// Clears the flush flags however the flush ends, panics included.
struct FlushGuard<'a> {
    inner: &'a RuntimeInner,
}

impl<'a> FlushGuard<'a> {
    fn enter(inner: &'a RuntimeInner) -> Self {
        inner.flushing.set(true);
        Self { inner }
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.flushing.set(false);
        self.inner.flush_scheduled.set(false);
    }
}

impl RuntimeInner {
    /// Marks `root` as needing a render and queues a flush task unless one is
    /// already queued or running.
    ///
    /// While a flush is running, newly marked roots are not picked up by it
    /// unless re-entrant draining is enabled; they stay pending until the next
    /// call made after the flush has returned.
    pub(crate) fn schedule_render(self: &Rc<Self>, root: RootId) {
        if !self.has_root(root) {
            log::warn!("ignoring render request for unknown root {root}");
            return;
        }
        if self.pending.borrow_mut().insert(root) {
            log::trace!("root {root} marked pending");
        }
        if self.flush_scheduled.get() {
            return;
        }
        self.flush_scheduled.set(true);
        let handle = self.handle();
        self.enqueue_task(Box::new(move || match handle.upgrade() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }));
    }

    /// Renders every root that was pending when the flush started, in the
    /// order they were first marked.
    pub(crate) fn flush(self: &Rc<Self>) -> Result<(), RenderError> {
        let _guard = FlushGuard::enter(self);
        let limit = self.options.max_flush_passes.max(1);
        let mut passes = 0;
        loop {
            let snapshot: Vec<RootId> = self.pending.borrow().iter().copied().collect();
            if snapshot.is_empty() {
                break;
            }
            if passes == limit {
                return Err(RenderError::UpdateDepthExceeded { passes });
            }
            passes += 1;
            log::debug!("flush pass {passes}: {} root(s)", snapshot.len());
            for root in snapshot {
                if !self.pending.borrow_mut().shift_remove(&root) {
                    continue;
                }
                self.render_root(root)?;
            }
            if !self.options.drain_reentrant_updates {
                break;
            }
        }
        let left = self.pending.borrow().len();
        if left > 0 {
            log::debug!("{left} root(s) marked during the flush remain pending");
        }
        Ok(())
    }
}
