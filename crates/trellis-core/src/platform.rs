//! Platform abstraction traits for the Trellis runtime.
//!
//! The runtime never drains its own task queue. It only tells the host that
//! deferred work exists, and the host decides when the current synchronous
//! unit of work has finished and [`Runtime::run_until_idle`] may be called.
//!
//! [`Runtime::run_until_idle`]: crate::Runtime::run_until_idle

/// Receives wake-up requests from the runtime's task queue.
///
/// Implementations must be cheap and must not re-enter the runtime; they are
/// called while a state setter or `render` call is still on the stack.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host drain the runtime's task queue soon.
    fn schedule_flush(&self);
}
