//! Post-commit side effects and their cleanups.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::deps::{deps_changed, Deps};
use crate::error::RenderError;
use crate::hooks::{HookKind, HookSlot};
use crate::path::Path;
use crate::runtime::RuntimeInner;

pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// Stored in an effect slot: the deps of the last run and its cleanup.
#[derive(Default)]
pub(crate) struct EffectState {
    deps: Option<Deps>,
    cleanup: Option<Cleanup>,
}

impl EffectState {
    pub(crate) fn take_cleanup(&mut self) -> Option<Cleanup> {
        self.cleanup.take()
    }
}

/// Handed to an effect body so it can register its cleanup.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectScope;

impl EffectScope {
    /// Registers `cleanup` to run before the next run of this effect and when
    /// its component unmounts.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> EffectResult {
        EffectResult {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

/// What an effect body returns; `EffectResult::default()` means no cleanup.
#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Cleanup>,
}

impl EffectResult {
    pub fn none() -> Self {
        Self::default()
    }
}

impl fmt::Debug for EffectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectResult")
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

pub(crate) struct QueuedEffect {
    path: Path,
    state: Rc<RefCell<EffectState>>,
    deps: Option<Deps>,
    body: Box<dyn FnOnce(EffectScope) -> EffectResult>,
}

/// Queues `effect` to run after the current commit when `deps` changed since
/// its last run. `None` runs it after every render, `deps![]` only once.
pub fn use_effect<F>(effect: F, deps: Option<Deps>)
where
    F: FnOnce(EffectScope) -> EffectResult + 'static,
{
    crate::hooks::with_slot("use_effect", HookKind::Effect, |inner, claim| {
        let state = match &claim.existing {
            Some(HookSlot::Effect(state)) => state.clone(),
            _ => {
                let state = Rc::new(RefCell::new(EffectState::default()));
                inner.store_slot(claim, HookSlot::Effect(state.clone()));
                state
            }
        };
        let due = deps_changed(state.borrow().deps.as_deref(), deps.as_deref());
        if due {
            inner.effects.borrow_mut().push(QueuedEffect {
                path: claim.path.clone(),
                state,
                deps,
                body: Box::new(effect),
            });
        }
    })
}

impl RuntimeInner {
    /// Runs the effects queued by the last commit in the order their hooks
    /// were called. Each previous cleanup runs right before its effect.
    pub(crate) fn run_effects(&self) {
        let queue = std::mem::take(&mut *self.effects.borrow_mut());
        if !queue.is_empty() {
            log::trace!("running {} effect(s)", queue.len());
        }
        for effect in queue {
            let QueuedEffect {
                path,
                state,
                deps,
                body,
            } = effect;
            let previous = state.borrow_mut().take_cleanup();
            if let Some(cleanup) = previous {
                if let Err(message) = run_guarded(cleanup) {
                    self.report(RenderError::EffectCleanup {
                        path: path.clone(),
                        message,
                    });
                }
            }
            let result = body(EffectScope);
            let mut state = state.borrow_mut();
            state.deps = deps;
            state.cleanup = result.cleanup;
        }
    }
}

/// Runs a cleanup, turning a panic into its message.
pub(crate) fn run_guarded(cleanup: Cleanup) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(cleanup))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "cleanup panicked".to_owned()
    }
}
