//! Per-component hook state, addressed by tree path and call order.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::collections::map::{HashMap, HashSet};
use crate::deps::{deps_changed, Dep, Deps, SameValue};
use crate::effects::EffectState;
use crate::error::HookError;
use crate::path::Path;
use crate::root::RootId;
use crate::runtime::{active_runtime, RuntimeHandle, RuntimeInner};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    State,
    Ref,
    Memo,
    Effect,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::State => "state",
            HookKind::Ref => "ref",
            HookKind::Memo => "memo",
            HookKind::Effect => "effect",
        })
    }
}

#[derive(Clone)]
pub(crate) enum HookSlot {
    State(Rc<dyn Any>),
    Ref(Rc<dyn Any>),
    Memo { deps: Option<Deps>, value: Rc<dyn Any> },
    Effect(Rc<RefCell<EffectState>>),
}

impl HookSlot {
    fn kind(&self) -> HookKind {
        match self {
            HookSlot::State(_) => HookKind::State,
            HookSlot::Ref(_) => HookKind::Ref,
            HookSlot::Memo { .. } => HookKind::Memo,
            HookSlot::Effect(_) => HookKind::Effect,
        }
    }
}

pub(crate) struct ComponentRecord {
    pub(crate) root: RootId,
    pub(crate) slots: Vec<HookSlot>,
}

#[derive(Default)]
pub(crate) struct HookStore {
    records: HashMap<Path, ComponentRecord>,
}

impl HookStore {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    pub(crate) fn paths(&self) -> Vec<Path> {
        let mut paths: Vec<Path> = self.records.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Removes the records of `root` that were not visited, in path order.
    pub(crate) fn take_stale(
        &mut self,
        root: RootId,
        visited: &HashSet<Path>,
    ) -> Vec<(Path, ComponentRecord)> {
        let mut stale: Vec<Path> = self
            .records
            .iter()
            .filter(|(path, record)| record.root == root && !visited.contains(*path))
            .map(|(path, _)| path.clone())
            .collect();
        stale.sort();
        stale
            .into_iter()
            .filter_map(|path| self.records.remove(&path).map(|record| (path, record)))
            .collect()
    }

    pub(crate) fn take_all(&mut self) -> Vec<(Path, ComponentRecord)> {
        let mut all: Vec<(Path, ComponentRecord)> = self.records.drain().collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

/// The component currently being invoked and how many hooks it has called.
pub(crate) struct Invocation {
    path: Path,
    root: RootId,
    cursor: usize,
}

pub(crate) struct SlotClaim {
    pub(crate) path: Path,
    pub(crate) root: RootId,
    pub(crate) index: usize,
    pub(crate) existing: Option<HookSlot>,
}

impl RuntimeInner {
    pub(crate) fn begin_invocation(&self, path: Path, root: RootId) {
        *self.invocation.borrow_mut() = Some(Invocation {
            path,
            root,
            cursor: 0,
        });
    }

    pub(crate) fn end_invocation(&self) {
        self.invocation.borrow_mut().take();
    }

    /// Takes the next slot of the current invocation, checking that a slot
    /// from an earlier render was created by the same kind of hook.
    fn claim_slot(&self, hook: &'static str, kind: HookKind) -> SlotClaim {
        let (path, root, index) = {
            let mut invocation = self.invocation.borrow_mut();
            let Some(invocation) = invocation.as_mut() else {
                panic!("{}", HookError::OutsideComponent { hook });
            };
            let index = invocation.cursor;
            invocation.cursor += 1;
            (invocation.path.clone(), invocation.root, index)
        };

        let mut hooks = self.hooks.borrow_mut();
        let record = hooks
            .records
            .entry(path.clone())
            .or_insert_with(|| ComponentRecord {
                root,
                slots: Vec::new(),
            });
        record.root = root;
        let existing = record.slots.get(index).cloned();
        if let Some(slot) = &existing {
            if slot.kind() != kind {
                let found = slot.kind();
                drop(hooks);
                panic!(
                    "{}",
                    HookError::IdentityMismatch {
                        path,
                        index,
                        expected: kind.to_string(),
                        found,
                    }
                );
            }
        }
        SlotClaim {
            path,
            root,
            index,
            existing,
        }
    }

    pub(crate) fn store_slot(&self, claim: &SlotClaim, slot: HookSlot) {
        let mut hooks = self.hooks.borrow_mut();
        let record = hooks
            .records
            .entry(claim.path.clone())
            .or_insert_with(|| ComponentRecord {
                root: claim.root,
                slots: Vec::new(),
            });
        if claim.index < record.slots.len() {
            record.slots[claim.index] = slot;
        } else {
            record.slots.push(slot);
        }
    }
}

/// Claims the next slot of the component being rendered and hands it to `f`.
pub(crate) fn with_slot<R>(
    hook: &'static str,
    kind: HookKind,
    f: impl FnOnce(&Rc<RuntimeInner>, &SlotClaim) -> R,
) -> R {
    let Some(inner) = active_runtime() else {
        panic!("{}", HookError::OutsideComponent { hook });
    };
    let claim = inner.claim_slot(hook, kind);
    f(&inner, &claim)
}

fn type_mismatch<T>(claim: &SlotClaim, kind: HookKind) -> ! {
    panic!(
        "{}",
        HookError::IdentityMismatch {
            path: claim.path.clone(),
            index: claim.index,
            expected: format!("{kind} of {}", type_name::<T>()),
            found: kind,
        }
    )
}

struct StateCell<T> {
    value: RefCell<T>,
    root: Cell<RootId>,
}

/// Updates one state slot and schedules its root when the value changes.
pub struct SetState<T> {
    cell: Rc<StateCell<T>>,
    runtime: RuntimeHandle,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("root", &self.cell.root.get())
            .finish()
    }
}

impl<T: SameValue + Clone + 'static> SetState<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Computes the next value from the current one. An update to an identical
    /// value schedules nothing.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.get();
        let next = f(&current);
        if current.same_value(&next) {
            return;
        }
        *self.cell.value.borrow_mut() = next;
        let root = self.cell.root.get();
        log::trace!("state changed in root {root}");
        self.runtime.schedule_render(root);
    }

    /// Latest stored value, including updates not yet rendered.
    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }
}

impl<T: 'static> SetState<T> {
    /// The setter is stable across renders; as a dependency it never changes.
    pub fn as_dep(&self) -> Dep {
        Dep::shared(&self.cell)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

/// Returns the slot's current value and its setter. `init` runs only on the
/// first render at this position.
pub fn use_state<T>(init: impl FnOnce() -> T) -> (T, SetState<T>)
where
    T: SameValue + Clone + 'static,
{
    with_slot("use_state", HookKind::State, |inner, claim| {
        let cell = match &claim.existing {
            Some(HookSlot::State(value)) => match value.clone().downcast::<StateCell<T>>() {
                Ok(cell) => cell,
                Err(_) => type_mismatch::<T>(claim, HookKind::State),
            },
            _ => {
                let cell = Rc::new(StateCell {
                    value: RefCell::new(init()),
                    root: Cell::new(claim.root),
                });
                inner.store_slot(claim, HookSlot::State(cell.clone()));
                cell
            }
        };
        cell.root.set(claim.root);
        let value = cell.value.borrow().clone();
        (
            value,
            SetState {
                cell,
                runtime: inner.handle(),
            },
        )
    })
}

/// Mutable box whose identity is stable across renders. Writing to it never
/// schedules a render.
pub struct Ref<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Clone> Ref<T> {
    pub fn current(&self) -> T {
        self.cell.borrow().clone()
    }
}

impl<T: 'static> Ref<T> {
    pub fn as_dep(&self) -> Dep {
        Dep::shared(&self.cell)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(value) => f.debug_tuple("Ref").field(&*value).finish(),
            Err(_) => f.write_str("Ref(<borrowed>)"),
        }
    }
}

pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Ref<T> {
    with_slot("use_ref", HookKind::Ref, |inner, claim| {
        match &claim.existing {
            Some(HookSlot::Ref(value)) => match value.clone().downcast::<RefCell<T>>() {
                Ok(cell) => Ref { cell },
                Err(_) => type_mismatch::<T>(claim, HookKind::Ref),
            },
            _ => {
                let created = Ref::new(init());
                inner.store_slot(claim, HookSlot::Ref(created.cell.clone()));
                created
            }
        }
    })
}

/// Caches `factory()` until `deps` change. `None` recomputes on every render.
pub fn use_memo<T: Clone + 'static>(factory: impl FnOnce() -> T, deps: Option<Deps>) -> T {
    with_slot("use_memo", HookKind::Memo, |inner, claim| {
        if let Some(HookSlot::Memo {
            deps: previous,
            value,
        }) = &claim.existing
        {
            if !deps_changed(previous.as_deref(), deps.as_deref()) {
                return match value.clone().downcast::<T>() {
                    Ok(value) => (*value).clone(),
                    Err(_) => type_mismatch::<T>(claim, HookKind::Memo),
                };
            }
        }
        let value = factory();
        inner.store_slot(
            claim,
            HookSlot::Memo {
                deps,
                value: Rc::new(value.clone()),
            },
        );
        value
    })
}

/// Keeps the first `callback` handed in until `deps` change.
pub fn use_callback<F: 'static>(callback: F, deps: Option<Deps>) -> Rc<F> {
    use_memo(move || Rc::new(callback), deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{pop_active_runtime, push_active_runtime, Runtime};

    struct Scope<'a> {
        runtime: &'a Runtime,
    }

    impl<'a> Scope<'a> {
        fn enter(runtime: &'a Runtime, path: &Path) -> Self {
            let inner = runtime.handle().upgrade().unwrap();
            inner.begin_invocation(path.clone(), RootId::new(1));
            push_active_runtime(&runtime.handle());
            Self { runtime }
        }
    }

    impl Drop for Scope<'_> {
        fn drop(&mut self) {
            pop_active_runtime();
            if let Some(inner) = self.runtime.handle().upgrade() {
                inner.end_invocation();
            }
        }
    }

    fn path() -> Path {
        Path::root(RootId::new(1))
    }

    #[test]
    fn state_initializer_runs_once() {
        let runtime = Runtime::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let _scope = Scope::enter(&runtime, &path());
            let (value, _) = use_state(|| {
                calls.set(calls.get() + 1);
                10
            });
            assert_eq!(value, 10);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(runtime.hook_record_count(), 1);
    }

    #[test]
    fn setter_is_visible_on_next_read() {
        let runtime = Runtime::new();
        let setter = {
            let _scope = Scope::enter(&runtime, &path());
            use_state(|| 1).1
        };
        setter.update(|n| n + 4);
        assert_eq!(setter.get(), 5);
        let _scope = Scope::enter(&runtime, &path());
        let (value, again) = use_state(|| 0);
        assert_eq!(value, 5);
        assert!(again.ptr_eq(&setter));
    }

    #[test]
    fn ref_identity_is_stable() {
        let runtime = Runtime::new();
        let first = {
            let _scope = Scope::enter(&runtime, &path());
            use_ref(|| 0)
        };
        first.set(3);
        let _scope = Scope::enter(&runtime, &path());
        let second = use_ref(|| 99);
        assert!(first.ptr_eq(&second));
        assert_eq!(second.current(), 3);
    }

    #[test]
    fn memo_recomputes_only_when_deps_change() {
        let runtime = Runtime::new();
        let calls = Cell::new(0);
        let render = |dep: i32| {
            let _scope = Scope::enter(&runtime, &path());
            use_memo(
                || {
                    calls.set(calls.get() + 1);
                    dep * 2
                },
                crate::deps![dep],
            )
        };
        assert_eq!(render(1), 2);
        assert_eq!(render(1), 2);
        assert_eq!(render(2), 4);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    #[should_panic(expected = "use_state called outside of a component body")]
    fn hooks_outside_components_panic() {
        let _ = use_state(|| 0);
    }

    #[test]
    #[should_panic(expected = "hook identity mismatch")]
    fn changing_hook_order_panics() {
        let runtime = Runtime::new();
        {
            let _scope = Scope::enter(&runtime, &path());
            let _ = use_state(|| 0);
        }
        let _scope = Scope::enter(&runtime, &path());
        let _ = use_ref(|| 0);
    }
}
