use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread_local;

use indexmap::{IndexMap, IndexSet};

use crate::effects::QueuedEffect;
use crate::element::Node;
use crate::error::RenderError;
use crate::hooks::{HookStore, Invocation};
use crate::options::RuntimeOptions;
use crate::path::Path;
use crate::platform::RuntimeScheduler;
use crate::root::{Root, RootId, RootRecord, SharedTarget};
use crate::target::NodeId;

pub(crate) type Task = Box<dyn FnOnce() -> Result<(), RenderError> + 'static>;

pub(crate) struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    pub(crate) options: RuntimeOptions,
    roots: RefCell<IndexMap<RootId, RootRecord>>,
    next_root_id: Cell<u64>,
    pub(crate) pending: RefCell<IndexSet<RootId>>,
    /// Set from the moment a flush task is queued until that flush returns.
    pub(crate) flush_scheduled: Cell<bool>,
    pub(crate) flushing: Cell<bool>,
    tasks: RefCell<VecDeque<Task>>,
    pub(crate) hooks: RefCell<HookStore>,
    pub(crate) invocation: RefCell<Option<Invocation>>,
    pub(crate) effects: RefCell<Vec<QueuedEffect>>,
    reported: RefCell<Vec<RenderError>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            options,
            roots: RefCell::new(IndexMap::new()),
            next_root_id: Cell::new(1),
            pending: RefCell::new(IndexSet::new()),
            flush_scheduled: Cell::new(false),
            flushing: Cell::new(false),
            tasks: RefCell::new(VecDeque::new()),
            hooks: RefCell::new(HookStore::default()),
            invocation: RefCell::new(None),
            effects: RefCell::new(Vec::new()),
            reported: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn handle(self: &Rc<Self>) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(self))
    }

    pub(crate) fn enqueue_task(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
        self.scheduler.schedule_flush();
    }

    fn next_task(&self) -> Option<Task> {
        self.tasks.borrow_mut().pop_front()
    }

    fn has_tasks(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    pub(crate) fn report(&self, error: RenderError) {
        log::error!("{error}");
        self.reported.borrow_mut().push(error);
    }

    pub(crate) fn has_root(&self, id: RootId) -> bool {
        self.roots.borrow().contains_key(&id)
    }

    fn create_root(self: &Rc<Self>, target: SharedTarget, mount: NodeId) -> Result<Root, RenderError> {
        if !target.borrow().contains(mount) {
            return Err(RenderError::MissingMount { mount });
        }
        let mut roots = self.roots.borrow_mut();
        if let Some((&id, _)) = roots
            .iter()
            .find(|(_, record)| record.is_mounted_at(&target, mount))
        {
            return Ok(Root::new(id, self.handle()));
        }
        let id = RootId::new(self.next_root_id.get());
        self.next_root_id.set(id.raw() + 1);
        roots.insert(id, RootRecord::new(target, mount));
        log::debug!("created root {id} at mount node {mount}");
        Ok(Root::new(id, self.handle()))
    }

    pub(crate) fn set_root_content(&self, id: RootId, content: Node) -> bool {
        match self.roots.borrow_mut().get_mut(&id) {
            Some(record) => {
                record.content = content;
                true
            }
            None => false,
        }
    }

    /// Counts a new pass for `id` and hands out what the pass needs.
    pub(crate) fn begin_root_pass(&self, id: RootId) -> Option<(SharedTarget, NodeId, Node)> {
        let mut roots = self.roots.borrow_mut();
        let record = roots.get_mut(&id)?;
        record.renders += 1;
        Some((record.target.clone(), record.mount, record.content.clone()))
    }

    pub(crate) fn root_render_count(&self, id: RootId) -> Option<usize> {
        self.roots.borrow().get(&id).map(|record| record.renders)
    }

    pub(crate) fn root_mount(&self, id: RootId) -> Option<NodeId> {
        self.roots.borrow().get(&id).map(|record| record.mount)
    }
}

/// Owner of every root, the hook store, the pending-render set and the
/// deferred task queue. Independent runtimes share nothing.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(DefaultScheduler))
    }

    pub fn with_scheduler(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self::with_options(scheduler, RuntimeOptions::default())
    }

    pub fn with_options(scheduler: Arc<dyn RuntimeScheduler>, options: RuntimeOptions) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler, options)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.inner.handle()
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }

    /// Returns the root mounted at `mount`, creating it on first use.
    pub fn create_root(&self, target: SharedTarget, mount: NodeId) -> Result<Root, RenderError> {
        self.inner.create_root(target, mount)
    }

    /// Shorthand for `create_root(target, mount)?.render(content)`.
    pub fn render(
        &self,
        content: impl Into<Node>,
        target: SharedTarget,
        mount: NodeId,
    ) -> Result<Root, RenderError> {
        let root = self.create_root(target, mount)?;
        root.render(content);
        Ok(root)
    }

    pub fn schedule_render(&self, root: RootId) {
        self.inner.schedule_render(root);
    }

    /// Queues a deferred callback behind every task already queued.
    pub fn spawn_task(&self, task: impl FnOnce() + 'static) {
        self.inner.enqueue_task(Box::new(move || {
            task();
            Ok(())
        }));
    }

    /// Runs queued tasks in FIFO order, including tasks they queue, until the
    /// queue is empty. A failing task stops the drain; later tasks stay queued.
    pub fn run_until_idle(&self) -> Result<(), RenderError> {
        while let Some(task) = self.inner.next_task() {
            task()?;
        }
        Ok(())
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.inner.has_tasks()
    }

    pub fn is_pending(&self, root: RootId) -> bool {
        self.inner.pending.borrow().contains(&root)
    }

    pub fn pending_roots(&self) -> Vec<RootId> {
        self.inner.pending.borrow().iter().copied().collect()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    pub fn has_root(&self, root: RootId) -> bool {
        self.inner.has_root(root)
    }

    pub fn hook_record_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    pub fn has_hook_state(&self, path: &Path) -> bool {
        self.inner.hooks.borrow().contains(path)
    }

    /// Paths holding hook state, in path order.
    pub fn hook_paths(&self) -> Vec<Path> {
        self.inner.hooks.borrow().paths()
    }

    /// Drains cleanup failures that were logged and skipped.
    pub fn take_reported_errors(&self) -> Vec<RenderError> {
        std::mem::take(&mut *self.inner.reported.borrow_mut())
    }

    /// Unmounts everything: runs every outstanding cleanup, then forgets all
    /// roots, hook state, pending renders and queued tasks. Root ids are never
    /// reused, so stale [`Root`] handles stay inert.
    pub fn reset(&self) {
        self.inner.reap_all();
        self.inner.roots.borrow_mut().clear();
        self.inner.pending.borrow_mut().clear();
        self.inner.tasks.borrow_mut().clear();
        self.inner.effects.borrow_mut().clear();
        self.inner.invocation.borrow_mut().take();
        self.inner.flush_scheduled.set(false);
        log::debug!("runtime reset");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("roots", &self.inner.roots.borrow().len())
            .field("pending", &self.pending_roots())
            .field("hook_records", &self.hook_record_count())
            .field("options", &self.inner.options)
            .finish()
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}
}

/// Weak reference to a runtime, held by roots and state setters.
#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub(crate) fn upgrade(&self) -> Option<Rc<RuntimeInner>> {
        self.0.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn schedule_render(&self, root: RootId) {
        if let Some(inner) = self.upgrade() {
            inner.schedule_render(root);
        }
    }
}

thread_local! {
    static ACTIVE_RUNTIMES: RefCell<Vec<RuntimeHandle>> = RefCell::new(Vec::new());
}

pub(crate) fn push_active_runtime(handle: &RuntimeHandle) {
    ACTIVE_RUNTIMES.with(|stack| stack.borrow_mut().push(handle.clone()));
}

pub(crate) fn pop_active_runtime() {
    ACTIVE_RUNTIMES.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// The runtime whose component is currently being invoked on this thread.
pub(crate) fn active_runtime() -> Option<Rc<RuntimeInner>> {
    ACTIVE_RUNTIMES
        .with(|stack| stack.borrow().last().cloned())
        .and_then(|handle| handle.upgrade())
}
