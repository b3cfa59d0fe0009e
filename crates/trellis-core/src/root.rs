use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::element::Node;
use crate::runtime::RuntimeHandle;
use crate::target::{NodeId, OutputTarget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Output target shared between the runtime and the host.
pub type SharedTarget = Rc<RefCell<dyn OutputTarget>>;

pub(crate) struct RootRecord {
    pub(crate) target: SharedTarget,
    pub(crate) mount: NodeId,
    pub(crate) content: Node,
    pub(crate) renders: usize,
}

impl RootRecord {
    pub(crate) fn new(target: SharedTarget, mount: NodeId) -> Self {
        Self {
            target,
            mount,
            content: Node::Empty,
            renders: 0,
        }
    }

    pub(crate) fn is_mounted_at(&self, target: &SharedTarget, mount: NodeId) -> bool {
        self.mount == mount
            && Rc::as_ptr(&self.target) as *const () == Rc::as_ptr(target) as *const ()
    }
}

/// Handle to a mounted root. Cloning it does not create another root.
#[derive(Clone)]
pub struct Root {
    id: RootId,
    runtime: RuntimeHandle,
}

impl Root {
    pub(crate) fn new(id: RootId, runtime: RuntimeHandle) -> Self {
        Self { id, runtime }
    }

    pub fn id(&self) -> RootId {
        self.id
    }

    /// Replaces the root's content and schedules a flush. Nothing is rendered
    /// until the runtime's task queue is drained.
    pub fn render(&self, content: impl Into<Node>) {
        let content = content.into();
        match self.runtime.upgrade() {
            Some(inner) => {
                let known = inner.set_root_content(self.id, content);
                if known {
                    inner.schedule_render(self.id);
                } else {
                    log::warn!("render on discarded root {}", self.id);
                }
            }
            None => log::warn!("render on root {} after its runtime was dropped", self.id),
        }
    }

    /// Render passes run for this root, failed ones included.
    pub fn render_count(&self) -> usize {
        self.runtime
            .upgrade()
            .and_then(|inner| inner.root_render_count(self.id))
            .unwrap_or(0)
    }

    pub fn mount(&self) -> Option<NodeId> {
        self.runtime
            .upgrade()
            .and_then(|inner| inner.root_mount(self.id))
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("id", &self.id).finish()
    }
}
