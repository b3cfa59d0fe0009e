use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use trellis_core::{
    DefaultScheduler, Event, MemoryTarget, Node, NodeId, OutputTarget, RenderError, Root, Runtime,
    RuntimeOptions, SharedTarget,
};

/// Headless harness owning a runtime, an in-memory target and one root
/// mounted on a `<div>`.
///
/// Nothing renders until [`flush`](Self::flush) drains the runtime's task
/// queue, the same way a host event loop would after each unit of work.
pub struct TestHarness {
    runtime: Runtime,
    target: Rc<RefCell<MemoryTarget>>,
    mount: NodeId,
    root: Root,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let runtime = Runtime::with_options(Arc::new(DefaultScheduler), options);
        let target = Rc::new(RefCell::new(MemoryTarget::new()));
        let mount = target.borrow_mut().create_element("div");
        let shared: SharedTarget = target.clone();
        let root = runtime
            .create_root(shared, mount)
            .expect("freshly created mount node exists");
        Self {
            runtime,
            target,
            mount,
            root,
        }
    }

    /// Replaces the root content without draining the task queue.
    pub fn render(&self, content: impl Into<Node>) {
        self.root.render(content);
    }

    /// Replaces the root content and drains the task queue.
    pub fn set_content(&self, content: impl Into<Node>) -> Result<(), RenderError> {
        self.render(content);
        self.flush()
    }

    pub fn flush(&self) -> Result<(), RenderError> {
        self.runtime.run_until_idle()
    }

    /// Markup of everything under the mount node, one node per line.
    pub fn dump(&self) -> String {
        let target = self.target.borrow();
        target
            .children(self.mount)
            .iter()
            .map(|&child| target.dump_tree(child))
            .collect()
    }

    pub fn text(&self) -> String {
        self.target.borrow().text_content(self.mount)
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.target.borrow().find_by_tag(self.mount, tag)
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find_by_tag(tag).into_iter().next()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.target
            .borrow()
            .attribute(node, name)
            .map(str::to_owned)
    }

    /// Calls the listeners registered for `event` and returns how many ran.
    /// The target is not borrowed while handlers run, so handlers may read it.
    pub fn dispatch(&self, event: Event) -> usize {
        let handlers = self.target.borrow().handlers(event.target, &event.kind);
        for handler in &handlers {
            handler.call(&event);
        }
        handlers.len()
    }

    pub fn click(&self, node: NodeId) -> usize {
        self.dispatch(Event::new("click", node))
    }

    /// Clicks the `index`-th element with `tag`, if there is one.
    pub fn click_tag(&self, tag: &str, index: usize) -> usize {
        match self.find_by_tag(tag).get(index) {
            Some(&node) => self.click(node),
            None => 0,
        }
    }

    pub fn target(&self) -> Rc<RefCell<MemoryTarget>> {
        self.target.clone()
    }

    pub fn shared_target(&self) -> SharedTarget {
        self.target.clone()
    }

    pub fn mount(&self) -> NodeId {
        self.mount
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{create_element, nodes, Props};

    #[test]
    fn nothing_renders_before_flush() {
        let harness = TestHarness::new();
        harness.render(create_element("p", Props::new(), nodes!["hello"]));
        assert_eq!(harness.text(), "");
        assert!(harness.runtime().has_pending_tasks());

        harness.flush().unwrap();
        assert_eq!(harness.dump(), "<p>\n  \"hello\"\n");
        assert_eq!(harness.root().render_count(), 1);
    }

    #[test]
    fn click_tag_without_match_is_a_no_op() {
        let harness = TestHarness::new();
        harness.set_content("plain").unwrap();
        assert_eq!(harness.click_tag("button", 0), 0);
    }
}
