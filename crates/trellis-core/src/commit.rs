//! Rebuilds a root's output subtree from its element tree.
//!
//! Every pass creates fresh output nodes; nothing is diffed. Hook state
//! survives because components are identified by their [`Path`], not by the
//! nodes they produced.

use std::rc::Rc;

use crate::collections::map::HashSet;
use crate::element::{Component, Element, ElementType, Node, NodeRef, PropValue};
use crate::error::RenderError;
use crate::path::Path;
use crate::root::{RootId, SharedTarget};
use crate::runtime::{pop_active_runtime, push_active_runtime, RuntimeInner};
use crate::target::{NodeId, OutputTarget};

impl RuntimeInner {
    /// One render pass for `root`: build, swap into the mount point, unmount
    /// components that were not rendered, then run due effects.
    pub(crate) fn render_root(self: &Rc<Self>, root: RootId) -> Result<(), RenderError> {
        let Some((target, mount, content)) = self.begin_root_pass(root) else {
            log::debug!("skipping render of discarded root {root}");
            return Ok(());
        };
        self.effects.borrow_mut().clear();

        let mut pass = RenderPass::new(self, root, target.clone());
        let output = match pass.render(&content, &Path::root(root)) {
            Ok(output) => output,
            Err(err) => {
                pass.discard();
                return Err(err);
            }
        };
        let replaced = target.borrow_mut().replace_children(mount, output);
        if let Err(err) = replaced {
            pass.discard();
            return Err(err.into());
        }
        log::debug!(
            "committed root {root} ({} component(s) rendered)",
            pass.visited.len()
        );

        self.reap(root, &pass.visited);
        self.run_effects();
        Ok(())
    }
}

struct RenderPass<'a> {
    runtime: &'a Rc<RuntimeInner>,
    root: RootId,
    target: SharedTarget,
    visited: HashSet<Path>,
    /// Every node this pass created, for cleanup when the pass fails.
    created: Vec<NodeId>,
}

impl<'a> RenderPass<'a> {
    fn new(runtime: &'a Rc<RuntimeInner>, root: RootId, target: SharedTarget) -> Self {
        Self {
            runtime,
            root,
            target,
            visited: HashSet::default(),
            created: Vec::new(),
        }
    }

    fn create(&mut self, build: impl FnOnce(&mut dyn OutputTarget) -> NodeId) -> NodeId {
        let node = build(&mut *self.target.borrow_mut());
        self.created.push(node);
        node
    }

    /// Removes the output of a pass that failed before it was committed.
    fn discard(&mut self) {
        let created = std::mem::take(&mut self.created);
        log::debug!("discarding {} node(s) of a failed pass", created.len());
        let mut target = self.target.borrow_mut();
        for node in created.into_iter().rev() {
            if target.contains(node) {
                let _ = target.remove(node);
            }
        }
    }

    /// Produces exactly one output node for `node`.
    fn render(&mut self, node: &Node, path: &Path) -> Result<NodeId, RenderError> {
        match node {
            Node::Empty | Node::Bool(_) => Ok(self.create(|target| target.create_placeholder())),
            Node::Text(text) => Ok(self.create(|target| target.create_text(text))),
            Node::Number(value) => {
                let text = crate::element::format_number(*value);
                Ok(self.create(|target| target.create_text(&text)))
            }
            Node::List(items) => self.render_group(items, path),
            Node::Element(element) => match element.ty() {
                ElementType::Fragment => self.render_group(element.content(), path),
                ElementType::Component(component) => {
                    let output = self.invoke(component, element, path);
                    self.render(&output, &path.rendered())
                }
                ElementType::Tag(tag) => self.render_tag(tag, element, path),
            },
        }
    }

    fn render_group(&mut self, items: &[Node], path: &Path) -> Result<NodeId, RenderError> {
        let group = self.create(|target| target.create_group());
        for (index, item) in items.iter().enumerate() {
            let child = self.render(item, &path.child(item.segment(index)))?;
            self.target.borrow_mut().append_child(group, child)?;
        }
        Ok(group)
    }

    fn invoke(&mut self, component: &Component, element: &Element, path: &Path) -> Node {
        self.visited.insert(path.clone());
        log::trace!("invoking {} at {path}", component.name());
        let _guard = InvocationGuard::enter(self.runtime, path.clone(), self.root);
        component.call(element.props())
    }

    fn render_tag(
        &mut self,
        tag: &str,
        element: &Element,
        path: &Path,
    ) -> Result<NodeId, RenderError> {
        if !is_valid_tag(tag) {
            return Err(RenderError::UnsupportedElementType {
                name: tag.to_owned(),
            });
        }
        let node = self.create(|target| target.create_element(tag));

        let mut node_ref = None;
        for (name, value) in element.props().iter() {
            match name {
                "children" => {}
                "ref" => node_ref = Some(value),
                _ => self.apply_property(node, name, value)?,
            }
        }

        for (index, child) in element.content().iter().enumerate() {
            let child_node = self.render(child, &path.child(child.segment(index)))?;
            self.target.borrow_mut().append_child(node, child_node)?;
        }

        if let Some(value) = node_ref {
            attach_ref(node, value);
        }
        Ok(node)
    }

    fn apply_property(&self, node: NodeId, name: &str, value: &PropValue) -> Result<(), RenderError> {
        if value.is_suppressed() {
            return Ok(());
        }
        let mut target = self.target.borrow_mut();
        match (name, value) {
            ("class" | "className", value) => {
                target.set_attribute(node, "class", &value.to_attribute_value())?;
            }
            ("style", PropValue::Style(entries)) => {
                for (property, value) in entries {
                    target.set_style(node, property, value)?;
                }
            }
            ("style", value) => {
                target.set_attribute(node, "style", &value.to_attribute_value())?;
            }
            (name, PropValue::Handler(handler)) if is_event_prop(name) => {
                let event = name[2..].to_lowercase();
                target.add_event_listener(node, &event, handler.clone())?;
            }
            (name, PropValue::Bool(true)) => target.set_attribute(node, name, "")?,
            (name, value) if target.has_property(node, name) => {
                target.set_property(node, name, value)?;
            }
            (name, value) => target.set_attribute(node, name, &value.to_attribute_value())?,
        }
        Ok(())
    }
}

/// Tracks the component whose body is running; undone on drop so a panicking
/// body does not leave hooks pointed at a stale invocation.
struct InvocationGuard<'a> {
    runtime: &'a Rc<RuntimeInner>,
}

impl<'a> InvocationGuard<'a> {
    fn enter(runtime: &'a Rc<RuntimeInner>, path: Path, root: RootId) -> Self {
        runtime.begin_invocation(path, root);
        push_active_runtime(&runtime.handle());
        Self { runtime }
    }
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        pop_active_runtime();
        self.runtime.end_invocation();
    }
}

fn attach_ref(node: NodeId, value: &PropValue) {
    match value {
        PropValue::Ref(NodeRef::Callback(callback)) => callback(node),
        PropValue::Ref(NodeRef::Object(slot)) => slot.set(Some(node)),
        PropValue::Null => {}
        other => log::warn!("ignoring ref property holding {other:?}"),
    }
}

fn is_event_prop(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on")
}

fn is_valid_tag(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}
