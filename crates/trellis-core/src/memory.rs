use indexmap::IndexMap;

use crate::element::PropValue;
use crate::error::NodeError;
use crate::target::{Event, EventHandler, NodeId, OutputTarget};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Element { tag: String },
    Text(String),
    Placeholder,
    Group,
}

#[derive(Debug)]
pub struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, PropValue>,
    styles: IndexMap<String, String>,
    listeners: Vec<(String, EventHandler)>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            styles: IndexMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn kind(&self) -> &MemoryNodeKind {
        &self.kind
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.properties.get(name)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|(name, _)| name == event).count()
    }

    fn is_container(&self) -> bool {
        matches!(
            self.kind,
            MemoryNodeKind::Element { .. } | MemoryNodeKind::Group
        )
    }
}

/// Properties a memory element exposes as live fields instead of attributes.
fn exposes_property(tag: &str, name: &str) -> bool {
    const GLOBAL: &[&str] = &["id", "title", "hidden", "tabIndex", "lang", "dir"];
    const FORM: &[&str] = &[
        "value",
        "checked",
        "disabled",
        "name",
        "type",
        "placeholder",
        "readOnly",
        "required",
        "min",
        "max",
        "step",
        "selected",
    ];
    GLOBAL.contains(&name)
        || (matches!(tag, "input" | "textarea" | "select" | "option" | "button")
            && FORM.contains(&name))
}

/// In-memory [`OutputTarget`] backed by a node arena. Slots of removed
/// nodes are reused by later insertions.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    nodes: Vec<Option<MemoryNode>>,
    free: Vec<NodeId>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena slots in use or waiting for reuse.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Live node count, mount points included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        let node = self.node_mut(id)?;
        match node.kind {
            MemoryNodeKind::Element { .. } => Ok(node),
            _ => Err(NodeError::Kind {
                id,
                expected: "element",
            }),
        }
    }

    fn insert(&mut self, node: MemoryNode) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(MemoryNode::children).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(MemoryNode::tag)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.attribute(name))
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        self.node(id).and_then(|node| node.property(name))
    }

    pub fn style(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.style(name))
    }

    /// Concatenated text of every text node below `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if let MemoryNodeKind::Text(text) = &node.kind {
            output.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, output);
        }
    }

    /// Pre-order search for elements with the given tag below `root`.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_by_tag(root, tag, &mut found);
        found
    }

    fn collect_by_tag(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.tag() == Some(tag) {
            found.push(id);
        }
        for &child in &node.children {
            self.collect_by_tag(child, tag, found);
        }
    }

    /// Handlers registered on `id` for `event`, in registration order.
    pub fn handlers(&self, id: NodeId, event: &str) -> Vec<EventHandler> {
        self.node(id)
            .map(|node| {
                node.listeners
                    .iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, handler)| handler.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Calls the listeners of `target` directly and returns how many ran.
    ///
    /// Handlers must not borrow this target again; callers holding the target
    /// in a `RefCell` should collect [`handlers`](Self::handlers) first.
    pub fn dispatch(&self, event: &Event) -> usize {
        let handlers = self.handlers(event.target, &event.kind);
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
            return;
        };
        match &node.kind {
            MemoryNodeKind::Element { tag } => {
                output.push_str(&format!("{indent}<{tag}"));
                for (name, value) in &node.attributes {
                    output.push_str(&format!(" {name}=\"{value}\""));
                }
                for (name, value) in &node.properties {
                    output.push_str(&format!(" .{name}={}", value.to_attribute_value()));
                }
                if !node.styles.is_empty() {
                    let styles: Vec<String> = node
                        .styles
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect();
                    output.push_str(&format!(" style{{{}}}", styles.join("; ")));
                }
                for (event, _) in &node.listeners {
                    output.push_str(&format!(" @{event}"));
                }
                output.push_str(">\n");
            }
            MemoryNodeKind::Text(text) => output.push_str(&format!("{indent}{text:?}\n")),
            MemoryNodeKind::Placeholder => output.push_str(&format!("{indent}<!---->\n")),
            MemoryNodeKind::Group => output.push_str(&format!("{indent}<#group>\n")),
        }
        for &child in &node.children {
            self.dump_node(output, child, depth + 1);
        }
    }

    /// Frees `id` and its subtree without touching its parent's child list.
    fn release(&mut self, id: NodeId) -> Result<(), NodeError> {
        let children = match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node.children,
            None => return Err(NodeError::Missing { id }),
        };
        self.free.push(id);
        for child in children {
            // already-detached children are fine
            let _ = self.release(child);
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let parent = self.node(child).and_then(MemoryNode::parent);
        if let Some(parent) = parent {
            if let Ok(node) = self.node_mut(parent) {
                node.children.retain(|&id| id != child);
            }
        }
    }
}

impl OutputTarget for MemoryTarget {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(MemoryNode::new(MemoryNodeKind::Element {
            tag: tag.to_owned(),
        }))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.insert(MemoryNode::new(MemoryNodeKind::Text(text.to_owned())))
    }

    fn create_placeholder(&mut self) -> NodeId {
        self.insert(MemoryNode::new(MemoryNodeKind::Placeholder))
    }

    fn create_group(&mut self) -> NodeId {
        self.insert(MemoryNode::new(MemoryNodeKind::Group))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn has_property(&self, node: NodeId, name: &str) -> bool {
        self.tag(node)
            .map(|tag| exposes_property(tag, name))
            .unwrap_or(false)
    }

    fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), NodeError> {
        self.element_mut(node)?
            .properties
            .insert(name.to_owned(), value.clone());
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), NodeError> {
        self.element_mut(node)?
            .styles
            .insert(property.to_owned(), value.to_owned());
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), NodeError> {
        self.element_mut(node)?
            .listeners
            .push((event.to_owned(), handler));
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        if !self.node_mut(parent)?.is_container() {
            return Err(NodeError::Kind {
                id: parent,
                expected: "element or group",
            });
        }
        let is_group = matches!(self.node_mut(child)?.kind, MemoryNodeKind::Group);
        let moved = if is_group {
            std::mem::take(&mut self.node_mut(child)?.children)
        } else {
            self.detach(child);
            vec![child]
        };
        for &id in &moved {
            self.node_mut(id)?.parent = Some(parent);
        }
        self.node_mut(parent)?.children.extend(moved);
        if is_group {
            self.release(child)?;
        }
        Ok(())
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    fn replace_children(&mut self, mount: NodeId, content: NodeId) -> Result<(), NodeError> {
        let previous = std::mem::take(&mut self.node_mut(mount)?.children);
        for child in previous {
            let _ = self.release(child);
        }
        self.append_child(mount, content)
    }

    fn remove(&mut self, node: NodeId) -> Result<(), NodeError> {
        self.detach(node);
        self.release(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn appending_a_group_splices_its_children() {
        let mut target = MemoryTarget::new();
        let parent = target.create_element("div");
        let group = target.create_group();
        let a = target.create_text("a");
        let b = target.create_placeholder();
        target.append_child(group, a).unwrap();
        target.append_child(group, b).unwrap();

        target.append_child(parent, group).unwrap();

        assert_eq!(target.children(parent), &[a, b]);
        assert!(!target.contains(group));
        assert_eq!(target.node(a).unwrap().parent(), Some(parent));
    }

    #[test]
    fn replace_children_frees_previous_subtree() {
        let mut target = MemoryTarget::new();
        let mount = target.create_element("main");
        let old = target.create_element("p");
        let old_text = target.create_text("old");
        target.append_child(old, old_text).unwrap();
        target.append_child(mount, old).unwrap();

        let fresh = target.create_text("new");
        target.replace_children(mount, fresh).unwrap();

        assert_eq!(target.children(mount), &[fresh]);
        assert!(!target.contains(old));
        assert!(!target.contains(old_text));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut target = MemoryTarget::new();
        let mount = target.create_element("main");
        for round in 0..100 {
            let p = target.create_element("p");
            let text = target.create_text(&round.to_string());
            target.append_child(p, text).unwrap();
            target.replace_children(mount, p).unwrap();
        }
        assert_eq!(target.len(), 3);
        assert_eq!(target.slot_count(), 5);
        assert_eq!(target.text_content(mount), "99");
    }

    #[test]
    fn remove_detaches_and_frees_a_subtree() {
        let mut target = MemoryTarget::new();
        let list = target.create_element("ul");
        let item = target.create_element("li");
        let text = target.create_text("x");
        target.append_child(item, text).unwrap();
        target.append_child(list, item).unwrap();

        target.remove(item).unwrap();
        assert!(target.children(list).is_empty());
        assert_eq!(target.len(), 1);
        assert_eq!(target.remove(item), Err(NodeError::Missing { id: item }));

        let reused = target.create_text("y");
        assert!(reused == item || reused == text);
    }

    #[test]
    fn text_nodes_reject_children_and_attributes() {
        let mut target = MemoryTarget::new();
        let text = target.create_text("leaf");
        let child = target.create_text("x");
        assert_eq!(
            target.append_child(text, child),
            Err(NodeError::Kind {
                id: text,
                expected: "element or group"
            })
        );
        assert_eq!(
            target.set_attribute(text, "class", "a"),
            Err(NodeError::Kind {
                id: text,
                expected: "element"
            })
        );
        assert_eq!(
            target.set_attribute(99, "class", "a"),
            Err(NodeError::Missing { id: 99 })
        );
    }

    #[test]
    fn form_fields_expose_value_property() {
        let mut target = MemoryTarget::new();
        let input = target.create_element("input");
        let div = target.create_element("div");
        assert!(target.has_property(input, "value"));
        assert!(!target.has_property(div, "value"));
        assert!(target.has_property(div, "id"));
        assert!(!target.has_property(input, "data-x"));
    }

    #[test]
    fn dispatch_runs_matching_listeners() {
        let mut target = MemoryTarget::new();
        let button = target.create_element("button");
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        target
            .add_event_listener(
                button,
                "click",
                EventHandler::new(move |_| counter.set(counter.get() + 1)),
            )
            .unwrap();

        assert_eq!(target.dispatch(&Event::new("click", button)), 1);
        assert_eq!(target.dispatch(&Event::new("input", button)), 0);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn dump_tree_renders_markup() {
        let mut target = MemoryTarget::new();
        let div = target.create_element("div");
        target.set_attribute(div, "class", "a").unwrap();
        target.set_style(div, "color", "red").unwrap();
        let text = target.create_text("hi");
        let hole = target.create_placeholder();
        target.append_child(div, text).unwrap();
        target.append_child(div, hole).unwrap();

        assert_eq!(
            target.dump_tree(div),
            "<div class=\"a\" style{color: red}>\n  \"hi\"\n  <!---->\n"
        );
    }
}
