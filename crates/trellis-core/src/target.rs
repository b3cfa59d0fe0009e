use std::fmt;
use std::rc::Rc;

use crate::element::PropValue;
use crate::error::NodeError;

pub type NodeId = usize;

/// Payload delivered to an event listener.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: String,
    pub target: NodeId,
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// The mutable tree that committed renders are written into.
///
/// Group nodes behave like document fragments: appending one to a parent
/// moves the group's children into the parent and consumes the group.
pub trait OutputTarget {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    /// Inert node that keeps a structural position without visible output.
    fn create_placeholder(&mut self) -> NodeId;
    fn create_group(&mut self) -> NodeId;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError>;
    /// Whether `node` exposes a live property called `name`.
    fn has_property(&self, node: NodeId, name: &str) -> bool;
    fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), NodeError>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), NodeError>;
    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), NodeError>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;
    fn contains(&self, node: NodeId) -> bool;
    /// Drops every child of `mount` and appends `content` in their place.
    fn replace_children(&mut self, mount: NodeId, content: NodeId) -> Result<(), NodeError>;
    /// Detaches `node` from its parent and discards it with its subtree.
    fn remove(&mut self, node: NodeId) -> Result<(), NodeError>;
}
