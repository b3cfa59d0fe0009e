//! Element model: immutable descriptions of what the output tree should hold.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::Ref;
use crate::path::PathSegment;
use crate::target::{EventHandler, NodeId};

/// Stable identity hint for an element among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{value}"),
            Key::Str(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(value) => Key::Int(value),
            Err(_) => Key::Str(value.to_string()),
        }
    }
}

impl Key {
    fn from_prop(value: &PropValue) -> Option<Key> {
        match value {
            PropValue::Null | PropValue::Bool(_) => None,
            PropValue::Number(number) if is_exact_i64(*number) => Some(Key::Int(*number as i64)),
            PropValue::Str(text) => Some(Key::Str(text.clone())),
            other => Some(Key::Str(other.to_attribute_value())),
        }
    }
}

/// Whether `value` is integral and inside the range `i64` can hold exactly.
fn is_exact_i64(value: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value)
}

pub type ComponentFn = dyn Fn(&Props) -> Node;

/// A user-supplied render function. Identity of a component instance comes
/// from its position in the tree, never from the closure.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<ComponentFn>,
}

impl Component {
    pub fn new(name: &'static str, render: impl Fn(&Props) -> Node + 'static) -> Self {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(&self, props: &Props) -> Node {
        (self.render)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

#[derive(Clone, Debug)]
pub enum ElementType {
    Tag(String),
    Fragment,
    Component(Component),
}

/// Groups children without producing a node of its own.
pub const FRAGMENT: ElementType = ElementType::Fragment;

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Tag(tag.to_owned())
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Tag(tag)
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

/// Assigned to a `ref` property; receives the output node once its
/// properties and children are attached.
#[derive(Clone)]
pub enum NodeRef {
    Callback(Rc<dyn Fn(NodeId)>),
    Object(Ref<Option<NodeId>>),
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Callback(_) => f.write_str("NodeRef::Callback"),
            NodeRef::Object(target) => f.debug_tuple("NodeRef::Object").field(target).finish(),
        }
    }
}

#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Style(IndexMap<String, String>),
    Handler(EventHandler),
    Ref(NodeRef),
    Children(Rc<[Node]>),
    Shared(Rc<dyn Any>),
}

impl PropValue {
    pub fn handler(handler: impl Fn(&crate::Event) + 'static) -> Self {
        PropValue::Handler(EventHandler::new(handler))
    }

    pub fn style<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        PropValue::Style(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn shared<T: Any>(value: T) -> Self {
        PropValue::Shared(Rc::new(value))
    }

    pub fn ref_callback(callback: impl Fn(NodeId) + 'static) -> Self {
        PropValue::Ref(NodeRef::Callback(Rc::new(callback)))
    }

    /// `false` and null values never reach the output node.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, PropValue::Null | PropValue::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn to_attribute_value(&self) -> String {
        match self {
            PropValue::Null => "null".to_owned(),
            PropValue::Bool(value) => value.to_string(),
            PropValue::Number(value) => format_number(*value),
            PropValue::Str(value) => value.clone(),
            PropValue::Style(entries) => entries
                .iter()
                .map(|(name, value)| format!("{name}: {value};"))
                .collect::<Vec<_>>()
                .join(" "),
            PropValue::Handler(_) => "[handler]".to_owned(),
            PropValue::Ref(_) => "[ref]".to_owned(),
            PropValue::Children(_) => "[children]".to_owned(),
            PropValue::Shared(_) => "[object]".to_owned(),
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Number(value) => write!(f, "Number({value})"),
            PropValue::Str(value) => write!(f, "Str({value:?})"),
            PropValue::Style(entries) => f.debug_tuple("Style").field(entries).finish(),
            PropValue::Handler(_) => f.write_str("Handler"),
            PropValue::Ref(node_ref) => write!(f, "{node_ref:?}"),
            PropValue::Children(children) => f.debug_tuple("Children").field(children).finish(),
            PropValue::Shared(_) => f.write_str("Shared"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<Vec<Node>> for PropValue {
    fn from(children: Vec<Node>) -> Self {
        PropValue::Children(children.into())
    }
}

impl From<EventHandler> for PropValue {
    fn from(handler: EventHandler) -> Self {
        PropValue::Handler(handler)
    }
}

impl From<NodeRef> for PropValue {
    fn from(node_ref: NodeRef) -> Self {
        PropValue::Ref(node_ref)
    }
}

impl From<Ref<Option<NodeId>>> for PropValue {
    fn from(target: Ref<Option<NodeId>>) -> Self {
        PropValue::Ref(NodeRef::Object(target))
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropValue::Null)
    }
}

/// Element properties, applied in insertion order.
#[derive(Clone, Default)]
pub struct Props {
    values: IndexMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds an `on<Event>` handler property.
    pub fn on(self, event: &str, handler: impl Fn(&crate::Event) + 'static) -> Self {
        let mut name = String::with_capacity(event.len() + 2);
        name.push_str("on");
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
        self.with(name, PropValue::handler(handler))
    }

    pub fn key(self, key: impl Into<Key>) -> Self {
        let value = match key.into() {
            Key::Int(value) => PropValue::Number(value as f64),
            Key::Str(value) => PropValue::Str(value),
        };
        self.with("key", value)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.values.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(PropValue::as_number)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_bool)
    }

    /// Typed access to a value passed with [`PropValue::shared`].
    pub fn shared<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        match self.get(name) {
            Some(PropValue::Shared(value)) => value.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn handler(&self, name: &str) -> Option<&EventHandler> {
        match self.get(name) {
            Some(PropValue::Handler(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self.get("children") {
            Some(PropValue::Children(children)) => &children[..],
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

/// Anything that can appear in an element tree.
#[derive(Clone, Debug, Default)]
pub enum Node {
    #[default]
    Empty,
    Bool(bool),
    Text(String),
    Number(f64),
    List(Vec<Node>),
    Element(Element),
}

impl Node {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Element(element) => element.key(),
            _ => None,
        }
    }

    pub(crate) fn segment(&self, index: usize) -> PathSegment {
        match self.key() {
            Some(key) => PathSegment::Key(key.clone()),
            None => PathSegment::Index(index),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_owned())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Number(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Number(f64::from(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(value as f64)
    }
}

impl From<usize> for Node {
    fn from(value: usize) -> Self {
        Node::Number(value as f64)
    }
}

impl From<()> for Node {
    fn from(_: ()) -> Self {
        Node::Empty
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Node::Empty)
    }
}

#[derive(Debug)]
struct ElementData {
    ty: ElementType,
    props: Props,
    children: Rc<[Node]>,
    key: Option<Key>,
}

/// Immutable element description. Cloning shares the element instead of
/// copying its subtree.
#[derive(Clone, Debug)]
pub struct Element(Rc<ElementData>);

impl Element {
    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Children as a component or tag sees them: the `children` property when
    /// one was given, the positional children otherwise.
    pub fn content(&self) -> &[Node] {
        match self.0.props.get("children") {
            Some(PropValue::Children(children)) => &children[..],
            _ => &self.0.children,
        }
    }
}

/// Builds an [`Element`].
///
/// Nested lists in `children` are spliced in depth-first order and booleans
/// and empty nodes are dropped. A `key` property becomes the element key.
/// The `children` property and [`Element::children`] share one list.
pub fn create_element(
    ty: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = Node>,
) -> Element {
    let mut props = props;
    let key = props.remove("key").and_then(|value| Key::from_prop(&value));
    let mut flattened = Vec::new();
    for child in children {
        flatten_into(&mut flattened, child);
    }
    let children: Rc<[Node]> = flattened.into();
    if !children.is_empty() && !props.contains("children") {
        props.insert("children", PropValue::Children(children.clone()));
    }
    Element(Rc::new(ElementData {
        ty: ty.into(),
        props,
        children,
        key,
    }))
}

fn flatten_into(out: &mut Vec<Node>, node: Node) {
    match node {
        Node::Empty | Node::Bool(_) => {}
        Node::List(items) => {
            for item in items {
                flatten_into(out, item);
            }
        }
        other => out.push(other),
    }
}

/// Renders a number the way text content shows it: integral values carry no
/// fraction, and `-0` prints as `0`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        }
    } else if value == 0.0 {
        "0".to_owned()
    } else {
        value.to_string()
    }
}

/// Collects heterogeneous children into a `Vec<Node>`.
#[macro_export]
macro_rules! nodes {
    ($($child:expr),* $(,)?) => {
        ::std::vec![$($crate::Node::from($child)),*]
    };
}
