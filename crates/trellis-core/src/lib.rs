#![doc = r"Core runtime of Trellis: elements, hooks, render scheduling and commit."]

pub mod collections;
mod commit;
pub mod deps;
pub mod effects;
pub mod element;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod options;
pub mod path;
pub mod platform;
mod reaper;
pub mod root;
pub mod runtime;
mod scheduler;
pub mod target;

pub use deps::{deps_changed, Dep, Deps, SameValue};
pub use effects::{use_effect, EffectResult, EffectScope};
pub use element::{
    create_element, format_number, Component, Element, ElementType, Key, Node, NodeRef, PropValue,
    Props, FRAGMENT,
};
pub use error::{HookError, NodeError, RenderError};
pub use hooks::{use_callback, use_memo, use_ref, use_state, HookKind, Ref, SetState};
pub use memory::{MemoryNode, MemoryNodeKind, MemoryTarget};
pub use options::RuntimeOptions;
pub use path::{Path, PathSegment};
pub use platform::RuntimeScheduler;
pub use root::{Root, RootId, SharedTarget};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use target::{Event, EventHandler, NodeId, OutputTarget};
