use std::fmt;

use crate::hooks::HookKind;
use crate::path::Path;
use crate::target::NodeId;

/// Failure reported by an [`OutputTarget`](crate::OutputTarget) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    Kind { id: NodeId, expected: &'static str },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::Kind { id, expected } => {
                write!(f, "node {id} has the wrong kind; expected {expected}")
            }
        }
    }
}

impl std::error::Error for NodeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A root was requested for a mount point the target does not contain.
    MissingMount { mount: NodeId },
    /// A tag element whose name cannot become an output node.
    UnsupportedElementType { name: String },
    Node(NodeError),
    /// An effect cleanup panicked while its effect was being re-run.
    EffectCleanup { path: Path, message: String },
    /// A cleanup panicked while its component was being unmounted.
    UnmountCleanup { path: Path, message: String },
    /// Re-entrant updates kept the flush busy past the configured pass limit.
    UpdateDepthExceeded { passes: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingMount { mount } => {
                write!(f, "cannot create a root: mount node {mount} does not exist")
            }
            RenderError::UnsupportedElementType { name } => {
                write!(f, "unsupported element type {name:?}")
            }
            RenderError::Node(err) => write!(f, "output target error: {err}"),
            RenderError::EffectCleanup { path, message } => {
                write!(f, "effect cleanup at {path} failed: {message}")
            }
            RenderError::UnmountCleanup { path, message } => {
                write!(f, "unmount cleanup at {path} failed: {message}")
            }
            RenderError::UpdateDepthExceeded { passes } => write!(
                f,
                "maximum update depth exceeded after {passes} flush passes"
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Node(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeError> for RenderError {
    fn from(err: NodeError) -> Self {
        RenderError::Node(err)
    }
}

/// Misuse of the hook API. These are raised as panics: they mean the
/// component itself is wrong, not that rendering hit a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    OutsideComponent {
        hook: &'static str,
    },
    IdentityMismatch {
        path: Path,
        index: usize,
        expected: String,
        found: HookKind,
    },
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::OutsideComponent { hook } => {
                write!(f, "{hook} called outside of a component body")
            }
            HookError::IdentityMismatch {
                path,
                index,
                expected,
                found,
            } => write!(
                f,
                "hook identity mismatch at {path} slot {index}: expected {expected}, found {found}; \
                 hooks must be called in the same order on every render"
            ),
        }
    }
}

impl std::error::Error for HookError {}
