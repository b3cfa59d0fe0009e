//! Structural identity of component instances.
//!
//! A [`Path`] records how the committer reached a node from its root: every
//! child step contributes the child's key (or its position when unkeyed) and
//! every component contributes a [`PathSegment::Rendered`] step before its
//! output. Segments stay discriminated, so a user key can never be confused
//! with a position or with the rendered-output marker.

use std::fmt;

use crate::element::Key;
use crate::root::RootId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Root(RootId),
    Index(usize),
    Key(Key),
    Rendered,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Root(id) => write!(f, "{id}"),
            PathSegment::Index(index) => write!(f, "{index}"),
            PathSegment::Key(key) => write!(f, "#{key}"),
            PathSegment::Rendered => f.write_str(">"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn root(id: RootId) -> Self {
        Self {
            segments: vec![PathSegment::Root(id)],
        }
    }

    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    pub fn rendered(&self) -> Self {
        self.child(PathSegment::Rendered)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn root_id(&self) -> Option<RootId> {
        match self.segments.first() {
            Some(PathSegment::Root(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_segments() {
        let path = Path::root(RootId::new(3))
            .child(PathSegment::Index(0))
            .rendered()
            .child(PathSegment::Key(Key::from("row")));
        assert_eq!(path.to_string(), "r3/0/>/#row");
        assert_eq!(path.depth(), 4);
        assert_eq!(path.root_id(), Some(RootId::new(3)));
    }

    #[test]
    fn keys_never_collide_with_markers() {
        let base = Path::root(RootId::new(1));
        let keyed = base.child(PathSegment::Key(Key::from(">")));
        let rendered = base.rendered();
        assert_ne!(keyed, rendered);

        let keyed_index = base.child(PathSegment::Key(Key::from("0")));
        let index = base.child(PathSegment::Index(0));
        assert_ne!(keyed_index, index);

        let joined = base.child(PathSegment::Key(Key::from("a/b")));
        let nested = base
            .child(PathSegment::Key(Key::from("a")))
            .child(PathSegment::Key(Key::from("b")));
        assert_ne!(joined, nested);
    }

    #[test]
    fn child_leaves_parent_untouched() {
        let parent = Path::root(RootId::new(1));
        let child = parent.child(PathSegment::Index(2));
        assert_eq!(parent.depth(), 1);
        assert_eq!(child.segments()[1], PathSegment::Index(2));
    }
}
