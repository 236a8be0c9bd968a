//! Response path: the breadcrumb trail threaded through every field
//! invocation, carried into errors and into incremental-delivery records.

use std::{fmt, sync::Arc};

/// One segment of a [`Path`].
///
/// Mirrors the two places a response value can branch: into a named
/// (aliased) field of some parent object type, or into an indexed element
/// of a list.
#[derive(Clone, Debug, PartialEq)]
pub enum PathSegment {
    /// A field's response key (alias, or name if unaliased), plus the name
    /// of the object type it was selected on. The type name is carried for
    /// diagnostics; it is not part of the serialized path.
    Field {
        /// Response key (alias-or-name).
        response_key: Arc<str>,
        /// Name of the object type the field was selected on.
        parent_type: Arc<str>,
    },
    /// An index into a list value.
    Index(usize),
}

/// Immutable, structurally shared linked list of [`PathSegment`]s.
///
/// A `Path` is created on entering a field or list element and is cheap to
/// clone: extending it allocates one new node and shares the rest of the
/// chain via [`Arc`]. This lets every in-flight resolver hold its own
/// `Path` without copying the whole ancestry.
#[derive(Clone, Debug)]
pub struct Path {
    segment: Option<PathSegment>,
    parent: Option<Arc<Path>>,
}

impl Path {
    /// The empty path, at the root of the response.
    pub fn root() -> Self {
        Self {
            segment: None,
            parent: None,
        }
    }

    /// Returns a new `Path` extending `self` with `segment`.
    #[must_use]
    pub fn append(self: &Arc<Self>, segment: PathSegment) -> Self {
        Self {
            segment: Some(segment),
            parent: Some(Arc::clone(self)),
        }
    }

    /// The segment at the end of this path, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segment.as_ref()
    }

    /// Materializes this path into an ordered array of response keys /
    /// indices, root first, suitable for inclusion in a [`LocatedError`].
    ///
    /// [`LocatedError`]: crate::error::LocatedError
    pub fn materialize(&self) -> Vec<PathElement> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<PathElement>) {
        if let Some(parent) = &self.parent {
            parent.collect_into(out);
        }
        match &self.segment {
            Some(PathSegment::Field { response_key, .. }) => {
                out.push(PathElement::Key(response_key.to_string()))
            }
            Some(PathSegment::Index(i)) => out.push(PathElement::Index(*i)),
            None => {}
        }
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

/// One element of a materialized [`Path`], as it is serialized in a
/// [`LocatedError`]'s `path` field.
///
/// [`LocatedError`]: crate::error::LocatedError
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum PathElement {
    /// A response key (object field).
    Key(String),
    /// A list index.
    Index(usize),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl PathElement {
    /// Converts this path element into an output [`Value`](crate::value::Value),
    /// as it appears in a serialized error's or incremental record's `path`.
    pub fn to_value(&self) -> crate::value::Value {
        match self {
            Self::Key(k) => crate::value::Value::from(k.clone()),
            Self::Index(i) => crate::value::Value::from(*i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materializes_root_to_empty() {
        assert_eq!(Path::root().materialize(), Vec::new());
    }

    #[test]
    fn materializes_nested_path_in_order() {
        let root = Arc::new(Path::root());
        let a = Arc::new(root.append(PathSegment::Field {
            response_key: Arc::from("a"),
            parent_type: Arc::from("Q"),
        }));
        let b = Arc::new(a.append(PathSegment::Field {
            response_key: Arc::from("b"),
            parent_type: Arc::from("A"),
        }));
        let c = b.append(PathSegment::Index(2));

        assert_eq!(
            c.materialize(),
            vec![
                PathElement::Key("a".into()),
                PathElement::Key("b".into()),
                PathElement::Index(2),
            ]
        );
    }
}
