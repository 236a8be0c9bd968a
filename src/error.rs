//! The error model: per-field [`FieldError`]s raised by resolvers and
//! completion, accumulated as [`ExecutionError`]s, plus the small set of
//! structural [`GraphQLError`]s that abort an execution before any field
//! runs.

use std::fmt;

use derive_more::with_trait::{Display, Error, From};

use crate::{
    path::PathElement,
    value::{Object, Value},
};

/// A line/column position in the original query source, for inclusion in a
/// [`LocatedError`]'s `locations`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

/// The result of resolving the value of a field.
///
/// Raised from a user resolver (a returned `Err`, or a caught panic) or
/// from argument/result coercion. Carries a human-readable `message` plus
/// an opaque `extensions` bag that is merged into the serialized error's
/// `extensions` field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl FieldError {
    /// Constructs a new [`FieldError`] with additional `extensions` data.
    ///
    /// If `extensions` is [`Value::Null`], no extra data is attached.
    pub fn new(message: impl fmt::Display, extensions: Value) -> Self {
        Self {
            message: message.to_string(),
            extensions,
        }
    }

    /// The error's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error's `extensions` bag, [`Value::Null`] if none was attached.
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }

    /// Wraps a resolver failure as a [`FieldError`], applying the uniform
    /// wrapping policy (DESIGN.md): every resolver failure already arrives
    /// as a typed `E: Display` (unlike a JS resolver's arbitrary thrown
    /// value), so its `Display` output is used directly as the message
    /// rather than a canonical "unexpected value" placeholder.
    pub fn wrap(cause: impl fmt::Display) -> Self {
        Self::new(cause, Value::Null)
    }
}

impl<T: fmt::Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self::wrap(e)
    }
}

/// The result of resolving an unspecified field.
pub type ExecutionResult<T> = Result<T, FieldError>;

/// A [`FieldError`] located at a specific point in the response, as it was
/// observed during one execution.
///
/// Errors accumulate append-only into an execution's error collector; order
/// is the order in which they were emitted, which may vary run-to-run under
/// concurrent scheduling (§8, property 1).
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    locations: Vec<SourceLocation>,
    path: Vec<PathElement>,
    error: FieldError,
}

impl ExecutionError {
    /// Constructs a new [`ExecutionError`] at the given `path`.
    pub fn new(path: Vec<PathElement>, locations: Vec<SourceLocation>, error: FieldError) -> Self {
        Self {
            locations,
            path,
            error,
        }
    }

    /// The response path at which this error occurred.
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// The inner [`FieldError`].
    pub fn error(&self) -> &FieldError {
        &self.error
    }

    /// Serializes this error into the `{message, locations?, path?,
    /// extensions?}` shape described in §6.
    pub fn to_response_object(&self) -> Object {
        let mut obj = Object::with_capacity(4);
        obj.add_field("message", Value::from(self.error.message().to_owned()));
        if !self.locations.is_empty() {
            let locs = self
                .locations
                .iter()
                .map(|loc| {
                    let mut o = Object::with_capacity(2);
                    o.add_field("line", Value::from(loc.line as i32));
                    o.add_field("column", Value::from(loc.column as i32));
                    Value::Object(o)
                })
                .collect();
            obj.add_field("locations", Value::List(locs));
        }
        if !self.path.is_empty() {
            let path = self.path.iter().map(PathElement::to_value).collect();
            obj.add_field("path", Value::List(path));
        }
        if !self.error.extensions().is_null() {
            obj.add_field("extensions", self.error.extensions().clone());
        }
        obj
    }
}

/// A structural error that prevents a response from reflecting any field
/// resolution at all.
///
/// Only [`NoDocument`](Self::NoDocument) and [`NoSchema`](Self::NoSchema) --
/// the two conditions that mean the entry point has nothing to execute
/// against -- are returned as `Err` from the operation entry point. Every
/// other variant here is raised *before* field execution starts (unresolvable
/// operation name, a schema not configured for the selected operation's kind,
/// invalid variable values) but is still surfaced the same way a [`FieldError`]
/// would be: as the sole entry of a `{data: null, errors: [...]}` response,
/// never thrown (§4.7, §7 item 4).
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum GraphQLError {
    /// No document was provided.
    #[display("Must provide document.")]
    NoDocument,
    /// No schema / an unrecognizable schema was provided.
    #[display("Must provide schema.")]
    NoSchema,
    /// `operationName` named an operation the document doesn't contain.
    #[display("Unknown operation named \"{_0}\".")]
    UnknownOperationName(#[error(not(source))] String),
    /// The document has more than one operation and `operationName` was not
    /// given.
    #[display("Must provide operation name if query contains multiple operations.")]
    MultipleOperationsProvided,
    /// The document has no operations at all.
    #[display("Must provide an operation.")]
    NoOperationProvided,
    /// The schema doesn't declare a root type for the selected operation's
    /// kind (e.g. a `mutation` document against a query-only schema).
    #[display("Schema is not configured to execute {_0} operation.")]
    OperationKindNotConfigured(#[error(not(source))] &'static str),
    /// A variable's supplied (or missing, or defaulted) value could not be
    /// coerced against its declared type (§4.3).
    #[display("Variable \"${_0}\": {_1}")]
    InvalidVariableValue(#[error(not(source))] String, #[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_displayable_cause_by_stringifying_it() {
        let err = FieldError::wrap("boom");
        assert_eq!(err.message(), "boom");
        assert!(err.extensions().is_null());
    }

    #[test]
    fn response_object_omits_empty_optional_fields() {
        let err = ExecutionError::new(vec![], vec![], FieldError::wrap("oops"));
        let obj = err.to_response_object();
        assert_eq!(obj.field_count(), 1);
        assert_eq!(
            obj.get_field_value("message"),
            Some(&Value::from("oops".to_owned()))
        );
    }

    #[test]
    fn response_object_includes_path_when_present() {
        let err = ExecutionError::new(
            vec![PathElement::Key("a".into()), PathElement::Index(1)],
            vec![],
            FieldError::wrap("oops"),
        );
        let obj = err.to_response_object();
        assert_eq!(
            obj.get_field_value("path"),
            Some(&Value::List(vec![
                Value::from("a".to_owned()),
                Value::from(1),
            ]))
        );
    }
}
