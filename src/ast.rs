//! The parsed-document data model: operations, fragments, selection sets,
//! and input-literal values.
//!
//! Lexing and parsing are out of scope for this crate (§1) -- a document is
//! a collaborator's output, already structured. Unlike upstream `juniper`'s
//! `ast` module, which borrows `&'a str` slices straight out of the source
//! text to stay zero-copy through the parser, these nodes own their data:
//! with no parser in this crate to amortize the borrow against, and with
//! `@defer`/`@stream` needing to keep selection-set fragments alive across
//! `await` points in a long-running incremental delivery stream, owned
//! `String`s (and a cheap `Arc` clone of the whole [`Document`] where a
//! record needs to outlive the call that scheduled it) are the simpler
//! choice.

use std::fmt;

use indexmap::IndexMap;

use crate::value::Scalar;

/// A line/column position in the original query source.
pub use crate::error::SourceLocation;

/// A GraphQL named/list/non-null type reference, as written in a variable
/// definition.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    /// A named type, e.g. `String`.
    Named(String),
    /// A list of some other type, e.g. `[String]`.
    List(Box<Type>),
    /// A non-null wrapping of some other type, e.g. `String!`.
    NonNull(Box<Type>),
}

impl Type {
    /// The innermost named type, stripping all `List`/`NonNull` wrappers.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(t) | Self::NonNull(t) => t.innermost_name(),
        }
    }

    /// Whether this type is wrapped in `NonNull` at the top level.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNull(t) => write!(f, "{t}!"),
        }
    }
}

/// A literal or variable-referencing input value, as written in an
/// argument, a default value, or nested inside one of those.
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    /// The literal `null`.
    Null,
    /// A literal scalar (int, float, string, or boolean).
    Scalar(Scalar),
    /// A literal enum value, by its name.
    Enum(String),
    /// A reference to an operation variable, by name.
    Variable(String),
    /// A literal list.
    List(Vec<InputValue>),
    /// A literal input object.
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    /// Whether this is a `Variable` reference, and if so, to what name.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// A single `name: value` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    /// The argument's name.
    pub name: String,
    /// The argument's literal-or-variable value.
    pub value: InputValue,
}

/// A directive application, e.g. `@skip(if: $cond)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// The directive's name, without the leading `@`.
    pub name: String,
    /// The directive's arguments.
    pub arguments: Vec<Argument>,
}

impl Directive {
    /// Looks up an argument's literal-or-variable value by name.
    pub fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

/// A single field selection, e.g. `alias: name(arg: 1) { sub }`.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// The field's alias, if any.
    pub alias: Option<String>,
    /// The field's name, as declared on the parent type.
    pub name: String,
    /// The field's arguments.
    pub arguments: Vec<Argument>,
    /// Directives applied to this field selection.
    pub directives: Vec<Directive>,
    /// The field's sub-selection set, empty for leaf (scalar/enum) fields.
    pub selection_set: Vec<Selection>,
    /// Source location, for error reporting.
    pub location: SourceLocation,
}

impl Field {
    /// The field's response key: its alias if present, else its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A `...fragmentName` selection.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpread {
    /// The name of the fragment being spread.
    pub name: String,
    /// Directives applied to the spread itself.
    pub directives: Vec<Directive>,
    /// Source location, for error reporting.
    pub location: SourceLocation,
}

/// A `... on TypeCondition { ... }` selection.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineFragment {
    /// The type condition, absent when the fragment applies unconditionally.
    pub type_condition: Option<String>,
    /// Directives applied to the inline fragment.
    pub directives: Vec<Directive>,
    /// The fragment's selection set.
    pub selection_set: Vec<Selection>,
    /// Source location, for error reporting.
    pub location: SourceLocation,
}

/// One entry in a selection set: a field, a fragment spread, or an inline
/// fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// A field selection.
    Field(Field),
    /// A named fragment spread.
    FragmentSpread(FragmentSpread),
    /// An inline (possibly type-conditioned) fragment.
    InlineFragment(InlineFragment),
}

impl Selection {
    /// The directives applied directly to this selection (not to whatever
    /// it expands into).
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Field(f) => &f.directives,
            Self::FragmentSpread(s) => &s.directives,
            Self::InlineFragment(i) => &i.directives,
        }
    }
}

/// The three kinds of GraphQL operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// A `query` operation: top-level fields may run concurrently.
    Query,
    /// A `mutation` operation: top-level fields run strictly serially.
    Mutation,
    /// A `subscription` operation: exactly one top-level field, re-run per
    /// source event (event-source setup itself is out of scope, §1).
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

/// One declared `$name: Type = default` operation variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    /// The variable's name, without the leading `$`.
    pub name: String,
    /// The variable's declared type.
    pub var_type: Type,
    /// The variable's default value, if declared.
    pub default_value: Option<InputValue>,
}

/// A top-level operation definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// `query` / `mutation` / `subscription`.
    pub operation_type: OperationType,
    /// The operation's name, if given.
    pub name: Option<String>,
    /// Declared operation variables.
    pub variable_definitions: Vec<VariableDefinition>,
    /// Directives applied to the operation itself.
    pub directives: Vec<Directive>,
    /// The operation's top-level selection set.
    pub selection_set: Vec<Selection>,
    /// Source location, for error reporting.
    pub location: SourceLocation,
}

/// A top-level named fragment definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// The fragment's name.
    pub name: String,
    /// The type condition it applies under.
    pub type_condition: String,
    /// Directives applied to the fragment definition.
    pub directives: Vec<Directive>,
    /// The fragment's selection set.
    pub selection_set: Vec<Selection>,
}

/// A complete parsed document: every operation and every named fragment it
/// defines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// All operation definitions, in source order.
    pub operations: Vec<Operation>,
    /// All fragment definitions, by name.
    pub fragments: IndexMap<String, Fragment>,
}

impl Document {
    /// Selects the operation to execute, per §4.7 step 4: by name if given,
    /// else the sole operation if there is exactly one.
    pub fn get_operation(
        &self,
        operation_name: Option<&str>,
    ) -> Result<&Operation, crate::error::GraphQLError> {
        use crate::error::GraphQLError;

        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|op| op.name.as_deref() == Some(name))
                .ok_or_else(|| GraphQLError::UnknownOperationName(name.to_owned())),
            None => match self.operations.len() {
                0 => Err(GraphQLError::NoOperationProvided),
                1 => Ok(&self.operations[0]),
                _ => Err(GraphQLError::MultipleOperationsProvided),
            },
        }
    }
}
