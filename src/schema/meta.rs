//! Metadata describing one named type or directive in a frozen schema.
//!
//! Schema *construction* -- turning Rust types into this metadata, the way
//! upstream `juniper`'s `Registry` and `#[derive(GraphQLObject)]` do -- is
//! out of scope (§1): the core only ever reads a schema that some
//! collaborator has already built. What's here is deliberately plain data
//! (plus a handful of closures for scalar `serialize`/`parse_*`, which have
//! no sensible non-closure representation) rather than a builder API.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{ast::InputValue, value::Scalar, value::Value};

/// A possibly-list, possibly-non-null reference to a named schema type, as
/// it appears in a field's return type or an argument's type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeRef {
    /// A named type, e.g. `String`.
    Named(String),
    /// A list of some other type.
    List(Box<TypeRef>),
    /// A non-null wrapping of some other type.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Shorthand for a nullable named type reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Shorthand for `self!`.
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// Shorthand for `[self]`.
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// The innermost named type, stripping all `List`/`NonNull` wrappers.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(t) | Self::NonNull(t) => t.innermost_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNull(t) => write!(f, "{t}!"),
        }
    }
}

/// One declared argument of a field or directive.
#[derive(Clone)]
pub struct ArgumentMeta {
    /// The argument's name.
    pub name: String,
    /// The argument's declared type.
    pub arg_type: TypeRef,
    /// The argument's default value, applied per §4.3 when the argument is
    /// absent, or refers to an absent variable.
    pub default_value: Option<InputValue>,
}

impl ArgumentMeta {
    /// Constructs a new required (no default) argument.
    pub fn new(name: impl Into<String>, arg_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            arg_type,
            default_value: None,
        }
    }

    /// Attaches a default value to this argument.
    #[must_use]
    pub fn with_default(mut self, default_value: InputValue) -> Self {
        self.default_value = Some(default_value);
        self
    }
}

/// One declared field of an object or interface type.
#[derive(Clone)]
pub struct FieldMeta {
    /// The field's name, as it appears in a selection.
    pub name: String,
    /// The field's declared return type.
    pub field_type: TypeRef,
    /// The field's declared arguments.
    pub arguments: Vec<ArgumentMeta>,
}

impl FieldMeta {
    /// Constructs a field with no arguments.
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type,
            arguments: Vec::new(),
        }
    }

    /// Attaches an argument to this field.
    #[must_use]
    pub fn argument(mut self, arg: ArgumentMeta) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Looks up a declared argument by name.
    pub fn argument_by_name(&self, name: &str) -> Option<&ArgumentMeta> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// Serializes a raw resolver-produced [`Scalar`] into an output [`Value`],
/// per §4.3's "result coercion".
pub type SerializeFn = Arc<dyn Fn(&Scalar) -> Result<Value, String> + Send + Sync>;
/// Coerces a literal [`InputValue`] (as written in a document) into a
/// [`Scalar`], per §4.3's "arguments: ... literal (parse-literal through
/// scalars)".
pub type ParseLiteralFn = Arc<dyn Fn(&InputValue) -> Result<Scalar, String> + Send + Sync>;
/// Coerces a raw external (JSON) value into a [`Scalar`], used when
/// coercing variable values.
pub type ParseValueFn = Arc<dyn Fn(&serde_json::Value) -> Result<Scalar, String> + Send + Sync>;

/// Metadata for a scalar type, including its coercion functions.
#[derive(Clone)]
pub struct ScalarType {
    /// The scalar's name.
    pub name: String,
    /// Serializes a resolver value for the response.
    pub serialize: SerializeFn,
    /// Parses a literal written in the document.
    pub parse_literal: ParseLiteralFn,
    /// Parses a raw external (variable) value.
    pub parse_value: ParseValueFn,
}

impl ScalarType {
    /// The built-in `Int` scalar.
    pub fn int() -> Self {
        Self {
            name: "Int".into(),
            serialize: Arc::new(|s| match s {
                Scalar::Int(i) => Ok(Value::from(*i)),
                other => Err(format!("Int cannot represent non-integer value: {other}")),
            }),
            parse_literal: Arc::new(|v| match v {
                InputValue::Scalar(Scalar::Int(i)) => Ok(Scalar::Int(*i)),
                other => Err(format!("Int cannot represent non-integer value: {other:?}")),
            }),
            parse_value: Arc::new(|v| match v {
                serde_json::Value::Number(n) if n.is_i64() => {
                    Ok(Scalar::Int(n.as_i64().unwrap() as i32))
                }
                other => Err(format!("Int cannot represent non-integer value: {other}")),
            }),
        }
    }

    /// The built-in `Float` scalar.
    pub fn float() -> Self {
        Self {
            name: "Float".into(),
            serialize: Arc::new(|s| match s {
                Scalar::Float(f) => Ok(Value::from(*f)),
                Scalar::Int(i) => Ok(Value::from(f64::from(*i))),
                other => Err(format!("Float cannot represent non-numeric value: {other}")),
            }),
            parse_literal: Arc::new(|v| match v {
                InputValue::Scalar(Scalar::Float(f)) => Ok(Scalar::Float(*f)),
                InputValue::Scalar(Scalar::Int(i)) => Ok(Scalar::Float(f64::from(*i))),
                other => Err(format!("Float cannot represent non-numeric value: {other:?}")),
            }),
            parse_value: Arc::new(|v| match v {
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .map(Scalar::Float)
                    .ok_or_else(|| format!("Float cannot represent non-numeric value: {n}")),
                other => Err(format!("Float cannot represent non-numeric value: {other}")),
            }),
        }
    }

    /// The built-in `String` scalar.
    pub fn string() -> Self {
        Self {
            name: "String".into(),
            serialize: Arc::new(|s| match s {
                Scalar::String(v) => Ok(Value::from(v.clone())),
                other => Err(format!("String cannot represent non-string value: {other}")),
            }),
            parse_literal: Arc::new(|v| match v {
                InputValue::Scalar(Scalar::String(s)) => Ok(Scalar::String(s.clone())),
                other => Err(format!(
                    "String cannot represent non-string value: {other:?}"
                )),
            }),
            parse_value: Arc::new(|v| match v {
                serde_json::Value::String(s) => Ok(Scalar::String(s.clone())),
                other => Err(format!("String cannot represent non-string value: {other}")),
            }),
        }
    }

    /// The built-in `ID` scalar, which accepts either a string or integer
    /// literal/value and serializes as a string.
    pub fn id() -> Self {
        let mut s = Self::string();
        s.name = "ID".into();
        s.parse_literal = Arc::new(|v| match v {
            InputValue::Scalar(Scalar::String(s)) => Ok(Scalar::String(s.clone())),
            InputValue::Scalar(Scalar::Int(i)) => Ok(Scalar::String(i.to_string())),
            other => Err(format!("ID cannot represent value: {other:?}")),
        });
        s.parse_value = Arc::new(|v| match v {
            serde_json::Value::String(s) => Ok(Scalar::String(s.clone())),
            serde_json::Value::Number(n) => Ok(Scalar::String(n.to_string())),
            other => Err(format!("ID cannot represent value: {other}")),
        });
        s
    }

    /// The built-in `Boolean` scalar.
    pub fn boolean() -> Self {
        Self {
            name: "Boolean".into(),
            serialize: Arc::new(|s| match s {
                Scalar::Boolean(b) => Ok(Value::from(*b)),
                other => Err(format!(
                    "Boolean cannot represent non-boolean value: {other}"
                )),
            }),
            parse_literal: Arc::new(|v| match v {
                InputValue::Scalar(Scalar::Boolean(b)) => Ok(Scalar::Boolean(*b)),
                other => Err(format!(
                    "Boolean cannot represent non-boolean value: {other:?}"
                )),
            }),
            parse_value: Arc::new(|v| match v {
                serde_json::Value::Bool(b) => Ok(Scalar::Boolean(*b)),
                other => Err(format!(
                    "Boolean cannot represent non-boolean value: {other}"
                )),
            }),
        }
    }
}

/// Metadata for an enum type.
#[derive(Clone)]
pub struct EnumMeta {
    /// The enum's name.
    pub name: String,
    /// The enum's declared value names.
    pub values: Vec<String>,
}

impl EnumMeta {
    /// Whether `value` is one of this enum's declared names.
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Metadata for an input object type, used only for coercing argument and
/// variable literals (§4.3); never resolved against directly.
#[derive(Clone)]
pub struct InputObjectMeta {
    /// The input object's name.
    pub name: String,
    /// Declared input fields.
    pub fields: IndexMap<String, ArgumentMeta>,
}

/// A function resolving an abstract (interface/union) value to the name of
/// its concrete runtime object type, overriding the default fallback of
/// asking the value itself (§4.6).
pub type TypeResolverFn<C> =
    Arc<dyn Fn(&dyn crate::resolve::Resolvable<C>) -> Option<String> + Send + Sync>;

/// A per-object-type predicate used to resolve an abstract value's concrete
/// type when the abstract type itself declares no `type_resolver` (§4.6:
/// "otherwise try each possible type's `isTypeOf`, in schema order").
pub type IsTypeOfFn<C> = Arc<dyn Fn(&dyn crate::resolve::Resolvable<C>) -> bool + Send + Sync>;

/// Metadata for an object type.
#[derive(Clone)]
pub struct ObjectType<C> {
    /// The object's name.
    pub name: String,
    /// Declared fields, in schema declaration order (`__typename` is
    /// handled separately by the collector/executor, not stored here).
    pub fields: IndexMap<String, FieldMeta>,
    /// Names of interfaces this object declares it implements.
    pub interfaces: Vec<String>,
    /// Predicate tried, in schema order among an abstract type's possible
    /// types, when that abstract type has no `type_resolver` of its own.
    pub is_type_of: Option<IsTypeOfFn<C>>,
    marker: std::marker::PhantomData<fn(C)>,
}

impl<C> ObjectType<C> {
    /// Constructs a new object type with no fields or interfaces yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            is_type_of: None,
            marker: std::marker::PhantomData,
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Declares that this object implements `interface_name`.
    #[must_use]
    pub fn implements(mut self, interface_name: impl Into<String>) -> Self {
        self.interfaces.push(interface_name.into());
        self
    }

    /// Attaches an `isTypeOf` predicate, consulted as a fallback during
    /// abstract-type resolution (§4.6).
    #[must_use]
    pub fn with_is_type_of(mut self, is_type_of: IsTypeOfFn<C>) -> Self {
        self.is_type_of = Some(is_type_of);
        self
    }
}

/// Metadata for an interface type.
#[derive(Clone)]
pub struct InterfaceType<C> {
    /// The interface's name.
    pub name: String,
    /// Fields every implementer must provide.
    pub fields: IndexMap<String, FieldMeta>,
    /// Overrides the default type-resolution fallback, see
    /// [`TypeResolverFn`].
    pub type_resolver: Option<TypeResolverFn<C>>,
}

impl<C> InterfaceType<C> {
    /// Constructs a new interface type with no fields yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            type_resolver: None,
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Metadata for a union type.
#[derive(Clone)]
pub struct UnionType<C> {
    /// The union's name.
    pub name: String,
    /// Names of the object types that are members of this union.
    pub possible_types: Vec<String>,
    /// Overrides the default type-resolution fallback, see
    /// [`TypeResolverFn`].
    pub type_resolver: Option<TypeResolverFn<C>>,
}

impl<C> UnionType<C> {
    /// Constructs a new union type over `possible_types`.
    pub fn new(name: impl Into<String>, possible_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            possible_types,
            type_resolver: None,
        }
    }
}

/// A named schema type: the frozen, resolved form of every GraphQL type
/// kind.
#[derive(Clone)]
pub enum MetaType<C> {
    /// A scalar type.
    Scalar(ScalarType),
    /// An enum type.
    Enum(EnumMeta),
    /// An object type.
    Object(ObjectType<C>),
    /// An interface type.
    Interface(InterfaceType<C>),
    /// A union type.
    Union(UnionType<C>),
    /// An input object type (used only for argument/variable coercion).
    InputObject(InputObjectMeta),
}

impl<C> MetaType<C> {
    /// This type's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::Object(t) => &t.name,
            Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::InputObject(t) => &t.name,
        }
    }

    /// Whether this type is an interface or a union (can have more than one
    /// possible concrete object type).
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// The declared field named `name`, if this is an object or interface
    /// type that declares it.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldMeta> {
        match self {
            Self::Object(t) => t.fields.get(name),
            Self::Interface(t) => t.fields.get(name),
            _ => None,
        }
    }
}
