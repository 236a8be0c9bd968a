//! The serializable output value tree produced by query/field execution.

mod object;
mod scalar;

use std::fmt;

pub use self::{object::Object, scalar::Scalar};

/// A value in the response tree, as produced by value completion.
///
/// Similar to `serde_json::Value`, but the `Object` variant is backed by an
/// order-preserving map (see `Object`'s docs) since response-key order is
/// observable to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `null`, either a genuinely null leaf or the result of nullability
    /// propagation.
    Null,
    /// A completed (serialized) scalar or enum leaf.
    Scalar(Scalar),
    /// A completed list.
    List(Vec<Value>),
    /// A completed object.
    Object(Object),
}

impl Value {
    /// Constructs [`Value::Null`].
    pub fn null() -> Self {
        Self::Null
    }

    /// Whether this value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Views the underlying object, if this is [`Value::Object`].
    pub fn as_object_value(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Converts into the underlying object, if this is [`Value::Object`].
    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(Scalar::String(s)) => write!(f, "{s:?}"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(list) => {
                write!(f, "[")?;
                for (idx, item) in list.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(obj) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in obj.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Scalar(Scalar::Int(i)) => serializer.serialize_i32(*i),
            Self::Scalar(Scalar::Float(v)) => serializer.serialize_f64(*v),
            Self::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Self::Scalar(Scalar::Boolean(b)) => serializer.serialize_bool(*b),
            Self::List(l) => l.serialize(serializer),
            Self::Object(o) => o.serialize(serializer),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl<T> From<Option<T>> for Value
where
    Self: From<T>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_owned()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Scalar(Scalar::Int(i as i32))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Boolean(b))
    }
}
