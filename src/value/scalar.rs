//! The concrete scalar representation used by [`Value`](super::Value) and
//! [`InputValue`](crate::ast::InputValue).
//!
//! Upstream `juniper` parameterizes both types over a `ScalarValue` trait so
//! applications can plug in their own scalar backend (`bigdecimal`, `bson`,
//! custom numeric types, ...). That generality is schema-construction
//! machinery, not part of the execution core this crate implements, so it
//! is collapsed here into one concrete enum covering the built-in GraphQL
//! scalars. A custom scalar is represented by whichever variant its
//! `serialize` function (held on the schema's `ScalarMeta`, see
//! `schema::meta`) produces.

use std::fmt;

/// A leaf scalar value, either as produced by a resolver before
/// `serialize` has run, or as the already-serialized output value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// A 32-bit signed integer, GraphQL's `Int`.
    Int(i32),
    /// A double-precision float, GraphQL's `Float`.
    Float(f64),
    /// A UTF-8 string, GraphQL's `String` and `ID`.
    String(String),
    /// A boolean, GraphQL's `Boolean`.
    Boolean(bool),
}

impl Scalar {
    /// Views this scalar as a `bool`, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Views this scalar as an `f64`, coercing `Int` (GraphQL allows `Int`
    /// literals in `Float` position).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(f64::from(*i)),
            _ => None,
        }
    }

    /// Views this scalar as an `i32`, if it is one.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Views this scalar as a `&str`, if it is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
