//! The seam between the engine and application-provided runtime objects:
//! [`Resolvable`] is implemented by whatever Rust value backs a GraphQL
//! object type, and [`Resolved`] is what resolving one field produces
//! before value completion (§4.6) walks it into a [`Value`].
//!
//! Upstream `juniper` dispatches field resolution through
//! `GraphQLValueAsync::resolve_field_async`, generated per-type by its
//! derive macros over a `Registry`. Schema-construction codegen is out of
//! scope here (§1), so this crate exposes the same dispatch seam as a
//! plain object-safe trait that a collaborator implements directly (or
//! that a macro elsewhere could still generate into).

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::{error::ExecutionResult, value::Value};

/// What resolving one field produced, before value completion walks it
/// against the field's declared type (§4.6).
///
/// This collapses the design note's `Value = Direct | Future | Iter |
/// AsyncIter | Error` sum type (§9) into native `async`/`await`: a future
/// is just what you get from calling an `async fn`, so only the
/// *completed* shapes -- leaf, object, list -- need representing here.
pub enum Resolved<C> {
    /// Field resolved to `null`.
    Null,
    /// Field resolved to a raw scalar, to be serialized by the field's
    /// declared scalar type.
    Scalar(crate::value::Scalar),
    /// Field resolved to an enum value, by name.
    Enum(String),
    /// Field resolved to another object, interface, or union value.
    Object(std::sync::Arc<dyn Resolvable<C>>),
    /// Field resolved to a list of values.
    List(Vec<Resolved<C>>),
}

impl<C> Resolved<C> {
    /// Shorthand for wrapping an object-valued resolution.
    pub fn object(value: impl Resolvable<C> + 'static) -> Self {
        Self::Object(std::sync::Arc::new(value))
    }
}

/// A runtime value backing a GraphQL object, interface, or union type.
///
/// Implementors announce their own concrete GraphQL type name via
/// [`type_name`](Resolvable::type_name) -- the engine's fallback for
/// abstract-type resolution (§4.6) when the schema declares no
/// `type_resolver` -- and resolve their own fields via
/// [`resolve_field`](Resolvable::resolve_field).
#[async_trait]
pub trait Resolvable<C>: Send + Sync
where
    C: Send + Sync,
{
    /// This value's concrete GraphQL object type name.
    fn type_name(&self) -> &str;

    /// Resolves the field named `field_name`, given its already-coerced
    /// argument values (§4.3).
    async fn resolve_field(
        &self,
        field_name: &str,
        arguments: &IndexMap<String, Value>,
        ctx: &C,
    ) -> ExecutionResult<Resolved<C>>;
}
