//! A standalone GraphQL execution engine: selection-set collection, field
//! resolution, value completion, and incremental delivery (`@defer`/
//! `@stream`), independent of any particular schema-construction or
//! transport layer.
//!
//! The crate does not parse queries or build schemas from Rust types --
//! both are treated as a collaborator's output (see the [`ast`] and
//! [`schema`] modules' docs). What it owns is everything from "I have a
//! parsed document, a frozen schema, and some root value" through to "here
//! is the response", including cooperative cancellation and the
//! incremental-delivery payload sequence.
//!
//! The single entry point is [`execute`]: build an [`ExecuteRequest`] and
//! await it to get back an [`ExecutionOutcome`].

#![warn(missing_docs)]

pub mod ast;
pub mod cancellation;
pub mod coercion;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod incremental;
pub mod operation;
pub mod path;
pub mod resolve;
pub mod schema;
mod trace;
pub mod value;

pub use cancellation::{Cancelled, CancellationToken};
pub use config::ExecutionConfig;
pub use error::{ExecutionError, ExecutionResult, FieldError, GraphQLError, SourceLocation};
pub use incremental::{
    CompletedEntry, IncrementalEntry, IncrementalPayload, PayloadStream, PendingEntry, RecordId,
};
pub use operation::{execute, ExecuteRequest, ExecutionOutcome, Response};
pub use path::{Path, PathElement, PathSegment};
pub use resolve::{Resolvable, Resolved};
pub use schema::{
    ArgumentMeta, EnumMeta, FieldMeta, InputObjectMeta, InterfaceType, IsTypeOfFn, MetaType,
    ObjectType, ScalarType, SchemaType, TypeRef, TypeResolverFn, TypeType, UnionType,
};
pub use value::{Object, Scalar, Value};
