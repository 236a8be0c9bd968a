//! The frozen schema data model: named types, fields, arguments, and the
//! root operation types.

pub mod meta;
pub mod model;

pub use meta::{
    ArgumentMeta, EnumMeta, FieldMeta, InputObjectMeta, InterfaceType, IsTypeOfFn, MetaType,
    ObjectType, ScalarType, TypeRef, TypeResolverFn, UnionType,
};
pub use model::{SchemaType, TypeType};
