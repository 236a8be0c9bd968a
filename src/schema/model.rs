//! The frozen schema: a registry of [`MetaType`]s plus the root operation
//! type names, closed over a resolver context type `C`.
//!
//! Building a [`SchemaType`] from Rust types -- what upstream `juniper`'s
//! `RootNode`/`Registry`/derive macros do -- is out of scope (§1). Tests and
//! callers construct one directly with [`SchemaType::new`] and
//! [`SchemaType::with_type`].

use indexmap::IndexMap;

use super::meta::{MetaType, ObjectType, TypeRef};

/// A type reference resolved against a schema's type registry: the same
/// shape as [`TypeRef`], but carrying a borrowed [`MetaType`] at the leaf
/// instead of a name, so value completion (§4.6) never needs a second
/// lookup.
pub enum TypeType<'a, C> {
    /// A named type, resolved to its metadata.
    Concrete(&'a MetaType<C>),
    /// A non-null wrapping of some other type.
    NonNull(Box<TypeType<'a, C>>),
    /// A list of some other type.
    List(Box<TypeType<'a, C>>),
}

impl<'a, C> TypeType<'a, C> {
    /// Whether this type is non-null at the top level.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Strips a single top-level `NonNull` wrapper, if present.
    pub fn unwrap_non_null(&self) -> &TypeType<'a, C> {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// The element type, if this is a `List`.
    pub fn list_contents(&self) -> Option<&TypeType<'a, C>> {
        match self {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// The concrete leaf metadata, stripping any `List`/`NonNull` wrappers.
    pub fn innermost_concrete(&self) -> &'a MetaType<C> {
        match self {
            Self::Concrete(t) => t,
            Self::NonNull(t) | Self::List(t) => t.innermost_concrete(),
        }
    }
}

/// A registry of every named type and the root operation type names, closed
/// over context type `C`.
pub struct SchemaType<C> {
    types: IndexMap<String, MetaType<C>>,
    query_type_name: String,
    mutation_type_name: Option<String>,
    subscription_type_name: Option<String>,
}

impl<C> SchemaType<C> {
    /// Starts building a schema rooted at the object type named
    /// `query_type_name`.
    pub fn new(query_type_name: impl Into<String>) -> Self {
        Self {
            types: IndexMap::new(),
            query_type_name: query_type_name.into(),
            mutation_type_name: None,
            subscription_type_name: None,
        }
    }

    /// Registers a named type.
    #[must_use]
    pub fn with_type(mut self, meta: MetaType<C>) -> Self {
        self.types.insert(meta.name().to_owned(), meta);
        self
    }

    /// Sets the root mutation object type's name.
    #[must_use]
    pub fn with_mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type_name = Some(name.into());
        self
    }

    /// Sets the root subscription object type's name.
    #[must_use]
    pub fn with_subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type_name = Some(name.into());
        self
    }

    /// Looks up a type by name.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType<C>> {
        self.types.get(name)
    }

    /// The root query object type.
    pub fn query_type(&self) -> &ObjectType<C> {
        match self.concrete_type_by_name(&self.query_type_name) {
            Some(MetaType::Object(o)) => o,
            _ => panic!("schema's query root type {:?} is not a registered object type", self.query_type_name),
        }
    }

    /// The root mutation object type, if this schema declares one.
    pub fn mutation_type(&self) -> Option<&ObjectType<C>> {
        let name = self.mutation_type_name.as_ref()?;
        match self.concrete_type_by_name(name) {
            Some(MetaType::Object(o)) => Some(o),
            _ => panic!("schema's mutation root type {name:?} is not a registered object type"),
        }
    }

    /// The root subscription object type, if this schema declares one.
    pub fn subscription_type(&self) -> Option<&ObjectType<C>> {
        let name = self.subscription_type_name.as_ref()?;
        match self.concrete_type_by_name(name) {
            Some(MetaType::Object(o)) => Some(o),
            _ => panic!("schema's subscription root type {name:?} is not a registered object type"),
        }
    }

    /// Whether `object_name` is a possible concrete type of the abstract
    /// (interface or union) type named `abstract_name`, per §4.6's
    /// "declared member of the abstract type" check.
    pub fn is_possible_type(&self, abstract_name: &str, object_name: &str) -> bool {
        match self.concrete_type_by_name(abstract_name) {
            Some(MetaType::Union(u)) => u.possible_types.iter().any(|n| n == object_name),
            Some(MetaType::Interface(_)) => match self.concrete_type_by_name(object_name) {
                Some(MetaType::Object(o)) => o.interfaces.iter().any(|n| n == abstract_name),
                _ => false,
            },
            _ => false,
        }
    }

    /// All object types that are possible concrete types of the abstract
    /// type named `abstract_name`.
    pub fn possible_types(&self, abstract_name: &str) -> Vec<&ObjectType<C>> {
        match self.concrete_type_by_name(abstract_name) {
            Some(MetaType::Union(u)) => u
                .possible_types
                .iter()
                .filter_map(|n| match self.concrete_type_by_name(n) {
                    Some(MetaType::Object(o)) => Some(o),
                    _ => None,
                })
                .collect(),
            Some(MetaType::Interface(_)) => self
                .types
                .values()
                .filter_map(|t| match t {
                    MetaType::Object(o) if o.interfaces.iter().any(|n| n == abstract_name) => {
                        Some(o)
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Resolves a [`TypeRef`] (as found on a [`FieldMeta`](super::meta::FieldMeta)
    /// or [`ArgumentMeta`](super::meta::ArgumentMeta)) against this
    /// registry.
    ///
    /// # Panics
    ///
    /// Panics if the referenced name is not registered; a schema with
    /// dangling type references is malformed, not a runtime condition
    /// produced by any document this crate executes.
    pub fn resolve_type_ref<'a>(&'a self, type_ref: &TypeRef) -> TypeType<'a, C> {
        match type_ref {
            TypeRef::Named(name) => TypeType::Concrete(
                self.concrete_type_by_name(name)
                    .unwrap_or_else(|| panic!("schema has no type named {name:?}")),
            ),
            TypeRef::List(inner) => TypeType::List(Box::new(self.resolve_type_ref(inner))),
            TypeRef::NonNull(inner) => TypeType::NonNull(Box::new(self.resolve_type_ref(inner))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::meta::{EnumMeta, FieldMeta, InterfaceType, UnionType};

    struct Ctx;

    fn test_schema() -> SchemaType<Ctx> {
        SchemaType::new("Query")
            .with_type(MetaType::Interface(InterfaceType::new("Node").field(
                FieldMeta::new("id", TypeRef::named("ID").non_null()),
            )))
            .with_type(MetaType::Object(
                ObjectType::new("User")
                    .field(FieldMeta::new("id", TypeRef::named("ID").non_null()))
                    .implements("Node"),
            ))
            .with_type(MetaType::Object(
                ObjectType::new("Bot")
                    .field(FieldMeta::new("id", TypeRef::named("ID").non_null()))
                    .implements("Node"),
            ))
            .with_type(MetaType::Union(UnionType::new(
                "SearchResult",
                vec!["User".into(), "Bot".into()],
            )))
            .with_type(MetaType::Enum(EnumMeta {
                name: "Role".into(),
                values: vec!["ADMIN".into(), "MEMBER".into()],
            }))
            .with_type(MetaType::Object(ObjectType::new("Query")))
    }

    #[test]
    fn interface_possible_types_are_declared_implementers() {
        let schema = test_schema();
        assert!(schema.is_possible_type("Node", "User"));
        assert!(schema.is_possible_type("Node", "Bot"));
        assert!(!schema.is_possible_type("Node", "Query"));
    }

    #[test]
    fn union_possible_types_are_listed_members() {
        let schema = test_schema();
        assert!(schema.is_possible_type("SearchResult", "User"));
        assert!(!schema.is_possible_type("SearchResult", "Query"));
        assert_eq!(schema.possible_types("SearchResult").len(), 2);
    }

    #[test]
    fn resolves_nested_list_and_non_null_type_refs() {
        let schema = test_schema();
        let type_ref = TypeRef::named("User").non_null().list();
        let resolved = schema.resolve_type_ref(&type_ref);
        assert!(!resolved.is_non_null());
        let inner = resolved.list_contents().expect("expected list");
        assert!(inner.is_non_null());
        assert_eq!(inner.innermost_concrete().name(), "User");
    }
}
