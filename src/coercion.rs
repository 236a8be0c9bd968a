//! Value coercion (§4.3): turning the raw external variable values and the
//! literal/variable argument expressions written in a document into the
//! final [`Value`]s a resolver sees.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{
    ast::{self, InputValue},
    error::GraphQLError,
    schema::{meta::ArgumentMeta, model::TypeType, MetaType, SchemaType},
    value::Value,
};

/// Converts a document-level [`ast::Type`] reference into a schema-level
/// [`crate::schema::TypeRef`].
pub fn ast_type_to_type_ref(t: &ast::Type) -> crate::schema::TypeRef {
    use crate::schema::TypeRef;
    match t {
        ast::Type::Named(n) => TypeRef::Named(n.clone()),
        ast::Type::List(inner) => TypeRef::List(Box::new(ast_type_to_type_ref(inner))),
        ast::Type::NonNull(inner) => TypeRef::NonNull(Box::new(ast_type_to_type_ref(inner))),
    }
}

/// Coerces the raw (e.g. deserialized-JSON) `variableValues` supplied with
/// a request against an operation's declared variables, applying defaults
/// and validating required/non-null variables, per §4.3's "Variables"
/// bullet.
///
/// The returned map contains only variables that were *provided* (supplied
/// explicitly or defaulted); an absent, nullable, default-less variable is
/// simply not a key in the map, which callers must distinguish from an
/// explicitly-`null` value when later resolving default-value fallback for
/// arguments.
pub fn coerce_variable_values<C>(
    schema: &SchemaType<C>,
    variable_definitions: &[ast::VariableDefinition],
    raw_values: &serde_json::Map<String, serde_json::Value>,
) -> Result<HashMap<String, Value>, GraphQLError> {
    let mut coerced = HashMap::with_capacity(variable_definitions.len());
    for def in variable_definitions {
        let type_ref = ast_type_to_type_ref(&def.var_type);
        let type_type = schema.resolve_type_ref(&type_ref);

        match raw_values.get(&def.name) {
            None => {
                if let Some(default) = &def.default_value {
                    let value = coerce_input_literal(schema, &type_type, default, &HashMap::new())
                        .map_err(|e| GraphQLError::InvalidVariableValue(def.name.clone(), e))?;
                    coerced.insert(def.name.clone(), value);
                } else if type_type.is_non_null() {
                    return Err(GraphQLError::InvalidVariableValue(
                        def.name.clone(),
                        "of required type was not provided.".to_owned(),
                    ));
                }
            }
            Some(serde_json::Value::Null) => {
                if type_type.is_non_null() {
                    return Err(GraphQLError::InvalidVariableValue(
                        def.name.clone(),
                        "must not be null.".to_owned(),
                    ));
                }
                coerced.insert(def.name.clone(), Value::Null);
            }
            Some(raw) => {
                let value = coerce_raw_value(schema, &type_type, raw)
                    .map_err(|e| GraphQLError::InvalidVariableValue(def.name.clone(), e))?;
                coerced.insert(def.name.clone(), value);
            }
        }
    }
    Ok(coerced)
}

/// Coerces a raw external value (as supplied for a variable) against a
/// resolved schema type.
fn coerce_raw_value<C>(
    schema: &SchemaType<C>,
    type_type: &TypeType<'_, C>,
    raw: &serde_json::Value,
) -> Result<Value, String> {
    match type_type {
        TypeType::NonNull(inner) => {
            if raw.is_null() {
                return Err("must not be null.".to_owned());
            }
            coerce_raw_value(schema, inner, raw)
        }
        TypeType::List(inner) => {
            if raw.is_null() {
                return Ok(Value::Null);
            }
            if let serde_json::Value::Array(items) = raw {
                let values = items
                    .iter()
                    .map(|item| coerce_raw_value(schema, inner, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            } else {
                Ok(Value::List(vec![coerce_raw_value(schema, inner, raw)?]))
            }
        }
        TypeType::Concrete(meta) => coerce_raw_concrete(schema, meta, raw),
    }
}

fn coerce_raw_concrete<C>(
    schema: &SchemaType<C>,
    meta: &MetaType<C>,
    raw: &serde_json::Value,
) -> Result<Value, String> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match meta {
        MetaType::Scalar(s) => (s.parse_value)(raw).map(Value::from),
        MetaType::Enum(e) => match raw {
            serde_json::Value::String(name) if e.contains(name) => Ok(Value::from(name.clone())),
            other => Err(format!("{} is not a valid value for enum {}", other, e.name)),
        },
        MetaType::InputObject(io) => {
            let serde_json::Value::Object(raw_fields) = raw else {
                return Err(format!("Expected input object {}, found {raw}", io.name));
            };
            let mut fields = IndexMap::with_capacity(io.fields.len());
            for (name, field_meta) in &io.fields {
                let field_type = schema.resolve_type_ref(&field_meta.arg_type);
                match raw_fields.get(name) {
                    None => {
                        if let Some(default) = &field_meta.default_value {
                            let value =
                                coerce_input_literal(schema, &field_type, default, &HashMap::new())?;
                            fields.insert(name.clone(), value);
                        } else if field_type.is_non_null() {
                            return Err(format!(
                                "Field {}.{name} of required type was not provided.",
                                io.name
                            ));
                        }
                    }
                    Some(raw_field) => {
                        fields.insert(name.clone(), coerce_raw_value(schema, &field_type, raw_field)?);
                    }
                }
            }
            Ok(Value::Object(fields.into_iter().collect()))
        }
        other => Err(format!("{} is not an input type", other.name())),
    }
}

/// Coerces a document-literal [`InputValue`] (an argument value, default
/// value, or a value nested within one) against a resolved schema type,
/// resolving any `Variable` references against `variables`.
pub fn coerce_input_literal<C>(
    schema: &SchemaType<C>,
    type_type: &TypeType<'_, C>,
    literal: &InputValue,
    variables: &HashMap<String, Value>,
) -> Result<Value, String> {
    if let InputValue::Variable(name) = literal {
        return match variables.get(name) {
            Some(value) => Ok(value.clone()),
            None if type_type.is_non_null() => {
                Err(format!("Variable \"${name}\" of required type was not provided."))
            }
            None => Ok(Value::Null),
        };
    }

    match type_type {
        TypeType::NonNull(inner) => {
            if matches!(literal, InputValue::Null) {
                return Err("must not be null.".to_owned());
            }
            coerce_input_literal(schema, inner, literal, variables)
        }
        TypeType::List(inner) => match literal {
            InputValue::Null => Ok(Value::Null),
            InputValue::List(items) => {
                let values = items
                    .iter()
                    .map(|item| coerce_input_literal(schema, inner, item, variables))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            other => Ok(Value::List(vec![coerce_input_literal(
                schema, inner, other, variables,
            )?])),
        },
        TypeType::Concrete(meta) => coerce_literal_concrete(schema, meta, literal, variables),
    }
}

fn coerce_literal_concrete<C>(
    schema: &SchemaType<C>,
    meta: &MetaType<C>,
    literal: &InputValue,
    variables: &HashMap<String, Value>,
) -> Result<Value, String> {
    if matches!(literal, InputValue::Null) {
        return Ok(Value::Null);
    }
    match meta {
        MetaType::Scalar(s) => (s.parse_literal)(literal).map(Value::from),
        MetaType::Enum(e) => match literal {
            InputValue::Enum(name) if e.contains(name) => Ok(Value::from(name.clone())),
            other => Err(format!("{other:?} is not a valid value for enum {}", e.name)),
        },
        MetaType::InputObject(io) => {
            let InputValue::Object(raw_fields) = literal else {
                return Err(format!("Expected input object {}, found {literal:?}", io.name));
            };
            let mut fields = IndexMap::with_capacity(io.fields.len());
            for (name, field_meta) in &io.fields {
                let field_type = schema.resolve_type_ref(&field_meta.arg_type);
                match raw_fields.get(name) {
                    None => {
                        if let Some(default) = &field_meta.default_value {
                            let value = coerce_input_literal(schema, &field_type, default, variables)?;
                            fields.insert(name.clone(), value);
                        } else if field_type.is_non_null() {
                            return Err(format!(
                                "Field {}.{name} of required type was not provided.",
                                io.name
                            ));
                        }
                    }
                    Some(raw_field) => {
                        fields.insert(
                            name.clone(),
                            coerce_input_literal(schema, &field_type, raw_field, variables)?,
                        );
                    }
                }
            }
            Ok(Value::Object(fields.into_iter().collect()))
        }
        other => Err(format!("{} is not an input type", other.name())),
    }
}

/// Coerces a field or directive's declared [`ArgumentMeta`]s against the
/// arguments as written in the document, per GraphQL's `CoerceArgumentValues`
/// algorithm: a variable reference defers to `variables`, an absent
/// argument falls back to its default, and an absent-with-no-default
/// nullable argument is simply omitted from the result (a resolver sees no
/// entry, not an explicit `null`). A non-null argument whose referenced
/// variable is present but holds `null` is rejected outright (§4.3) -- only
/// an *absent* variable falls back to the argument's default.
pub fn coerce_argument_values<C>(
    schema: &SchemaType<C>,
    declared: &[ArgumentMeta],
    provided: &[ast::Argument],
    variables: &HashMap<String, Value>,
) -> Result<IndexMap<String, Value>, String> {
    let mut coerced = IndexMap::with_capacity(declared.len());
    for arg_meta in declared {
        let type_ref = &arg_meta.arg_type;
        let type_type = schema.resolve_type_ref(type_ref);
        let written = provided.iter().find(|a| a.name == arg_meta.name);

        let resolved = match written {
            None => default_or_absent(schema, &type_type, arg_meta, variables)?,
            Some(arg) => match &arg.value {
                InputValue::Variable(vname) => match variables.get(vname) {
                    Some(Value::Null) if type_type.is_non_null() => {
                        return Err(format!("Argument \"{}\" must not be null.", arg_meta.name));
                    }
                    Some(value) => Some(value.clone()),
                    None => default_or_absent(schema, &type_type, arg_meta, variables)?,
                },
                literal => Some(
                    coerce_input_literal(schema, &type_type, literal, variables)
                        .map_err(|e| format!("Argument \"{}\": {e}", arg_meta.name))?,
                ),
            },
        };

        if let Some(value) = resolved {
            coerced.insert(arg_meta.name.clone(), value);
        }
    }
    Ok(coerced)
}

fn default_or_absent<C>(
    schema: &SchemaType<C>,
    type_type: &TypeType<'_, C>,
    arg_meta: &ArgumentMeta,
    variables: &HashMap<String, Value>,
) -> Result<Option<Value>, String> {
    if let Some(default) = &arg_meta.default_value {
        coerce_input_literal(schema, type_type, default, variables)
            .map(Some)
            .map_err(|e| format!("Argument \"{}\": {e}", arg_meta.name))
    } else if type_type.is_non_null() {
        Err(format!(
            "Argument \"{}\" of required type \"{}\" was not provided.",
            arg_meta.name, arg_meta.arg_type
        ))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldMeta, InputObjectMeta, ObjectType, ScalarType, TypeRef};

    struct Ctx;

    fn schema() -> SchemaType<Ctx> {
        SchemaType::new("Query")
            .with_type(MetaType::Scalar(ScalarType::int()))
            .with_type(MetaType::Scalar(ScalarType::string()))
            .with_type(MetaType::InputObject(InputObjectMeta {
                name: "PointInput".into(),
                fields: [
                    ("x".to_owned(), ArgumentMeta::new("x", TypeRef::named("Int").non_null())),
                    (
                        "y".to_owned(),
                        ArgumentMeta::new("y", TypeRef::named("Int").non_null())
                            .with_default(InputValue::Scalar(crate::value::Scalar::Int(0))),
                    ),
                ]
                .into_iter()
                .collect(),
            }))
            .with_type(MetaType::Object(ObjectType::new("Query")))
    }

    fn field(arguments: Vec<ArgumentMeta>) -> FieldMeta {
        let mut meta = FieldMeta::new("f", TypeRef::named("Int"));
        meta.arguments = arguments;
        meta
    }

    #[test]
    fn variable_coercion_applies_declared_default() {
        let schema = schema();
        let defs = vec![ast::VariableDefinition {
            name: "limit".into(),
            var_type: ast::Type::Named("Int".into()),
            default_value: Some(InputValue::Scalar(crate::value::Scalar::Int(10))),
        }];
        let raw = serde_json::Map::new();
        let coerced = coerce_variable_values(&schema, &defs, &raw).unwrap();
        assert_eq!(coerced.get("limit"), Some(&Value::from(10)));
    }

    #[test]
    fn variable_coercion_rejects_missing_required_variable() {
        let schema = schema();
        let defs = vec![ast::VariableDefinition {
            name: "id".into(),
            var_type: ast::Type::NonNull(Box::new(ast::Type::Named("Int".into()))),
            default_value: None,
        }];
        let raw = serde_json::Map::new();
        assert!(coerce_variable_values(&schema, &defs, &raw).is_err());
    }

    #[test]
    fn argument_coercion_falls_back_to_declared_default_when_absent() {
        let schema = schema();
        let declared = vec![ArgumentMeta::new("limit", TypeRef::named("Int"))
            .with_default(InputValue::Scalar(crate::value::Scalar::Int(5)))];
        let _ = field(declared.clone());
        let coerced =
            coerce_argument_values(&schema, &declared, &[], &HashMap::new()).unwrap();
        assert_eq!(coerced.get("limit"), Some(&Value::from(5)));
    }

    #[test]
    fn argument_coercion_omits_absent_nullable_argument_with_no_default() {
        let schema = schema();
        let declared = vec![ArgumentMeta::new("limit", TypeRef::named("Int"))];
        let coerced =
            coerce_argument_values(&schema, &declared, &[], &HashMap::new()).unwrap();
        assert!(!coerced.contains_key("limit"));
    }

    #[test]
    fn argument_coercion_resolves_variable_reference() {
        let schema = schema();
        let declared = vec![ArgumentMeta::new("limit", TypeRef::named("Int").non_null())];
        let provided = vec![ast::Argument {
            name: "limit".into(),
            value: InputValue::Variable("lim".into()),
        }];
        let mut variables = HashMap::new();
        variables.insert("lim".to_owned(), Value::from(3));
        let coerced = coerce_argument_values(&schema, &declared, &provided, &variables).unwrap();
        assert_eq!(coerced.get("limit"), Some(&Value::from(3)));
    }

    #[test]
    fn argument_coercion_rejects_a_non_null_argument_whose_variable_is_present_but_null() {
        let schema = schema();
        let declared = vec![ArgumentMeta::new("limit", TypeRef::named("Int").non_null())];
        let provided = vec![ast::Argument {
            name: "limit".into(),
            value: InputValue::Variable("lim".into()),
        }];
        let mut variables = HashMap::new();
        variables.insert("lim".to_owned(), Value::Null);
        assert!(coerce_argument_values(&schema, &declared, &provided, &variables).is_err());
    }

    #[test]
    fn argument_coercion_accepts_a_nullable_argument_whose_variable_is_present_but_null() {
        let schema = schema();
        let declared = vec![ArgumentMeta::new("limit", TypeRef::named("Int"))];
        let provided = vec![ast::Argument {
            name: "limit".into(),
            value: InputValue::Variable("lim".into()),
        }];
        let mut variables = HashMap::new();
        variables.insert("lim".to_owned(), Value::Null);
        let coerced = coerce_argument_values(&schema, &declared, &provided, &variables).unwrap();
        assert_eq!(coerced.get("limit"), Some(&Value::Null));
    }

    #[test]
    fn input_object_coercion_applies_nested_field_default() {
        let schema = schema();
        let type_type = schema.resolve_type_ref(&TypeRef::named("PointInput").non_null());
        let mut obj_fields = IndexMap::new();
        obj_fields.insert("x".to_owned(), InputValue::Scalar(crate::value::Scalar::Int(1)));
        let literal = InputValue::Object(obj_fields);
        let coerced =
            coerce_input_literal(&schema, &type_type, &literal, &HashMap::new()).unwrap();
        let obj = coerced.into_object().unwrap();
        assert_eq!(obj.get_field_value("x"), Some(&Value::from(1)));
        assert_eq!(obj.get_field_value("y"), Some(&Value::from(0)));
    }
}
