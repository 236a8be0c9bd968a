//! The selection-set collector (§4.4): flattens fragment spreads and inline
//! fragments into a single ordered grouped field set, merging same
//! response-key fields, applying `@skip`/`@include`, and pulling
//! `@defer`-marked fragments out into their own deferred groups instead of
//! executing them inline.

use std::collections::HashMap;

use fnv::FnvHashSet;
use indexmap::IndexMap;

use crate::{
    ast::{self, Directive, Selection},
    error::FieldError,
    schema::SchemaType,
    value::Value,
};

/// Response-key -> the (possibly several, to-be-merged) field nodes
/// selecting it, in first-seen order (§3: "response-key order in output
/// mirrors insertion order in the grouped field set").
pub type GroupedFieldSet = IndexMap<String, Vec<ast::Field>>;

/// A fragment (named or inline) pulled out of the immediate grouped field
/// set by an enabled `@defer`, to be collected and executed later as its
/// own incremental record (§4.8).
#[derive(Clone, Debug)]
pub struct DeferredFragment {
    /// The `label` argument of the `@defer`, if given.
    pub label: Option<String>,
    /// The type condition under which this fragment's fields apply, for
    /// re-checking once the concrete runtime type is known.
    pub type_condition: Option<String>,
    /// The fragment's own selection set, not yet collected.
    pub selection_set: Vec<Selection>,
}

/// The result of collecting one selection set: fields to execute now, plus
/// any fragments deferred out of it.
#[derive(Clone, Debug, Default)]
pub struct CollectedSelection {
    /// Fields to execute as part of the current (parent) incremental
    /// record.
    pub grouped_field_set: GroupedFieldSet,
    /// Fragments deferred to their own incremental records.
    pub deferred: Vec<DeferredFragment>,
}

/// Collects a selection set against the concrete runtime object type named
/// `object_type_name`, per §4.4.
///
/// `visited_fragments` accumulates fragment-spread names already expanded
/// along the current path, breaking the cycles a (self-)recursive fragment
/// definition would otherwise cause (§4.4 edge case, §9 design note).
pub fn collect_fields<C>(
    schema: &SchemaType<C>,
    document: &ast::Document,
    object_type_name: &str,
    selection_set: &[Selection],
    variables: &HashMap<String, Value>,
    visited_fragments: &mut FnvHashSet<String>,
) -> Result<CollectedSelection, FieldError> {
    let mut collected = CollectedSelection::default();
    collect_into(
        schema,
        document,
        object_type_name,
        selection_set,
        variables,
        visited_fragments,
        &mut collected,
    )?;
    Ok(collected)
}

fn collect_into<C>(
    schema: &SchemaType<C>,
    document: &ast::Document,
    object_type_name: &str,
    selection_set: &[Selection],
    variables: &HashMap<String, Value>,
    visited_fragments: &mut FnvHashSet<String>,
    collected: &mut CollectedSelection,
) -> Result<(), FieldError> {
    for selection in selection_set {
        if directive_skips(selection.directives(), variables)? {
            continue;
        }

        match selection {
            Selection::Field(field) => {
                collected
                    .grouped_field_set
                    .entry(field.response_key().to_owned())
                    .or_default()
                    .push(field.clone());
            }
            Selection::FragmentSpread(spread) => {
                if let Some(label) = deferred_label(&spread.directives, variables)? {
                    let Some(fragment) = document.fragments.get(&spread.name) else {
                        return Err(FieldError::wrap(format!(
                            "Unknown fragment \"{}\".",
                            spread.name
                        )));
                    };
                    if fragment_applies(schema, &fragment.type_condition, object_type_name) {
                        collected.deferred.push(DeferredFragment {
                            label,
                            type_condition: Some(fragment.type_condition.clone()),
                            selection_set: fragment.selection_set.clone(),
                        });
                    }
                    continue;
                }

                if visited_fragments.contains(&spread.name) {
                    continue;
                }
                visited_fragments.insert(spread.name.clone());

                let Some(fragment) = document.fragments.get(&spread.name) else {
                    return Err(FieldError::wrap(format!(
                        "Unknown fragment \"{}\".",
                        spread.name
                    )));
                };
                if !fragment_applies(schema, &fragment.type_condition, object_type_name) {
                    continue;
                }
                collect_into(
                    schema,
                    document,
                    object_type_name,
                    &fragment.selection_set,
                    variables,
                    visited_fragments,
                    collected,
                )?;
            }
            Selection::InlineFragment(inline) => {
                if let Some(label) = deferred_label(&inline.directives, variables)? {
                    let applies = match &inline.type_condition {
                        Some(cond) => fragment_applies(schema, cond, object_type_name),
                        None => true,
                    };
                    if applies {
                        collected.deferred.push(DeferredFragment {
                            label,
                            type_condition: inline.type_condition.clone(),
                            selection_set: inline.selection_set.clone(),
                        });
                    }
                    continue;
                }

                if let Some(cond) = &inline.type_condition {
                    if !fragment_applies(schema, cond, object_type_name) {
                        continue;
                    }
                }
                collect_into(
                    schema,
                    document,
                    object_type_name,
                    &inline.selection_set,
                    variables,
                    visited_fragments,
                    collected,
                )?;
            }
        }
    }
    Ok(())
}

/// Whether a fragment's type condition applies to the concrete runtime
/// type named `object_type_name`: the condition names that type directly,
/// or names an interface/union of which it is a possible type.
fn fragment_applies<C>(schema: &SchemaType<C>, type_condition: &str, object_type_name: &str) -> bool {
    type_condition == object_type_name || schema.is_possible_type(type_condition, object_type_name)
}

/// Evaluates `@skip(if: ...)` / `@include(if: ...)` on a selection's
/// directives, per §4.4: `@skip(if: true)` or `@include(if: false)` drops
/// the selection entirely.
fn directive_skips(
    directives: &[Directive],
    variables: &HashMap<String, Value>,
) -> Result<bool, FieldError> {
    for directive in directives {
        match directive.name.as_str() {
            "skip" => {
                if bool_argument(directive, variables)? {
                    return Ok(true);
                }
            }
            "include" => {
                if !bool_argument(directive, variables)? {
                    return Ok(true);
                }
            }
            _ => {}
        }
    }
    Ok(false)
}

/// If `@defer` is present and its `if` argument (default `true`) evaluates
/// truthy, the resolved `label` argument (or `None` if not given).
fn deferred_label(
    directives: &[Directive],
    variables: &HashMap<String, Value>,
) -> Result<Option<Option<String>>, FieldError> {
    let Some(defer) = directives.iter().find(|d| d.name == "defer") else {
        return Ok(None);
    };
    let enabled = match defer.argument("if") {
        Some(value) => resolve_bool(value, variables)?,
        None => true,
    };
    if !enabled {
        return Ok(None);
    }
    let label = match defer.argument("label") {
        Some(ast::InputValue::Scalar(crate::value::Scalar::String(s))) => Some(s.clone()),
        Some(ast::InputValue::Variable(name)) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::String(s))) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    };
    Ok(Some(label))
}

fn bool_argument(
    directive: &Directive,
    variables: &HashMap<String, Value>,
) -> Result<bool, FieldError> {
    let value = directive.argument("if").ok_or_else(|| {
        FieldError::wrap(format!("Directive \"@{}\" requires an \"if\" argument.", directive.name))
    })?;
    resolve_bool(value, variables)
}

fn resolve_bool(value: &ast::InputValue, variables: &HashMap<String, Value>) -> Result<bool, FieldError> {
    match value {
        ast::InputValue::Scalar(crate::value::Scalar::Boolean(b)) => Ok(*b),
        ast::InputValue::Variable(name) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::Boolean(b))) => Ok(*b),
            _ => Err(FieldError::wrap(format!(
                "Variable \"${name}\" must be a Boolean."
            ))),
        },
        other => Err(FieldError::wrap(format!(
            "Expected a Boolean value, found {other:?}."
        ))),
    }
}

/// Whether any selection in `@stream`-eligible position on `field` carries
/// an enabled `@stream`, and if so, its `initialCount`/`label` arguments.
///
/// `default_initial_count` (from [`crate::config::ExecutionConfig`]) fills
/// in `initialCount` when the directive omits the argument entirely.
pub fn stream_directive(
    field: &ast::Field,
    variables: &HashMap<String, Value>,
    default_initial_count: usize,
) -> Result<Option<StreamArgs>, FieldError> {
    let Some(stream) = field.directives.iter().find(|d| d.name == "stream") else {
        return Ok(None);
    };
    let enabled = match stream.argument("if") {
        Some(value) => resolve_bool(value, variables)?,
        None => true,
    };
    if !enabled {
        return Ok(None);
    }
    let initial_count = match stream.argument("initialCount") {
        Some(ast::InputValue::Scalar(crate::value::Scalar::Int(i))) => non_negative_initial_count(*i)?,
        Some(ast::InputValue::Variable(name)) => match variables.get(name) {
            Some(Value::Scalar(crate::value::Scalar::Int(i))) => non_negative_initial_count(*i)?,
            _ => default_initial_count,
        },
        _ => default_initial_count,
    };
    let label = match stream.argument("label") {
        Some(ast::InputValue::Scalar(crate::value::Scalar::String(s))) => Some(s.clone()),
        _ => None,
    };
    Ok(Some(StreamArgs { initial_count, label }))
}

/// Rejects a negative `initialCount`: per §4.8, this is a field error
/// rather than a value to clamp, since a negative count most likely
/// signals a caller mistake the response should surface.
fn non_negative_initial_count(i: i32) -> Result<usize, FieldError> {
    if i < 0 {
        Err(FieldError::wrap("initialCount must not be negative."))
    } else {
        Ok(i as usize)
    }
}

/// The resolved arguments of an enabled `@stream` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamArgs {
    /// Number of leading list items to include in the initial payload.
    pub initial_count: usize,
    /// The directive's `label` argument, if given.
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MetaType, ObjectType};

    struct Ctx;

    fn schema() -> SchemaType<Ctx> {
        SchemaType::new("Query").with_type(MetaType::Object(ObjectType::new("Query")))
    }

    fn field(name: &str) -> ast::Field {
        ast::Field {
            alias: None,
            name: name.to_owned(),
            arguments: vec![],
            directives: vec![],
            selection_set: vec![],
            location: Default::default(),
        }
    }

    #[test]
    fn merges_fields_sharing_a_response_key() {
        let schema = schema();
        let document = ast::Document::default();
        let selection_set = vec![
            Selection::Field(field("name")),
            Selection::Field(field("name")),
        ];
        let collected = collect_fields(
            &schema,
            &document,
            "Query",
            &selection_set,
            &HashMap::new(),
            &mut FnvHashSet::default(),
        )
        .unwrap();
        assert_eq!(collected.grouped_field_set["name"].len(), 2);
    }

    #[test]
    fn skip_true_drops_the_field() {
        let schema = schema();
        let document = ast::Document::default();
        let mut f = field("name");
        f.directives.push(Directive {
            name: "skip".into(),
            arguments: vec![ast::Argument {
                name: "if".into(),
                value: ast::InputValue::Scalar(crate::value::Scalar::Boolean(true)),
            }],
        });
        let selection_set = vec![Selection::Field(f)];
        let collected = collect_fields(
            &schema,
            &document,
            "Query",
            &selection_set,
            &HashMap::new(),
            &mut FnvHashSet::default(),
        )
        .unwrap();
        assert!(collected.grouped_field_set.is_empty());
    }

    #[test]
    fn deferred_inline_fragment_is_pulled_out_of_grouped_field_set() {
        let schema = schema();
        let document = ast::Document::default();
        let inline = ast::InlineFragment {
            type_condition: None,
            directives: vec![Directive {
                name: "defer".into(),
                arguments: vec![ast::Argument {
                    name: "label".into(),
                    value: ast::InputValue::Scalar(crate::value::Scalar::String("slow".into())),
                }],
            }],
            selection_set: vec![Selection::Field(field("slowField"))],
            location: Default::default(),
        };
        let selection_set = vec![
            Selection::Field(field("fastField")),
            Selection::InlineFragment(inline),
        ];
        let collected = collect_fields(
            &schema,
            &document,
            "Query",
            &selection_set,
            &HashMap::new(),
            &mut FnvHashSet::default(),
        )
        .unwrap();
        assert!(collected.grouped_field_set.contains_key("fastField"));
        assert!(!collected.grouped_field_set.contains_key("slowField"));
        assert_eq!(collected.deferred.len(), 1);
        assert_eq!(collected.deferred[0].label.as_deref(), Some("slow"));
    }

    #[test]
    fn negative_initial_count_is_a_field_error() {
        let mut f = field("items");
        f.directives.push(Directive {
            name: "stream".into(),
            arguments: vec![ast::Argument {
                name: "initialCount".into(),
                value: ast::InputValue::Scalar(crate::value::Scalar::Int(-1)),
            }],
        });
        let err = stream_directive(&f, &HashMap::new(), 0).unwrap_err();
        assert!(err.message().contains("initialCount"));
    }

    #[test]
    fn fragment_cycle_does_not_recurse_forever() {
        let schema = schema();
        let mut document = ast::Document::default();
        document.fragments.insert(
            "Cyclic".into(),
            ast::Fragment {
                name: "Cyclic".into(),
                type_condition: "Query".into(),
                directives: vec![],
                selection_set: vec![Selection::FragmentSpread(ast::FragmentSpread {
                    name: "Cyclic".into(),
                    directives: vec![],
                    location: Default::default(),
                })],
            },
        );
        let selection_set = vec![Selection::FragmentSpread(ast::FragmentSpread {
            name: "Cyclic".into(),
            directives: vec![],
            location: Default::default(),
        })];
        let collected = collect_fields(
            &schema,
            &document,
            "Query",
            &selection_set,
            &HashMap::new(),
            &mut FnvHashSet::default(),
        )
        .unwrap();
        assert!(collected.grouped_field_set.is_empty());
    }
}
