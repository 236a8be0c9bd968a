//! The field executor (§4.5) and value completion (§4.6): walks a grouped
//! field set against a resolved runtime object, dispatching each field to
//! its [`Resolvable`] implementation and completing the result against the
//! field's declared type, including `@defer`/`@stream` scheduling and
//! non-null error propagation.

use std::{collections::HashMap, sync::Arc};

use fnv::FnvHashSet;
use futures::future::join_all;

use crate::{
    ast,
    cancellation::CancellationToken,
    collector::{collect_fields, stream_directive, DeferredFragment, GroupedFieldSet},
    coercion::coerce_argument_values,
    config::ExecutionConfig,
    error::{ExecutionError, FieldError},
    incremental::{Coordinator, PendingEntry},
    path::{Path, PathElement, PathSegment},
    resolve::{Resolvable, Resolved},
    schema::{
        model::TypeType, ArgumentMeta, FieldMeta, MetaType, ScalarType, SchemaType, TypeRef,
    },
    value::{Object, Scalar, Value},
};

/// Everything field execution needs, cheaply [`Clone`]-able (every field is
/// an [`Arc`]) so a `@defer`/`@stream` continuation can be handed to
/// [`tokio::spawn`] and keep running after the synchronous response has
/// been handed back to the caller.
pub struct ExecutionContext<C> {
    /// The frozen schema being executed against.
    pub schema: Arc<SchemaType<C>>,
    /// The document the current operation was selected from (fragments
    /// live here).
    pub document: Arc<ast::Document>,
    /// The operation's coerced variable values.
    pub variables: Arc<HashMap<String, Value>>,
    /// The application-supplied per-request context, passed to every
    /// resolver call.
    pub app_context: Arc<C>,
    /// Append-only collector for every [`ExecutionError`] raised anywhere
    /// in this operation.
    pub errors: Arc<std::sync::Mutex<Vec<ExecutionError>>>,
    /// Races every suspension point against cooperative cancellation.
    pub cancellation: CancellationToken,
    /// Schedules and tracks `@defer`/`@stream` records.
    pub coordinator: Arc<Coordinator>,
    /// Execution-wide policy knobs.
    pub config: Arc<ExecutionConfig>,
    /// Records newly begun in the current synchronous/background pass, to
    /// be bundled into whichever payload that pass emits (the initial
    /// payload for the root pass, or a record's own completion payload for
    /// a `@defer`/`@stream` continuation).
    pending: Arc<std::sync::Mutex<Vec<PendingEntry>>>,
}

impl<C> Clone for ExecutionContext<C> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            document: self.document.clone(),
            variables: self.variables.clone(),
            app_context: self.app_context.clone(),
            errors: self.errors.clone(),
            cancellation: self.cancellation.clone(),
            coordinator: self.coordinator.clone(),
            config: self.config.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<C> ExecutionContext<C>
where
    C: Send + Sync + 'static,
{
    /// Constructs a fresh execution context for a new operation.
    pub fn new(
        schema: Arc<SchemaType<C>>,
        document: Arc<ast::Document>,
        variables: Arc<HashMap<String, Value>>,
        app_context: Arc<C>,
        cancellation: CancellationToken,
        coordinator: Arc<Coordinator>,
        config: Arc<ExecutionConfig>,
    ) -> Self {
        Self {
            schema,
            document,
            variables,
            app_context,
            errors: Arc::new(std::sync::Mutex::new(Vec::new())),
            cancellation,
            coordinator,
            config,
            pending: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// A clone of this context scoped to a fresh pass: shares everything
    /// except [`pending`](Self::pending), which starts empty so the caller
    /// can attribute newly-begun records to exactly this pass.
    fn fresh_pass(&self) -> Self {
        Self {
            pending: Arc::new(std::sync::Mutex::new(Vec::new())),
            ..self.clone()
        }
    }

    fn take_pending(&self) -> Vec<PendingEntry> {
        std::mem::take(&mut self.pending.lock().unwrap())
    }

    /// Number of records registered so far in this pass, usable as a
    /// watermark with [`drain_pending_since`](Self::drain_pending_since).
    fn pending_watermark(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Removes and returns every record registered since `watermark`,
    /// leaving earlier ones untouched. Used to isolate exactly the records a
    /// failing subtree (a list item, a streamed head item) scheduled, so
    /// they can be filtered without disturbing sibling records already
    /// registered by the same pass (§4.8 "Filtering").
    fn drain_pending_since(&self, watermark: usize) -> Vec<PendingEntry> {
        let mut guard = self.pending.lock().unwrap();
        guard.split_off(watermark.min(guard.len()))
    }

    fn record_error(&self, path: &Arc<Path>, error: FieldError) {
        self.errors
            .lock()
            .unwrap()
            .push(ExecutionError::new(path.materialize(), vec![], error));
    }
}

/// Executes the top-level selection set of an operation (or the
/// sub-selection set of a deferred fragment's own pass), returning the
/// assembled [`Object`] (or `None` if a required field propagated a
/// non-null violation all the way out) plus the [`PendingEntry`]s newly
/// begun while doing so.
pub async fn execute_selection_set<C>(
    ctx: &ExecutionContext<C>,
    object_value: &Arc<dyn Resolvable<C>>,
    object_type_name: &str,
    selection_set: &[ast::Selection],
    path: Arc<Path>,
    serial: bool,
) -> (Option<Object>, Vec<PendingEntry>)
where
    C: Send + Sync + 'static,
{
    let pass = ctx.fresh_pass();
    let collected = match collect_fields(
        &pass.schema,
        &pass.document,
        object_type_name,
        selection_set,
        &pass.variables,
        &mut FnvHashSet::default(),
    ) {
        Ok(c) => c,
        Err(e) => {
            pass.record_error(&path, e);
            return (None, pass.take_pending());
        }
    };

    for deferred in collected.deferred {
        schedule_deferred(&pass, object_value.clone(), object_type_name, deferred, path.clone());
    }

    let result = execute_fields(
        &pass,
        object_value,
        object_type_name,
        &collected.grouped_field_set,
        &path,
        serial,
    )
    .await;

    let pending = pass.take_pending();
    match result {
        Ok(object) => (Some(object), pending),
        Err(()) => {
            // This selection set is itself propagating a non-null failure,
            // so it never ends up anywhere in the response: every record
            // scheduled while collecting/executing it (including nested
            // `@defer`s collected above and any started by sibling fields
            // that otherwise succeeded) must be filtered rather than
            // forwarded as pending (§4.8 "Filtering").
            pass.coordinator.filter_pending(&pending);
            (None, Vec::new())
        }
    }
}

/// Executes every entry of a grouped field set, per §4.5: query/subscription
/// fields run concurrently, mutation fields run strictly serially.
async fn execute_fields<C>(
    ctx: &ExecutionContext<C>,
    object_value: &Arc<dyn Resolvable<C>>,
    object_type_name: &str,
    grouped_field_set: &GroupedFieldSet,
    path: &Arc<Path>,
    serial: bool,
) -> Result<Object, ()>
where
    C: Send + Sync + 'static,
{
    let mut results: Vec<(String, Result<Option<Value>, ()>)> = Vec::with_capacity(grouped_field_set.len());

    if serial {
        for (key, fields) in grouped_field_set {
            let r = execute_field(ctx, object_value, object_type_name, key, fields, path).await;
            results.push((key.clone(), r));
        }
    } else {
        let futures = grouped_field_set.iter().map(|(key, fields)| {
            execute_field(ctx, object_value, object_type_name, key, fields, path)
        });
        let values = join_all(futures).await;
        for ((key, _), value) in grouped_field_set.iter().zip(values) {
            results.push((key.clone(), value));
        }
    }

    if results.iter().any(|(_, r)| r.is_err()) {
        return Err(());
    }

    let mut obj = Object::with_capacity(results.len());
    for (key, value) in results {
        if let Some(value) = value.expect("checked above") {
            obj.add_field(key, value);
        }
    }
    Ok(obj)
}

/// Resolves and completes one response-key's worth of merged field nodes.
///
/// Returns `Ok(None)` when the response key names a field the parent type
/// doesn't declare: a validator would have caught this before execution, so
/// an engine running an unvalidated document silently omits the key from
/// the output rather than raising an error (§4.5 step 2).
async fn execute_field<C>(
    ctx: &ExecutionContext<C>,
    object_value: &Arc<dyn Resolvable<C>>,
    object_type_name: &str,
    response_key: &str,
    fields: &[ast::Field],
    parent_path: &Arc<Path>,
) -> Result<Option<Value>, ()>
where
    C: Send + Sync + 'static,
{
    let representative = &fields[0];
    let path = Arc::new(parent_path.append(PathSegment::Field {
        response_key: Arc::from(response_key),
        parent_type: Arc::from(object_type_name),
    }));

    if representative.name == "__typename" {
        return Ok(Some(Value::from(object_value.type_name().to_owned())));
    }

    let Some(field_meta) = ctx
        .schema
        .concrete_type_by_name(object_type_name)
        .and_then(|t| t.field_by_name(&representative.name))
        .cloned()
    else {
        return Ok(None);
    };

    let field_type = ctx.schema.resolve_type_ref(&field_meta.field_type);
    // graphql-js reports a non-null violation against the *declaring*
    // field's parent type and name regardless of how deep inside a nested
    // list the actual null was produced (its `completeValue` keeps
    // re-using the same `info` object through the recursion); this engine
    // matches that by computing the descriptor once per field invocation
    // and threading it unchanged through list/stream item completion.
    let field_descriptor: Arc<str> =
        Arc::from(format!("{object_type_name}.{}", representative.name));

    let arguments = match coerce_argument_values(
        &ctx.schema,
        &field_meta.arguments,
        &representative.arguments,
        &ctx.variables,
    ) {
        Ok(a) => a,
        Err(e) => {
            ctx.record_error(&path, FieldError::wrap(e));
            return propagate_or_null(&field_type).map(Some);
        }
    };

    if let Some(stream_args) = match stream_directive(
        representative,
        &ctx.variables,
        ctx.config.default_stream_initial_count,
    ) {
        Ok(s) => s,
        Err(e) => {
            ctx.record_error(&path, e);
            return propagate_or_null(&field_type).map(Some);
        }
    } {
        return execute_streamed_field(
            ctx,
            object_value,
            &field_type,
            field_meta.field_type.clone(),
            &arguments,
            fields,
            path,
            stream_args,
            field_descriptor,
        )
        .await
        .map(Some);
    }

    crate::__trace!(format!("resolving {object_type_name}.{}", representative.name));

    let resolved = ctx
        .cancellation
        .race(object_value.resolve_field(&representative.name, &arguments, &ctx.app_context))
        .await;

    let resolved = match resolved {
        Err(cancelled) => {
            crate::__trace_warn!(format!("{object_type_name}.{} aborted: {cancelled}", representative.name));
            ctx.record_error(&path, cancelled.into());
            return propagate_or_null(&field_type).map(Some);
        }
        Ok(Err(field_error)) => {
            crate::__trace_warn!(format!(
                "{object_type_name}.{} resolver failed: {}",
                representative.name,
                field_error.message()
            ));
            ctx.record_error(&path, field_error);
            return propagate_or_null(&field_type).map(Some);
        }
        Ok(Ok(resolved)) => resolved,
    };

    complete_value(ctx, &field_type, resolved, fields, path, &field_descriptor)
        .await
        .map(Some)
}

fn propagate_or_null<C>(field_type: &TypeType<'_, C>) -> Result<Value, ()> {
    if field_type.is_non_null() {
        Err(())
    } else {
        Ok(Value::Null)
    }
}

/// Value completion (§4.6): recursively applies non-null, list, and
/// concrete-type completion, converting a non-null violation into a
/// propagated error for exactly as many enclosing levels as are themselves
/// declared non-null.
fn complete_value<'a, C>(
    ctx: &'a ExecutionContext<C>,
    field_type: &'a TypeType<'a, C>,
    resolved: Resolved<C>,
    fields: &'a [ast::Field],
    path: Arc<Path>,
    field_descriptor: &'a Arc<str>,
) -> futures::future::BoxFuture<'a, Result<Value, ()>>
where
    C: Send + Sync + 'static,
{
    Box::pin(async move {
        let (is_non_null, inner_type) = match field_type {
            TypeType::NonNull(inner) => (true, inner.as_ref()),
            other => (false, other),
        };

        if matches!(resolved, Resolved::Null) {
            return if is_non_null {
                ctx.record_error(
                    &path,
                    FieldError::wrap(format!(
                        "Cannot return null for non-nullable field {field_descriptor}."
                    )),
                );
                Err(())
            } else {
                Ok(Value::Null)
            };
        }

        let completed = match inner_type {
            TypeType::List(item_type) => match resolved {
                Resolved::List(items) => {
                    let watermark = ctx.pending_watermark();
                    let mut out = Vec::with_capacity(items.len());
                    let mut failed = false;
                    for (index, item) in items.into_iter().enumerate() {
                        let item_path = Arc::new(path.append(PathSegment::Index(index)));
                        match complete_value(ctx, item_type, item, fields, item_path, field_descriptor).await {
                            Ok(v) => out.push(v),
                            Err(()) => {
                                failed = true;
                                break;
                            }
                        }
                    }
                    if failed {
                        // The whole list is going null one way or another
                        // (here, or further up once this propagates); any
                        // record an earlier, otherwise-successful sibling
                        // item scheduled is now rooted under a null and
                        // must be filtered rather than forwarded (§4.8).
                        let orphaned = ctx.drain_pending_since(watermark);
                        ctx.coordinator.filter_pending(&orphaned);
                        Err(())
                    } else {
                        Ok(Value::List(out))
                    }
                }
                _ => {
                    ctx.record_error(&path, FieldError::wrap("Expected list value."));
                    Err(())
                }
            },
            TypeType::Concrete(meta) => complete_concrete(ctx, meta, resolved, fields, path.clone()).await,
            TypeType::NonNull(_) => unreachable!("peeled above"),
        };

        match completed {
            Ok(v) => Ok(v),
            Err(()) if is_non_null => Err(()),
            Err(()) => Ok(Value::Null),
        }
    })
}

async fn complete_concrete<C>(
    ctx: &ExecutionContext<C>,
    meta: &MetaType<C>,
    resolved: Resolved<C>,
    fields: &[ast::Field],
    path: Arc<Path>,
) -> Result<Value, ()>
where
    C: Send + Sync + 'static,
{
    match meta {
        MetaType::Scalar(scalar_type) => complete_scalar(ctx, scalar_type, resolved, path),
        MetaType::Enum(enum_meta) => match resolved {
            Resolved::Enum(name) if enum_meta.contains(&name) => Ok(Value::from(name)),
            other => {
                use itertools::Itertools as _;
                ctx.record_error(
                    &path,
                    FieldError::wrap(format!(
                        "Expected enum value for {}, found {other:?}. Must be one of: {}.",
                        enum_meta.name,
                        enum_meta.values.iter().join(", "),
                    )),
                );
                Err(())
            }
        },
        MetaType::Object(object_type) => match resolved {
            Resolved::Object(value) => {
                complete_object(ctx, &object_type.name, value, fields, path).await
            }
            _ => {
                ctx.record_error(&path, FieldError::wrap("Expected an object value."));
                Err(())
            }
        },
        MetaType::Interface(_) | MetaType::Union(_) => match resolved {
            Resolved::Object(value) => {
                let type_name = resolve_abstract_type_name(ctx, meta, &value);
                let Some(type_name) = type_name else {
                    ctx.record_error(
                        &path,
                        FieldError::wrap(format!(
                            "Could not resolve the concrete type for abstract type \"{}\".",
                            meta.name()
                        )),
                    );
                    return Err(());
                };
                if !ctx.schema.is_possible_type(meta.name(), &type_name) {
                    ctx.record_error(
                        &path,
                        FieldError::wrap(format!(
                            "Runtime Object type \"{type_name}\" is not a possible type for \"{}\".",
                            meta.name()
                        )),
                    );
                    return Err(());
                }
                complete_object(ctx, &type_name, value, fields, path).await
            }
            _ => {
                ctx.record_error(&path, FieldError::wrap("Expected an object value."));
                Err(())
            }
        },
        MetaType::InputObject(_) => {
            ctx.record_error(
                &path,
                FieldError::wrap("Input object types cannot appear in output position."),
            );
            Err(())
        }
    }
}

/// Resolves the concrete object type backing an abstract (interface/union)
/// value, per §4.6: a declared `type_resolver` wins if present and returns a
/// name; otherwise each possible type's `isTypeOf` predicate is tried in
/// schema order; failing that, the resolved value's own reported type name
/// is trusted as a last resort.
fn resolve_abstract_type_name<C>(
    ctx: &ExecutionContext<C>,
    meta: &MetaType<C>,
    value: &Arc<dyn Resolvable<C>>,
) -> Option<String> {
    let resolver = match meta {
        MetaType::Interface(i) => i.type_resolver.as_ref(),
        MetaType::Union(u) => u.type_resolver.as_ref(),
        _ => None,
    };
    if let Some(resolver) = resolver {
        if let Some(name) = resolver(value.as_ref()) {
            return Some(name);
        }
    }
    for possible_type in ctx.schema.possible_types(meta.name()) {
        if let Some(is_type_of) = &possible_type.is_type_of {
            if is_type_of(value.as_ref()) {
                return Some(possible_type.name.clone());
            }
        }
    }
    Some(value.type_name().to_owned())
}

async fn complete_object<C>(
    ctx: &ExecutionContext<C>,
    object_type_name: &str,
    value: Arc<dyn Resolvable<C>>,
    fields: &[ast::Field],
    path: Arc<Path>,
) -> Result<Value, ()>
where
    C: Send + Sync + 'static,
{
    let sub_selection: Vec<ast::Selection> = fields
        .iter()
        .flat_map(|f| f.selection_set.iter().cloned())
        .collect();

    let (object, pending) =
        execute_selection_set(ctx, &value, object_type_name, &sub_selection, path, false).await;
    {
        let mut guard = ctx.pending.lock().unwrap();
        guard.extend(pending);
    }
    object.map(Value::Object).ok_or(())
}

fn complete_scalar<C>(
    ctx: &ExecutionContext<C>,
    scalar_type: &ScalarType,
    resolved: Resolved<C>,
    path: Arc<Path>,
) -> Result<Value, ()> {
    let scalar = match resolved {
        Resolved::Scalar(s) => s,
        other => {
            ctx.record_error(
                &path,
                FieldError::wrap(format!("Expected a scalar value for {}, found {other:?}.", scalar_type.name)),
            );
            return Err(());
        }
    };
    match (scalar_type.serialize)(&scalar) {
        Ok(v) => Ok(v),
        Err(e) => {
            ctx.record_error(&path, FieldError::wrap(e));
            Err(())
        }
    }
}

impl<C> std::fmt::Debug for Resolved<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Scalar(s) => write!(f, "Scalar({s:?})"),
            Self::Enum(e) => write!(f, "Enum({e:?})"),
            Self::Object(_) => write!(f, "Object(..)"),
            Self::List(items) => write!(f, "List(len={})", items.len()),
        }
    }
}

/// Schedules a `@defer`d fragment as its own background incremental
/// record, per §4.8: registers it with the coordinator, then spawns a task
/// that collects and executes it independently of the rest of the
/// response.
fn schedule_deferred<C>(
    ctx: &ExecutionContext<C>,
    object_value: Arc<dyn Resolvable<C>>,
    object_type_name: &str,
    deferred: DeferredFragment,
    path: Arc<Path>,
) where
    C: Send + Sync + 'static,
{
    let ctx = ctx.clone();
    let object_type_name = object_type_name.to_owned();
    let mut handle = ctx
        .coordinator
        .begin_record(path.materialize(), deferred.label.clone());
    {
        let mut guard = ctx.pending.lock().unwrap();
        guard.push(handle.pending_entry());
    }
    tokio::spawn(async move {
        handle.admit().await;

        let (object, nested_pending) = execute_selection_set(
            &ctx,
            &object_value,
            &object_type_name,
            &deferred.selection_set,
            path,
            false,
        )
        .await;

        let data = object.unwrap_or_default();
        handle.complete_fragment(data, Vec::new(), nested_pending);
    });
}

/// Executes a `@stream`d list field (§4.8): completes the leading
/// `initialCount` items inline, then schedules the remainder as a
/// background incremental record.
async fn execute_streamed_field<C>(
    ctx: &ExecutionContext<C>,
    object_value: &Arc<dyn Resolvable<C>>,
    field_type: &TypeType<'_, C>,
    declared_type_ref: TypeRef,
    arguments: &indexmap::IndexMap<String, Value>,
    fields: &[ast::Field],
    path: Arc<Path>,
    stream_args: crate::collector::StreamArgs,
    field_descriptor: Arc<str>,
) -> Result<Value, ()>
where
    C: Send + Sync + 'static,
{
    let representative = &fields[0];
    let resolved = ctx
        .cancellation
        .race(object_value.resolve_field(&representative.name, arguments, &ctx.app_context))
        .await;
    let resolved = match resolved {
        Err(cancelled) => {
            ctx.record_error(&path, cancelled.into());
            return propagate_or_null(field_type);
        }
        Ok(Err(e)) => {
            ctx.record_error(&path, e);
            return propagate_or_null(field_type);
        }
        Ok(Ok(r)) => r,
    };

    let (is_non_null, list_type) = match field_type {
        TypeType::NonNull(inner) => (true, inner.as_ref()),
        other => (false, other),
    };
    let TypeType::List(item_type) = list_type else {
        ctx.record_error(&path, FieldError::wrap("@stream applied to a non-list field."));
        return if is_non_null { Err(()) } else { Ok(Value::Null) };
    };
    let Resolved::List(items) = resolved else {
        ctx.record_error(&path, FieldError::wrap("Expected list value."));
        return if is_non_null { Err(()) } else { Ok(Value::Null) };
    };

    let split_at = stream_args.initial_count.min(items.len());
    let mut items = items;
    let remaining: Vec<_> = items.split_off(split_at);

    let head_watermark = ctx.pending_watermark();
    let mut head = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item_path = Arc::new(path.append(PathSegment::Index(index)));
        match complete_value(ctx, item_type, item, fields, item_path, &field_descriptor).await {
            Ok(v) => head.push(v),
            Err(()) if item_type.is_non_null() => {
                let orphaned = ctx.drain_pending_since(head_watermark);
                ctx.coordinator.filter_pending(&orphaned);
                return if is_non_null { Err(()) } else { Ok(Value::Null) };
            }
            Err(()) => head.push(Value::Null),
        }
    }

    if !remaining.is_empty() {
        let item_non_null = item_type.is_non_null();
        schedule_stream(
            ctx,
            declared_type_ref,
            item_non_null,
            remaining,
            fields[0].clone(),
            path.clone(),
            split_at,
            stream_args.label,
            field_descriptor,
        );
    }

    Ok(Value::List(head))
}

/// Completes the items of a `@stream`d list beyond `initialCount` as a
/// background incremental record (§4.8).
///
/// Takes the field's declared type by name (`declared_type_ref`) rather
/// than a borrowed [`TypeType`]: a `TypeType` borrows from the schema it
/// was resolved against and cannot outlive the synchronous call that
/// produced it, but [`Arc<SchemaType<C>>`] moves into the spawned task
/// just fine, so the type is simply re-resolved there.
fn schedule_stream<C>(
    ctx: &ExecutionContext<C>,
    declared_type_ref: TypeRef,
    item_non_null: bool,
    remaining: Vec<Resolved<C>>,
    representative_field: ast::Field,
    path: Arc<Path>,
    start_index: usize,
    label: Option<String>,
    field_descriptor: Arc<str>,
) where
    C: Send + Sync + 'static,
{
    let ctx = ctx.clone();
    let mut handle = ctx.coordinator.begin_record(path.materialize(), label);
    {
        let mut guard = ctx.pending.lock().unwrap();
        guard.push(handle.pending_entry());
    }
    tokio::spawn(async move {
        handle.admit().await;

        let resolved_type = ctx.schema.resolve_type_ref(&declared_type_ref);
        let list_type = resolved_type.unwrap_non_null();
        let item_type = list_type
            .list_contents()
            .expect("declared_type_ref was validated as a list type before scheduling");

        let mut errors = Vec::new();
        let mut trailing_pending = Vec::new();
        for (offset, item) in remaining.into_iter().enumerate() {
            let item_path = Arc::new(path.append(PathSegment::Index(start_index + offset)));
            let fields = std::slice::from_ref(&representative_field);
            let outcome = complete_value(&ctx, item_type, item, fields, item_path, &field_descriptor).await;
            let newly_pending = ctx.take_pending();
            match outcome {
                Ok(value) => handle.deliver_stream_items(vec![value], Vec::new(), newly_pending),
                Err(()) if item_non_null => {
                    // The item's own non-null subtree already filtered
                    // whatever it scheduled (see `execute_selection_set`),
                    // so `newly_pending` is empty here; keep it anyway so
                    // this stays correct if that ever changes.
                    trailing_pending = newly_pending;
                    errors.push(ExecutionError::new(
                        path.materialize(),
                        vec![],
                        FieldError::wrap(format!(
                            "Cannot return null for non-nullable field {field_descriptor}."
                        )),
                    ));
                    break;
                }
                Err(()) => {
                    handle.deliver_stream_items(vec![Value::Null], Vec::new(), newly_pending);
                }
            }
        }
        handle.complete_stream(errors, trailing_pending);
    });
}

/// Looks up an argument's declared metadata by name, used by coercion call
/// sites that already have a [`FieldMeta`] in hand.
pub fn argument_meta_by_name<'a>(field_meta: &'a FieldMeta, name: &str) -> Option<&'a ArgumentMeta> {
    field_meta.argument_by_name(name)
}
