//! The operation driver (§4.7): the crate's single public entry point,
//! tying every other component together into `execute()`. Picks the
//! operation to run, coerces its variables, resolves its root type by
//! operation kind, and drives the top-level selection set with
//! query/subscription (concurrent) or mutation (strictly serial) field
//! ordering, producing either a single response or an initial/subsequent
//! incremental payload sequence (§4.8).

use std::{collections::HashMap, sync::Arc};

use crate::{
    ast::{self, OperationType},
    cancellation::CancellationToken,
    coercion::coerce_variable_values,
    config::ExecutionConfig,
    error::{ExecutionError, GraphQLError},
    executor::{execute_selection_set, ExecutionContext},
    incremental::{Coordinator, IncrementalPayload, PayloadStream},
    path::Path,
    resolve::Resolvable,
    schema::SchemaType,
    value::{Object, Value},
};

/// Everything needed to execute one operation, per §6's "Execute
/// operation" input list.
///
/// `schema` and `document` are `Option` even though most callers will
/// always have both in hand: §4.7 step 1-2 requires the engine to reject
/// their absence with a descriptive [`GraphQLError`] rather than panic, the
/// way a caller that deserialized a request or received a schema handle
/// from elsewhere might legitimately fail to produce one.
pub struct ExecuteRequest<C> {
    /// The frozen schema to execute against.
    pub schema: Option<Arc<SchemaType<C>>>,
    /// The parsed, already-validated document.
    pub document: Option<Arc<ast::Document>>,
    /// The root value passed to the operation's top-level field resolvers.
    pub root_value: Arc<dyn Resolvable<C>>,
    /// Opaque per-request context, threaded to every resolver.
    pub app_context: Arc<C>,
    /// Raw (e.g. deserialized-JSON) variable values, coerced against the
    /// selected operation's declared variables (§4.3).
    pub variable_values: serde_json::Map<String, serde_json::Value>,
    /// Selects which operation in `document` to run, required when the
    /// document declares more than one.
    pub operation_name: Option<String>,
    /// Cooperative cancellation handle (§4.9); defaults to a token that is
    /// never cancelled.
    pub cancellation: CancellationToken,
    /// Engine-level policy knobs (§5, `config` module).
    pub config: Arc<ExecutionConfig>,
}

impl<C> ExecuteRequest<C> {
    /// Starts building a request against `schema` and `document`, with no
    /// variables, no explicit operation name, an un-cancellable
    /// cancellation token, and default config.
    pub fn new(
        schema: Arc<SchemaType<C>>,
        document: Arc<ast::Document>,
        root_value: Arc<dyn Resolvable<C>>,
        app_context: Arc<C>,
    ) -> Self {
        Self {
            schema: Some(schema),
            document: Some(document),
            root_value,
            app_context,
            variable_values: serde_json::Map::new(),
            operation_name: None,
            cancellation: CancellationToken::new(),
            config: Arc::new(ExecutionConfig::default()),
        }
    }

    /// Sets the raw variable values to coerce against the selected
    /// operation's declarations.
    #[must_use]
    pub fn with_variable_values(mut self, variables: serde_json::Map<String, serde_json::Value>) -> Self {
        self.variable_values = variables;
        self
    }

    /// Selects which operation in the document to run.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Attaches a cancellation handle the caller can trigger mid-execution.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Overrides the default [`ExecutionConfig`].
    #[must_use]
    pub fn with_config(mut self, config: Arc<ExecutionConfig>) -> Self {
        self.config = config;
        self
    }
}

/// A completed `{data, errors}` result (§6), produced when no `@defer`/
/// `@stream` directive was encountered anywhere in the operation.
#[derive(Clone, Debug, Default)]
pub struct Response {
    /// The operation's result data: `None` when execution never produced
    /// any (a variable-coercion or operation-selection failure), `Some(Value::Null)`
    /// when a top-level non-null field propagated.
    pub data: Option<Value>,
    /// Located errors accumulated during execution, in emission order.
    pub errors: Vec<ExecutionError>,
}

impl Response {
    /// Serializes this response into the `{data?, errors?}` shape
    /// described in §6.
    pub fn to_response_object(&self) -> Object {
        let mut obj = Object::with_capacity(2);
        if let Some(data) = &self.data {
            obj.add_field("data", data.clone());
        }
        if !self.errors.is_empty() {
            let errors = self
                .errors
                .iter()
                .map(|e| Value::Object(e.to_response_object()))
                .collect();
            obj.add_field("errors", Value::List(errors));
        }
        obj
    }
}

/// What executing an operation produced: either a single completed
/// response, or the initial payload of an incremental-delivery sequence
/// plus the [`Stream`](futures::Stream) of payloads that follow it (§4.8).
pub enum ExecutionOutcome {
    /// No `@defer`/`@stream` was encountered: the operation's complete
    /// result.
    Single(Response),
    /// `@defer`/`@stream` scheduled at least one record: the initial
    /// payload plus the stream of subsequent ones.
    Incremental {
        /// The synchronously-available initial payload.
        initial: IncrementalPayload,
        /// Subsequent payloads, terminated by one with `hasNext: false`.
        subsequent: PayloadStream,
    },
}

/// Wraps a pre-execution [`GraphQLError`] as the sole error of a `{data:
/// null}` response (§4.7 step 5, §7 item 4).
fn single_error_response(error: GraphQLError) -> ExecutionOutcome {
    ExecutionOutcome::Single(Response {
        data: None,
        errors: vec![ExecutionError::new(Vec::new(), Vec::new(), crate::error::FieldError::wrap(error))],
    })
}

/// Executes one GraphQL operation against a schema, per §4.7.
///
/// Returns `Err` only for the two strictly structural failures that mean
/// there is nothing to execute at all: a missing document or a missing
/// schema. Every other pre-execution failure -- an unresolvable or
/// ambiguous operation name, a schema not configured for the selected
/// operation's kind, invalid variable values -- as well as every failure
/// during execution itself -- resolver errors, non-null propagation -- is
/// surfaced as the sole error of a `data: null` (or partial-`data`)
/// [`Response`]/[`IncrementalPayload`] instead (§7).
pub async fn execute<C>(request: ExecuteRequest<C>) -> Result<ExecutionOutcome, GraphQLError>
where
    C: Send + Sync + 'static,
{
    let ExecuteRequest {
        schema,
        document,
        root_value,
        app_context,
        variable_values,
        operation_name,
        cancellation,
        config,
    } = request;

    let schema = schema.ok_or(GraphQLError::NoSchema)?;
    let document = document.ok_or(GraphQLError::NoDocument)?;

    if cancellation.is_cancelled() {
        crate::__trace_warn!("execution aborted before any field ran");
        let reason = cancellation.reason().unwrap_or_else(|| {
            crate::cancellation::CANCELLED_CANONICAL_MESSAGE.to_owned()
        });
        return Ok(ExecutionOutcome::Single(Response {
            data: None,
            errors: vec![ExecutionError::new(
                Vec::new(),
                Vec::new(),
                crate::error::FieldError::wrap(reason),
            )],
        }));
    }

    let operation = match document.get_operation(operation_name.as_deref()) {
        Ok(operation) => operation,
        Err(e) => return Ok(single_error_response(e)),
    };

    let variables: Arc<HashMap<String, Value>> =
        match coerce_variable_values(&schema, &operation.variable_definitions, &variable_values) {
            Ok(v) => Arc::new(v),
            Err(e) => return Ok(single_error_response(e)),
        };

    let (root_type_name, operation_kind): (String, &'static str) = match operation.operation_type {
        OperationType::Query => (schema.query_type().name.clone(), "query"),
        OperationType::Mutation => match schema.mutation_type() {
            Some(t) => (t.name.clone(), "mutation"),
            None => return Ok(single_error_response(GraphQLError::OperationKindNotConfigured("mutation"))),
        },
        OperationType::Subscription => match schema.subscription_type() {
            Some(t) => (t.name.clone(), "subscription"),
            None => {
                return Ok(single_error_response(GraphQLError::OperationKindNotConfigured(
                    "subscription",
                )))
            }
        },
    };

    crate::__trace_debug!(format!("executing {operation_kind} operation against root type {root_type_name}"));

    let (coordinator, subsequent) = Coordinator::new(config.max_concurrent_incremental_records);
    let coordinator = Arc::new(coordinator);

    let ctx = ExecutionContext::new(
        schema,
        document,
        variables,
        app_context,
        cancellation,
        coordinator.clone(),
        config,
    );

    let serial = matches!(operation.operation_type, OperationType::Mutation);

    let (object, pending) = execute_selection_set(
        &ctx,
        &root_value,
        &root_type_name,
        &operation.selection_set,
        Arc::new(Path::root()),
        serial,
    )
    .await;

    let errors = std::mem::take(&mut *ctx.errors.lock().unwrap());
    let data = object.map(Value::Object);

    if pending.is_empty() {
        crate::__trace!("operation completed with no incremental records");
        return Ok(ExecutionOutcome::Single(Response { data, errors }));
    }

    crate::__trace_debug!(format!("operation has {} outstanding incremental record(s)", pending.len()));
    let initial = coordinator.initial_payload(data.unwrap_or(Value::Null), errors, pending);
    Ok(ExecutionOutcome::Incremental { initial, subsequent })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use indexmap::IndexMap;

    use super::*;
    use crate::{
        ast::{Field, Selection},
        error::ExecutionResult,
        resolve::Resolved,
        schema::{FieldMeta, MetaType, ObjectType, ScalarType, TypeRef},
        value::Scalar,
    };

    struct Ctx;

    struct Root;

    #[async_trait]
    impl Resolvable<Ctx> for Root {
        fn type_name(&self) -> &str {
            "Query"
        }

        async fn resolve_field(
            &self,
            _field_name: &str,
            _arguments: &IndexMap<String, Value>,
            _ctx: &Ctx,
        ) -> ExecutionResult<Resolved<Ctx>> {
            Ok(Resolved::Scalar(Scalar::Boolean(true)))
        }
    }

    fn test_schema() -> Arc<SchemaType<Ctx>> {
        Arc::new(
            SchemaType::new("Query")
                .with_type(MetaType::Scalar(ScalarType::boolean()))
                .with_type(MetaType::Object(
                    ObjectType::new("Query").field(FieldMeta::new("ok", TypeRef::named("Boolean"))),
                )),
        )
    }

    fn field(name: &str) -> Field {
        Field {
            alias: None,
            name: name.to_owned(),
            arguments: vec![],
            directives: vec![],
            selection_set: vec![],
            location: Default::default(),
        }
    }

    fn query_document(name: Option<&str>) -> Arc<ast::Document> {
        Arc::new(ast::Document {
            operations: vec![ast::Operation {
                operation_type: OperationType::Query,
                name: name.map(str::to_owned),
                variable_definitions: vec![],
                directives: vec![],
                selection_set: vec![Selection::Field(field("ok"))],
                location: Default::default(),
            }],
            fragments: Default::default(),
        })
    }

    fn request() -> ExecuteRequest<Ctx> {
        ExecuteRequest::new(test_schema(), query_document(None), Arc::new(Root), Arc::new(Ctx))
    }

    #[tokio::test]
    async fn missing_schema_is_rejected_before_any_field_runs() {
        let mut req = request();
        req.schema = None;
        let err = execute(req).await.unwrap_err();
        assert_eq!(err, GraphQLError::NoSchema);
    }

    #[tokio::test]
    async fn missing_document_is_rejected_before_any_field_runs() {
        let mut req = request();
        req.document = None;
        let err = execute(req).await.unwrap_err();
        assert_eq!(err, GraphQLError::NoDocument);
    }

    /// Runs `req` and unwraps it as a single (non-incremental) response.
    async fn single_response<C: Send + Sync + 'static>(req: ExecuteRequest<C>) -> Response {
        match execute(req).await.expect("not a structural NoDocument/NoSchema failure") {
            ExecutionOutcome::Single(response) => response,
            ExecutionOutcome::Incremental { .. } => panic!("expected a single response"),
        }
    }

    #[tokio::test]
    async fn unknown_operation_name_is_rejected_with_data_null() {
        let req = request().with_operation_name("DoesNotExist");
        let response = single_response(req).await;
        assert_eq!(response.data, None);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].error().message(),
            "Unknown operation named \"DoesNotExist\"."
        );
    }

    #[tokio::test]
    async fn ambiguous_operation_name_is_rejected_with_data_null() {
        let mut document = (*query_document(Some("A"))).clone();
        document.operations.push(ast::Operation {
            operation_type: OperationType::Query,
            name: Some("B".to_owned()),
            variable_definitions: vec![],
            directives: vec![],
            selection_set: vec![Selection::Field(field("ok"))],
            location: Default::default(),
        });
        let req = ExecuteRequest::new(test_schema(), Arc::new(document), Arc::new(Root), Arc::new(Ctx));
        let response = single_response(req).await;
        assert_eq!(response.data, None);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].error().message(),
            "Must provide operation name if query contains multiple operations."
        );
    }

    #[tokio::test]
    async fn document_with_no_operations_is_rejected_with_data_null() {
        let document = Arc::new(ast::Document::default());
        let req = ExecuteRequest::new(test_schema(), document, Arc::new(Root), Arc::new(Ctx));
        let response = single_response(req).await;
        assert_eq!(response.data, None);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].error().message(), "Must provide an operation.");
    }

    #[tokio::test]
    async fn mutation_against_a_query_only_schema_is_rejected_with_data_null() {
        let document = Arc::new(ast::Document {
            operations: vec![ast::Operation {
                operation_type: OperationType::Mutation,
                name: None,
                variable_definitions: vec![],
                directives: vec![],
                selection_set: vec![Selection::Field(field("ok"))],
                location: Default::default(),
            }],
            fragments: Default::default(),
        });
        let req = ExecuteRequest::new(test_schema(), document, Arc::new(Root), Arc::new(Ctx));
        let response = single_response(req).await;
        assert_eq!(response.data, None);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].error().message(),
            "Schema is not configured to execute mutation operation."
        );
    }

    #[tokio::test]
    async fn invalid_variable_value_aborts_with_data_null_before_any_field_runs() {
        let document = Arc::new(ast::Document {
            operations: vec![ast::Operation {
                operation_type: OperationType::Query,
                name: None,
                variable_definitions: vec![ast::VariableDefinition {
                    name: "x".to_owned(),
                    var_type: ast::Type::NonNull(Box::new(ast::Type::Named("Boolean".to_owned()))),
                    default_value: None,
                }],
                directives: vec![],
                selection_set: vec![Selection::Field(field("ok"))],
                location: Default::default(),
            }],
            fragments: Default::default(),
        });
        let req = ExecuteRequest::new(test_schema(), document, Arc::new(Root), Arc::new(Ctx));
        let response = single_response(req).await;
        assert_eq!(response.data, None);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].error().message().starts_with("Variable \"$x\":"));
    }

    #[tokio::test]
    async fn a_full_query_round_trips_through_to_response_object() {
        let outcome = execute(request()).await.unwrap();
        let ExecutionOutcome::Single(response) = outcome else {
            panic!("expected a single response, no @defer/@stream was used");
        };
        assert!(response.errors.is_empty());
        let obj = response.to_response_object();
        let data = obj.get_field_value("data").expect("data present");
        let Value::Object(data) = data else {
            panic!("expected an object");
        };
        assert_eq!(data.get_field_value("ok"), Some(&Value::from(true)));
        assert!(obj.get_field_value("errors").is_none());
    }

    #[tokio::test]
    async fn cancellation_before_start_short_circuits_with_no_fields_run() {
        let cancellation = CancellationToken::new();
        cancellation.cancel_with_reason(Some("shutting down".to_owned()));
        let req = request().with_cancellation(cancellation);

        let outcome = execute(req).await.unwrap();
        let ExecutionOutcome::Single(response) = outcome else {
            panic!("expected a single response");
        };
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].error().message(), "shutting down");
    }
}
