use std::sync::Arc;

use async_graphql_parser::{
    parse_query,
    types::{DocumentOperations, ExecutableDocument, OperationDefinition, OperationType},
};
use error::{ErrorCode, ErrorPath, GraphqlError, Location};
use serde_json::{Map, Value};

use crate::{
    Context, Response, Schema,
    config::ExecutorConfig,
    execution::{FieldSpanTracer, NoopTracer, Runtime, Tracer},
};

/// Executes operations against a [`Schema`].
#[derive(Clone)]
pub struct Executor {
    schema: Arc<Schema>,
    config: Arc<ExecutorConfig>,
}

enum Document {
    Query(String),
    Parsed(ExecutableDocument),
}

/// An operation to execute, with everything it runs against.
pub struct Request {
    document: Document,
    operation_name: Option<String>,
    variables: Map<String, Value>,
    root_value: Value,
    context: Map<String, Value>,
    base_path: ErrorPath,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self::with_document(Document::Query(query.into()))
    }

    pub fn from_document(document: ExecutableDocument) -> Self {
        Self::with_document(Document::Parsed(document))
    }

    fn with_document(document: Document) -> Self {
        Request {
            document,
            operation_name: None,
            variables: Map::new(),
            root_value: Value::Object(Map::new()),
            context: Map::new(),
            base_path: ErrorPath::default(),
        }
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Anything but a JSON object is treated as no variables.
    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = match variables {
            Value::Object(variables) => variables,
            _ => Map::new(),
        };
        self
    }

    #[must_use]
    pub fn root_value(mut self, value: Value) -> Self {
        self.root_value = value;
        self
    }

    #[must_use]
    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Executes the operation as a subtree found at `path`, which prefixes every error path.
    #[must_use]
    pub fn base_path(mut self, path: impl Into<ErrorPath>) -> Self {
        self.base_path = path.into();
        self
    }
}

impl Executor {
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, ExecutorConfig::default())
    }

    pub fn with_config(schema: Schema, config: ExecutorConfig) -> Self {
        Executor {
            schema: Arc::new(schema),
            config: Arc::new(config),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn execute(&self, request: Request) -> Response {
        let span = tracing::info_span!(
            "execute_operation",
            operation_name = request.operation_name.as_deref().unwrap_or_default()
        );
        let _guard = span.enter();

        let Request {
            document,
            operation_name,
            mut variables,
            root_value,
            context,
            base_path,
        } = request;

        let document = match document {
            Document::Parsed(document) => document,
            Document::Query(query) => match parse_query(query) {
                Ok(document) => document,
                Err(err) => {
                    tracing::debug!("could not parse operation: {err}");
                    let locations = err.positions().map(|pos| Location::new(pos.line, pos.column));
                    return Response::request_error(
                        GraphqlError::new(err.to_string(), ErrorCode::OperationParsingError).with_locations(locations),
                    );
                }
            },
        };

        let operation = match select_operation(&document, operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => return Response::request_error(error),
        };

        let (root_type, serial) = match operation.ty {
            OperationType::Query => (self.schema.query_type(), false),
            OperationType::Mutation => (self.schema.mutation_type(), true),
            OperationType::Subscription => {
                return Response::request_error(GraphqlError::bad_request("Subscriptions are not supported"));
            }
        };
        let Some(root_type) = root_type else {
            return Response::request_error(GraphqlError::bad_request(format!(
                "Schema is not configured for {} operations",
                operation.ty
            )));
        };

        for definition in &operation.variable_definitions {
            let name = definition.node.name.node.as_str();
            if variables.contains_key(name) {
                continue;
            }
            if let Some(value) = &definition.node.default_value {
                if let Ok(value) = value.node.clone().into_json() {
                    variables.insert(name.to_string(), value);
                }
            }
        }

        let tracer: &dyn Tracer = match (&self.schema.tracer, self.config.tracing.field_spans) {
            (Some(tracer), _) => tracer.as_ref(),
            (None, true) => &FieldSpanTracer,
            (None, false) => &NoopTracer,
        };

        let ctx = Context::new(context);
        let mut runtime = Runtime::new(&self.schema, &document, &variables, &ctx, &self.config, tracer, base_path);
        let data = runtime.run_operation(root_type, &operation.selection_set.node, root_value, serial);

        let errors = ctx.take_errors();
        tracing::debug!(errors = errors.len(), "operation executed");
        Response { data, errors }
    }
}

fn select_operation<'d>(
    document: &'d ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition, GraphqlError> {
    let operation = match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Some(operation),
        (DocumentOperations::Single(_), Some(_)) => None,
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find_map(|(key, operation)| (key.as_str() == name).then_some(operation)),
        (DocumentOperations::Multiple(operations), None) => {
            if operations.len() != 1 {
                return Err(GraphqlError::bad_request(
                    "Must provide operation name if query contains multiple operations",
                ));
            }
            operations.values().next()
        }
    };

    match (operation, operation_name) {
        (Some(operation), _) => Ok(&operation.node),
        (None, Some(name)) => Err(GraphqlError::bad_request(format!("Unknown operation named \"{name}\""))),
        (None, None) => Err(GraphqlError::bad_request("The document contains no operation")),
    }
}
