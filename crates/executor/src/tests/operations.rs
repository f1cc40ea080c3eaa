use std::sync::{Arc, Mutex};

use async_graphql_parser::parse_query;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

use super::execute;
use crate::{
    ErrorPath, Executor, FieldDefinition, ObjectType, Request, Resolved, Schema, SchemaBuilder, TraceField, Tracer,
};

fn builder() -> SchemaBuilder {
    Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "Int"))
                .field(FieldDefinition::new("b", "Int"))
                .field(FieldDefinition::new("test", "Test"))
                .field(
                    FieldDefinition::new("viewer", "String")
                        .resolve(|ctx| Ok(ctx.context().get("viewer").cloned().into())),
                ),
        )
        .register(ObjectType::new("Test").field(FieldDefinition::new("req", "String!")))
}

fn root() -> Value {
    json!({"a": 1, "b": 2, "test": {}})
}

#[test]
fn parse_errors_are_request_errors() {
    let response = execute(builder().finish().unwrap(), Request::new("{ a "));

    assert_eq!(response["data"], Value::Null);
    assert_eq!(response["errors"][0]["extensions"], json!({"code": "OPERATION_PARSING_ERROR"}));
    assert!(response["errors"][0]["locations"].is_array());
}

#[rstest]
#[case::ambiguous(
    "query A { a } query B { b }",
    None,
    "Must provide operation name if query contains multiple operations"
)]
#[case::unknown_name("query A { a }", Some("C"), "Unknown operation named \"C\"")]
#[case::anonymous_with_name("{ a }", Some("C"), "Unknown operation named \"C\"")]
#[case::subscription("subscription { a }", None, "Subscriptions are not supported")]
#[case::no_mutation_type("mutation { a }", None, "Schema is not configured for mutation operations")]
fn operation_selection_errors(#[case] query: &str, #[case] operation_name: Option<&str>, #[case] message: &str) {
    let mut request = Request::new(query);
    if let Some(name) = operation_name {
        request = request.operation_name(name);
    }

    let response = execute(builder().finish().unwrap(), request);

    assert_eq!(
        response,
        json!({
            "data": null,
            "errors": [{"message": message, "extensions": {"code": "BAD_REQUEST"}}]
        })
    );
}

#[test]
fn selects_operation_by_name() {
    let request = Request::new("query A { a } query B { b __typename }")
        .operation_name("B")
        .root_value(root());

    let response = execute(builder().finish().unwrap(), request);

    assert_eq!(response, json!({"data": {"b": 2, "__typename": "Query"}}));
}

#[test]
fn executes_pre_parsed_documents_with_context() {
    let document = parse_query("{ viewer }").unwrap();
    let request = Request::from_document(document).context_value("viewer", "ada");

    let response = execute(builder().finish().unwrap(), request);

    assert_eq!(response, json!({"data": {"viewer": "ada"}}));
}

#[test]
fn partial_execution_prefixes_paths() {
    let request = Request::new("{ test { req } }")
        .root_value(root())
        .base_path(ErrorPath::from(("node", 4usize)));

    let response = execute(builder().finish().unwrap(), request);

    assert_eq!(response["data"], json!({"test": null}));
    assert_eq!(response["errors"][0]["path"], json!(["node", 4, "test", "req"]));
}

#[derive(Default)]
struct RecordingTracer {
    events: Arc<Mutex<Vec<String>>>,
}

impl Tracer for RecordingTracer {
    fn begin_execute_field(&self, field: &TraceField<'_>) {
        self.events.lock().unwrap().push(format!("begin {}", field.path));
    }

    fn execute_field(&self, field: &TraceField<'_>, resolve: &mut dyn FnMut() -> Resolved) -> Resolved {
        self.events
            .lock()
            .unwrap()
            .push(format!("execute {}.{}", field.type_name, field.field_name));
        resolve()
    }

    fn end_execute_field(&self, field: &TraceField<'_>, resolved: &Resolved) {
        let outcome = resolved.as_value().map(Value::to_string).unwrap_or_default();
        self.events.lock().unwrap().push(format!("end {} {outcome}", field.path));
    }
}

#[test]
fn tracer_brackets_every_resolver_call() {
    let tracer = RecordingTracer::default();
    let events = Arc::clone(&tracer.events);
    let schema = builder().tracer(tracer).finish().unwrap();

    let response = Executor::new(schema)
        .execute(Request::new("{ a b }").root_value(root()))
        .to_json();

    assert_eq!(response, json!({"data": {"a": 1, "b": 2}}));
    assert_eq!(
        *events.lock().unwrap(),
        ["begin a", "execute Query.a", "end a 1", "begin b", "execute Query.b", "end b 2"]
    );
}
