use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::{
    EnumType, ErrorsConfig, Executor, ExecutorConfig, FieldDefinition, FieldError, Handled, ObjectType, Request,
    Resolved, ScalarType, Schema, SchemaBuilder,
};

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("connection reset")]
    ConnectionReset,
    #[error("row {0} not found")]
    NotFound(u64),
}

fn builder() -> SchemaBuilder {
    Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(
                    FieldDefinition::new("explicit", "Int")
                        .resolve(|_| Err(FieldError::new("Out of stock").with_extension("sku", "A-1").into())),
                )
                .field(FieldDefinition::new("reset", "Int").resolve(|_| Err(StoreError::ConnectionReset.into())))
                .field(FieldDefinition::new("missing", "Int").resolve(|_| Err(StoreError::NotFound(7).into())))
                .field(FieldDefinition::new("several", "[Int]").resolve(|_| {
                    Ok(Resolved::Errors(vec![FieldError::new("first"), FieldError::new("second")]))
                }))
                .field(FieldDefinition::new("fine", "Int").resolve(|_| Ok(json!(1).into()))),
        )
}

fn execute(builder: SchemaBuilder, config: ExecutorConfig, query: &str) -> Value {
    Executor::with_config(builder.finish().unwrap(), config)
        .execute(Request::new(query))
        .to_json()
}

#[test]
fn explicit_field_errors_keep_message_and_extensions() {
    let response = execute(builder(), ExecutorConfig::default(), "{ explicit fine }");

    assert_eq!(
        response,
        json!({
            "data": {"explicit": null, "fine": 1},
            "errors": [{
                "message": "Out of stock",
                "locations": [{"line": 1, "column": 3}],
                "path": ["explicit"],
                "extensions": {"code": "FIELD_ERROR", "sku": "A-1"}
            }]
        })
    );
}

#[test]
fn unhandled_errors_are_masked() {
    let response = execute(builder(), ExecutorConfig::default(), "{ reset }");

    assert_eq!(
        response["errors"],
        json!([{
            "message": "Internal server error",
            "locations": [{"line": 1, "column": 3}],
            "path": ["reset"],
            "extensions": {"code": "INTERNAL_SERVER_ERROR"}
        }])
    );
}

#[test]
fn masking_can_be_disabled() {
    let config = ExecutorConfig {
        errors: ErrorsConfig {
            mask_unhandled: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let response = execute(builder(), config, "{ reset }");

    assert_eq!(response["errors"][0]["message"], json!("connection reset"));
}

#[test]
fn error_handler_recovers_or_converts() {
    let builder = builder().error_handler(|error, field| match error.downcast::<StoreError>() {
        Ok(error) => match *error {
            StoreError::NotFound(_) => Handled::Recovered(Resolved::Value(json!(0))),
            StoreError::ConnectionReset => {
                Handled::Error(FieldError::new(format!("{} is unavailable", field.field_name)))
            }
        },
        Err(error) => Handled::Unhandled(error),
    });

    let response = execute(builder, ExecutorConfig::default(), "{ missing reset explicit }");

    assert_eq!(
        response,
        json!({
            "data": {"missing": 0, "reset": null, "explicit": null},
            "errors": [
                {
                    "message": "reset is unavailable",
                    "locations": [{"line": 1, "column": 11}],
                    "path": ["reset"],
                    "extensions": {"code": "FIELD_ERROR"}
                },
                {
                    "message": "Out of stock",
                    "locations": [{"line": 1, "column": 17}],
                    "path": ["explicit"],
                    "extensions": {"code": "FIELD_ERROR", "sku": "A-1"}
                }
            ]
        })
    );
}

#[test]
fn every_returned_error_is_reported() {
    let response = execute(builder(), ExecutorConfig::default(), "{ several }");

    assert_eq!(
        response,
        json!({
            "data": {"several": null},
            "errors": [
                {
                    "message": "first",
                    "locations": [{"line": 1, "column": 3}],
                    "path": ["several", 0],
                    "extensions": {"code": "FIELD_ERROR"}
                },
                {
                    "message": "second",
                    "locations": [{"line": 1, "column": 3}],
                    "path": ["several", 1],
                    "extensions": {"code": "FIELD_ERROR"}
                }
            ]
        })
    );
}

#[test]
fn empty_error_list_is_a_null() {
    let schema = Schema::build("Query")
        .register(ObjectType::new("Query").field(FieldDefinition::new("test", "Test")))
        .register(
            ObjectType::new("Test")
                .field(FieldDefinition::new("req", "String!").resolve(|_| Ok(Resolved::Errors(Vec::new()))))
                .field(FieldDefinition::new("opt", "String")),
        );
    let request = Request::new("{ test { req opt } }").root_value(json!({"test": {"opt": "x"}}));

    let response = Executor::new(schema.finish().unwrap()).execute(request).to_json();

    assert_eq!(
        response,
        json!({
            "data": {"test": null},
            "errors": [{
                "message": "Cannot return null for non-nullable field Test.req",
                "locations": [{"line": 1, "column": 10}],
                "path": ["test", "req"],
                "extensions": {"code": "INVALID_NULL"}
            }]
        })
    );
}

#[test]
fn leaf_coercion_failures() {
    let schema = Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("count", "Int"))
                .field(FieldDefinition::new("color", "Color"))
                .field(FieldDefinition::new("when", "Date")),
        )
        .register(EnumType::new("Color", ["RED", "GREEN"]))
        .register(ScalarType::new("Date").coerce_result(|value| match value.as_str() {
            Some(date) if date.len() == 10 => Ok(Value::String(date.to_string())),
            _ => Err(FieldError::new("Invalid date")),
        }))
        .finish()
        .unwrap();
    let request = Request::new("{ count color when }").root_value(json!({
        "count": "many",
        "color": "BLUE",
        "when": "2024-02-30"
    }));

    let response = Executor::new(schema).execute(request).to_json();

    assert_eq!(
        response,
        json!({
            "data": {"count": null, "color": null, "when": "2024-02-30"},
            "errors": [
                {
                    "message": "Int cannot represent value: \"many\"",
                    "locations": [{"line": 1, "column": 3}],
                    "path": ["count"],
                    "extensions": {"code": "FIELD_ERROR"}
                },
                {
                    "message": "Enum \"Color\" cannot represent value: \"BLUE\"",
                    "locations": [{"line": 1, "column": 9}],
                    "path": ["color"],
                    "extensions": {"code": "FIELD_ERROR"}
                }
            ]
        })
    );
}
