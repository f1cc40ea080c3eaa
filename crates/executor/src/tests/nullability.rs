use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

use super::execute;
use crate::{FieldDefinition, ObjectType, Request, Schema};

fn schema(test_type: &str) -> Schema {
    Schema::build("Query")
        .register(ObjectType::new("Query").field(FieldDefinition::new("test", test_type)))
        .register(
            ObjectType::new("Test")
                .field(FieldDefinition::new("req", "String!"))
                .field(FieldDefinition::new("opt", "String")),
        )
        .finish()
        .unwrap()
}

const QUERY: &str = indoc! {"
    {
      test {
        req
        opt
      }
    }
"};

#[test]
fn non_null_leaf_keeps_its_value() {
    let response = execute(
        schema("Test!"),
        Request::new(QUERY).root_value(json!({"test": {"req": "yes", "opt": "maybe"}})),
    );

    assert_eq!(response, json!({"data": {"test": {"req": "yes", "opt": "maybe"}}}));
}

#[test]
fn nullable_null_does_not_propagate() {
    let response = execute(schema("Test"), Request::new(QUERY).root_value(json!({"test": {"req": "yes"}})));

    assert_eq!(response, json!({"data": {"test": {"req": "yes", "opt": null}}}));
}

#[rstest]
#[case::nullable_parent("Test", json!({"test": null}))]
#[case::non_null_parent("Test!", Value::Null)]
fn non_null_violation_erases_nearest_nullable_ancestor(#[case] test_type: &str, #[case] data: Value) {
    let response = execute(schema(test_type), Request::new(QUERY).root_value(json!({"test": {"opt": "x"}})));

    assert_eq!(
        response,
        json!({
            "data": data,
            "errors": [{
                "message": "Cannot return null for non-nullable field Test.req",
                "locations": [{"line": 3, "column": 5}],
                "path": ["test", "req"],
                "extensions": {"code": "INVALID_NULL"}
            }]
        })
    );
}

#[test]
fn duplicate_selections_report_every_location() {
    let query = indoc! {"
        {
          test {
            req
            opt
            req
          }
        }
    "};
    let response = execute(schema("Test"), Request::new(query).root_value(json!({"test": {}})));

    assert_eq!(
        response,
        json!({
            "data": {"test": null},
            "errors": [{
                "message": "Cannot return null for non-nullable field Test.req",
                "locations": [{"line": 3, "column": 5}, {"line": 5, "column": 5}],
                "path": ["test", "req"],
                "extensions": {"code": "INVALID_NULL"}
            }]
        })
    );
}

#[test]
fn aliases_and_fragments_merge_into_the_same_key() {
    let query = indoc! {"
        {
          test {
            value: req
            ... on Test {
              value: req
            }
            ...Fields
          }
        }

        fragment Fields on Test {
          opt
        }
    "};
    let response = execute(
        schema("Test"),
        Request::new(query).root_value(json!({"test": {"req": "a", "opt": "b"}})),
    );

    assert_eq!(response, json!({"data": {"test": {"value": "a", "opt": "b"}}}));
}

#[test]
fn sibling_of_erased_subtree_still_resolves() {
    let schema = Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("test", "Test"))
                .field(FieldDefinition::new("other", "Int")),
        )
        .register(ObjectType::new("Test").field(FieldDefinition::new("req", "String!")))
        .finish()
        .unwrap();
    let request = Request::new("{ test { req } other }").root_value(json!({"test": {}, "other": 3}));

    let response = execute(schema, request);

    assert_eq!(response["data"], json!({"test": null, "other": 3}));
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1));
}
