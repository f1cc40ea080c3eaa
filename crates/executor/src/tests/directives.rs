use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

use super::execute;
use crate::{
    DirectiveContext, DirectiveOutcome, FieldDefinition, FieldError, Loader, ObjectType, Request, Resolved, Schema,
};

fn schema() -> Schema {
    Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "Int"))
                .field(FieldDefinition::new("b", "Int"))
                .field(FieldDefinition::new("items", "[Item]")),
        )
        .register(
            ObjectType::new("Item")
                .field(FieldDefinition::new("id", "Int"))
                .field(FieldDefinition::new("secret", "String!")),
        )
        .directive("admin", |ctx: &DirectiveContext<'_>| {
            match ctx.context.get("role").and_then(Value::as_str) {
                Some("admin") => DirectiveOutcome::Continue,
                Some(_) => DirectiveOutcome::Skip,
                None => DirectiveOutcome::Error(FieldError::unauthorized("Not authenticated")),
            }
        })
        .finish()
        .unwrap()
}

fn root() -> Value {
    json!({"a": 1, "b": 2, "items": [{"id": 1, "secret": "s1"}, {"id": 2, "secret": "s2"}]})
}

#[rstest]
#[case(json!({"withB": true}), json!({"a": 1, "b": 2}))]
#[case(json!({"withB": false}), json!({"a": 1}))]
fn skip_and_include_use_variables(#[case] variables: Value, #[case] data: Value) {
    let query = indoc! {"
        query($withB: Boolean!) {
          a @skip(if: false)
          b @include(if: $withB)
        }
    "};

    let response = execute(schema(), Request::new(query).variables(variables).root_value(root()));

    assert_eq!(response, json!({"data": data}));
}

#[test]
fn skipped_fragments() {
    let query = indoc! {"
        {
          ... on Query @skip(if: true) {
            a
          }
          ...B @include(if: false)
          ...B
        }

        fragment B on Query {
          b
        }
    "};

    let response = execute(schema(), Request::new(query).root_value(root()));

    assert_eq!(response, json!({"data": {"b": 2}}));
}

#[rstest]
#[case::admin("admin", json!({"data": {"items": [{"id": 1, "secret": "s1"}, {"id": 2, "secret": "s2"}]}}))]
#[case::member("member", json!({"data": {"items": [{"id": 1}, {"id": 2}]}}))]
fn runtime_directive_outcomes(#[case] role: &str, #[case] expected: Value) {
    let request = Request::new("{ items { id secret @admin } }")
        .root_value(root())
        .context_value("role", role);

    let response = execute(schema(), request);

    assert_eq!(response, expected);
}

#[test]
fn runtime_directive_error_nulls_the_field() {
    let request = Request::new("{ items { id secret @admin } }").root_value(root());

    let response = execute(schema(), request);

    assert_eq!(response["data"], json!({"items": [null, null]}));
    assert_eq!(
        response["errors"],
        json!([
            {
                "message": "Not authenticated",
                "locations": [{"line": 1, "column": 14}],
                "path": ["items", 0, "secret"],
                "extensions": {"code": "UNAUTHORIZED"}
            },
            {
                "message": "Not authenticated",
                "locations": [{"line": 1, "column": 14}],
                "path": ["items", 1, "secret"],
                "extensions": {"code": "UNAUTHORIZED"}
            }
        ])
    );
}

type Batches = Arc<Mutex<Vec<Vec<String>>>>;

struct FlagLoader(Batches);

impl Loader<String> for FlagLoader {
    type Value = Value;
    type Error = String;

    fn load(&self, keys: &[String]) -> Result<HashMap<String, Value>, String> {
        self.0.lock().unwrap().push(keys.to_vec());
        Ok(keys
            .iter()
            .map(|key| (key.clone(), Value::Bool(key.starts_with("beta"))))
            .collect())
    }
}

#[test]
fn runtime_directive_can_wait_on_batched_values() {
    let batches = Batches::default();
    let loader_batches = Arc::clone(&batches);
    let schema = Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "Int"))
                .field(FieldDefinition::new("b", "Int"))
                .field(FieldDefinition::new("c", "Int")),
        )
        .directive("flag", move |ctx: &DirectiveContext<'_>| {
            let Some(name) = ctx.arguments.get("name").and_then(Value::as_str) else {
                return DirectiveOutcome::Error(FieldError::new("missing flag name"));
            };
            let flags = ctx.context.dataloader().with(|| FlagLoader(Arc::clone(&loader_batches)));
            DirectiveOutcome::Pending(flags.load(name.to_string()).then(|enabled| match enabled {
                Resolved::Value(Value::Bool(true)) => Resolved::null(),
                _ => Resolved::Skip,
            }))
        })
        .finish()
        .unwrap();
    let query = r#"{ a @flag(name: "beta-a") b @flag(name: "old-b") c }"#;

    let response = execute(schema, Request::new(query).root_value(root()));

    assert_eq!(response, json!({"data": {"a": 1, "c": null}}));
    assert_eq!(
        *batches.lock().unwrap(),
        vec![vec!["beta-a".to_string(), "old-b".to_string()]]
    );
}
