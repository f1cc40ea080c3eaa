use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use super::execute;
use crate::{ArgumentDefinition, FieldDefinition, InterfaceType, ObjectType, Request, Schema, UnionType};

fn schema() -> Schema {
    let node = FieldDefinition::new("node", "Node")
        .argument(ArgumentDefinition::new("id", "ID!"))
        .resolve(|ctx| {
            let id = ctx.argument("id").and_then(Value::as_u64);
            let node = ctx.object()["nodes"]
                .as_array()
                .and_then(|nodes| nodes.iter().find(|node| node["id"].as_u64() == id))
                .cloned();
            Ok(node.into())
        });

    Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(node)
                .field(FieldDefinition::new("search", "[SearchResult!]")),
        )
        .register(InterfaceType::new("Node"))
        .register(
            ObjectType::new("User")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("name", "String")),
        )
        .register(
            ObjectType::new("Post")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("title", "String")),
        )
        .register(UnionType::new("SearchResult", ["User", "Post"]).resolve_type(|value, _| {
            let name = if value.get("title").is_some() { "Post" } else { "User" };
            Some(name.to_string())
        }))
        .finish()
        .unwrap()
}

fn root() -> Value {
    json!({
        "nodes": [
            {"__typename": "User", "id": 1, "name": "Ada"},
            {"__typename": "Post", "id": 2, "title": "Hello"},
            {"__typename": "Comment", "id": 3}
        ],
        "search": [{"id": 1, "name": "Ada"}, {"id": 2, "title": "Hello"}]
    })
}

#[test]
fn interfaces_resolve_with_typename() {
    let query = indoc! {"
        {
          user: node(id: 1) {
            __typename
            ... on Node {
              id
            }
            ... on User {
              name
            }
            ... on Post {
              title
            }
          }
          post: node(id: 2) {
            __typename
            ... on Post {
              title
            }
          }
          nothing: node(id: 9) {
            id
          }
        }
    "};

    let response = execute(schema(), Request::new(query).root_value(root()));

    assert_eq!(
        response,
        json!({
            "data": {
                "user": {"__typename": "User", "id": "1", "name": "Ada"},
                "post": {"__typename": "Post", "title": "Hello"},
                "nothing": null
            }
        })
    );
}

#[test]
fn unions_use_their_type_resolver() {
    let query = "{ search { __typename ... on User { name } ... on Post { title } } }";

    let response = execute(schema(), Request::new(query).root_value(root()));

    assert_eq!(
        response,
        json!({
            "data": {
                "search": [
                    {"__typename": "User", "name": "Ada"},
                    {"__typename": "Post", "title": "Hello"}
                ]
            }
        })
    );
}

#[test]
fn unknown_concrete_type_is_an_error() {
    let response = execute(schema(), Request::new("{ node(id: 3) { id } }").root_value(root()));

    assert_eq!(
        response,
        json!({
            "data": {"node": null},
            "errors": [{
                "message": "Could not resolve Node to one of User, Post, got Comment",
                "locations": [{"line": 1, "column": 3}],
                "path": ["node"],
                "extensions": {"code": "UNRESOLVED_TYPE"}
            }]
        })
    );
}
