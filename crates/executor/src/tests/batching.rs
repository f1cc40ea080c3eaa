use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use super::execute;
use crate::{FieldDefinition, Loader, ObjectType, Request, Resolved, Schema};

type Batches = Arc<Mutex<Vec<Vec<u64>>>>;

struct UserLoader {
    batches: Batches,
}

impl Loader<u64> for UserLoader {
    type Value = Value;
    type Error = String;

    fn load(&self, keys: &[u64]) -> Result<HashMap<u64, Value>, String> {
        self.batches.lock().unwrap().push(keys.to_vec());
        Ok(keys
            .iter()
            .filter(|id| **id != 404)
            .map(|id| (*id, json!({"id": id, "name": format!("user {id}")})))
            .collect())
    }
}

fn user_field(
    name: &str,
    batches: &Batches,
    id: impl Fn(&Value) -> Option<u64> + Send + Sync + 'static,
) -> FieldDefinition {
    let batches = Arc::clone(batches);
    FieldDefinition::new(name, "User").resolve(move |ctx| {
        let Some(id) = id(ctx.object()) else {
            return Ok(Resolved::null());
        };
        let users = ctx.dataloader().with(|| UserLoader {
            batches: Arc::clone(&batches),
        });
        Ok(users.load(id).into())
    })
}

fn user_type() -> ObjectType {
    ObjectType::new("User")
        .field(FieldDefinition::new("id", "ID!"))
        .field(FieldDefinition::new("name", "String"))
}

#[test]
fn sibling_fields_share_one_batch() {
    let batches = Batches::default();
    let schema = Schema::build("Query")
        .register(
            ObjectType::new("Query")
                .field(user_field("first", &batches, |_| Some(1)))
                .field(user_field("second", &batches, |_| Some(2)))
                .field(user_field("missing", &batches, |_| Some(404))),
        )
        .register(user_type())
        .finish()
        .unwrap();

    let response = execute(schema, Request::new("{ first { id name } second { name } missing { id } }"));

    assert_eq!(
        response,
        json!({
            "data": {
                "first": {"id": "1", "name": "user 1"},
                "second": {"name": "user 2"},
                "missing": null
            }
        })
    );
    assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 404]]);
}

#[test]
fn fields_at_the_same_depth_are_batched_across_list_items() {
    let batches = Batches::default();
    let schema = Schema::build("Query")
        .register(ObjectType::new("Query").field(FieldDefinition::new("posts", "[Post!]!")))
        .register(
            ObjectType::new("Post")
                .field(FieldDefinition::new("id", "ID!"))
                .field(user_field("author", &batches, |post| post["authorId"].as_u64())),
        )
        .register(user_type())
        .finish()
        .unwrap();
    let query = indoc! {"
        {
          posts {
            id
            author {
              name
            }
          }
        }
    "};
    let root = json!({
        "posts": [
            {"id": 1, "authorId": 10},
            {"id": 2, "authorId": 11},
            {"id": 3, "authorId": 10},
            {"id": 4}
        ]
    });

    let response = execute(schema, Request::new(query).root_value(root));

    assert_eq!(
        response,
        json!({
            "data": {
                "posts": [
                    {"id": "1", "author": {"name": "user 10"}},
                    {"id": "2", "author": {"name": "user 11"}},
                    {"id": "3", "author": {"name": "user 10"}},
                    {"id": "4", "author": null}
                ]
            }
        })
    );
    assert_eq!(*batches.lock().unwrap(), vec![vec![10, 11]]);
}

#[test]
fn chained_lazies_batch_each_level() {
    let batches = Batches::default();
    let loader_batches = Arc::clone(&batches);
    let schema = Schema::build("Query")
        .register(
            ObjectType::new("Query").field(FieldDefinition::new("managers", "[User]").resolve(move |ctx| {
                let users = ctx.dataloader().with(|| UserLoader {
                    batches: Arc::clone(&loader_batches),
                });
                let items = [1, 2]
                    .into_iter()
                    .map(|id| {
                        let users = users.clone();
                        // Each user's manager has the id of the user plus 100.
                        Resolved::Lazy(users.load(id).then(move |user| match user {
                            Resolved::Value(user) => match user["id"].as_u64() {
                                Some(id) => users.load(id + 100).into(),
                                None => Resolved::null(),
                            },
                            other => other,
                        }))
                    })
                    .collect();
                Ok(Resolved::List(items))
            })),
        )
        .register(user_type())
        .finish()
        .unwrap();

    let response = execute(schema, Request::new("{ managers { name } }"));

    assert_eq!(
        response,
        json!({"data": {"managers": [{"name": "user 101"}, {"name": "user 102"}]}})
    );
    assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2], vec![101, 102]]);
}
