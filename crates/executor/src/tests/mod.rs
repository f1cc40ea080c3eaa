mod abstract_types;
mod batching;
mod directives;
mod errors;
mod nullability;
mod operations;

use serde_json::Value;

use crate::{Executor, Request, Schema};

fn execute(schema: Schema, request: Request) -> Value {
    Executor::new(schema).execute(request).to_json()
}
