mod tree;

use error::GraphqlError;
use serde_json::Value;

pub(crate) use tree::{ResponseValue, ResultId, ResultTree};

/// Outcome of an operation: the data tree, possibly partial, and every error raised producing it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Response {
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl Response {
    pub(crate) fn request_error(error: GraphqlError) -> Self {
        Response {
            data: None,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
