use std::rc::Rc;

use async_graphql_parser::types::{Directive, Field};
use async_graphql_value::Value as InputValue;
use error::ErrorCode;
use serde_json::{Map, Value};

use super::{FieldPosition, Runtime};
use crate::{FieldDefinition, FieldError, Lazy, Resolved, TypeRef};

/// Coerced arguments of a field occurrence, shared by every step resolving it.
#[derive(Debug, Clone)]
pub(crate) enum CachedArguments {
    Ready(Rc<Map<String, Value>>),
    Failed(FieldError),
    /// Some argument is still being loaded.
    Pending(Lazy),
}

impl CachedArguments {
    pub fn from_resolved(resolved: Resolved) -> Self {
        match resolved {
            Resolved::Value(Value::Object(arguments)) => CachedArguments::Ready(Rc::new(arguments)),
            Resolved::Error(error) => CachedArguments::Failed(error),
            Resolved::Lazy(lazy) => CachedArguments::Pending(lazy),
            _ => CachedArguments::Failed(
                FieldError::new("Arguments could not be loaded").with_code(ErrorCode::InternalServerError),
            ),
        }
    }
}

impl<'a> Runtime<'a> {
    pub(super) fn field_arguments(&mut self, position: &FieldPosition<'a>) -> CachedArguments {
        let key = (position.ast_node.pos, position.owner.name(), position.field.name());
        if let Some(cached) = self.arguments.get(&key) {
            return cached.clone();
        }
        let arguments = self.coerce_arguments(position.field, &position.ast_node.node);
        self.arguments.insert(key, arguments.clone());
        arguments
    }

    /// Replaces a pending cache entry once its value is known.
    pub(super) fn store_arguments(
        &mut self,
        position: &FieldPosition<'a>,
        arguments: CachedArguments,
    ) -> CachedArguments {
        let key = (position.ast_node.pos, position.owner.name(), position.field.name());
        self.arguments.insert(key, arguments.clone());
        arguments
    }

    fn coerce_arguments(&self, field: &FieldDefinition, ast_field: &Field) -> CachedArguments {
        let mut arguments = Map::new();
        let mut loaded = Vec::new();

        for (name, definition) in &field.arguments {
            let value = ast_field
                .get_argument(name)
                .and_then(|value| input_value(&value.node, self.variables))
                .or_else(|| definition.default.clone());
            let provided = value.is_some();
            let value = match value {
                None | Some(Value::Null) if definition.ty.is_non_null() => {
                    return CachedArguments::Failed(invalid_argument(name, &definition.ty, provided));
                }
                None => continue,
                Some(value) => value,
            };
            match &definition.loads {
                Some(loads) if !value.is_null() => loaded.push((name.clone(), loads(&value, self.ctx))),
                _ => {
                    arguments.insert(name.clone(), value);
                }
            }
        }

        if loaded.is_empty() {
            return CachedArguments::Ready(Rc::new(arguments));
        }
        let pending = loaded
            .iter()
            .any(|(_, resolved)| matches!(resolved, Resolved::Lazy(lazy) if !lazy.is_ready()));
        if pending {
            return CachedArguments::Pending(Lazy::new(move || with_loaded(arguments, loaded)));
        }
        CachedArguments::from_resolved(with_loaded(arguments, loaded))
    }
}

fn invalid_argument(name: &str, ty: &TypeRef, provided: bool) -> FieldError {
    let message = if provided {
        format!("Argument \"{name}\" of non-null type \"{ty}\" must not be null.")
    } else {
        format!("Argument \"{name}\" of required type \"{ty}\" was not provided.")
    };
    FieldError::new(message).with_code(ErrorCode::InvalidArgument)
}

fn with_loaded(mut arguments: Map<String, Value>, loaded: Vec<(String, Resolved)>) -> Resolved {
    for (name, resolved) in loaded {
        match loaded_value(resolved) {
            Ok(value) => {
                arguments.insert(name, value);
            }
            Err(error) => return Resolved::Error(error),
        }
    }
    Resolved::Value(Value::Object(arguments))
}

fn loaded_value(resolved: Resolved) -> Result<Value, FieldError> {
    match resolved {
        Resolved::Value(value) => Ok(value),
        Resolved::List(items) => items.into_iter().map(loaded_value).collect::<Result<_, _>>().map(Value::Array),
        Resolved::Lazy(lazy) => loaded_value(lazy.sync_all()),
        Resolved::Error(error) => Err(error),
        Resolved::Errors(errors) => Err(errors
            .into_iter()
            .next()
            .unwrap_or_else(|| FieldError::new("Argument could not be loaded"))),
        Resolved::Skip => Ok(Value::Null),
    }
}

pub(super) fn directive_arguments(directive: &Directive, variables: &Map<String, Value>) -> Map<String, Value> {
    directive
        .arguments
        .iter()
        .filter_map(|(name, value)| Some((name.node.to_string(), input_value(&value.node, variables)?)))
        .collect()
}

/// Converts a query literal to JSON. A variable missing from `variables` gives `None`, which drops
/// the key of an input object and is `null` inside a list.
pub(super) fn input_value(value: &InputValue, variables: &Map<String, Value>) -> Option<Value> {
    let value = match value {
        InputValue::Variable(name) => return variables.get(name.as_str()).cloned(),
        InputValue::Null => Value::Null,
        InputValue::Number(number) => Value::Number(number.clone()),
        InputValue::String(s) => Value::String(s.clone()),
        InputValue::Boolean(b) => Value::Bool(*b),
        InputValue::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        InputValue::Enum(name) => Value::String(name.to_string()),
        InputValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| input_value(item, variables).unwrap_or_default())
                .collect(),
        ),
        InputValue::Object(fields) => Value::Object(
            fields
                .iter()
                .filter_map(|(name, value)| Some((name.to_string(), input_value(value, variables)?)))
                .collect(),
        ),
    };
    Some(value)
}
