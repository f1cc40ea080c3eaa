use serde_json::{Number, Value};

use crate::FieldError;

pub(crate) const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Result coercion of the built-in scalars. Custom scalars without a hook are passed through.
pub(crate) fn coerce_builtin(name: &str, value: Value) -> Result<Value, FieldError> {
    let coerced = match name {
        "Int" => coerce_int(&value),
        "Float" => value.as_f64().and_then(Number::from_f64).map(Value::Number),
        "String" => match &value {
            Value::String(_) => Some(value.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        "Boolean" => value.as_bool().map(Value::Bool),
        "ID" => match &value {
            Value::String(_) => Some(value.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::String(n.to_string())),
            _ => None,
        },
        _ => Some(value.clone()),
    };

    coerced.ok_or_else(|| FieldError::new(format!("{name} cannot represent value: {value}")))
}

fn coerce_int(value: &Value) -> Option<Value> {
    let int = match value {
        Value::Number(n) => match n.as_i64() {
            Some(int) => Some(int),
            None => n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64),
        },
        _ => None,
    }?;
    i32::try_from(int).ok().map(Value::from)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("Int", json!(7), json!(7))]
    #[case("Int", json!(7.0), json!(7))]
    #[case("Float", json!(1), json!(1.0))]
    #[case("String", json!("yes"), json!("yes"))]
    #[case("String", json!(12), json!("12"))]
    #[case("String", json!(true), json!("true"))]
    #[case("Boolean", json!(false), json!(false))]
    #[case("ID", json!(5), json!("5"))]
    #[case("ID", json!("abc"), json!("abc"))]
    #[case("DateTime", json!("2024-01-01"), json!("2024-01-01"))]
    fn coerces(#[case] scalar: &str, #[case] input: Value, #[case] expected: Value) {
        assert_eq!(coerce_builtin(scalar, input).unwrap(), expected);
    }

    #[rstest]
    #[case("Int", json!(2_147_483_648_i64))]
    #[case("Int", json!(1.5))]
    #[case("Int", json!("1"))]
    #[case("Float", json!("1.0"))]
    #[case("Boolean", json!(1))]
    #[case("String", json!({"a": 1}))]
    #[case("ID", json!(1.5))]
    fn rejects(#[case] scalar: &str, #[case] input: Value) {
        let error = coerce_builtin(scalar, input).unwrap_err();
        assert!(error.message.starts_with(scalar), "{}", error.message);
    }
}
