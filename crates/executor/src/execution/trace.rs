use error::ErrorPath;
use serde_json::{Map, Value};

use crate::Resolved;

/// A resolver call, as seen by a [`Tracer`].
#[derive(Debug, Clone, Copy)]
pub struct TraceField<'a> {
    pub type_name: &'a str,
    pub field_name: &'a str,
    pub path: &'a ErrorPath,
    pub arguments: &'a Map<String, Value>,
}

/// Hooks around every resolver call. They observe, they cannot change the outcome of a field
/// other than through `execute_field`, which must call `resolve` exactly once.
pub trait Tracer: Send + Sync {
    fn begin_execute_field(&self, _field: &TraceField<'_>) {}

    fn execute_field(&self, _field: &TraceField<'_>, resolve: &mut dyn FnMut() -> Resolved) -> Resolved {
        resolve()
    }

    fn end_execute_field(&self, _field: &TraceField<'_>, _resolved: &Resolved) {}
}

/// Wraps each resolver call in an `execute_field` span.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldSpanTracer;

impl Tracer for FieldSpanTracer {
    fn execute_field(&self, field: &TraceField<'_>, resolve: &mut dyn FnMut() -> Resolved) -> Resolved {
        let span = tracing::info_span!(
            "execute_field",
            graphql_type = field.type_name,
            graphql_field = field.field_name,
            path = %field.path,
        );
        span.in_scope(resolve)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoopTracer;

impl Tracer for NoopTracer {}
