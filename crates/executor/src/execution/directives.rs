use error::ErrorPath;
use serde_json::{Map, Value};

use crate::{Context, FieldError, Lazy, Resolved};

/// A directive evaluated at runtime for every field it annotates, before the field's arguments
/// are loaded. `@skip` and `@include` are built in and evaluated while collecting fields.
pub trait RuntimeDirective: Send + Sync {
    fn resolve(&self, ctx: &DirectiveContext<'_>) -> DirectiveOutcome;
}

impl<F> RuntimeDirective for F
where
    F: Fn(&DirectiveContext<'_>) -> DirectiveOutcome + Send + Sync,
{
    fn resolve(&self, ctx: &DirectiveContext<'_>) -> DirectiveOutcome {
        self(ctx)
    }
}

pub struct DirectiveContext<'a> {
    pub name: &'a str,
    pub arguments: &'a Map<String, Value>,
    /// Application value of the object owning the field.
    pub object: &'a Value,
    pub context: &'a Context,
    pub path: &'a ErrorPath,
}

#[derive(Debug)]
pub enum DirectiveOutcome {
    Continue,
    /// Omit the field from the response.
    Skip,
    Error(FieldError),
    /// Decide once the lazy value is available.
    Pending(Lazy),
}

impl DirectiveOutcome {
    /// `Skip` or errors map to themselves, a lazy value stays pending and anything else continues.
    pub fn from_resolved(resolved: Resolved) -> Self {
        match resolved {
            Resolved::Skip => DirectiveOutcome::Skip,
            Resolved::Error(error) => DirectiveOutcome::Error(error),
            Resolved::Errors(errors) => match errors.into_iter().next() {
                Some(error) => DirectiveOutcome::Error(error),
                None => DirectiveOutcome::Continue,
            },
            Resolved::Lazy(lazy) => DirectiveOutcome::Pending(lazy),
            Resolved::Value(_) | Resolved::List(_) => DirectiveOutcome::Continue,
        }
    }
}
