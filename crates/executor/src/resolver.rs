use std::{borrow::Cow, cell::RefCell, rc::Rc};

use async_graphql_parser::{Positioned, types::Field};
use error::{ErrorCode, ErrorPath, GraphqlError, Location};
use serde_json::{Map, Value};

use crate::{Dataloader, Lazy, execution::Lookahead};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by application code for a single field.
///
/// Returned inside a [`BoxError`] or as [`Resolved::Error`], it is attached to the field's path
/// as-is. Any other error goes through the schema's [`ErrorHandler`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    pub message: Cow<'static, str>,
    pub code: ErrorCode,
    pub extensions: Vec<(Cow<'static, str>, Value)>,
}

impl FieldError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        FieldError {
            message: message.into(),
            code: ErrorCode::FieldError,
            extensions: Vec::new(),
        }
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(message).with_code(ErrorCode::Unauthorized)
    }

    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.extensions.push((key.into(), value.into()));
        self
    }

    pub(crate) fn into_graphql_error(
        self,
        path: ErrorPath,
        locations: impl IntoIterator<Item = Location>,
    ) -> GraphqlError {
        GraphqlError::new(self.message, self.code)
            .with_path(path)
            .with_locations(locations)
            .with_extensions(self.extensions)
    }
}

impl From<&'static str> for FieldError {
    fn from(message: &'static str) -> Self {
        FieldError::new(message)
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        FieldError::new(message)
    }
}

/// What a resolver produced for a field.
#[derive(Debug, Clone)]
pub enum Resolved {
    Value(Value),
    /// Items of a list field, each of which may be lazy or an error on its own.
    List(Vec<Resolved>),
    Lazy(Lazy),
    Error(FieldError),
    /// Every error is reported and the field is null.
    Errors(Vec<FieldError>),
    /// Omit the field from its object, or remove the item from its list.
    Skip,
}

impl Resolved {
    pub fn null() -> Self {
        Resolved::Value(Value::Null)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

impl From<Lazy> for Resolved {
    fn from(lazy: Lazy) -> Self {
        Resolved::Lazy(lazy)
    }
}

impl From<FieldError> for Resolved {
    fn from(error: FieldError) -> Self {
        Resolved::Error(error)
    }
}

impl From<Vec<Resolved>> for Resolved {
    fn from(items: Vec<Resolved>) -> Self {
        Resolved::List(items)
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Resolved::null)
    }
}

/// Outcome of the schema's [`ErrorHandler`].
pub enum Handled {
    /// Use this value in place of the error.
    Recovered(Resolved),
    Error(FieldError),
    Unhandled(BoxError),
}

/// Field being resolved when an error was raised.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo<'a> {
    pub type_name: &'a str,
    pub field_name: &'a str,
    pub path: &'a ErrorPath,
}

pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: BoxError, field: &FieldInfo<'_>) -> Handled;
}

impl<F> ErrorHandler for F
where
    F: Fn(BoxError, &FieldInfo<'_>) -> Handled + Send + Sync,
{
    fn handle(&self, error: BoxError, field: &FieldInfo<'_>) -> Handled {
        self(error, field)
    }
}

/// Request-wide state shared by every resolver.
#[derive(Default)]
pub struct Context {
    dataloader: Dataloader,
    data: Map<String, Value>,
    errors: RefCell<Vec<GraphqlError>>,
}

impl Context {
    pub fn new(data: Map<String, Value>) -> Self {
        Context {
            data,
            ..Default::default()
        }
    }

    pub fn dataloader(&self) -> &Dataloader {
        &self.dataloader
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn push_error(&self, error: GraphqlError) {
        self.errors.borrow_mut().push(error);
    }

    pub fn error_count(&self) -> usize {
        self.errors.borrow().len()
    }

    pub(crate) fn take_errors(&self) -> Vec<GraphqlError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }
}

/// Appends errors at a field's position without failing the field.
pub struct ExecutionErrors<'r> {
    context: &'r Context,
    path: ErrorPath,
    locations: Vec<Location>,
}

impl<'r> ExecutionErrors<'r> {
    pub(crate) fn new(context: &'r Context, path: ErrorPath, locations: Vec<Location>) -> Self {
        ExecutionErrors {
            context,
            path,
            locations,
        }
    }

    pub fn add(&self, error: impl Into<FieldError>) {
        let error = error.into().into_graphql_error(self.path.clone(), self.locations.iter().copied());
        self.context.push_error(error);
    }

    pub fn path(&self) -> &ErrorPath {
        &self.path
    }
}

/// Values a field asked for with [`FieldExtra`](crate::FieldExtra), prepared before its resolver runs.
#[derive(Default)]
pub(crate) struct Extras<'a> {
    pub ast_node: Option<&'a Positioned<Field>>,
    pub execution_errors: Option<ExecutionErrors<'a>>,
    pub path: Option<ErrorPath>,
    pub lookahead: Option<Lookahead<'a>>,
    pub parent: Option<Rc<Value>>,
    pub custom: Vec<(Cow<'static, str>, Value)>,
}

/// Everything a resolver function can read.
pub struct ResolverContext<'r> {
    pub(crate) object: &'r Value,
    pub(crate) arguments: &'r Map<String, Value>,
    pub(crate) context: &'r Context,
    pub(crate) extras: &'r Extras<'r>,
}

impl<'r> ResolverContext<'r> {
    /// Application value of the object owning the field.
    pub fn object(&self) -> &'r Value {
        self.object
    }

    pub fn arguments(&self) -> &'r Map<String, Value> {
        self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&'r Value> {
        self.arguments.get(name)
    }

    pub fn context(&self) -> &'r Context {
        self.context
    }

    pub fn dataloader(&self) -> &'r Dataloader {
        self.context.dataloader()
    }

    pub fn ast_node(&self) -> Option<&'r Positioned<Field>> {
        self.extras.ast_node
    }

    pub fn execution_errors(&self) -> Option<&'r ExecutionErrors<'r>> {
        self.extras.execution_errors.as_ref()
    }

    pub fn path(&self) -> Option<&'r ErrorPath> {
        self.extras.path.as_ref()
    }

    pub fn lookahead(&self) -> Option<&'r Lookahead<'r>> {
        self.extras.lookahead.as_ref()
    }

    /// Application value of the object one level above [`Self::object`], lists skipped.
    pub fn parent(&self) -> Option<&'r Value> {
        self.extras.parent.as_deref()
    }

    pub fn extra(&self, name: &str) -> Option<&'r Value> {
        self.extras
            .custom
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}
