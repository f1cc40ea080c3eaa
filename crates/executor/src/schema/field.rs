use std::{borrow::Cow, fmt, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;

use super::{SchemaError, TypeRef};
use crate::{BoxError, Context, Resolved, ResolverContext};

pub type ResolverFn = Arc<dyn Fn(&ResolverContext<'_>) -> Result<Resolved, BoxError> + Send + Sync>;
pub type DeriveFn = Arc<dyn Fn(&Value) -> Resolved + Send + Sync>;
pub type LoadsFn = Arc<dyn Fn(&Value, &Context) -> Resolved + Send + Sync>;
pub type ExtraFn = Arc<dyn Fn(&Context) -> Value + Send + Sync>;

/// How a field gets its value, chosen when the schema is built.
#[derive(Clone)]
pub enum FieldResolver {
    /// Reads a key of the parent object.
    Property(Cow<'static, str>),
    /// Computed from the parent object alone.
    Derived(DeriveFn),
    Function(ResolverFn),
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldResolver::Property(key) => f.debug_tuple("Property").field(key).finish(),
            FieldResolver::Derived(_) => f.write_str("Derived"),
            FieldResolver::Function(_) => f.write_str("Function"),
        }
    }
}

/// Additional values injected into the [`ResolverContext`] of a field.
#[derive(Clone)]
pub enum FieldExtra {
    AstNode,
    ExecutionErrors,
    Path,
    Lookahead,
    /// The object above the one owning the field.
    Parent,
    Custom(Cow<'static, str>, ExtraFn),
}

impl FieldExtra {
    pub fn custom(name: impl Into<Cow<'static, str>>, f: impl Fn(&Context) -> Value + Send + Sync + 'static) -> Self {
        FieldExtra::Custom(name.into(), Arc::new(f))
    }
}

impl fmt::Debug for FieldExtra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExtra::AstNode => f.write_str("AstNode"),
            FieldExtra::ExecutionErrors => f.write_str("ExecutionErrors"),
            FieldExtra::Path => f.write_str("Path"),
            FieldExtra::Lookahead => f.write_str("Lookahead"),
            FieldExtra::Parent => f.write_str("Parent"),
            FieldExtra::Custom(name, _) => f.debug_tuple("Custom").field(name).finish(),
        }
    }
}

pub struct FieldDefinition {
    pub(crate) name: String,
    pub(crate) ty: TypeRef,
    pub(crate) arguments: IndexMap<String, ArgumentDefinition>,
    pub(crate) resolver: FieldResolver,
    pub(crate) extras: Vec<FieldExtra>,
    pub(crate) type_error: Option<SchemaError>,
}

impl FieldDefinition {
    /// A field of type `ty` in GraphQL notation, reading the parent's key of the same name.
    pub fn new(name: impl Into<String>, ty: &str) -> Self {
        let (ty, type_error) = parse_type(ty);
        let mut field = Self::with_type(name, ty);
        field.type_error = type_error;
        field
    }

    pub fn with_type(name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        FieldDefinition {
            resolver: FieldResolver::Property(Cow::Owned(name.clone())),
            name,
            ty,
            arguments: IndexMap::new(),
            extras: Vec::new(),
            type_error: None,
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.resolver = FieldResolver::Property(key.into());
        self
    }

    #[must_use]
    pub fn derive(mut self, f: impl Fn(&Value) -> Resolved + Send + Sync + 'static) -> Self {
        self.resolver = FieldResolver::Derived(Arc::new(f));
        self
    }

    #[must_use]
    pub fn resolve(
        mut self,
        f: impl Fn(&ResolverContext<'_>) -> Result<Resolved, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.resolver = FieldResolver::Function(Arc::new(f));
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: FieldExtra) -> Self {
        self.extras.push(extra);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }
}

pub struct ArgumentDefinition {
    pub(crate) name: String,
    pub(crate) ty: TypeRef,
    pub(crate) default: Option<Value>,
    pub(crate) loads: Option<LoadsFn>,
    pub(crate) type_error: Option<SchemaError>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: &str) -> Self {
        let (ty, type_error) = parse_type(ty);
        ArgumentDefinition {
            name: name.into(),
            ty,
            default: None,
            loads: None,
            type_error,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Replaces the argument's value, usually an id, with the object it designates.
    #[must_use]
    pub fn loads(mut self, f: impl Fn(&Value, &Context) -> Resolved + Send + Sync + 'static) -> Self {
        self.loads = Some(Arc::new(f));
        self
    }
}

fn parse_type(source: &str) -> (TypeRef, Option<SchemaError>) {
    match TypeRef::parse(source) {
        Ok(ty) => (ty, None),
        Err(err) => (TypeRef::Named(source.into()), Some(err)),
    }
}
