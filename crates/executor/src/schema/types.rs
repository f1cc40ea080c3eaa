use std::{fmt, str::FromStr, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;

use super::{FieldDefinition, SchemaError, scalar};
use crate::{Context, FieldError};

pub type CoerceFn = Arc<dyn Fn(&Value) -> Result<Value, FieldError> + Send + Sync>;
pub type ResolveTypeFn = Arc<dyn Fn(&Value, &Context) -> Option<String> + Send + Sync>;

/// Output type of a field or argument, e.g. `[Test!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(Box<str>),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<Box<str>>) -> Self {
        TypeRef::Named(name.into())
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    #[must_use]
    pub fn list(self) -> Self {
        TypeRef::List(Box::new(self))
    }

    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidTypeReference(source.to_string());
        let source = source.trim();

        if let Some(inner) = source.strip_suffix('!') {
            return match TypeRef::parse(inner).map_err(|_| invalid())? {
                TypeRef::NonNull(_) => Err(invalid()),
                inner => Ok(TypeRef::NonNull(Box::new(inner))),
            };
        }

        if let Some(inner) = source.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let inner = TypeRef::parse(inner).map_err(|_| invalid())?;
            return Ok(TypeRef::List(Box::new(inner)));
        }

        let is_name = source
            .chars()
            .enumerate()
            .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
        if source.is_empty() || !is_name {
            return Err(invalid());
        }
        Ok(TypeRef::Named(source.into()))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Same type, without the outermost non-null wrapper.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner.as_ref(),
            other => other,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), TypeRef::List(_))
    }

    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name.as_ref(),
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }
}

impl FromStr for TypeRef {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeRef::parse(s)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

pub enum TypeDefinition {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(scalar) => scalar.name.as_str(),
            TypeDefinition::Enum(enum_type) => enum_type.name.as_str(),
            TypeDefinition::Object(object) => object.name.as_str(),
            TypeDefinition::Interface(interface) => interface.name.as_str(),
            TypeDefinition::Union(union) => union.name.as_str(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeDefinition::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDefinition::Interface(_) | TypeDefinition::Union(_))
    }
}

impl From<ScalarType> for TypeDefinition {
    fn from(value: ScalarType) -> Self {
        TypeDefinition::Scalar(value)
    }
}

impl From<EnumType> for TypeDefinition {
    fn from(value: EnumType) -> Self {
        TypeDefinition::Enum(value)
    }
}

impl From<ObjectType> for TypeDefinition {
    fn from(value: ObjectType) -> Self {
        TypeDefinition::Object(value)
    }
}

impl From<InterfaceType> for TypeDefinition {
    fn from(value: InterfaceType) -> Self {
        TypeDefinition::Interface(value)
    }
}

impl From<UnionType> for TypeDefinition {
    fn from(value: UnionType) -> Self {
        TypeDefinition::Union(value)
    }
}

pub struct ScalarType {
    pub(crate) name: String,
    pub(crate) coerce: Option<CoerceFn>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        ScalarType {
            name: name.into(),
            coerce: None,
        }
    }

    /// Converts resolver output into the serialized scalar. Without it, values are used as-is.
    #[must_use]
    pub fn coerce_result(mut self, f: impl Fn(&Value) -> Result<Value, FieldError> + Send + Sync + 'static) -> Self {
        self.coerce = Some(Arc::new(f));
        self
    }

    pub(crate) fn coerce(&self, value: Value) -> Result<Value, FieldError> {
        match &self.coerce {
            Some(coerce) => coerce(&value),
            None => scalar::coerce_builtin(&self.name, value),
        }
    }
}

pub struct EnumType {
    pub(crate) name: String,
    pub(crate) values: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        EnumType {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn coerce(&self, value: Value) -> Result<Value, FieldError> {
        match &value {
            Value::String(s) if self.values.iter().any(|v| v == s) => Ok(value),
            _ => Err(FieldError::new(format!(
                "Enum \"{}\" cannot represent value: {value}",
                self.name
            ))),
        }
    }
}

pub struct ObjectType {
    pub(crate) name: String,
    pub(crate) fields: IndexMap<String, FieldDefinition>,
    pub(crate) interfaces: Vec<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            fields: IndexMap::new(),
            interfaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

pub struct InterfaceType {
    pub(crate) name: String,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceType {
            name: name.into(),
            resolve_type: None,
        }
    }

    /// Picks the object type of a value. By default the value's `__typename` key is used.
    #[must_use]
    pub fn resolve_type(mut self, f: impl Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}

pub struct UnionType {
    pub(crate) name: String,
    pub(crate) possible_types: Vec<String>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

impl UnionType {
    pub fn new(name: impl Into<String>, possible_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        UnionType {
            name: name.into(),
            possible_types: possible_types.into_iter().map(Into::into).collect(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn resolve_type(mut self, f: impl Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static) -> Self {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}
