mod field;
mod scalar;
mod types;

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;

pub use field::*;
pub use types::*;

use crate::{BoxError, ErrorHandler, FieldInfo, Handled, RuntimeDirective, Tracer};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid type reference `{0}`")]
    InvalidTypeReference(String),
    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),
    #[error("root type `{0}` is not defined")]
    MissingRootType(String),
    #[error("root type `{0}` must be an object type")]
    RootTypeNotObject(String),
    #[error("`{owner}.{field}` references unknown type `{name}`")]
    UnknownType { owner: String, field: String, name: String },
    #[error("union `{union}` member `{member}` must be an object type")]
    NotAnObject { union: String, member: String },
    #[error("`{object}` implements `{interface}` which is not an interface")]
    NotAnInterface { object: String, interface: String },
}

/// Type definitions and hooks the executor resolves operations against.
pub struct Schema {
    types: IndexMap<String, TypeDefinition>,
    query: String,
    mutation: Option<String>,
    possible_types: HashMap<String, Vec<String>>,
    directives: HashMap<String, Arc<dyn RuntimeDirective>>,
    pub(crate) error_handler: Option<Arc<dyn ErrorHandler>>,
    pub(crate) tracer: Option<Arc<dyn Tracer>>,
}

impl Schema {
    pub fn build(query: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            query: query.into(),
            mutation: None,
            types: Vec::new(),
            directives: HashMap::new(),
            error_handler: None,
            tracer: None,
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.get_type(name).and_then(TypeDefinition::as_object)
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.object(&self.query)
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.mutation.as_deref().and_then(|name| self.object(name))
    }

    /// Object types an interface or union may resolve to.
    pub fn possible_types(&self, abstract_type: &str) -> &[String] {
        self.possible_types.get(abstract_type).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_possible_type(&self, abstract_type: &str, object: &str) -> bool {
        self.possible_types(abstract_type).iter().any(|name| name == object)
    }

    /// Whether a fragment with this type condition applies to `object`.
    pub(crate) fn type_condition_applies(&self, condition: &str, object: &ObjectType) -> bool {
        condition == object.name || self.is_possible_type(condition, &object.name)
    }

    pub fn directive(&self, name: &str) -> Option<&dyn RuntimeDirective> {
        self.directives.get(name).map(|directive| directive.as_ref())
    }
}

pub struct SchemaBuilder {
    query: String,
    mutation: Option<String>,
    types: Vec<TypeDefinition>,
    directives: HashMap<String, Arc<dyn RuntimeDirective>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn mutation(mut self, name: impl Into<String>) -> Self {
        self.mutation = Some(name.into());
        self
    }

    #[must_use]
    pub fn register(mut self, definition: impl Into<TypeDefinition>) -> Self {
        self.types.push(definition.into());
        self
    }

    /// Runs `directive` for every field carrying `@name` before resolving it.
    #[must_use]
    pub fn directive(mut self, name: impl Into<String>, directive: impl RuntimeDirective + 'static) -> Self {
        self.directives.insert(name.into(), Arc::new(directive));
        self
    }

    /// Converts resolver errors which aren't a [`FieldError`](crate::FieldError).
    #[must_use]
    pub fn error_handler(
        mut self,
        handler: impl Fn(BoxError, &FieldInfo<'_>) -> Handled + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    pub fn finish(self) -> Result<Schema, SchemaError> {
        let mut types = IndexMap::new();
        for name in scalar::BUILTIN_SCALARS {
            types.insert(name.to_string(), TypeDefinition::Scalar(ScalarType::new(name)));
        }
        for definition in self.types {
            let name = definition.name().to_string();
            let overrides_builtin = scalar::BUILTIN_SCALARS.contains(&name.as_str())
                && matches!(definition, TypeDefinition::Scalar(_));
            if types.contains_key(&name) && !overrides_builtin {
                return Err(SchemaError::DuplicateType(name));
            }
            types.insert(name, definition);
        }

        let mut possible_types: HashMap<String, Vec<String>> = HashMap::new();
        for definition in types.values() {
            match definition {
                TypeDefinition::Object(object) => {
                    validate_fields(&types, object)?;
                    for interface in &object.interfaces {
                        if !matches!(types.get(interface), Some(TypeDefinition::Interface(_))) {
                            return Err(SchemaError::NotAnInterface {
                                object: object.name.clone(),
                                interface: interface.clone(),
                            });
                        }
                        possible_types
                            .entry(interface.clone())
                            .or_default()
                            .push(object.name.clone());
                    }
                }
                TypeDefinition::Union(union) => {
                    for member in &union.possible_types {
                        if !matches!(types.get(member), Some(TypeDefinition::Object(_))) {
                            return Err(SchemaError::NotAnObject {
                                union: union.name.clone(),
                                member: member.clone(),
                            });
                        }
                    }
                    possible_types
                        .entry(union.name.clone())
                        .or_default()
                        .extend(union.possible_types.iter().cloned());
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) | TypeDefinition::Interface(_) => {}
            }
        }

        for root in std::iter::once(&self.query).chain(self.mutation.as_ref()) {
            match types.get(root) {
                Some(TypeDefinition::Object(_)) => {}
                Some(_) => return Err(SchemaError::RootTypeNotObject(root.clone())),
                None => return Err(SchemaError::MissingRootType(root.clone())),
            }
        }

        Ok(Schema {
            types,
            query: self.query,
            mutation: self.mutation,
            possible_types,
            directives: self.directives,
            error_handler: self.error_handler,
            tracer: self.tracer,
        })
    }
}

fn validate_fields(types: &IndexMap<String, TypeDefinition>, object: &ObjectType) -> Result<(), SchemaError> {
    let unknown = |field: String, name: &str| SchemaError::UnknownType {
        owner: object.name.clone(),
        field,
        name: name.to_string(),
    };

    for field in object.fields.values() {
        if let Some(err) = &field.type_error {
            return Err(err.clone());
        }
        let name = field.ty.named_type();
        if !types.contains_key(name) {
            return Err(unknown(field.name.clone(), name));
        }
        for argument in field.arguments.values() {
            if let Some(err) = &argument.type_error {
                return Err(err.clone());
            }
            let name = argument.ty.named_type();
            if !types.contains_key(name) {
                return Err(unknown(format!("{}({})", field.name, argument.name), name));
            }
        }
    }
    Ok(())
}
