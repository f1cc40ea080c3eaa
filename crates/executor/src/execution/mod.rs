//! The step machine resolving an operation into a [`ResultTree`].
//!
//! Every field occurrence gets a [`FieldResolveStep`] and every list item a [`ListItemStep`].
//! Steps run from the [`RunQueue`] until they finish or suspend on a lazy value. Suspended steps
//! are bucketed by depth and resumed shallowest first, after the dataloader ran its batches, so
//! that fields at the same level share their fetches.

mod arguments;
mod directives;
mod error;
mod field_resolve_step;
mod list_item_step;
mod lookahead;
mod run_queue;
mod selections;
mod step;
mod trace;

use std::rc::Rc;

use async_graphql_parser::{
    Pos, Positioned,
    types::{ExecutableDocument, Field, SelectionSet},
};
use ::error::{ErrorCode, ErrorPath, ErrorPathSegment, Location};
use fxhash::FxHashMap;
use serde_json::{Map, Value};

pub use directives::{DirectiveContext, DirectiveOutcome, RuntimeDirective};
pub use lookahead::Lookahead;
pub use trace::{FieldSpanTracer, TraceField, Tracer};

pub(crate) use trace::NoopTracer;

use self::{
    arguments::CachedArguments,
    error::ExecutionError,
    field_resolve_step::FieldResolveStep,
    list_item_step::ListItemStep,
    run_queue::RunQueue,
    selections::GatheredFields,
    step::{BoxedStep, Step, StepState},
};
use crate::{
    BoxError, Context, FieldDefinition, FieldError, FieldInfo, Handled, ObjectType, ResolveTypeFn, Resolved, Schema,
    TypeDefinition, TypeRef,
    config::ExecutorConfig,
    response::{ResponseValue, ResultId, ResultTree},
};

/// Mutable state of one operation execution.
pub(crate) struct Runtime<'a> {
    schema: &'a Schema,
    document: &'a ExecutableDocument,
    variables: &'a Map<String, Value>,
    ctx: &'a Context,
    config: &'a ExecutorConfig,
    tracer: &'a dyn Tracer,
    tree: ResultTree,
    queue: RunQueue<'a>,
    arguments: FxHashMap<(Pos, &'a str, &'a str), CachedArguments>,
}

/// A field of an object type, with every occurrence of its response key in the query.
pub(crate) struct FieldPosition<'a> {
    owner: &'a ObjectType,
    field: &'a FieldDefinition,
    response_key: &'a str,
    ast_node: &'a Positioned<Field>,
    ast_nodes: Vec<&'a Positioned<Field>>,
}

impl<'a> FieldPosition<'a> {
    fn locations(&self) -> Vec<Location> {
        self.ast_nodes.iter().map(|field| location(field.pos)).collect()
    }

    fn selection_sets(&self) -> impl Iterator<Item = &'a SelectionSet> {
        self.ast_nodes.iter().copied().map(|field| &field.node.selection_set.node)
    }
}

/// Where a value gets written: a key of an object or an index of a list.
pub(crate) struct Slot<'a> {
    result: ResultId,
    key: ErrorPathSegment,
    ty: &'a TypeRef,
}

/// A value that is neither null, an error nor lazy.
pub(crate) enum Completed {
    Value(Value),
    List(Vec<Resolved>),
}

pub(crate) fn location(pos: Pos) -> Location {
    Location::new(pos.line, pos.column)
}

impl<'a> Runtime<'a> {
    pub fn new(
        schema: &'a Schema,
        document: &'a ExecutableDocument,
        variables: &'a Map<String, Value>,
        ctx: &'a Context,
        config: &'a ExecutorConfig,
        tracer: &'a dyn Tracer,
        base_path: ErrorPath,
    ) -> Self {
        Runtime {
            schema,
            document,
            variables,
            ctx,
            config,
            tracer,
            tree: ResultTree::new(base_path),
            queue: RunQueue::default(),
            arguments: FxHashMap::default(),
        }
    }

    /// Resolves `selection_set` against `root_value`. Root fields run one after the other, each
    /// with its whole subtree, when `serial` is set.
    pub fn run_operation(
        &mut self,
        root_type: &'a ObjectType,
        selection_set: &'a SelectionSet,
        root_value: Value,
        serial: bool,
    ) -> Option<Value> {
        let gathered = self.gather_fields(root_type, [selection_set]);
        let root = self.tree.new_root(Rc::new(root_value), gathered.keys().copied());
        self.evaluate_selections(root, root_type, gathered, serial);
        self.complete();
        self.tree.to_json(root)
    }

    fn evaluate_selections(
        &mut self,
        node: ResultId,
        object: &'a ObjectType,
        gathered: GatheredFields<'a>,
        serial: bool,
    ) {
        let depth = self.tree.depth(node);
        for (response_key, ast_nodes) in gathered {
            let Some(&ast_node) = ast_nodes.first() else {
                continue;
            };
            let key = ErrorPathSegment::Field(response_key.into());
            let name = ast_node.node.name.node.as_str();
            if name == "__typename" {
                self.tree
                    .write(node, &key, ResponseValue::Leaf(Value::String(object.name().to_string())));
                continue;
            }

            let Some(field) = object.get_field(name) else {
                let error = ExecutionError::UnknownField {
                    type_name: object.name().to_string(),
                    field_name: name.to_string(),
                }
                .into_field_error(&self.config.errors);
                let locations = ast_nodes.iter().map(|field| location(field.pos));
                self.push_error(node, self.tree.field_path(node, &key), locations.collect(), error);
                self.tree.write(node, &key, ResponseValue::Null);
                continue;
            };

            let position = Rc::new(FieldPosition {
                owner: object,
                field,
                response_key,
                ast_node,
                ast_nodes,
            });
            let step = Box::new(FieldResolveStep::new(position, node, depth));
            if serial {
                self.run_isolated(step);
            } else {
                self.queue.push(step);
            }
        }
    }

    fn push_error(&self, result: ResultId, path: ErrorPath, locations: Vec<Location>, error: FieldError) {
        if !self.tree.is_dead(result) {
            self.ctx.push_error(error.into_graphql_error(path, locations));
        }
    }

    /// Records `error` at the slot and writes a null there.
    fn fail(&mut self, slot: &Slot<'a>, position: &FieldPosition<'a>, error: FieldError) {
        let path = self.tree.field_path(slot.result, &slot.key);
        self.push_error(slot.result, path, position.locations(), error);
        self.tree.write_null(slot.result, &slot.key, slot.ty.is_non_null());
    }

    fn null_value(&mut self, slot: &Slot<'a>, position: &FieldPosition<'a>) {
        if slot.ty.is_non_null() {
            let type_name = position.owner.name().to_string();
            let field_name = position.field.name().to_string();
            let error = match slot.key {
                ErrorPathSegment::Field(_) => ExecutionError::InvalidNull { type_name, field_name },
                ErrorPathSegment::Index(_) => ExecutionError::InvalidNullElement {
                    type_name,
                    field_name,
                    element: slot.ty.to_string(),
                },
            };
            self.fail(slot, position, error.into_field_error(&self.config.errors));
        } else {
            self.tree.write(slot.result, &slot.key, ResponseValue::Null);
        }
    }

    /// Handles nulls, errors and skips. Anything else is returned to be completed against the
    /// slot's type.
    fn continue_value(
        &mut self,
        slot: &Slot<'a>,
        position: &FieldPosition<'a>,
        resolved: Resolved,
    ) -> Option<Completed> {
        match resolved {
            Resolved::Value(Value::Null) => self.null_value(slot, position),
            Resolved::Value(value) => return Some(Completed::Value(value)),
            Resolved::List(items) => return Some(Completed::List(items)),
            Resolved::Lazy(lazy) => return self.continue_value(slot, position, lazy.sync_all()),
            Resolved::Error(error) => self.fail(slot, position, error),
            Resolved::Errors(errors) if errors.is_empty() => self.null_value(slot, position),
            Resolved::Errors(errors) => {
                let indexed = matches!(slot.key, ErrorPathSegment::Field(_)) && slot.ty.is_list();
                let path = self.tree.field_path(slot.result, &slot.key);
                for (index, error) in errors.into_iter().enumerate() {
                    let mut path = path.clone();
                    if indexed {
                        path.push(ErrorPathSegment::Index(index));
                    }
                    self.push_error(slot.result, path, position.locations(), error);
                }
                self.tree.write_null(slot.result, &slot.key, slot.ty.is_non_null());
            }
            Resolved::Skip => {
                if let ErrorPathSegment::Index(index) = slot.key {
                    self.tree.skip_at(slot.result, index);
                }
            }
        }
        None
    }

    fn continue_field(&mut self, slot: &Slot<'a>, position: &Rc<FieldPosition<'a>>, completed: Completed) {
        let ty = slot.ty.nullable();
        let TypeRef::List(item_type) = ty else {
            let value = match completed {
                Completed::Value(value) => value,
                Completed::List(_) => {
                    let error = ExecutionError::UnexpectedList {
                        type_name: position.owner.name().to_string(),
                        field_name: position.field.name().to_string(),
                    };
                    self.fail(slot, position, error.into_field_error(&self.config.errors));
                    return;
                }
            };
            self.continue_named(slot, position, ty.named_type(), value);
            return;
        };

        let items = match completed {
            Completed::List(items) => items,
            Completed::Value(Value::Array(items)) => items.into_iter().map(Resolved::Value).collect(),
            Completed::Value(value) => {
                let path = self.tree.field_path(slot.result, &slot.key);
                tracing::error!(
                    graphql_type = position.owner.name(),
                    graphql_field = position.field.name(),
                    %path,
                    %value,
                    "list field resolved to a value which is not a list"
                );
                let error = ExecutionError::ListResultFailed {
                    type_name: position.owner.name().to_string(),
                    field_name: position.field.name().to_string(),
                    ty: slot.ty.to_string(),
                    value,
                };
                self.fail(slot, position, error.into_field_error(&self.config.errors));
                return;
            }
        };

        let list = self
            .tree
            .new_list(slot.result, slot.key.clone(), slot.ty.is_non_null(), items.len());
        self.tree.write(slot.result, &slot.key, ResponseValue::Node(list));
        let depth = self.tree.depth(list);
        for (index, item) in items.into_iter().enumerate() {
            let step = ListItemStep::new(Rc::clone(position), list, index, item, item_type, depth);
            self.queue.push(Box::new(step));
        }
    }

    fn continue_named(&mut self, slot: &Slot<'a>, position: &FieldPosition<'a>, type_name: &str, value: Value) {
        let schema = self.schema;
        let coerced = match schema.get_type(type_name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.coerce(value),
            Some(TypeDefinition::Enum(enum_type)) => enum_type.coerce(value),
            Some(TypeDefinition::Object(object)) => return self.continue_object(slot, position, object, value),
            Some(TypeDefinition::Interface(interface)) => {
                let resolve_type = interface.resolve_type.as_ref();
                return self.continue_abstract(slot, position, &interface.name, resolve_type, value);
            }
            Some(TypeDefinition::Union(union)) => {
                let resolve_type = union.resolve_type.as_ref();
                return self.continue_abstract(slot, position, &union.name, resolve_type, value);
            }
            None => Err(FieldError::new(format!("Unknown type {type_name}")).with_code(ErrorCode::InternalServerError)),
        };

        match coerced {
            Ok(Value::Null) => self.null_value(slot, position),
            Ok(value) => self.tree.write(slot.result, &slot.key, ResponseValue::Leaf(value)),
            Err(error) => self.fail(slot, position, error),
        }
    }

    fn continue_abstract(
        &mut self,
        slot: &Slot<'a>,
        position: &FieldPosition<'a>,
        abstract_type: &str,
        resolve_type: Option<&ResolveTypeFn>,
        value: Value,
    ) {
        let schema = self.schema;
        let resolved = match resolve_type {
            Some(resolve_type) => resolve_type(&value, self.ctx),
            None => value.get("__typename").and_then(Value::as_str).map(str::to_string),
        };
        let object = resolved
            .as_deref()
            .and_then(|name| schema.object(name))
            .filter(|object| schema.is_possible_type(abstract_type, object.name()));

        match object {
            Some(object) => self.continue_object(slot, position, object, value),
            None => {
                let error = ExecutionError::UnresolvedType {
                    abstract_type: abstract_type.to_string(),
                    possible_types: schema.possible_types(abstract_type).to_vec(),
                    resolved,
                };
                self.fail(slot, position, error.into_field_error(&self.config.errors));
            }
        }
    }

    fn continue_object(&mut self, slot: &Slot<'a>, position: &FieldPosition<'a>, object: &'a ObjectType, value: Value) {
        let gathered = self.gather_fields(object, position.selection_sets());
        let node = self.tree.new_object(
            slot.result,
            slot.key.clone(),
            slot.ty.is_non_null(),
            Rc::new(value),
            gathered.keys().copied(),
        );
        self.tree.write(slot.result, &slot.key, ResponseValue::Node(node));
        self.evaluate_selections(node, object, gathered, false);
    }

    fn handle_resolver_error(&self, position: &FieldPosition<'a>, path: &ErrorPath, error: BoxError) -> Resolved {
        let error = match error.downcast::<FieldError>() {
            Ok(error) => return Resolved::Error(*error),
            Err(error) => error,
        };

        let field = FieldInfo {
            type_name: position.owner.name(),
            field_name: position.field.name(),
            path,
        };
        let handled = match &self.schema.error_handler {
            Some(handler) => handler.handle(error, &field),
            None => Handled::Unhandled(error),
        };
        match handled {
            Handled::Recovered(resolved) => resolved,
            Handled::Error(error) => Resolved::Error(error),
            Handled::Unhandled(error) => {
                tracing::error!(
                    graphql_type = field.type_name,
                    graphql_field = field.field_name,
                    %path,
                    "unhandled resolver error: {error}"
                );
                Resolved::Error(ExecutionError::Unhandled(error).into_field_error(&self.config.errors))
            }
        }
    }
}
