use std::rc::Rc;

use async_graphql_parser::{Positioned, types::Directive};
use error::{ErrorPath, ErrorPathSegment};
use itertools::Itertools;
use serde_json::{Map, Value};

use super::{
    CachedArguments, DirectiveContext, DirectiveOutcome, FieldPosition, Lookahead, Runtime, Slot, Step, StepState,
    TraceField, arguments::directive_arguments, step::settle,
};
use crate::{
    ExecutionErrors, FieldExtra, FieldResolver, Lazy, Resolved, ResolverContext, resolver::Extras, response::ResultId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InspectAst,
    ResolveDirectives,
    LoadArguments,
    PrepareArguments,
    CallResolver,
    HandleResolvedValue,
}

/// Resolves one field of one object, from its directives to writing its value.
pub(crate) struct FieldResolveStep<'a> {
    position: Rc<FieldPosition<'a>>,
    parent: ResultId,
    depth: usize,
    phase: Phase,
    directives: Vec<&'a Positioned<Directive>>,
    next_directive: usize,
    arguments: Option<CachedArguments>,
    ready_arguments: Rc<Map<String, Value>>,
    resolved: Option<Resolved>,
    /// Lazy value the step is suspended on.
    pending: Option<Lazy>,
}

impl<'a> FieldResolveStep<'a> {
    pub fn new(position: Rc<FieldPosition<'a>>, parent: ResultId, depth: usize) -> Self {
        FieldResolveStep {
            position,
            parent,
            depth,
            phase: Phase::InspectAst,
            directives: Vec::new(),
            next_directive: 0,
            arguments: None,
            ready_arguments: Rc::default(),
            resolved: None,
            pending: None,
        }
    }

    fn slot(&self) -> Slot<'a> {
        Slot {
            result: self.parent,
            key: self.key(),
            ty: self.position.field.ty(),
        }
    }

    fn key(&self) -> ErrorPathSegment {
        ErrorPathSegment::Field(self.position.response_key.into())
    }

    fn path(&self, runtime: &Runtime<'a>) -> ErrorPath {
        runtime.tree.field_path(self.parent, &self.key())
    }

    fn suspend(&mut self, lazy: Lazy) -> StepState {
        self.pending = Some(lazy);
        StepState::Suspended
    }

    fn inspect_ast(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        let schema = runtime.schema;
        self.directives = self
            .position
            .ast_nodes
            .iter()
            .copied()
            .flat_map(|field| field.node.directives.iter())
            .filter(|directive| schema.directive(directive.node.name.node.as_str()).is_some())
            .unique_by(|directive| directive.node.name.node.clone())
            .collect();

        self.phase = if self.directives.is_empty() {
            Phase::LoadArguments
        } else {
            Phase::ResolveDirectives
        };
        StepState::Continue
    }

    fn resolve_directives(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        if let Some(lazy) = self.pending.take() {
            let outcome = match settle(lazy.sync()) {
                Ok(resolved) => DirectiveOutcome::from_resolved(resolved),
                Err(lazy) => return self.suspend(lazy),
            };
            if let Some(state) = self.apply_directive(runtime, outcome) {
                return state;
            }
        }

        let schema = runtime.schema;
        while let Some(&directive) = self.directives.get(self.next_directive) {
            self.next_directive += 1;
            let name = directive.node.name.node.as_str();
            let Some(handler) = schema.directive(name) else {
                continue;
            };

            let arguments = directive_arguments(&directive.node, runtime.variables);
            let object = runtime.tree.application_value(self.parent);
            let path = self.path(runtime);
            let outcome = handler.resolve(&DirectiveContext {
                name,
                arguments: &arguments,
                object: object.as_ref(),
                context: runtime.ctx,
                path: &path,
            });
            if let Some(state) = self.apply_directive(runtime, outcome) {
                return state;
            }
        }

        self.phase = Phase::LoadArguments;
        StepState::Continue
    }

    /// `None` to go on with the next directive.
    fn apply_directive(&mut self, runtime: &mut Runtime<'a>, outcome: DirectiveOutcome) -> Option<StepState> {
        match outcome {
            DirectiveOutcome::Continue => None,
            DirectiveOutcome::Skip => Some(StepState::Finished),
            DirectiveOutcome::Error(error) => {
                runtime.fail(&self.slot(), &self.position, error);
                Some(StepState::Finished)
            }
            DirectiveOutcome::Pending(lazy) => match settle(Resolved::Lazy(lazy)) {
                Ok(resolved) => self.apply_directive(runtime, DirectiveOutcome::from_resolved(resolved)),
                Err(lazy) => Some(self.suspend(lazy)),
            },
        }
    }

    fn load_arguments(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        let field = self.position.field;
        let arguments = match self.pending.take() {
            Some(lazy) => runtime.store_arguments(&self.position, CachedArguments::from_resolved(lazy.sync_all())),
            None if field.arguments.is_empty() && field.extras.is_empty() => CachedArguments::Ready(Rc::default()),
            None => runtime.field_arguments(&self.position),
        };

        let arguments = match arguments {
            CachedArguments::Pending(lazy) => match settle(Resolved::Lazy(lazy)) {
                Ok(resolved) => runtime.store_arguments(&self.position, CachedArguments::from_resolved(resolved)),
                Err(lazy) => return self.suspend(lazy),
            },
            arguments => arguments,
        };

        self.arguments = Some(arguments);
        self.phase = Phase::PrepareArguments;
        StepState::Continue
    }

    fn prepare_arguments(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        match self.arguments.take() {
            Some(CachedArguments::Ready(arguments)) => {
                self.ready_arguments = arguments;
                self.phase = Phase::CallResolver;
                StepState::Continue
            }
            Some(CachedArguments::Failed(error)) => {
                runtime.fail(&self.slot(), &self.position, error);
                StepState::Finished
            }
            Some(CachedArguments::Pending(lazy)) => {
                self.phase = Phase::LoadArguments;
                self.suspend(lazy)
            }
            None => {
                self.phase = Phase::LoadArguments;
                StepState::Continue
            }
        }
    }

    fn call_resolver(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        let position = &*self.position;
        let field = position.field;
        let parent_value = runtime.tree.application_value(self.parent);
        let object: &Value = &parent_value;
        let path = self.path(runtime);
        let extras = runtime.prepare_extras(position, self.parent, &path);

        let trace = TraceField {
            type_name: position.owner.name(),
            field_name: field.name(),
            path: &path,
            arguments: &self.ready_arguments,
        };
        let ctx = ResolverContext {
            object,
            arguments: &self.ready_arguments,
            context: runtime.ctx,
            extras: &extras,
        };

        let runtime_ref = &*runtime;
        let mut resolve = || match field.resolver() {
            FieldResolver::Property(key) => {
                let key: &str = key;
                Resolved::Value(object.get(key).cloned().unwrap_or_default())
            }
            FieldResolver::Derived(derive) => derive(object),
            FieldResolver::Function(function) => match function(&ctx) {
                Ok(resolved) => resolved,
                Err(error) => runtime_ref.handle_resolver_error(position, &path, error),
            },
        };

        let tracer = runtime.tracer;
        tracer.begin_execute_field(&trace);
        let resolved = tracer.execute_field(&trace, &mut resolve);
        tracer.end_execute_field(&trace, &resolved);

        self.resolved = Some(resolved);
        self.phase = Phase::HandleResolvedValue;
        StepState::Continue
    }

    fn handle_resolved_value(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        let resolved = match self.pending.take() {
            Some(lazy) => lazy.sync(),
            None => self.resolved.take().unwrap_or_else(Resolved::null),
        };
        let resolved = match settle(resolved) {
            Ok(resolved) => resolved,
            Err(lazy) => return self.suspend(lazy),
        };

        let slot = self.slot();
        if let Some(completed) = runtime.continue_value(&slot, &self.position, resolved) {
            runtime.continue_field(&slot, &self.position, completed);
        }
        StepState::Finished
    }
}

impl<'a> Step<'a> for FieldResolveStep<'a> {
    fn depth(&self) -> usize {
        self.depth
    }

    fn run_step(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        if runtime.tree.is_dead(self.parent) {
            return StepState::Finished;
        }
        tracing::trace!(
            graphql_type = self.position.owner.name(),
            field = self.position.response_key,
            phase = ?self.phase,
            "field step"
        );

        match self.phase {
            Phase::InspectAst => self.inspect_ast(runtime),
            Phase::ResolveDirectives => self.resolve_directives(runtime),
            Phase::LoadArguments => self.load_arguments(runtime),
            Phase::PrepareArguments => self.prepare_arguments(runtime),
            Phase::CallResolver => self.call_resolver(runtime),
            Phase::HandleResolvedValue => self.handle_resolved_value(runtime),
        }
    }
}

impl<'a> Runtime<'a> {
    fn prepare_extras(&self, position: &FieldPosition<'a>, parent: ResultId, path: &ErrorPath) -> Extras<'a> {
        let mut extras = Extras::default();
        for extra in &position.field.extras {
            match extra {
                FieldExtra::AstNode => extras.ast_node = Some(position.ast_node),
                FieldExtra::ExecutionErrors => {
                    extras.execution_errors = Some(ExecutionErrors::new(self.ctx, path.clone(), position.locations()));
                }
                FieldExtra::Path => extras.path = Some(path.clone()),
                FieldExtra::Lookahead => {
                    extras.lookahead = Some(Lookahead::new(self.document, self.variables, position.ast_nodes.clone()));
                }
                FieldExtra::Parent => extras.parent = self.tree.grandparent_value(parent),
                FieldExtra::Custom(name, value) => extras.custom.push((name.clone(), value(self.ctx))),
            }
        }
        extras
    }
}
