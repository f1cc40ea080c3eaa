use async_graphql_parser::{
    Positioned,
    types::{Directive, ExecutableDocument, Field, Selection, SelectionSet},
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Runtime, arguments::input_value};
use crate::ObjectType;

/// Fields of a selection set grouped by response key, in selection order.
pub(crate) type GatheredFields<'a> = IndexMap<&'a str, Vec<&'a Positioned<Field>>>;

/// Evaluates `@skip(if:)` and `@include(if:)`.
pub(super) fn directives_include(directives: &[Positioned<Directive>], variables: &Map<String, Value>) -> bool {
    directives.iter().all(|directive| {
        let condition = || {
            directive
                .node
                .get_argument("if")
                .and_then(|value| input_value(&value.node, variables))
                .and_then(|value| value.as_bool())
        };
        match directive.node.name.node.as_str() {
            "skip" => condition() != Some(true),
            "include" => condition() != Some(false),
            _ => true,
        }
    })
}

/// Flattens fragments into the list of fields they select.
pub(super) struct FieldCollector<'a, 'f> {
    document: &'a ExecutableDocument,
    variables: &'a Map<String, Value>,
    applies: &'f dyn Fn(&str) -> bool,
    visited: Vec<&'a str>,
}

impl<'a, 'f> FieldCollector<'a, 'f> {
    pub fn new(
        document: &'a ExecutableDocument,
        variables: &'a Map<String, Value>,
        applies: &'f dyn Fn(&str) -> bool,
    ) -> Self {
        FieldCollector {
            document,
            variables,
            applies,
            visited: Vec::new(),
        }
    }

    pub fn collect(&mut self, selection_set: &'a SelectionSet, fields: &mut Vec<&'a Positioned<Field>>) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    if directives_include(&field.node.directives, self.variables) {
                        fields.push(field);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if self.visited.contains(&name) || !directives_include(&spread.node.directives, self.variables) {
                        continue;
                    }
                    self.visited.push(name);
                    let Some(fragment) = self.document.fragments.get(&spread.node.fragment_name.node) else {
                        continue;
                    };
                    if (self.applies)(fragment.node.type_condition.node.on.node.as_str()) {
                        self.collect(&fragment.node.selection_set.node, fields);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if !directives_include(&fragment.node.directives, self.variables) {
                        continue;
                    }
                    let applies = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| (self.applies)(condition.node.on.node.as_str()));
                    if applies {
                        self.collect(&fragment.node.selection_set.node, fields);
                    }
                }
            }
        }
    }
}

impl<'a> Runtime<'a> {
    pub(super) fn gather_fields(
        &self,
        object: &ObjectType,
        selection_sets: impl IntoIterator<Item = &'a SelectionSet>,
    ) -> GatheredFields<'a> {
        let schema = self.schema;
        let applies = |condition: &str| schema.type_condition_applies(condition, object);
        let mut collector = FieldCollector::new(self.document, self.variables, &applies);

        let mut fields = Vec::new();
        for selection_set in selection_sets {
            collector.collect(selection_set, &mut fields);
        }

        let mut gathered = GatheredFields::default();
        for field in fields {
            gathered
                .entry(field.node.response_key().node.as_str())
                .or_default()
                .push(field);
        }
        gathered
    }
}
