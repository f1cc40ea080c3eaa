use async_graphql_parser::{
    Positioned,
    types::{ExecutableDocument, Field},
};
use itertools::Itertools;
use serde_json::{Map, Value};

use super::selections::FieldCollector;

/// Read-only view of what the query selects below a field, fragments flattened.
#[derive(Clone)]
pub struct Lookahead<'a> {
    document: &'a ExecutableDocument,
    variables: &'a Map<String, Value>,
    fields: Vec<&'a Positioned<Field>>,
}

impl<'a> Lookahead<'a> {
    pub(crate) fn new(
        document: &'a ExecutableDocument,
        variables: &'a Map<String, Value>,
        fields: Vec<&'a Positioned<Field>>,
    ) -> Self {
        Lookahead {
            document,
            variables,
            fields,
        }
    }

    /// Whether the field this lookahead points at is selected at all.
    pub fn exists(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn selects(&self, name: &str) -> bool {
        self.children().iter().any(|field| field.node.name.node.as_str() == name)
    }

    pub fn selection(&self, name: &str) -> Lookahead<'a> {
        let fields = self
            .children()
            .into_iter()
            .filter(|field| field.node.name.node.as_str() == name)
            .collect();
        Lookahead::new(self.document, self.variables, fields)
    }

    /// Names of the selected fields, without duplicates.
    pub fn selected_fields(&self) -> Vec<&'a str> {
        self.children()
            .into_iter()
            .map(|field| field.node.name.node.as_str())
            .unique()
            .collect()
    }

    fn children(&self) -> Vec<&'a Positioned<Field>> {
        let any_type = |_: &str| true;
        let mut collector = FieldCollector::new(self.document, self.variables, &any_type);
        let mut children = Vec::new();
        for field in self.fields.iter().copied() {
            collector.collect(&field.node.selection_set.node, &mut children);
        }
        children
    }
}
