use std::{collections::BTreeSet, rc::Rc};

use error::{ErrorPath, ErrorPathSegment};
use indexmap::IndexMap;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResultId(u32);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResponseValue {
    /// Not written yet. Keys still unset when serializing were skipped.
    Unset,
    Null,
    Leaf(Value),
    Node(ResultId),
}

#[derive(Debug)]
struct ResultNode {
    parent: Option<ResultId>,
    key: Option<ErrorPathSegment>,
    non_null_in_parent: bool,
    dead: bool,
    depth: usize,
    application_value: Option<Rc<Value>>,
    data: NodeData,
}

#[derive(Debug)]
enum NodeData {
    Object(IndexMap<Box<str>, ResponseValue>),
    List {
        items: Vec<ResponseValue>,
        skip_indices: BTreeSet<usize>,
    },
}

/// Objects and lists of the response being built, linked to their parent by id.
///
/// A null written into a non-null position erases the enclosing node instead, recursively. Erased
/// nodes are dead: writes into them or any of their descendants are dropped, so work still
/// scheduled below them finishes without effect.
#[derive(Debug, Default)]
pub(crate) struct ResultTree {
    nodes: Vec<ResultNode>,
    base_path: ErrorPath,
    erased: bool,
}

impl ResultTree {
    pub fn new(base_path: ErrorPath) -> Self {
        ResultTree {
            nodes: Vec::new(),
            base_path,
            erased: false,
        }
    }

    pub fn new_root<'k>(&mut self, value: Rc<Value>, keys: impl IntoIterator<Item = &'k str>) -> ResultId {
        self.push(ResultNode {
            parent: None,
            key: None,
            non_null_in_parent: true,
            dead: false,
            depth: 1,
            application_value: Some(value),
            data: NodeData::Object(unset_fields(keys)),
        })
    }

    pub fn new_object<'k>(
        &mut self,
        parent: ResultId,
        key: ErrorPathSegment,
        non_null_in_parent: bool,
        value: Rc<Value>,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> ResultId {
        self.push(ResultNode {
            parent: Some(parent),
            key: Some(key),
            non_null_in_parent,
            dead: false,
            depth: self.depth(parent) + 1,
            application_value: Some(value),
            data: NodeData::Object(unset_fields(keys)),
        })
    }

    pub fn new_list(
        &mut self,
        parent: ResultId,
        key: ErrorPathSegment,
        non_null_in_parent: bool,
        len: usize,
    ) -> ResultId {
        self.push(ResultNode {
            parent: Some(parent),
            key: Some(key),
            non_null_in_parent,
            dead: false,
            depth: self.depth(parent) + 1,
            application_value: None,
            data: NodeData::List {
                items: vec![ResponseValue::Unset; len],
                skip_indices: BTreeSet::new(),
            },
        })
    }

    fn push(&mut self, node: ResultNode) -> ResultId {
        let id = ResultId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: ResultId) -> &ResultNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: ResultId) -> &mut ResultNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn depth(&self, id: ResultId) -> usize {
        self.node(id).depth
    }

    pub fn application_value(&self, id: ResultId) -> Rc<Value> {
        self.node(id).application_value.clone().unwrap_or_default()
    }

    /// Application value of the closest object above `id`, lists skipped.
    pub fn grandparent_value(&self, id: ResultId) -> Option<Rc<Value>> {
        let mut current = self.node(id).parent;
        while let Some(id) = current {
            let node = self.node(id);
            if let Some(value) = &node.application_value {
                return Some(value.clone());
            }
            current = node.parent;
        }
        None
    }

    pub fn is_dead(&self, id: ResultId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if node.dead {
                return true;
            }
            current = node.parent;
        }
        self.erased
    }

    pub fn path(&self, id: ResultId) -> ErrorPath {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            segments.extend(node.key.clone());
            current = node.parent;
        }
        let mut path = self.base_path.clone();
        path.extend(segments.into_iter().rev());
        path
    }

    pub fn field_path(&self, id: ResultId, key: &ErrorPathSegment) -> ErrorPath {
        let mut path = self.path(id);
        path.push(key.clone());
        path
    }

    pub fn write(&mut self, id: ResultId, key: &ErrorPathSegment, value: ResponseValue) {
        if self.is_dead(id) {
            return;
        }
        match (&mut self.node_mut(id).data, key) {
            (NodeData::Object(fields), ErrorPathSegment::Field(name)) => {
                fields.insert(name.clone(), value);
            }
            (NodeData::List { items, .. }, ErrorPathSegment::Index(index)) => {
                if let Some(item) = items.get_mut(*index) {
                    *item = value;
                }
            }
            (data, key) => tracing::warn!("write of {key} into mismatched {data:?}"),
        }
    }

    /// Writes a null, erasing the enclosing node instead if the position is non-null.
    pub fn write_null(&mut self, id: ResultId, key: &ErrorPathSegment, non_null: bool) {
        if self.is_dead(id) {
            return;
        }
        if !non_null {
            self.write(id, key, ResponseValue::Null);
            return;
        }

        let mut current = id;
        loop {
            let node = self.node_mut(current);
            node.dead = true;
            let (parent, key, non_null_in_parent) = (node.parent, node.key.clone(), node.non_null_in_parent);
            match (parent, key) {
                (Some(parent), Some(key)) if non_null_in_parent => {
                    self.write(parent, &key, ResponseValue::Null);
                    current = parent;
                }
                (Some(parent), Some(key)) => {
                    self.write(parent, &key, ResponseValue::Null);
                    return;
                }
                _ => {
                    self.erased = true;
                    return;
                }
            }
        }
    }

    /// Removes `index` from the list. Following items move down by one in the response.
    pub fn skip_at(&mut self, id: ResultId, index: usize) {
        if let NodeData::List { skip_indices, .. } = &mut self.node_mut(id).data {
            skip_indices.insert(index);
        }
    }

    /// Position of `index` in the serialized list, once earlier skipped items are removed.
    pub fn corrected_index(&self, id: ResultId, index: usize) -> usize {
        match &self.node(id).data {
            NodeData::List { skip_indices, .. } => index - skip_indices.range(..index).count(),
            NodeData::Object(_) => index,
        }
    }

    /// `None` when the root itself was erased.
    pub fn to_json(&self, root: ResultId) -> Option<Value> {
        if self.erased {
            return None;
        }
        Some(self.node_to_json(root))
    }

    fn node_to_json(&self, id: ResultId) -> Value {
        match &self.node(id).data {
            NodeData::Object(fields) => {
                let mut object = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    if !matches!(value, ResponseValue::Unset) {
                        object.insert(key.to_string(), self.value_to_json(value));
                    }
                }
                Value::Object(object)
            }
            NodeData::List { items, skip_indices } => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| !skip_indices.contains(index))
                    .map(|(_, value)| self.value_to_json(value))
                    .collect(),
            ),
        }
    }

    fn value_to_json(&self, value: &ResponseValue) -> Value {
        match value {
            ResponseValue::Unset | ResponseValue::Null => Value::Null,
            ResponseValue::Leaf(value) => value.clone(),
            ResponseValue::Node(id) => self.node_to_json(*id),
        }
    }
}

fn unset_fields<'k>(keys: impl IntoIterator<Item = &'k str>) -> IndexMap<Box<str>, ResponseValue> {
    keys.into_iter().map(|key| (key.into(), ResponseValue::Unset)).collect()
}
