//! Runtime value nodes.

use crate::schema::{ElementType, TypeGraph};

/// Value assigned to an int or enum leaf whose data has the wrong type.
///
/// Existing data files rely on this value, so it is `1` rather than `0`.
pub const INT_FALLBACK: i64 = 1;

/// Value held by a node. Closed over every shape a schema type can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Int(i64),
    String(String),
    Bool(bool),
    /// Enum leaf, stored as its numeric value.
    Enum { type_name: String, value: i64 },
    /// Struct instance; one child per resolvable field, in declaration order.
    Struct { type_name: String, fields: Vec<ValueNode> },
    /// Ordered children. Empty until data arrives.
    List {
        element: ElementType,
        items: Vec<ValueNode>,
    },
    /// Keyed children; each child carries its key.
    Map {
        element: ElementType,
        entries: Vec<ValueNode>,
    },
}

/// One field (or container element) of a value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueNode {
    pub name: String,
    pub alias: String,
    /// Struct-field depth; top-level table fields sit at depth 1.
    pub depth: usize,
    pub value: NodeValue,
    /// Key of a map entry.
    pub key: Option<String>,
    /// Soft-delete marker for list and map children.
    pub deleted: bool,
    /// Set once data or an edit assigns this node. Unassigned nodes are left
    /// out when the tree is serialized.
    pub present: bool,
}

impl ValueNode {
    pub fn new(name: impl Into<String>, alias: impl Into<String>, depth: usize, value: NodeValue) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            depth,
            value,
            key: None,
            deleted: false,
            present: false,
        }
    }

    /// Whether this node is emitted on serialization. A struct counts as
    /// assigned once any of its fields is.
    pub fn is_present(&self) -> bool {
        match &self.value {
            NodeValue::Struct { fields, .. } => self.present || fields.iter().any(ValueNode::is_present),
            _ => self.present,
        }
    }

    /// Mark this node and every descendant as assigned, so a freshly built
    /// subtree serializes with its defaults.
    pub fn materialize(&mut self) {
        self.present = true;
        if let Some(children) = self.children_mut() {
            for child in children {
                child.materialize();
            }
        }
    }

    /// Declared type name: `int`, `string`, `bool`, `list`, `map`, or the
    /// struct/enum name.
    pub fn type_name(&self) -> &str {
        match &self.value {
            NodeValue::Int(_) => "int",
            NodeValue::String(_) => "string",
            NodeValue::Bool(_) => "bool",
            NodeValue::Enum { type_name, .. } | NodeValue::Struct { type_name, .. } => type_name,
            NodeValue::List { .. } => "list",
            NodeValue::Map { .. } => "map",
        }
    }

    /// Element type of a list or map node.
    pub fn element_type(&self) -> Option<&ElementType> {
        match &self.value {
            NodeValue::List { element, .. } | NodeValue::Map { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.value, NodeValue::List { .. } | NodeValue::Map { .. })
    }

    /// Children of a struct, list or map, including soft-deleted ones.
    pub fn children(&self) -> &[ValueNode] {
        match &self.value {
            NodeValue::Struct { fields, .. } => fields,
            NodeValue::List { items, .. } => items,
            NodeValue::Map { entries, .. } => entries,
            NodeValue::Int(_) | NodeValue::String(_) | NodeValue::Bool(_) | NodeValue::Enum { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<ValueNode>> {
        match &mut self.value {
            NodeValue::Struct { fields, .. } => Some(fields),
            NodeValue::List { items, .. } => Some(items),
            NodeValue::Map { entries, .. } => Some(entries),
            NodeValue::Int(_) | NodeValue::String(_) | NodeValue::Bool(_) | NodeValue::Enum { .. } => None,
        }
    }

    /// Children not marked deleted.
    pub fn live_children(&self) -> impl Iterator<Item = &ValueNode> {
        self.children().iter().filter(|c| !c.deleted)
    }

    /// Struct field by name.
    pub fn child(&self, name: &str) -> Option<&ValueNode> {
        match &self.value {
            NodeValue::Struct { fields, .. } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ValueNode> {
        match &mut self.value {
            NodeValue::Struct { fields, .. } => fields.iter_mut().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Live map entry by key.
    pub fn entry(&self, key: &str) -> Option<&ValueNode> {
        match &self.value {
            NodeValue::Map { entries, .. } => entries
                .iter()
                .find(|e| !e.deleted && e.key.as_deref() == Some(key)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            NodeValue::Int(v) | NodeValue::Enum { value: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            NodeValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Set an int or enum leaf. Returns false for any other shape.
    pub fn set_int(&mut self, v: i64) -> bool {
        match &mut self.value {
            NodeValue::Int(slot) | NodeValue::Enum { value: slot, .. } => {
                *slot = v;
                self.present = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_string(&mut self, v: impl Into<String>) -> bool {
        match &mut self.value {
            NodeValue::String(slot) => {
                *slot = v.into();
                self.present = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_bool(&mut self, v: bool) -> bool {
        match &mut self.value {
            NodeValue::Bool(slot) => {
                *slot = v;
                self.present = true;
                true
            }
            _ => false,
        }
    }

    /// Soft-delete the list or map child at `index`.
    ///
    /// Storage is not compacted; the child is dropped when the tree is
    /// serialized.
    pub fn mark_deleted(&mut self, index: usize) -> bool {
        self.set_deleted(index, true)
    }

    /// Undo a soft delete.
    pub fn restore(&mut self, index: usize) -> bool {
        self.set_deleted(index, false)
    }

    fn set_deleted(&mut self, index: usize, deleted: bool) -> bool {
        if !self.is_container() {
            return false;
        }
        match self.children_mut().and_then(|c| c.get_mut(index)) {
            Some(child) => {
                child.deleted = deleted;
                true
            }
            None => false,
        }
    }

    /// Append a fresh element to a list, built from the element type's skeleton.
    /// The list and the new element, defaults included, become assigned.
    ///
    /// Returns `None` when the node is not a list or the element type no
    /// longer resolves.
    pub fn push_element(&mut self, graph: &TypeGraph) -> Option<&mut ValueNode> {
        let NodeValue::List { element, items } = &mut self.value else {
            return None;
        };
        let field = super::build::element_field(&self.name, &self.alias, items.len(), element);
        let mut child = super::build::build_node(graph, &field, self.depth + 1)?;
        child.materialize();
        items.push(child);
        self.present = true;
        items.last_mut()
    }

    /// Add a fresh entry to a map under `key`.
    ///
    /// Returns `None` when the node is not a map, a live entry already uses
    /// `key`, or the element type no longer resolves.
    pub fn insert_entry(&mut self, graph: &TypeGraph, key: impl Into<String>) -> Option<&mut ValueNode> {
        let key = key.into();
        if self.entry(&key).is_some() {
            return None;
        }
        let NodeValue::Map { element, entries } = &mut self.value else {
            return None;
        };
        let field = super::build::element_field(&self.name, &self.alias, entries.len(), element);
        let mut child = super::build::build_node(graph, &field, self.depth + 1)?;
        child.key = Some(key);
        child.materialize();
        entries.push(child);
        self.present = true;
        entries.last_mut()
    }
}
