//! Skeleton construction from a type graph.

use super::node::{NodeValue, ValueNode};
use crate::schema::{ElementType, Embedded, FieldDecl, FieldType, MAX_DEPTH, TypeGraph};
use tracing::debug;

/// Build one node per field at depth 1. Fields that cannot be built are
/// left out (holes).
pub fn build_skeleton(graph: &TypeGraph, fields: &[FieldDecl]) -> Vec<ValueNode> {
    fields
        .iter()
        .filter_map(|field| build_node(graph, field, 1))
        .collect()
}

/// Build the node for `field` at `depth`.
///
/// Scalars start at their type default. Lists and maps record only their
/// element type; children appear when data is filled in. Struct fields recurse.
///
/// Returns `None` (a hole) when `depth` exceeds [`MAX_DEPTH`], when a referenced
/// type is missing, or when it names a table.
pub fn build_node(graph: &TypeGraph, field: &FieldDecl, depth: usize) -> Option<ValueNode> {
    if depth > MAX_DEPTH {
        debug!(field = %field.name, depth, "Nesting too deep, leaving field absent");
        return None;
    }

    let value = match &field.ty {
        FieldType::Int => NodeValue::Int(0),
        FieldType::String => NodeValue::String(String::new()),
        FieldType::Bool => NodeValue::Bool(false),
        FieldType::List(element) => {
            if !graph.element_resolves(element) {
                debug!(field = %field.name, element = element.type_name(), "Unresolved list element type");
                return None;
            }
            NodeValue::List {
                element: element.clone(),
                items: Vec::new(),
            }
        }
        FieldType::Map(element) => {
            if !graph.element_resolves(element) {
                debug!(field = %field.name, element = element.type_name(), "Unresolved map element type");
                return None;
            }
            NodeValue::Map {
                element: element.clone(),
                entries: Vec::new(),
            }
        }
        FieldType::Named(name) => match graph.embedded(name) {
            Some(Embedded::Enum(_)) => NodeValue::Enum {
                type_name: name.clone(),
                value: 0,
            },
            Some(Embedded::Struct(decl)) => NodeValue::Struct {
                type_name: name.clone(),
                fields: decl
                    .fields
                    .iter()
                    .filter_map(|f| build_node(graph, f, depth + 1))
                    .collect(),
            },
            None => {
                debug!(field = %field.name, type_name = %name, "Unresolved or table type");
                return None;
            }
        },
    };

    Some(ValueNode::new(&field.name, &field.alias, depth, value))
}

/// Field descriptor for the `index`-th child of a container named `name`.
pub fn element_field(name: &str, alias: &str, index: usize, element: &ElementType) -> FieldDecl {
    FieldDecl {
        name: format!("{}_{}", name, index),
        alias: format!("{}_{}", alias, index),
        ty: FieldType::from(element),
    }
}
