//! Serialization of a value tree back to untyped data.

use super::node::{NodeValue, ValueNode};
use crate::schema::{Embedded, TypeGraph};
use serde_json::{Map, Value};
use tracing::debug;

/// Convert `node` to JSON-like data.
///
/// Nodes that were never assigned yield `None`, so data that omitted a field
/// serializes without it. Soft-deleted list and map children are skipped here,
/// which is where deletes take effect. A struct or enum whose type no longer resolves in
/// `graph` yields `None` for that subtree only; its parent keeps emitting the
/// remaining fields.
pub fn to_value(node: &ValueNode, graph: &TypeGraph) -> Option<Value> {
    if !node.is_present() {
        return None;
    }
    match &node.value {
        NodeValue::Int(v) => Some(Value::from(*v)),
        NodeValue::String(s) => Some(Value::String(s.clone())),
        NodeValue::Bool(b) => Some(Value::Bool(*b)),
        NodeValue::Enum { type_name, value } => match graph.embedded(type_name) {
            Some(Embedded::Enum(_)) => Some(Value::from(*value)),
            _ => {
                debug!(field = %node.name, type_name = %type_name, "Enum type no longer resolves, dropping");
                None
            }
        },
        NodeValue::Struct { type_name, fields } => match graph.embedded(type_name) {
            Some(Embedded::Struct(_)) => Some(Value::Object(fields_to_object(fields, graph))),
            _ => {
                debug!(field = %node.name, type_name = %type_name, "Struct type no longer resolves, dropping");
                None
            }
        },
        NodeValue::List { element, items } => {
            if !graph.element_resolves(element) {
                debug!(field = %node.name, element = element.type_name(), "List element type no longer resolves, dropping");
                return None;
            }
            let values = items
                .iter()
                .filter(|item| !item.deleted)
                .filter_map(|item| to_value(item, graph))
                .collect();
            Some(Value::Array(values))
        }
        NodeValue::Map { element, entries } => {
            if !graph.element_resolves(element) {
                debug!(field = %node.name, element = element.type_name(), "Map element type no longer resolves, dropping");
                return None;
            }
            let mut map = Map::new();
            for entry in entries.iter().filter(|e| !e.deleted) {
                let Some(key) = entry.key.as_deref().filter(|k| !k.is_empty()) else {
                    continue;
                };
                if let Some(value) = to_value(entry, graph) {
                    map.insert(key.to_string(), value);
                }
            }
            Some(Value::Object(map))
        }
    }
}

/// Emit struct-like children as an object keyed by field name, skipping
/// fields that fail to serialize.
pub fn fields_to_object(fields: &[ValueNode], graph: &TypeGraph) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|f| to_value(f, graph).map(|v| (f.name.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementType, parse_package};
    use crate::tree::fill::fill;
    use serde_json::json;

    fn graph(schema: &str) -> TypeGraph {
        parse_package(schema.as_bytes()).unwrap().graph
    }

    const SCHEMA: &str = r#"
package: p
enums:
  - name: Color
    variants:
      - { name: RED, value: 1 }
structs:
  - name: Point
    fields:
      - { name: x, type: int }
"#;

    #[test]
    fn test_deleted_list_item_is_dropped() {
        let g = graph(SCHEMA);
        let mut list = ValueNode::new(
            "tags",
            "",
            1,
            NodeValue::List {
                element: ElementType::String,
                items: vec![],
            },
        );
        fill(&mut list, &g, &json!(["a", "b", "c", "d"]));
        assert!(list.mark_deleted(1));

        assert_eq!(to_value(&list, &g), Some(json!(["a", "c", "d"])));
        // Storage is untouched until serialization.
        assert_eq!(list.children().len(), 4);

        assert!(list.restore(1));
        assert_eq!(to_value(&list, &g), Some(json!(["a", "b", "c", "d"])));
    }

    #[test]
    fn test_deleted_map_entry_is_dropped() {
        let g = graph(SCHEMA);
        let mut map = ValueNode::new(
            "colors",
            "",
            1,
            NodeValue::Map {
                element: ElementType::Named("Color".into()),
                entries: vec![],
            },
        );
        fill(&mut map, &g, &json!({"a": 1, "b": 1}));
        let idx = map
            .children()
            .iter()
            .position(|e| e.key.as_deref() == Some("a"))
            .unwrap();
        map.mark_deleted(idx);

        assert_eq!(to_value(&map, &g), Some(json!({"b": 1})));
    }

    #[test]
    fn test_schema_drift_drops_only_affected_field() {
        let old = graph(SCHEMA);
        let mut point = crate::tree::build::build_node(
            &old,
            &crate::schema::FieldDecl {
                name: "pos".into(),
                alias: String::new(),
                ty: crate::schema::FieldType::Named("Point".into()),
            },
            1,
        )
        .unwrap();
        point.materialize();
        let mut color = ValueNode::new(
            "color",
            "",
            1,
            NodeValue::Enum {
                type_name: "Color".into(),
                value: 1,
            },
        );
        color.present = true;
        let fields = vec![point, color];

        // Point was removed from the schema; Color survives.
        let new = graph(
            r#"
package: p
enums:
  - name: Color
    variants:
      - { name: RED, value: 1 }
"#,
        );
        assert_eq!(to_value(&fields[0], &new), None);
        let obj = fields_to_object(&fields, &new);
        assert_eq!(Value::Object(obj), json!({"color": 1}));
    }

    #[test]
    fn test_unassigned_fields_are_omitted() {
        let g = graph(SCHEMA);
        let mut point = crate::tree::build::build_node(
            &g,
            &crate::schema::FieldDecl {
                name: "pos".into(),
                alias: String::new(),
                ty: crate::schema::FieldType::Named("Point".into()),
            },
            1,
        )
        .unwrap();
        assert_eq!(to_value(&point, &g), None);

        fill(&mut point, &g, &json!({}));
        assert_eq!(to_value(&point, &g), Some(json!({})));

        point.child_mut("x").unwrap().set_int(4);
        assert_eq!(to_value(&point, &g), Some(json!({"x": 4})));
    }
}
