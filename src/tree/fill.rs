//! Population of a skeleton from untyped decoded data.
//!
//! Never fails: a value of the wrong shape degrades to the leaf fallback
//! (`""`, `false`, [`INT_FALLBACK`]) or, for containers and structs, leaves
//! the node unassigned. This keeps trees editable when data is stale relative
//! to the schema.
//!
//! Only nodes reached by data are marked present, so fields the data never
//! mentioned stay out of the serialized output.

use super::build::{build_node, element_field};
use super::node::{INT_FALLBACK, NodeValue, ValueNode};
use crate::schema::TypeGraph;
use serde_json::Value;
use tracing::debug;

/// Assign `raw` into `node`, materializing container children as needed.
pub fn fill(node: &mut ValueNode, graph: &TypeGraph, raw: &Value) {
    node.present = true;
    match &mut node.value {
        NodeValue::Int(slot) | NodeValue::Enum { value: slot, .. } => {
            *slot = coerce_int(raw).unwrap_or_else(|| {
                debug!(field = %node.name, raw = %raw, "Expected number, using fallback");
                INT_FALLBACK
            });
        }
        NodeValue::String(slot) => {
            *slot = match raw {
                Value::String(s) => s.clone(),
                other => {
                    debug!(field = %node.name, raw = %other, "Expected string, using fallback");
                    String::new()
                }
            };
        }
        NodeValue::Bool(slot) => {
            *slot = match raw {
                Value::Bool(b) => *b,
                other => {
                    debug!(field = %node.name, raw = %other, "Expected bool, using fallback");
                    false
                }
            };
        }
        NodeValue::Struct { fields, .. } => {
            let Some(obj) = raw.as_object() else {
                debug!(field = %node.name, "Expected object for struct, leaving unassigned");
                node.present = false;
                return;
            };
            for child in fields.iter_mut() {
                if let Some(value) = obj.get(&child.name) {
                    fill(child, graph, value);
                }
            }
        }
        NodeValue::List { element, items } => {
            let Some(raw_items) = raw.as_array() else {
                debug!(field = %node.name, "Expected array for list, leaving empty");
                items.clear();
                node.present = false;
                return;
            };
            *items = raw_items
                .iter()
                .enumerate()
                .filter_map(|(i, raw_item)| {
                    let field = element_field(&node.name, &node.alias, i, element);
                    let mut child = build_node(graph, &field, node.depth + 1)?;
                    fill(&mut child, graph, raw_item);
                    Some(child)
                })
                .collect();
        }
        NodeValue::Map { element, entries } => {
            let Some(raw_entries) = raw.as_object() else {
                debug!(field = %node.name, "Expected object for map, leaving empty");
                entries.clear();
                node.present = false;
                return;
            };
            *entries = raw_entries
                .iter()
                .enumerate()
                .filter_map(|(i, (key, raw_item))| {
                    let field = element_field(&node.name, &node.alias, i, element);
                    let mut child = build_node(graph, &field, node.depth + 1)?;
                    fill(&mut child, graph, raw_item);
                    child.key = Some(key.clone());
                    Some(child)
                })
                .collect();
        }
    }
}

/// Integer view of a JSON number; fractional values truncate toward zero.
fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementType, parse_package};
    use serde_json::json;

    fn graph() -> TypeGraph {
        parse_package(
            br#"
package: p
enums:
  - name: Color
    variants:
      - { name: RED, value: 1 }
      - { name: BLUE, value: 2 }
structs:
  - name: Point
    fields:
      - { name: x, type: int }
      - { name: y, type: int }
tables:
  - name: T
    fields:
      - { name: n, type: int }
"#,
        )
        .unwrap()
        .graph
    }

    fn leaf(value: NodeValue) -> ValueNode {
        ValueNode::new("f", "F", 1, value)
    }

    #[test]
    fn test_scalar_fallbacks() {
        let g = graph();

        let mut n = leaf(NodeValue::Int(0));
        fill(&mut n, &g, &json!("seven"));
        assert_eq!(n.as_int(), Some(INT_FALLBACK));

        let mut e = leaf(NodeValue::Enum {
            type_name: "Color".into(),
            value: 0,
        });
        fill(&mut e, &g, &json!(null));
        assert_eq!(e.as_int(), Some(1));

        let mut s = leaf(NodeValue::String("x".into()));
        fill(&mut s, &g, &json!(12));
        assert_eq!(s.as_str(), Some(""));

        let mut b = leaf(NodeValue::Bool(true));
        fill(&mut b, &g, &json!("true"));
        assert_eq!(b.as_bool(), Some(false));
    }

    #[test]
    fn test_float_truncates() {
        let mut n = leaf(NodeValue::Int(0));
        fill(&mut n, &graph(), &json!(2.9));
        assert_eq!(n.as_int(), Some(2));
    }

    #[test]
    fn test_list_of_structs_materializes_children() {
        let g = graph();
        let mut list = leaf(NodeValue::List {
            element: ElementType::Named("Point".into()),
            items: vec![],
        });
        fill(&mut list, &g, &json!([{"x": 1, "y": 2}, {"x": 3}]));

        let items = list.children();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "f_0");
        assert_eq!(items[0].depth, 2);
        assert_eq!(items[0].child("y").unwrap().as_int(), Some(2));
        // Missing struct fields keep their defaults but stay unassigned.
        assert_eq!(items[1].child("y").unwrap().as_int(), Some(0));
        assert!(!items[1].child("y").unwrap().present);
        assert!(items[1].child("x").unwrap().present);
    }

    #[test]
    fn test_map_children_carry_keys() {
        let g = graph();
        let mut map = leaf(NodeValue::Map {
            element: ElementType::Named("Color".into()),
            entries: vec![],
        });
        fill(&mut map, &g, &json!({"a": 1, "b": 2}));

        assert_eq!(map.children().len(), 2);
        assert_eq!(map.entry("b").unwrap().as_int(), Some(2));
    }

    #[test]
    fn test_container_shape_mismatch_leaves_empty() {
        let g = graph();
        let mut list = leaf(NodeValue::List {
            element: ElementType::Int,
            items: vec![],
        });
        fill(&mut list, &g, &json!([1, 2]));
        fill(&mut list, &g, &json!({"not": "a list"}));
        assert!(list.children().is_empty());
    }

    #[test]
    fn test_container_at_max_depth_drops_elements() {
        use crate::schema::MAX_DEPTH;
        use crate::tree::build::build_skeleton;

        let g = parse_package(
            br#"
package: p
structs:
  - name: Link
    fields:
      - { name: items, type: list, elementType: int }
      - { name: next, type: Link }
tables:
  - name: T
    fields:
      - { name: head, type: Link }
"#,
        )
        .unwrap()
        .graph;

        // One Link per level, each listing its own level.
        let mut raw = json!({"items": [MAX_DEPTH]});
        for level in (1..MAX_DEPTH).rev() {
            raw = json!({"items": [level], "next": raw});
        }

        let mut nodes = build_skeleton(&g, &g.table("T").unwrap().fields);
        fill(&mut nodes[0], &g, &raw);

        let mut link = &nodes[0];
        for level in 1..MAX_DEPTH - 1 {
            let items = link.child("items").unwrap();
            assert_eq!(items.children().len(), 1, "level {level}");
            assert_eq!(items.children()[0].as_int(), Some(level as i64));
            link = link.child("next").unwrap();
        }

        // Elements of a list at the depth cap would sit one level deeper.
        assert_eq!(link.depth, MAX_DEPTH - 1);
        let capped = link.child("items").unwrap();
        assert_eq!(capped.depth, MAX_DEPTH);
        assert!(capped.children().is_empty());

        // The deepest link has no room for fields at all.
        let last = link.child("next").unwrap();
        assert_eq!(last.depth, MAX_DEPTH);
        assert!(last.children().is_empty());
    }
}
