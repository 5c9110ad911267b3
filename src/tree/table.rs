//! Value tree of one table, and its data file on disk.

use super::build::build_skeleton;
use super::data::DataSet;
use super::emit::fields_to_object;
use super::fill::fill;
use super::node::ValueNode;
use crate::paths::table_file_name;
use crate::schema::{SchemaRegistry, StructDecl, TypeGraph};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Value tree for one table of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTree {
    pub package: String,
    pub name: String,
    pub alias: String,
    pub nodes: Vec<ValueNode>,
}

impl TableTree {
    /// Build the skeleton of `table`.
    pub fn build(graph: &TypeGraph, package: &str, table: &StructDecl) -> Self {
        Self {
            package: package.to_string(),
            name: table.name.clone(),
            alias: table.alias.clone(),
            nodes: build_skeleton(graph, &table.fields),
        }
    }

    /// Fill every top-level field present in `data`. Absent fields stay
    /// unassigned and are not serialized.
    pub fn fill(&mut self, graph: &TypeGraph, data: &Map<String, Value>) {
        for node in &mut self.nodes {
            if let Some(raw) = data.get(&node.name) {
                fill(node, graph, raw);
            }
        }
    }

    /// Mark every node assigned, so fields missing from the data serialize
    /// with their defaults.
    pub fn materialize(&mut self) {
        for node in &mut self.nodes {
            node.materialize();
        }
    }

    pub fn node(&self, name: &str) -> Option<&ValueNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut ValueNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Untyped object for this table; fields that fail to serialize are left out.
    pub fn to_value(&self, graph: &TypeGraph) -> Value {
        Value::Object(fields_to_object(&self.nodes, graph))
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_json_pretty(&self, graph: &TypeGraph) -> serde_json::Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.to_value(graph).serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// File name relative to the data root: `<package>/<table>.json`.
    pub fn file_name(&self) -> String {
        table_file_name(&self.package, &self.name)
    }

    pub fn data_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(self.file_name())
    }

    /// Write the table to its data file, creating the package directory.
    /// Soft-deleted entries are compacted away.
    pub fn save(&self, graph: &TypeGraph, data_root: &Path) -> io::Result<PathBuf> {
        let path = self.data_path(data_root);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = self.to_json_pretty(graph).map_err(io::Error::other)?;
        std::fs::write(&path, json)?;
        debug!(table = %self.name, path = %path.display(), "Saved table");
        Ok(path)
    }

    /// Build every table of every package and fill it from `data` where present.
    pub fn build_all(
        registry: &SchemaRegistry,
        data: &DataSet,
    ) -> BTreeMap<String, BTreeMap<String, TableTree>> {
        let mut all = BTreeMap::new();
        for package in registry.packages() {
            let graph = &package.graph;
            let trees = graph
                .tables()
                .map(|table| {
                    let mut tree = TableTree::build(graph, &package.name, table);
                    if let Some(rows) = data.table(&package.name, &table.name) {
                        tree.fill(graph, rows);
                    }
                    (table.name.clone(), tree)
                })
                .collect();
            all.insert(package.name.clone(), trees);
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_package;
    use serde_json::json;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
package: testpkg
structs:
  - name: Point
    fields:
      - { name: x, type: int }
      - { name: y, type: int }
tables:
  - name: Player
    fields:
      - { name: name, type: string }
      - { name: pos, type: Point }
      - { name: tags, type: list, elementType: string }
"#;

    #[test]
    fn test_save_writes_package_dir_and_compacts() {
        let pkg = parse_package(SCHEMA.as_bytes()).unwrap();
        let graph = &pkg.graph;
        let mut tree = TableTree::build(graph, &pkg.name, graph.table("Player").unwrap());
        let data = json!({"name": "Ann", "pos": {"x": 1, "y": 2}, "tags": ["a", "b"]});
        tree.fill(graph, data.as_object().unwrap());
        tree.node_mut("tags").unwrap().mark_deleted(0);

        let temp = TempDir::new().unwrap();
        let path = tree.save(graph, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("testpkg/Player.json"));

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"name": "Ann", "pos": {"x": 1, "y": 2}, "tags": ["b"]}));
    }

    #[test]
    fn test_pretty_output_uses_four_spaces() {
        let pkg = parse_package(SCHEMA.as_bytes()).unwrap();
        let mut tree = TableTree::build(&pkg.graph, &pkg.name, pkg.graph.table("Player").unwrap());
        assert_eq!(tree.to_json_pretty(&pkg.graph).unwrap(), "{}");

        tree.node_mut("name").unwrap().set_string("Ann");
        let text = tree.to_json_pretty(&pkg.graph).unwrap();
        assert!(text.contains("\n    \"name\": \"Ann\""));
    }

    #[test]
    fn test_unknown_keys_are_not_carried() {
        let pkg = parse_package(SCHEMA.as_bytes()).unwrap();
        let graph = &pkg.graph;
        let mut tree = TableTree::build(graph, &pkg.name, graph.table("Player").unwrap());
        let data = json!({"name": "Bo", "legacy": true});
        tree.fill(graph, data.as_object().unwrap());

        let out = tree.to_value(graph);
        assert_eq!(out["name"], "Bo");
        assert!(out.get("legacy").is_none());
    }
}
