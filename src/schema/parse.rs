//! Parsing and validation of schema documents.
//!
//! A document declares one package:
//!
//! ```yaml
//! package: testpkg
//! alias: Test package
//! enums:
//!   - name: Color
//!     variants:
//!       - { name: RED, value: 1 }
//! structs:
//!   - name: Point
//!     fields:
//!       - { name: x, type: int }
//! tables:
//!   - name: Player
//!     fields:
//!       - { name: tags, type: list, elementType: string }
//! ```
//!
//! ## Converting XML schema documents
//!
//! Schemas written in the older XML layout convert one to one: attributes
//! become keys and repeated child elements become lists.
//!
//! | XML | YAML |
//! |-----|------|
//! | `package` / `alias` attributes of the root element | `package:` / `alias:` |
//! | `<enum name>` with `<var name alias default>` children | `enums:` entries with `variants:`; `default` is accepted in place of `value` |
//! | `<struct>` / `<table>` with `<var name alias type valueType>` children | `structs:` / `tables:` entries with `fields:`; `valueType` is accepted in place of `elementType` |

use super::types::{
    ElementType, EnumDecl, EnumVariant, FieldDecl, FieldType, Package, SchemaType, StructDecl,
    TypeGraph,
};
use crate::error::SchemaError;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct RawPackage {
    package: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    enums: Vec<RawEnum>,
    #[serde(default)]
    structs: Vec<RawStruct>,
    #[serde(default)]
    tables: Vec<RawStruct>,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    name: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    variants: Vec<RawVariant>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    name: String,
    #[serde(default)]
    alias: String,
    #[serde(alias = "default")]
    value: i64,
}

#[derive(Debug, Deserialize)]
struct RawStruct {
    name: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    alias: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(rename = "elementType", alias = "element_type", alias = "valueType", default)]
    element_type: Option<String>,
}

/// Parse and validate one package document.
///
/// Returns the first violation found; no partial graph is ever returned.
pub fn parse_package(raw: &[u8]) -> Result<Package, SchemaError> {
    let doc: RawPackage = serde_yaml::from_slice(raw)?;
    build_package(doc)
}

fn build_package(doc: RawPackage) -> Result<Package, SchemaError> {
    if doc.package.trim().is_empty() {
        return Err(SchemaError::EmptyPackageName);
    }

    let mut graph = TypeGraph::new();

    for e in doc.enums {
        graph.insert(SchemaType::Enum(EnumDecl {
            name: e.name,
            alias: e.alias,
            variants: e
                .variants
                .into_iter()
                .map(|v| EnumVariant {
                    name: v.name,
                    alias: v.alias,
                    value: v.value,
                })
                .collect(),
        }))?;
    }
    for s in doc.structs {
        graph.insert(SchemaType::Struct(build_struct(s)?))?;
    }
    for t in doc.tables {
        graph.insert(SchemaType::Table(build_struct(t)?))?;
    }

    check_references(&graph)?;

    Ok(Package {
        name: doc.package,
        alias: doc.alias,
        graph,
    })
}

fn build_struct(raw: RawStruct) -> Result<StructDecl, SchemaError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(raw.fields.len());
    for field in raw.fields {
        if !seen.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateField {
                owner: raw.name,
                field: field.name,
            });
        }
        let ty = field_type(&raw.name, &field)?;
        fields.push(FieldDecl {
            name: field.name,
            alias: field.alias,
            ty,
        });
    }
    Ok(StructDecl {
        name: raw.name,
        alias: raw.alias,
        fields,
    })
}

fn field_type(owner: &str, field: &RawField) -> Result<FieldType, SchemaError> {
    let ty = match field.ty.as_str() {
        "int" => FieldType::Int,
        "string" => FieldType::String,
        "bool" => FieldType::Bool,
        container @ ("list" | "map") => {
            let element = match field.element_type.as_deref().map(str::trim) {
                None | Some("") => {
                    return Err(SchemaError::MissingElementType {
                        owner: owner.to_string(),
                        field: field.name.clone(),
                        container: container.to_string(),
                    });
                }
                Some("int") => ElementType::Int,
                Some("string") => ElementType::String,
                Some("bool") => ElementType::Bool,
                Some(nested @ ("list" | "map")) => {
                    return Err(SchemaError::NestedContainer {
                        owner: owner.to_string(),
                        field: field.name.clone(),
                        container: container.to_string(),
                        element: nested.to_string(),
                    });
                }
                Some(name) => ElementType::Named(name.to_string()),
            };
            if container == "list" {
                FieldType::List(element)
            } else {
                FieldType::Map(element)
            }
        }
        name => FieldType::Named(name.to_string()),
    };
    Ok(ty)
}

/// Every referenced name must be an enum or struct of the same package.
fn check_references(graph: &TypeGraph) -> Result<(), SchemaError> {
    let owners = graph.structs().chain(graph.tables());
    for owner in owners {
        for field in &owner.fields {
            let Some(name) = field.ty.referenced_name() else {
                continue;
            };
            match graph.lookup(name) {
                None => {
                    return Err(SchemaError::UnresolvedType {
                        owner: owner.name.clone(),
                        field: field.name.clone(),
                        type_name: name.to_string(),
                    });
                }
                Some(SchemaType::Table(_)) => {
                    return Err(SchemaError::TableReference {
                        owner: owner.name.clone(),
                        field: field.name.clone(),
                        type_name: name.to_string(),
                    });
                }
                Some(SchemaType::Enum(_) | SchemaType::Struct(_)) => {}
            }
        }
    }
    Ok(())
}
