//! Type graph of one schema package.

use crate::error::SchemaError;
use std::collections::HashMap;

/// Maximum nesting depth, counted in struct-field traversal.
///
/// Paths deeper than this are treated as absent rather than as an error.
pub const MAX_DEPTH: usize = 10;

/// Element type of a `list` or `map` field.
///
/// Containers never nest, so there is no list or map variant here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    Int,
    String,
    Bool,
    /// A struct or enum of the same package.
    Named(String),
}

impl ElementType {
    pub fn type_name(&self) -> &str {
        match self {
            ElementType::Int => "int",
            ElementType::String => "string",
            ElementType::Bool => "bool",
            ElementType::Named(name) => name,
        }
    }
}

/// Declared type of a struct or table field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    String,
    Bool,
    List(ElementType),
    /// String-keyed map.
    Map(ElementType),
    /// A struct or enum of the same package.
    Named(String),
}

impl FieldType {
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::Int => "int",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::List(_) => "list",
            FieldType::Map(_) => "map",
            FieldType::Named(name) => name,
        }
    }

    /// Element type of a container field.
    pub fn element(&self) -> Option<&ElementType> {
        match self {
            FieldType::List(elem) | FieldType::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// Name of the struct or enum this field refers to, directly or through
    /// its element type.
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name),
            FieldType::List(ElementType::Named(name)) | FieldType::Map(ElementType::Named(name)) => {
                Some(name)
            }
            _ => None,
        }
    }
}

impl From<&ElementType> for FieldType {
    fn from(elem: &ElementType) -> Self {
        match elem {
            ElementType::Int => FieldType::Int,
            ElementType::String => FieldType::String,
            ElementType::Bool => FieldType::Bool,
            ElementType::Named(name) => FieldType::Named(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub alias: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub alias: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub alias: String,
    pub variants: Vec<EnumVariant>,
}

impl EnumDecl {
    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Struct declaration; tables share this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub alias: String,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A named declaration of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    Enum(EnumDecl),
    Struct(StructDecl),
    /// A struct whose instances back one persisted data file.
    Table(StructDecl),
}

impl SchemaType {
    pub fn name(&self) -> &str {
        match self {
            SchemaType::Enum(e) => &e.name,
            SchemaType::Struct(s) | SchemaType::Table(s) => &s.name,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            SchemaType::Enum(e) => &e.alias,
            SchemaType::Struct(s) | SchemaType::Table(s) => &s.alias,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaType::Enum(_) => "enum",
            SchemaType::Struct(_) => "struct",
            SchemaType::Table(_) => "table",
        }
    }
}

/// A type that may be embedded in a field: an enum or a struct, never a table.
#[derive(Debug, Clone, Copy)]
pub enum Embedded<'a> {
    Enum(&'a EnumDecl),
    Struct(&'a StructDecl),
}

/// Name-addressable type graph of one package, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGraph {
    types: Vec<SchemaType>,
    index: HashMap<String, usize>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Names are unique across enums, structs and tables.
    pub fn insert(&mut self, ty: SchemaType) -> Result<(), SchemaError> {
        if self.index.contains_key(ty.name()) {
            return Err(SchemaError::DuplicateName {
                kind: ty.kind_name(),
                name: ty.name().to_string(),
            });
        }
        self.index.insert(ty.name().to_string(), self.types.len());
        self.types.push(ty);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&SchemaType> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Resolve `name` to an embeddable type. Tables and unknown names yield `None`.
    pub fn embedded(&self, name: &str) -> Option<Embedded<'_>> {
        match self.lookup(name)? {
            SchemaType::Enum(e) => Some(Embedded::Enum(e)),
            SchemaType::Struct(s) => Some(Embedded::Struct(s)),
            SchemaType::Table(_) => None,
        }
    }

    /// True when a container element type can still be materialized.
    pub fn element_resolves(&self, elem: &ElementType) -> bool {
        match elem {
            ElementType::Int | ElementType::String | ElementType::Bool => true,
            ElementType::Named(name) => self.embedded(name).is_some(),
        }
    }

    pub fn enum_decl(&self, name: &str) -> Option<&EnumDecl> {
        match self.lookup(name)? {
            SchemaType::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        match self.lookup(name)? {
            SchemaType::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn table(&self, name: &str) -> Option<&StructDecl> {
        match self.lookup(name)? {
            SchemaType::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDecl> {
        self.types.iter().filter_map(|t| match t {
            SchemaType::Enum(e) => Some(e),
            _ => None,
        })
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDecl> {
        self.types.iter().filter_map(|t| match t {
            SchemaType::Struct(s) => Some(s),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &StructDecl> {
        self.types.iter().filter_map(|t| match t {
            SchemaType::Table(s) => Some(s),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A validated package: its namespace and type graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub alias: String,
    pub graph: TypeGraph,
}
