//! Generic value trees built against a package's type graph.
//!
//! A tree mirrors one schema-typed value: [`build_skeleton`] instantiates it
//! from declarations, [`fill`] populates it from decoded JSON, and
//! [`to_value`] turns it back into JSON. Editors mutate trees in between
//! through the [`ValueNode`] operations; list and map children are deleted
//! softly and compacted on serialization.

mod build;
mod data;
mod emit;
mod fill;
mod node;
mod table;

pub use build::{build_node, build_skeleton, element_field};
pub use data::{DataSet, read_object, table_path};
pub use emit::{fields_to_object, to_value};
pub use fill::fill;
pub use node::{INT_FALLBACK, NodeValue, ValueNode};
pub use table::TableTree;
