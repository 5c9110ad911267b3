//! Schema registry: per-package enum/struct/table declarations and their
//! validated type graph.
//!
//! ## Flow
//! ```text
//! metadata root
//!     → registry.rs (discover *.yaml, one task per file)
//!     → parse.rs (decode declarations, validate references)
//!     → TypeGraph per package (read-only once published)
//! ```
//!
//! Validation rules:
//! - enum, struct and table names are unique within a package
//! - every referenced name resolves to an enum or struct of the same package
//! - tables are never embedded, containers never nest

mod parse;
mod registry;
mod types;

pub use parse::parse_package;
pub use registry::{PackageNames, PendingSchemas, SchemaRegistry, load_package_file};
pub use types::*;
