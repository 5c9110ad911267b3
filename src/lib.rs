//! Schema-typed table configuration.
//!
//! This module exports the core components for testing and integration:
//! schema loading ([`schema`]), generic value trees ([`tree`]), the reloadable
//! config manager ([`manager`]) and the background change watcher
//! ([`watcher`]).

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod manager;
pub mod paths;
pub mod schema;
pub mod tree;
pub mod watcher;
