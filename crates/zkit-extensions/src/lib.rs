//! Extension dependency resolution for zkit.
//!
//! This crate knows nothing about what an extension contributes. It only
//! orders items that declare dependencies on each other:
//!
//! - [`DependencyGraph`] performs a stable topological sort and reports the
//!   exact cycle when one exists
//! - [`PluginResolver`] reorders any list of [`Dependent`] items into a load
//!   sequence
//!
//! `zkit-core` uses the resolver for extensions and the graph for task
//! dependency cycle checks.

pub mod dependency;
pub mod error;
pub mod resolver;

pub use dependency::DependencyGraph;
pub use error::{Error, Result};
pub use resolver::{Dependent, PluginResolver};
