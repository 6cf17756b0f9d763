//! Load-order resolution for extensions.

use crate::dependency::DependencyGraph;
use crate::error::Result;

/// Anything that has an id and names the ids it must come after.
pub trait Dependent {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Ids that must be ordered before this item.
    fn dependencies(&self) -> &[String];
}

/// Orders extensions so every extension follows all of its dependencies.
///
/// Ties are broken by input order, so resolving the same list twice always
/// produces the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginResolver;

impl PluginResolver {
    /// Reorder `items` into a valid load sequence.
    ///
    /// # Errors
    ///
    /// - `Error::DuplicateExtension` if two items share an id
    /// - `Error::MissingDependency` if a dependency is not in `items`
    /// - `Error::DependencyCycle` with the full cycle if no order exists
    pub fn resolve<T: Dependent>(items: Vec<T>) -> Result<Vec<T>> {
        let mut graph = DependencyGraph::new();
        for item in &items {
            graph.add_node(item.id())?;
        }
        for item in &items {
            for dependency in item.dependencies() {
                graph.add_edge(item.id(), dependency);
            }
        }

        let order = graph.topological_indices()?;

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let resolved: Vec<T> = order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();

        tracing::debug!(
            order = ?resolved.iter().map(Dependent::id).collect::<Vec<_>>(),
            "resolved extension load order"
        );
        Ok(resolved)
    }
}
