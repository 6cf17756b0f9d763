/// Errors raised while ordering extensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The dependency graph contains a cycle.
    ///
    /// `cycle` is a closed path: consecutive entries are dependency edges and
    /// the last entry repeats the first.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// An extension declares a dependency that is not part of the input.
    #[error("extension '{extension}' depends on '{dependency}', which is not loaded")]
    MissingDependency {
        extension: String,
        dependency: String,
    },

    /// Two entries in the input share the same id.
    #[error("extension '{id}' is declared more than once")]
    DuplicateExtension { id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
