//! Error types for zkit-core

use std::fmt;
use std::path::PathBuf;

use crate::tasks::ActionError;

pub use zkit_extensions::Error as ExtensionError;

/// Result type for zkit-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, resolving or running a project
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Extension ordering failed (cycle, missing or duplicate extension)
    #[error(transparent)]
    Extensions(#[from] zkit_extensions::Error),

    /// `plugins` names an extension the entry point does not provide
    #[error("unknown extension '{id}' listed in plugins")]
    UnknownExtension { id: String },

    /// A non-override task definition collides with an existing one
    #[error(
        "task '{task}' is already defined by {defined_by}; {contributed_by} must declare it as an override"
    )]
    DuplicateTask {
        task: String,
        defined_by: String,
        contributed_by: String,
    },

    /// Task lookup or override target absent
    #[error("task '{task}' not found{}", required_by_suffix(.required_by))]
    TaskNotFound {
        task: String,
        required_by: Option<String>,
    },

    /// Task dependencies form a cycle
    #[error("task dependency cycle detected: {}", .cycle.join(" -> "))]
    TaskDependencyCycle { cycle: Vec<String> },

    /// A task action failed
    #[error("task '{task}' failed: {source}")]
    TaskExecution {
        task: String,
        #[source]
        source: ActionError,
    },

    /// Configuration rejected by built-in or extension validation
    #[error(transparent)]
    ConfigValidation(#[from] ConfigValidationError),

    /// Two extensions attached the same runtime property
    #[error(
        "runtime property '{property}' attached by extension '{extension}' is already provided by extension '{owner}'"
    )]
    RuntimeExtensionCollision {
        property: String,
        owner: String,
        extension: String,
    },

    /// A runtime hook failed for a reason other than a collision
    #[error("runtime hook of extension '{extension}' failed: {message}")]
    HookFailed { extension: String, message: String },

    /// The run was cancelled before `task` started
    #[error("cancelled before task '{task}' started")]
    Cancelled { task: String },

    /// Configuration file not found at expected path
    #[error("configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|parent| format!(" (required by '{parent}')"))
        .unwrap_or_default()
}

/// A configuration value that failed validation.
///
/// `path` is the dotted location of the value (`networks.local.node_url`).
/// When an extension's `validate_user_config` hook reports the failure,
/// `extension` names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub value: String,
    pub message: String,
    pub extension: Option<String>,
}

impl ConfigValidationError {
    /// Create a validation error for the value at `path`
    pub fn new(
        path: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            message: message.into(),
            extension: None,
        }
    }

    /// Validation error for a required value that is absent
    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, "<missing>", "value is required")
    }

    /// Attribute the error to the extension that reported it
    pub fn reported_by(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid config at '{}' (value: {}): {}",
            self.path, self.value, self.message
        )?;
        if let Some(extension) = &self.extension {
            write!(f, " [reported by extension '{extension}']")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}
