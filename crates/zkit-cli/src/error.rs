//! Error types for zkit-cli

use zkit_core::Error as CoreError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from zkit-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Task output could not be printed
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Malformed task options
    #[error("{message}")]
    Usage { message: String },
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(core) => match core {
                CoreError::ConfigValidation(_) | CoreError::TomlDe(_) => 2,
                CoreError::Extensions(_)
                | CoreError::UnknownExtension { .. }
                | CoreError::DuplicateTask { .. }
                | CoreError::TaskDependencyCycle { .. } => 3,
                CoreError::TaskNotFound { .. } => 4,
                CoreError::Cancelled { .. } => 130,
                _ => 1,
            },
            Self::Usage { .. } => 2,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }
}
