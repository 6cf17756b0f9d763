//! Named, composable tasks
//!
//! - [`TaskContribution`]: what an extension (or the core) offers to register
//! - [`TaskRegistry`]: task definitions keyed by name, with override chains
//! - [`TaskRunner`]: runs a task after its dependencies, each at most once
//! - [`CommandTaskConfig`]: tasks declared in `zkit.toml` that run a command

mod action;
pub mod builtin;
mod command;
mod registry;
mod runner;

use std::fmt;
use std::sync::Arc;

pub use action::{
    ActionError, ActionResult, BoxFuture, FnAction, NoPreviousAction, TaskAction, TaskArgs,
    TaskContext,
};
pub use command::{CommandAction, CommandFailed, CommandOutput, CommandTaskConfig, run_command};
pub use registry::{TaskRegistration, TaskRegistry};
pub use runner::{TaskReport, TaskRunner};

/// A task offered for registration
#[derive(Clone)]
pub struct TaskContribution {
    /// Task name; dots separate subtasks (`node.start`)
    pub name: String,
    pub description: Option<String>,
    pub action: Arc<dyn TaskAction>,
    /// Tasks that must run first
    pub depends_on: Vec<String>,
    /// Replace an existing task, keeping it callable as the previous
    /// implementation
    pub is_override: bool,
}

impl TaskContribution {
    /// A fresh task definition
    pub fn new(name: impl Into<String>, action: impl TaskAction + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            action: Arc::new(action),
            depends_on: Vec::new(),
            is_override: false,
        }
    }

    /// An override of an existing task
    pub fn overriding(name: impl Into<String>, action: impl TaskAction + 'static) -> Self {
        Self {
            is_override: true,
            ..Self::new(name, action)
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(tasks.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for TaskContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContribution")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("depends_on", &self.depends_on)
            .field("is_override", &self.is_override)
            .finish_non_exhaustive()
    }
}
