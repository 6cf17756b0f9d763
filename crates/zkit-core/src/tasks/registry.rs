//! Task registry with override chains

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::action::{ActionResult, TaskAction, TaskArgs, TaskContext};
use super::TaskContribution;
use crate::environment::RuntimeEnvironment;
use crate::{Error, Result};

/// A registered task
pub struct TaskRegistration {
    name: String,
    description: Option<String>,
    action: Arc<dyn TaskAction>,
    /// Replaced implementations, most recent first
    override_chain: Vec<Arc<dyn TaskAction>>,
    depends_on: Vec<String>,
    defined_by: String,
    overridden_by: Vec<String>,
}

impl TaskRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Who registered the original definition (`builtin`, an extension id or
    /// `config`)
    pub fn defined_by(&self) -> &str {
        &self.defined_by
    }

    /// Who overrode the task, oldest first
    pub fn overridden_by(&self) -> &[String] {
        &self.overridden_by
    }

    /// Number of implementations below the current one
    pub fn override_depth(&self) -> usize {
        self.override_chain.len()
    }

    /// Run the current action with the override chain behind it
    pub(crate) async fn invoke(
        &self,
        args: &TaskArgs,
        env: &RuntimeEnvironment,
        cancellation: &CancellationToken,
    ) -> ActionResult {
        self.action
            .run(TaskContext::new(
                &self.name,
                args,
                env,
                cancellation,
                &self.override_chain,
            ))
            .await
    }
}

/// Task definitions keyed by name
///
/// Populated during the load phase only; the runner borrows it immutably.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskRegistration>,
}

impl TaskRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated with the built-in tasks.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for contribution in super::builtin::builtin_tasks() {
            registry.define(super::builtin::SOURCE, contribution)?;
        }
        Ok(registry)
    }

    /// Register a contribution, dispatching on `is_override`
    pub fn register(&mut self, source: &str, contribution: TaskContribution) -> Result<()> {
        if contribution.is_override {
            self.override_task(source, contribution)
        } else {
            self.define(source, contribution)
        }
    }

    /// Add a fresh task
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateTask` if the name is taken.
    pub fn define(&mut self, source: &str, contribution: TaskContribution) -> Result<()> {
        if let Some(existing) = self.tasks.get(&contribution.name) {
            return Err(Error::DuplicateTask {
                task: contribution.name,
                defined_by: existing.defined_by.clone(),
                contributed_by: source.to_string(),
            });
        }

        tracing::debug!(task = %contribution.name, source, "task defined");
        self.tasks.insert(
            contribution.name.clone(),
            TaskRegistration {
                name: contribution.name,
                description: contribution.description,
                action: contribution.action,
                override_chain: Vec::new(),
                depends_on: dedup(contribution.depends_on),
                defined_by: source.to_string(),
                overridden_by: Vec::new(),
            },
        );
        Ok(())
    }

    /// Replace an existing task, keeping the replaced action reachable
    ///
    /// The override's dependencies are appended to the existing ones; its
    /// description replaces the old one when given.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if there is nothing to override.
    pub fn override_task(&mut self, source: &str, contribution: TaskContribution) -> Result<()> {
        let Some(existing) = self.tasks.get_mut(&contribution.name) else {
            return Err(Error::TaskNotFound {
                task: contribution.name,
                required_by: Some(format!("override from {source}")),
            });
        };

        let replaced = std::mem::replace(&mut existing.action, contribution.action);
        existing.override_chain.insert(0, replaced);
        for dependency in contribution.depends_on {
            if !existing.depends_on.contains(&dependency) {
                existing.depends_on.push(dependency);
            }
        }
        if contribution.description.is_some() {
            existing.description = contribution.description;
        }
        existing.overridden_by.push(source.to_string());

        tracing::debug!(
            task = %existing.name,
            source,
            depth = existing.override_chain.len(),
            "task overridden"
        );
        Ok(())
    }

    /// Look up a task
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if absent.
    pub fn get(&self, name: &str) -> Result<&TaskRegistration> {
        self.tasks.get(name).ok_or_else(|| Error::TaskNotFound {
            task: name.to_string(),
            required_by: None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Registrations in name order
    pub fn iter(&self) -> impl Iterator<Item = &TaskRegistration> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
