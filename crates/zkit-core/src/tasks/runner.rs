//! Dependency-ordered task execution

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use zkit_extensions::DependencyGraph;

use super::action::TaskArgs;
use super::registry::TaskRegistry;
use crate::environment::RuntimeEnvironment;
use crate::{Error, Result};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    /// The requested task
    pub task: String,
    /// Output of the requested task's action
    pub output: Value,
    /// Every task that ran, in execution order; the requested task is last
    pub executed: Vec<String>,
}

/// Runs a task after its dependencies
///
/// Each task runs at most once per [`run`](Self::run) call no matter how many
/// dependents require it. Steps run one after another; the cancellation
/// token is checked before each step starts.
pub struct TaskRunner<'a> {
    registry: &'a TaskRegistry,
    cancel: CancellationToken,
}

impl<'a> TaskRunner<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self::with_cancellation(registry, CancellationToken::new())
    }

    pub fn with_cancellation(registry: &'a TaskRegistry, cancel: CancellationToken) -> Self {
        Self { registry, cancel }
    }

    /// Token that cancels runs started by this runner
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The steps [`run`](Self::run) would execute for `name`, in order
    ///
    /// # Errors
    ///
    /// - `Error::TaskNotFound` if `name` or any task it reaches is absent
    /// - `Error::TaskDependencyCycle` if the reachable tasks form a cycle
    pub fn plan(&self, name: &str) -> Result<Vec<String>> {
        let reachable = self.reachable(name)?;

        let mut graph = DependencyGraph::new();
        for task in &reachable {
            graph.add_node(*task)?;
        }
        for task in &reachable {
            for dependency in self.registry.get(task)?.depends_on() {
                graph.add_edge(task, dependency);
            }
        }
        graph.topological_indices().map_err(|e| match e {
            zkit_extensions::Error::DependencyCycle { cycle } => {
                Error::TaskDependencyCycle { cycle }
            }
            other => Error::Extensions(other),
        })?;

        let mut order = Vec::with_capacity(reachable.len());
        let mut visited = HashSet::new();
        self.post_order(name, &mut visited, &mut order)?;
        Ok(order)
    }

    /// Run `name` with `args` after its dependencies
    ///
    /// Dependencies receive empty arguments. The first failure stops the run;
    /// tasks depending on the failed one never start.
    ///
    /// # Errors
    ///
    /// Planning errors from [`plan`](Self::plan), `Error::Cancelled` naming
    /// the step that was about to start, or `Error::TaskExecution` wrapping
    /// the failing action's error.
    pub async fn run(
        &self,
        name: &str,
        args: &TaskArgs,
        env: &RuntimeEnvironment,
    ) -> Result<TaskReport> {
        let plan = self.plan(name)?;
        tracing::debug!(task = name, ?plan, "running task");

        let no_args = TaskArgs::new();
        let mut executed = Vec::with_capacity(plan.len());
        let mut output = Value::Null;

        for step in plan {
            if self.cancel.is_cancelled() {
                tracing::warn!(task = %step, "run cancelled");
                return Err(Error::Cancelled { task: step });
            }

            let task = self.registry.get(&step)?;
            let step_args = if step == name { args } else { &no_args };

            tracing::info!(task = %step, "task started");
            let started = Instant::now();
            let result = task.invoke(step_args, env, &self.cancel).await;
            let elapsed_ms = started.elapsed().as_millis();

            match result {
                Ok(value) => {
                    tracing::info!(task = %step, elapsed_ms, "task finished");
                    if step == name {
                        output = value;
                    }
                    executed.push(step);
                }
                Err(source) => {
                    tracing::error!(task = %step, elapsed_ms, error = %source, "task failed");
                    return Err(Error::TaskExecution { task: step, source });
                }
            }
        }

        Ok(TaskReport {
            task: name.to_string(),
            output,
            executed,
        })
    }

    /// Tasks reachable from `name`, in discovery order
    fn reachable(&self, name: &str) -> Result<Vec<&'a str>> {
        let root = self.registry.get(name)?;
        let mut found = vec![root.name()];
        let mut seen: HashSet<&str> = HashSet::from([root.name()]);
        let mut next = 0;

        while next < found.len() {
            let current = found[next];
            next += 1;
            for dependency in self.registry.get(current)?.depends_on() {
                if seen.contains(dependency.as_str()) {
                    continue;
                }
                let registration =
                    self.registry
                        .get(dependency)
                        .map_err(|_| Error::TaskNotFound {
                            task: dependency.clone(),
                            required_by: Some(current.to_string()),
                        })?;
                seen.insert(registration.name());
                found.push(registration.name());
            }
        }
        Ok(found)
    }

    fn post_order(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        for dependency in self.registry.get(name)?.depends_on() {
            self.post_order(dependency, visited, order)?;
        }
        order.push(name.to_string());
        Ok(())
    }
}
