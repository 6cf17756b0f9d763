//! One invocation's worth of resolved state
//!
//! A [`Session`] is built fresh for every entry-point run: it resolves the
//! configuration, builds the runtime environment and fills the task
//! registry, then runs tasks against them. Nothing is shared between
//! sessions.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigPipeline, ResolvedConfig, UserConfig};
use crate::environment::RuntimeEnvironment;
use crate::extension::Extension;
use crate::hooks::HookManager;
use crate::tasks::{TaskArgs, TaskRegistry, TaskReport, TaskRunner};
use crate::Result;

/// Registration source recorded for config-declared command tasks
pub const CONFIG_SOURCE: &str = "config";

/// How a session is set up
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root; command tasks run here and project paths resolve
    /// against it
    pub root: PathBuf,
    /// Network override; `default_network` is used when `None`
    pub network: Option<String>,
    pub cancellation: CancellationToken,
}

impl SessionOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            network: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Resolved configuration, runtime environment and task registry for one run
pub struct Session {
    extensions: Vec<Extension>,
    env: RuntimeEnvironment,
    registry: TaskRegistry,
    cancellation: CancellationToken,
}

impl Session {
    /// Build everything a task run needs from `user_config`
    ///
    /// 1. Resolve the configuration and extension order.
    /// 2. Create the runtime environment and run the runtime hooks.
    /// 3. Register built-in tasks, then each extension's tasks in load
    ///    order, then the command tasks from the configuration.
    ///
    /// # Errors
    ///
    /// Any configuration, extension, hook or registration error; no task
    /// has run when this fails.
    pub async fn bootstrap(
        user_config: &UserConfig,
        catalog: &[Extension],
        options: SessionOptions,
    ) -> Result<Self> {
        let (config, extensions) = ConfigPipeline::resolve(user_config, catalog)?;

        let env = RuntimeEnvironment::new(config, options.root, options.network.as_deref())?;
        let env = HookManager::run_runtime_hooks(&extensions, env).await?;

        let mut registry = TaskRegistry::with_builtins()?;
        for extension in &extensions {
            for task in extension.tasks() {
                registry.register(extension.id(), task.clone())?;
            }
        }
        for (name, task) in &env.config().tasks {
            registry.register(CONFIG_SOURCE, task.contribution(name))?;
        }
        tracing::debug!(tasks = registry.len(), "task registry populated");

        Ok(Self {
            extensions,
            env,
            registry,
            cancellation: options.cancellation,
        })
    }

    /// Run `name` with `args` after its dependencies
    pub async fn run(&self, name: &str, args: &TaskArgs) -> Result<TaskReport> {
        TaskRunner::with_cancellation(&self.registry, self.cancellation.clone())
            .run(name, args, &self.env)
            .await
    }

    pub fn config(&self) -> &ResolvedConfig {
        self.env.config()
    }

    pub fn env(&self) -> &RuntimeEnvironment {
        &self.env
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Loaded extensions in load order
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
