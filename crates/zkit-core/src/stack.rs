//! The `local-stack` extension: a node, indexer and proof server run
//! through `docker compose`
//!
//! The extension attaches a [`ComposeStack`] to the runtime environment and
//! contributes the `node.start`, `node.stop` and `node.status` tasks, which
//! only reach compose through that property.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedConfig;
use crate::environment::RuntimeScope;
use crate::error::ConfigValidationError;
use crate::extension::{Extension, RuntimeHook};
use crate::tasks::{
    ActionResult, CommandFailed, CommandOutput, TaskAction, TaskContext, TaskContribution,
    run_command,
};

/// Extension id
pub const LOCAL_STACK: &str = "local-stack";

/// Runtime property holding the [`ComposeStack`]
pub const COMPOSE_PROPERTY: &str = "compose";

/// Controls the local development stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeStack {
    binary: String,
    compose_file: PathBuf,
    project_name: Option<String>,
    root: PathBuf,
}

impl ComposeStack {
    pub fn new(
        binary: impl Into<String>,
        compose_file: impl Into<PathBuf>,
        project_name: Option<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            compose_file: compose_file.into(),
            project_name,
            root: root.into(),
        }
    }

    pub fn compose_file(&self) -> &std::path::Path {
        &self.compose_file
    }

    /// `compose` arguments selecting this project, followed by `command`
    fn args(&self, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
        ];
        if let Some(name) = &self.project_name {
            args.push("-p".to_string());
            args.push(name.clone());
        }
        args.extend(command.iter().map(|s| s.to_string()));
        args
    }

    async fn compose(
        &self,
        command: &[&str],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandFailed> {
        let output = run_command(
            &self.binary,
            &self.args(command),
            &self.root,
            &Default::default(),
            cancel,
        )
        .await?;
        if !output.success {
            return Err(output.into());
        }
        Ok(output)
    }

    /// Start the stack in the background
    pub async fn up(&self, cancel: &CancellationToken) -> Result<CommandOutput, CommandFailed> {
        self.compose(&["up", "-d", "--wait"], cancel).await
    }

    /// Stop and remove the stack's containers
    pub async fn down(&self, cancel: &CancellationToken) -> Result<CommandOutput, CommandFailed> {
        self.compose(&["down"], cancel).await
    }

    /// Names of running services
    pub async fn running_services(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CommandFailed> {
        let output = self
            .compose(&["ps", "--services", "--filter", "status=running"], cancel)
            .await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Why a `node.*` task could not reach the stack
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("no 'compose' property in the runtime environment; is the local-stack extension loaded?")]
    NotAttached,

    #[error("network '{network}' is not a local network")]
    RemoteNetwork { network: String },
}

/// The `local-stack` extension
pub fn local_stack() -> Extension {
    Extension::new(LOCAL_STACK)
        .validate_config(validate_docker)
        .on_created(AttachCompose)
        .task(
            TaskContribution::new("node.start", NodeStart)
                .description("Start the local node, indexer and proof server"),
        )
        .task(TaskContribution::new("node.stop", NodeStop).description("Stop the local stack"))
        .task(
            TaskContribution::new("node.status", NodeStatus)
                .description("Show which local services are running"),
        )
}

fn validate_docker(config: &ResolvedConfig) -> Result<(), ConfigValidationError> {
    let file = &config.docker.compose_file;
    let is_yaml = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yml" || e == "yaml");
    if !is_yaml {
        return Err(ConfigValidationError::new(
            "docker.compose_file",
            file.display().to_string(),
            "compose file must be a .yml or .yaml file",
        ));
    }

    if let Some(name) = &config.docker.project_name {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(ConfigValidationError::new(
                "docker.project_name",
                name.clone(),
                "project names use lowercase letters, digits, '-' and '_'",
            ));
        }
    }
    Ok(())
}

struct AttachCompose;

#[async_trait]
impl RuntimeHook for AttachCompose {
    async fn created(&self, scope: &mut RuntimeScope<'_>) -> crate::Result<()> {
        let env = scope.env();
        let docker = &env.config().docker;
        let stack = ComposeStack::new(
            docker.binary.clone(),
            env.project_path(&docker.compose_file),
            docker.project_name.clone(),
            env.root(),
        );
        scope.attach(COMPOSE_PROPERTY, stack)
    }
}

fn stack<'a>(ctx: &TaskContext<'a>) -> Result<&'a ComposeStack, StackError> {
    ctx.env()
        .get::<ComposeStack>(COMPOSE_PROPERTY)
        .ok_or(StackError::NotAttached)
}

struct NodeStart;

#[async_trait]
impl TaskAction for NodeStart {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        if let Some(network) = ctx.env().network()
            && !network.config.local
        {
            return Err(Box::new(StackError::RemoteNetwork {
                network: network.name.clone(),
            }));
        }
        let stack = stack(&ctx)?;
        stack.up(ctx.cancellation()).await?;
        tracing::info!(compose_file = ?stack.compose_file(), "local stack started");
        Ok(json!({ "started": true }))
    }
}

struct NodeStop;

#[async_trait]
impl TaskAction for NodeStop {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        stack(&ctx)?.down(ctx.cancellation()).await?;
        Ok(json!({ "stopped": true }))
    }
}

struct NodeStatus;

#[async_trait]
impl TaskAction for NodeStatus {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        let services = stack(&ctx)?.running_services(ctx.cancellation()).await?;
        Ok(json!({
            "running": !services.is_empty(),
            "services": services,
        }))
    }
}
