//! Tasks every project has, registered before any extension

use async_trait::async_trait;
use serde_json::{Value, json};

use super::action::{ActionResult, TaskAction, TaskContext};
use super::TaskContribution;

/// Registration source recorded for built-in tasks
pub const SOURCE: &str = "builtin";

/// The built-in task contributions
pub fn builtin_tasks() -> Vec<TaskContribution> {
    vec![
        TaskContribution::new("config", ShowConfig)
            .description("Print the resolved configuration"),
        TaskContribution::new("networks", ListNetworks)
            .description("List configured networks and the selected one"),
        TaskContribution::new("clean", Clean).description("Remove the artifacts directory"),
    ]
}

struct ShowConfig;

#[async_trait]
impl TaskAction for ShowConfig {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        Ok(serde_json::to_value(ctx.env().config())?)
    }
}

struct ListNetworks;

#[async_trait]
impl TaskAction for ListNetworks {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        let env = ctx.env();
        let selected = env.network().map(|n| n.name.as_str());
        let networks: Vec<Value> = env
            .config()
            .networks
            .iter()
            .map(|(name, network)| {
                json!({
                    "name": name,
                    "node_url": network.node_url,
                    "local": network.local,
                    "selected": selected == Some(name.as_str()),
                })
            })
            .collect();
        Ok(Value::Array(networks))
    }
}

/// `clean` would remove the project root or a directory above it
#[derive(Debug, thiserror::Error)]
#[error("refusing to remove {path}: it contains the project root")]
pub struct CleanRefused {
    pub path: String,
}

struct Clean;

#[async_trait]
impl TaskAction for Clean {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        let env = ctx.env();
        let artifacts = env.project_path(&env.config().paths.artifacts);
        let existed = tokio::fs::try_exists(&artifacts).await?;
        if existed {
            let target = tokio::fs::canonicalize(&artifacts).await?;
            let root = tokio::fs::canonicalize(env.root()).await?;
            if root.starts_with(&target) {
                return Err(Box::new(CleanRefused {
                    path: artifacts.display().to_string(),
                }));
            }
            tokio::fs::remove_dir_all(&artifacts).await?;
            tracing::info!(path = ?artifacts, "artifacts removed");
        }
        Ok(json!({
            "path": artifacts.display().to_string(),
            "removed": existed,
        }))
    }
}
