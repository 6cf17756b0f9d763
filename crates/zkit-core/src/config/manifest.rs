//! Raw user configuration parsed from `zkit.toml`
//!
//! A `UserConfig` represents a single configuration layer. Every field is
//! optional so that a layer only states what it changes; layers are merged
//! and then turned into a [`ResolvedConfig`](super::ResolvedConfig).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::tasks::CommandTaskConfig;

/// One `[networks.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_server_url: Option<String>,
    /// Whether the network runs on this machine (e.g. via `node.start`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
}

impl NetworkEntry {
    fn merge(&mut self, other: &NetworkEntry) {
        merge_option(&mut self.node_url, &other.node_url);
        merge_option(&mut self.indexer_url, &other.indexer_url);
        merge_option(&mut self.indexer_ws_url, &other.indexer_ws_url);
        merge_option(&mut self.proof_server_url, &other.proof_server_url);
        merge_option(&mut self.local, &other.local);
    }
}

/// The `[paths]` table; all paths are relative to the project root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments: Option<PathBuf>,
}

/// The `[docker]` table used by the local development stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Container CLI used to drive compose (`docker` unless overridden)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

/// A single configuration layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Network used when `--network` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_network: Option<String>,

    /// Extensions to load, by id. When absent every available extension is
    /// loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkEntry>,

    #[serde(default)]
    pub paths: PathsEntry,

    #[serde(default)]
    pub docker: DockerEntry,

    /// Free-form per-extension sections keyed by extension id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,

    /// Command tasks declared directly in the config
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tasks: BTreeMap<String, CommandTaskConfig>,
}

/// Name of the network every project gets unless it redefines it
pub const LOCAL_NETWORK: &str = "local";

impl UserConfig {
    /// Parse a configuration layer from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use zkit_core::config::UserConfig;
    ///
    /// let config = UserConfig::parse(r#"
    /// default_network = "devnet"
    ///
    /// [networks.devnet]
    /// node_url = "https://rpc.devnet.example.org"
    /// "#).unwrap();
    ///
    /// assert_eq!(config.default_network.as_deref(), Some("devnet"));
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let config: UserConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// The built-in defaults layer
    ///
    /// Provides a `local` network on the standard development ports, the
    /// default project directories and the default compose file.
    pub fn defaults() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            LOCAL_NETWORK.to_string(),
            NetworkEntry {
                node_url: Some("http://127.0.0.1:9944".to_string()),
                indexer_url: Some("http://127.0.0.1:8088/api/v1/graphql".to_string()),
                indexer_ws_url: Some("ws://127.0.0.1:8088/api/v1/graphql/ws".to_string()),
                proof_server_url: Some("http://127.0.0.1:6300".to_string()),
                local: Some(true),
            },
        );

        Self {
            default_network: None,
            networks,
            paths: PathsEntry {
                sources: Some(PathBuf::from("contracts")),
                artifacts: Some(PathBuf::from("artifacts")),
                deployments: Some(PathBuf::from("deployments")),
            },
            docker: DockerEntry {
                compose_file: Some(PathBuf::from("docker-compose.yml")),
                project_name: None,
                binary: Some("docker".to_string()),
            },
            plugins: None,
            extensions: BTreeMap::new(),
            tasks: BTreeMap::new(),
        }
    }

    /// Merge another layer into this one
    ///
    /// The `other` layer takes precedence for every value it sets:
    /// - scalars and `plugins`: replaced when set in `other`
    /// - `networks`: merged per network, field by field
    /// - `extensions`: deep merge, base-only keys preserved
    /// - `tasks`: replaced per task name
    pub fn merge(&mut self, other: &UserConfig) {
        merge_option(&mut self.default_network, &other.default_network);

        for (name, entry) in &other.networks {
            self.networks.entry(name.clone()).or_default().merge(entry);
        }

        merge_option(&mut self.paths.sources, &other.paths.sources);
        merge_option(&mut self.paths.artifacts, &other.paths.artifacts);
        merge_option(&mut self.paths.deployments, &other.paths.deployments);

        merge_option(&mut self.docker.compose_file, &other.docker.compose_file);
        merge_option(&mut self.docker.project_name, &other.docker.project_name);
        merge_option(&mut self.docker.binary, &other.docker.binary);

        merge_option(&mut self.plugins, &other.plugins);

        for (id, other_value) in &other.extensions {
            if let Some(base_value) = self.extensions.get_mut(id) {
                deep_merge_value(base_value, other_value);
            } else {
                self.extensions.insert(id.clone(), other_value.clone());
            }
        }

        for (name, task) in &other.tasks {
            self.tasks.insert(name.clone(), task.clone());
        }
    }

    /// Consuming variant of [`merge`](Self::merge)
    pub fn merged(mut self, other: &UserConfig) -> Self {
        self.merge(other);
        self
    }
}

fn merge_option<T: Clone>(base: &mut Option<T>, other: &Option<T>) {
    if let Some(value) = other {
        *base = Some(value.clone());
    }
}

/// Deep merge two JSON values
///
/// If both values are objects, merge them recursively with `other` taking precedence.
/// Otherwise, `other` replaces `base`.
pub(crate) fn deep_merge_value(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, other_val) in other_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge_value(base_val, other_val);
                } else {
                    base_map.insert(key.clone(), other_val.clone());
                }
            }
        }
        (base, other) => {
            *base = other.clone();
        }
    }
}
