//! The validated, fully merged configuration
//!
//! `ResolvedConfig` serializes to the same shape `UserConfig` parses, so a
//! resolved configuration can be written back out and loaded again.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manifest::{LOCAL_NETWORK, NetworkEntry, UserConfig};
use crate::error::ConfigValidationError;
use crate::tasks::CommandTaskConfig;

/// A network the project can target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub node_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_server_url: Option<String>,
    #[serde(default)]
    pub local: bool,
}

impl NetworkConfig {
    /// A remote network reachable only through its node
    pub fn remote(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            indexer_url: None,
            indexer_ws_url: None,
            proof_server_url: None,
            local: false,
        }
    }
}

/// Project directories, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub sources: PathBuf,
    pub artifacts: PathBuf,
    pub deployments: PathBuf,
}

/// Local development stack settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    pub compose_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub binary: String,
}

/// The final resolved configuration after merging all sources
///
/// This is the only configuration object the rest of the core reads. It is
/// read-only once [`ConfigPipeline`](super::ConfigPipeline) returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_network: Option<String>,

    /// Loaded extension ids, in load order
    pub plugins: Vec<String>,

    pub networks: BTreeMap<String, NetworkConfig>,

    pub paths: PathsConfig,

    pub docker: DockerConfig,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tasks: BTreeMap<String, CommandTaskConfig>,
}

impl ResolvedConfig {
    /// Build a resolved config from a merged layer, filling nothing in beyond
    /// what the layer holds except the `local` default network selection.
    ///
    /// `plugins` is left empty; the pipeline fills it with the load order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigValidationError` naming the first required value that
    /// is absent.
    pub fn from_user(user: UserConfig) -> Result<Self, ConfigValidationError> {
        let mut networks = BTreeMap::new();
        for (name, entry) in user.networks {
            let network = network_from_entry(&name, entry)?;
            networks.insert(name, network);
        }

        let default_network = user.default_network.or_else(|| {
            networks
                .contains_key(LOCAL_NETWORK)
                .then(|| LOCAL_NETWORK.to_string())
        });

        let paths = PathsConfig {
            sources: user
                .paths
                .sources
                .ok_or_else(|| ConfigValidationError::missing("paths.sources"))?,
            artifacts: user
                .paths
                .artifacts
                .ok_or_else(|| ConfigValidationError::missing("paths.artifacts"))?,
            deployments: user
                .paths
                .deployments
                .ok_or_else(|| ConfigValidationError::missing("paths.deployments"))?,
        };

        let docker = DockerConfig {
            compose_file: user
                .docker
                .compose_file
                .ok_or_else(|| ConfigValidationError::missing("docker.compose_file"))?,
            project_name: user.docker.project_name,
            binary: user
                .docker
                .binary
                .ok_or_else(|| ConfigValidationError::missing("docker.binary"))?,
        };

        Ok(Self {
            default_network,
            networks,
            paths,
            docker,
            plugins: Vec::new(),
            extensions: user.extensions,
            tasks: user.tasks,
        })
    }

    /// Check the shape of every value: network names and URLs, project paths,
    /// plugin ids and command tasks.
    ///
    /// Cross-field references are checked by [`validate`](Self::validate).
    pub fn validate_structure(&self) -> Result<(), ConfigValidationError> {
        for (name, network) in &self.networks {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::new(
                    "networks",
                    format!("{name:?}"),
                    "network names must not be empty",
                ));
            }
            let prefix = format!("networks.{name}");
            check_url(&format!("{prefix}.node_url"), &network.node_url)?;
            for (field, value) in [
                ("indexer_url", &network.indexer_url),
                ("indexer_ws_url", &network.indexer_ws_url),
                ("proof_server_url", &network.proof_server_url),
            ] {
                if let Some(url) = value {
                    check_url(&format!("{prefix}.{field}"), url)?;
                }
            }
        }

        for (field, path) in [
            ("sources", &self.paths.sources),
            ("artifacts", &self.paths.artifacts),
            ("deployments", &self.paths.deployments),
        ] {
            check_project_entry(&format!("paths.{field}"), path)?;
        }

        check_project_entry("docker.compose_file", &self.docker.compose_file)?;
        if self.docker.binary.trim().is_empty() {
            return Err(ConfigValidationError::new(
                "docker.binary",
                format!("{:?}", self.docker.binary),
                "container CLI must not be empty",
            ));
        }

        let mut seen = HashSet::new();
        for (i, id) in self.plugins.iter().enumerate() {
            if id.trim().is_empty() {
                return Err(ConfigValidationError::new(
                    format!("plugins[{i}]"),
                    format!("{id:?}"),
                    "extension ids must not be empty",
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigValidationError::new(
                    format!("plugins[{i}]"),
                    id.clone(),
                    "extension listed more than once",
                ));
            }
        }

        for (name, task) in &self.tasks {
            task.validate(&format!("tasks.{name}"))?;
        }

        Ok(())
    }

    /// Full validation: structure plus the `default_network` reference.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.validate_structure()?;

        if let Some(name) = &self.default_network
            && !self.networks.contains_key(name)
        {
            return Err(ConfigValidationError::new(
                "default_network",
                name.clone(),
                format!(
                    "no network named '{name}' (known networks: {})",
                    self.network_names().join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Network names in sorted order
    pub fn network_names(&self) -> Vec<&str> {
        self.networks.keys().map(String::as_str).collect()
    }

    /// The per-extension section for `id`, if any
    pub fn extension_section(&self, id: &str) -> Option<&Value> {
        self.extensions.get(id)
    }
}

fn network_from_entry(
    name: &str,
    entry: NetworkEntry,
) -> Result<NetworkConfig, ConfigValidationError> {
    let node_url = entry
        .node_url
        .ok_or_else(|| ConfigValidationError::missing(format!("networks.{name}.node_url")))?;
    Ok(NetworkConfig {
        node_url,
        indexer_url: entry.indexer_url,
        indexer_ws_url: entry.indexer_ws_url,
        proof_server_url: entry.proof_server_url,
        local: entry.local.unwrap_or(false),
    })
}

fn check_url(path: &str, value: &str) -> Result<(), ConfigValidationError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigValidationError::new(path, value, format!("invalid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(()),
        scheme => Err(ConfigValidationError::new(
            path,
            value,
            format!("unsupported URL scheme '{scheme}' (expected http, https, ws or wss)"),
        )),
    }
}

pub(crate) fn check_project_path(path: &str, value: &Path) -> Result<(), ConfigValidationError> {
    let shown = value.display().to_string();
    if shown.trim().is_empty() {
        return Err(ConfigValidationError::new(path, "\"\"", "path must not be empty"));
    }
    if value.is_absolute() || value.components().any(|c| c == Component::ParentDir) {
        return Err(ConfigValidationError::new(
            path,
            shown,
            "path must stay inside the project root",
        ));
    }
    Ok(())
}

/// A project path naming something below the root, never the root itself
fn check_project_entry(path: &str, value: &Path) -> Result<(), ConfigValidationError> {
    check_project_path(path, value)?;
    if value.components().all(|c| c == Component::CurDir) {
        return Err(ConfigValidationError::new(
            path,
            value.display().to_string(),
            "path must not be the project root",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolved_defaults() -> ResolvedConfig {
        ResolvedConfig::from_user(UserConfig::defaults()).unwrap()
    }

    #[test]
    fn defaults_select_local_network() {
        let config = resolved_defaults();
        assert_eq!(config.default_network.as_deref(), Some(LOCAL_NETWORK));
        assert!(config.networks[LOCAL_NETWORK].local);
        config.validate().unwrap();
    }

    #[test]
    fn missing_node_url_names_the_path() {
        let mut user = UserConfig::defaults();
        user.networks.insert("devnet".into(), NetworkEntry::default());

        let err = ResolvedConfig::from_user(user).unwrap_err();
        assert_eq!(err.path, "networks.devnet.node_url");
    }

    #[test]
    fn unknown_default_network_is_rejected() {
        let mut config = resolved_defaults();
        config.default_network = Some("ghost".into());

        let err = config.validate().unwrap_err();
        assert_eq!(err.path, "default_network");
        assert_eq!(err.value, "ghost");
        // Structure alone does not look at the reference.
        config.validate_structure().unwrap();
    }

    #[rstest]
    #[case("not a url", "invalid URL")]
    #[case("ftp://files.example.org", "unsupported URL scheme 'ftp'")]
    fn bad_node_urls_are_rejected(#[case] url: &str, #[case] expected: &str) {
        let mut config = resolved_defaults();
        config
            .networks
            .insert("devnet".into(), NetworkConfig::remote(url));

        let err = config.validate_structure().unwrap_err();
        assert_eq!(err.path, "networks.devnet.node_url");
        assert_eq!(err.value, url);
        assert!(err.message.contains(expected), "got: {}", err.message);
    }

    #[rstest]
    #[case("../outside")]
    #[case("/abs/artifacts")]
    #[case(".")]
    #[case("./")]
    #[case("./.")]
    fn artifact_path_must_stay_in_project(#[case] path: &str) {
        let mut config = resolved_defaults();
        config.paths.artifacts = PathBuf::from(path);

        let err = config.validate_structure().unwrap_err();
        assert_eq!(err.path, "paths.artifacts");
    }

    #[test]
    fn nested_current_dir_path_is_accepted() {
        let mut config = resolved_defaults();
        config.paths.artifacts = PathBuf::from("./build/artifacts");
        assert!(config.validate_structure().is_ok());
    }

    #[test]
    fn project_root_rejected_as_compose_file() {
        let mut config = resolved_defaults();
        config.docker.compose_file = PathBuf::from(".");

        let err = config.validate_structure().unwrap_err();
        assert_eq!(err.path, "docker.compose_file");
        assert_eq!(err.message, "path must not be the project root");
    }

    #[test]
    fn duplicate_plugin_ids_are_rejected() {
        let mut config = resolved_defaults();
        config.plugins = vec!["wallet".into(), "wallet".into()];

        let err = config.validate_structure().unwrap_err();
        assert_eq!(err.path, "plugins[1]");
    }

    #[test]
    fn round_trips_through_user_config() {
        let config = resolved_defaults();
        let text = toml::to_string(&config).unwrap();
        let user = UserConfig::parse(&text).unwrap();
        assert_eq!(ResolvedConfig::from_user(user).unwrap(), config);
    }
}
