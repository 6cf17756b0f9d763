//! Runtime environment handed to runtime hooks and task actions
//!
//! The environment holds the resolved configuration, the selected network
//! and any properties extensions attached while their `created` hooks ran.
//! Properties are typed services (clients, container control, ...) stored
//! behind `Arc<dyn Any>` and looked up by name.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{NetworkConfig, ResolvedConfig};
use crate::error::ConfigValidationError;
use crate::{Error, Result};

/// The network tasks run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedNetwork {
    pub name: String,
    pub config: NetworkConfig,
}

struct Property {
    owner: String,
    value: Arc<dyn Any + Send + Sync>,
}

/// Everything a task action may use
///
/// Built once per invocation. Mutable only while runtime hooks run; task
/// actions get a shared reference.
pub struct RuntimeEnvironment {
    config: ResolvedConfig,
    root: PathBuf,
    network: Option<SelectedNetwork>,
    properties: BTreeMap<String, Property>,
}

impl RuntimeEnvironment {
    /// Create an environment for `config`, rooted at the project directory.
    ///
    /// `network` selects a network explicitly; otherwise the configured
    /// `default_network` is used. A project without networks runs without a
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigValidationError` at path `network` when the requested
    /// network does not exist.
    pub fn new(
        config: ResolvedConfig,
        root: impl Into<PathBuf>,
        network: Option<&str>,
    ) -> Result<Self> {
        let name = network
            .map(str::to_string)
            .or_else(|| config.default_network.clone());

        let network = match name {
            Some(name) => {
                let Some(network_config) = config.networks.get(&name) else {
                    return Err(ConfigValidationError::new(
                        "network",
                        name.clone(),
                        format!(
                            "no network named '{name}' (known networks: {})",
                            config.network_names().join(", ")
                        ),
                    )
                    .into());
                };
                Some(SelectedNetwork {
                    config: network_config.clone(),
                    name,
                })
            }
            None => None,
        };

        tracing::debug!(
            network = network.as_ref().map(|n| n.name.as_str()),
            "runtime environment created"
        );

        Ok(Self {
            config,
            root: root.into(),
            network,
            properties: BTreeMap::new(),
        })
    }

    /// The resolved configuration
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The selected network, if any
    pub fn network(&self) -> Option<&SelectedNetwork> {
        self.network.as_ref()
    }

    /// The project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a project-relative path against the root
    pub fn project_path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Look up a property by name and type
    ///
    /// Returns `None` if the property is absent or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.properties
            .get(name)
            .and_then(|p| p.value.downcast_ref::<T>())
    }

    /// Look up a property and return a shared handle to it
    pub fn get_shared<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.properties
            .get(name)
            .and_then(|p| Arc::clone(&p.value).downcast::<T>().ok())
    }

    /// Whether a property with this name is attached
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Id of the extension that attached `name`
    pub fn property_owner(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|p| p.owner.as_str())
    }

    /// Attached property names in sorted order
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    /// A handle that attaches properties on behalf of `extension`
    pub fn scope<'a>(&'a mut self, extension: &'a str) -> RuntimeScope<'a> {
        RuntimeScope {
            env: self,
            extension,
        }
    }

    fn attach(
        &mut self,
        owner: &str,
        name: &str,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Result<()> {
        if let Some(existing) = self.properties.get(name) {
            return Err(Error::RuntimeExtensionCollision {
                property: name.to_string(),
                owner: existing.owner.clone(),
                extension: owner.to_string(),
            });
        }
        tracing::debug!(extension = owner, property = name, "runtime property attached");
        self.properties.insert(
            name.to_string(),
            Property {
                owner: owner.to_string(),
                value,
            },
        );
        Ok(())
    }
}

impl fmt::Debug for RuntimeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeEnvironment")
            .field("root", &self.root)
            .field("network", &self.network)
            .field("properties", &self.property_names())
            .finish_non_exhaustive()
    }
}

/// What a runtime hook sees: the environment, bound to one extension
pub struct RuntimeScope<'a> {
    env: &'a mut RuntimeEnvironment,
    extension: &'a str,
}

impl RuntimeScope<'_> {
    /// Id of the extension this scope acts for
    pub fn extension(&self) -> &str {
        self.extension
    }

    /// Read access to the environment built so far
    pub fn env(&self) -> &RuntimeEnvironment {
        self.env
    }

    /// Attach a new property
    ///
    /// # Errors
    ///
    /// Returns `Error::RuntimeExtensionCollision` if any extension, including
    /// this one, already attached `name`.
    pub fn attach<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> Result<()> {
        self.env.attach(self.extension, name, Arc::new(value))
    }

    /// A hook failure attributed to this scope's extension
    pub fn fail(&self, message: impl Into<String>) -> Error {
        Error::HookFailed {
            extension: self.extension.to_string(),
            message: message.into(),
        }
    }
}
