//! Extension descriptors
//!
//! An [`Extension`] bundles what one unit of functionality contributes:
//! configuration hooks, runtime hooks and tasks. Extensions are plain values
//! built with a builder and handed to the core as an explicit list.
//!
//! ```
//! use zkit_core::config::NetworkConfig;
//! use zkit_core::extension::Extension;
//!
//! let devnet = Extension::new("devnet")
//!     .extend_config(|mut config| {
//!         config
//!             .networks
//!             .entry("devnet".into())
//!             .or_insert_with(|| NetworkConfig::remote("https://rpc.devnet.example.org"));
//!         config
//!     });
//! assert_eq!(devnet.id(), "devnet");
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use zkit_extensions::Dependent;

use crate::config::ResolvedConfig;
use crate::environment::RuntimeScope;
use crate::error::ConfigValidationError;
use crate::tasks::TaskContribution;
use crate::Result;

/// Config hook returning an updated configuration
pub type ConfigTransform = Arc<dyn Fn(ResolvedConfig) -> ResolvedConfig + Send + Sync>;

/// Config hook that accepts or rejects a configuration
pub type ConfigCheck =
    Arc<dyn Fn(&ResolvedConfig) -> std::result::Result<(), ConfigValidationError> + Send + Sync>;

/// The kinds of configuration hook, in the order they run per extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigHookKind {
    Extend,
    Validate,
    Resolve,
}

impl ConfigHookKind {
    /// All kinds in execution order
    pub const ORDER: [ConfigHookKind; 3] = [Self::Extend, Self::Validate, Self::Resolve];

    pub fn name(self) -> &'static str {
        match self {
            Self::Extend => "extend_user_config",
            Self::Validate => "validate_user_config",
            Self::Resolve => "resolve_user_config",
        }
    }
}

impl fmt::Display for ConfigHookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configuration hook
#[derive(Clone)]
pub enum ConfigHook {
    /// Add to the user configuration (new networks, extension sections)
    Extend(ConfigTransform),
    /// Reject configurations the extension cannot work with
    Validate(ConfigCheck),
    /// Fill in values derived from the rest of the configuration
    Resolve(ConfigTransform),
}

impl ConfigHook {
    pub fn kind(&self) -> ConfigHookKind {
        match self {
            Self::Extend(_) => ConfigHookKind::Extend,
            Self::Validate(_) => ConfigHookKind::Validate,
            Self::Resolve(_) => ConfigHookKind::Resolve,
        }
    }
}

impl fmt::Debug for ConfigHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigHook::{:?}", self.kind())
    }
}

/// Hook run once the runtime environment exists
///
/// `created` may read the environment and attach new properties through the
/// scope. It runs to completion before the next extension's hook starts.
#[async_trait]
pub trait RuntimeHook: Send + Sync {
    async fn created(&self, scope: &mut RuntimeScope<'_>) -> Result<()>;
}

/// Adapts a synchronous closure into a [`RuntimeHook`]
pub struct FnRuntimeHook<F>(F);

impl<F> FnRuntimeHook<F> {
    pub fn new(f: F) -> Self
    where
        F: Fn(&mut RuntimeScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self(f)
    }
}

#[async_trait]
impl<F> RuntimeHook for FnRuntimeHook<F>
where
    F: Fn(&mut RuntimeScope<'_>) -> Result<()> + Send + Sync + 'static,
{
    async fn created(&self, scope: &mut RuntimeScope<'_>) -> Result<()> {
        (self.0)(scope)
    }
}

/// What one extension contributes
#[derive(Clone)]
pub struct Extension {
    id: String,
    dependencies: Vec<String>,
    config_hooks: Vec<ConfigHook>,
    runtime_hooks: Vec<Arc<dyn RuntimeHook>>,
    tasks: Vec<TaskContribution>,
}

impl Extension {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            config_hooks: Vec::new(),
            runtime_hooks: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Extensions that must load before this one
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn extend_config<F>(mut self, hook: F) -> Self
    where
        F: Fn(ResolvedConfig) -> ResolvedConfig + Send + Sync + 'static,
    {
        self.config_hooks.push(ConfigHook::Extend(Arc::new(hook)));
        self
    }

    pub fn validate_config<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ResolvedConfig) -> std::result::Result<(), ConfigValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.config_hooks.push(ConfigHook::Validate(Arc::new(hook)));
        self
    }

    pub fn resolve_config<F>(mut self, hook: F) -> Self
    where
        F: Fn(ResolvedConfig) -> ResolvedConfig + Send + Sync + 'static,
    {
        self.config_hooks.push(ConfigHook::Resolve(Arc::new(hook)));
        self
    }

    pub fn on_created(mut self, hook: impl RuntimeHook + 'static) -> Self {
        self.runtime_hooks.push(Arc::new(hook));
        self
    }

    pub fn task(mut self, contribution: TaskContribution) -> Self {
        self.tasks.push(contribution);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Config hooks of one kind, in registration order
    pub fn config_hooks(&self, kind: ConfigHookKind) -> impl Iterator<Item = &ConfigHook> {
        self.config_hooks.iter().filter(move |h| h.kind() == kind)
    }

    pub fn runtime_hooks(&self) -> &[Arc<dyn RuntimeHook>] {
        &self.runtime_hooks
    }

    pub fn tasks(&self) -> &[TaskContribution] {
        &self.tasks
    }
}

impl Dependent for Extension {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("config_hooks", &self.config_hooks)
            .field("runtime_hooks", &self.runtime_hooks.len())
            .field("tasks", &self.tasks)
            .finish()
    }
}
