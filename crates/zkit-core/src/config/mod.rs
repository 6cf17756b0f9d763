//! Configuration loading and resolution
//!
//! # Configuration Hierarchy
//!
//! Configuration is merged from these sources (later sources override earlier):
//!
//! 1. **Built-in defaults** - a `local` network and the default project layout
//! 2. **Global config** - `<config_dir>/zkit/config.toml`
//! 3. **Project config** - `zkit.toml`
//! 4. **Local overrides** - `zkit.local.toml` (git-ignored)
//!
//! [`ConfigLoader`] merges the file layers into a [`UserConfig`];
//! [`ConfigPipeline`] applies the defaults, runs extension hooks and returns
//! the [`ResolvedConfig`].
//!
//! # Example
//!
//! ```no_run
//! use zkit_core::config::{ConfigLoader, ConfigPipeline};
//!
//! let loader = ConfigLoader::new("zkit.toml");
//! let raw = loader.load()?;
//! let (config, _order) = ConfigPipeline::resolve(&raw, &zkit_core::builtin_extensions())?;
//! println!("default network: {:?}", config.default_network);
//! # Ok::<(), zkit_core::Error>(())
//! ```

mod loader;
mod manifest;
mod pipeline;
mod resolved;

pub use loader::{CONFIG_FILENAME, ConfigLoader, LOCAL_CONFIG_FILENAME};
pub use manifest::{DockerEntry, LOCAL_NETWORK, NetworkEntry, PathsEntry, UserConfig};
pub use pipeline::ConfigPipeline;
pub use resolved::{DockerConfig, NetworkConfig, PathsConfig, ResolvedConfig};

pub(crate) use resolved::check_project_path;
