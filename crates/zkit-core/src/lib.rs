//! Plugin, hook and task orchestration for zkit
//!
//! This crate turns a project configuration and a list of extensions into
//! runnable tasks:
//!
//! - **Configuration**: layered loading of `zkit.toml` and resolution through
//!   the [`ConfigPipeline`](config::ConfigPipeline)
//! - **Extensions**: [`Extension`] descriptors ordered by dependency, whose
//!   hooks the [`HookManager`] runs
//! - **Runtime environment**: resolved config, selected network and the
//!   services extensions attach
//! - **Tasks**: a [`TaskRegistry`](tasks::TaskRegistry) with override chains
//!   and a [`TaskRunner`](tasks::TaskRunner) that runs dependencies first
//!
//! # Control flow
//!
//! ```text
//! UserConfig --ConfigPipeline--> ResolvedConfig + extension order
//!            --HookManager-----> RuntimeEnvironment
//!            --TaskRegistry----> built-ins, extension tasks, command tasks
//!            --TaskRunner------> TaskReport
//! ```
//!
//! [`Session`] wires these steps together for one invocation.
//!
//! # Example
//!
//! ```no_run
//! use zkit_core::config::ConfigLoader;
//! use zkit_core::tasks::TaskArgs;
//! use zkit_core::{Session, SessionOptions, builtin_extensions};
//!
//! # async fn example() -> zkit_core::Result<()> {
//! let loader = ConfigLoader::new("zkit.toml");
//! let raw = loader.load()?;
//! let session = Session::bootstrap(
//!     &raw,
//!     &builtin_extensions(),
//!     SessionOptions::new(loader.project_root()),
//! )
//! .await?;
//! let report = session.run("networks", &TaskArgs::new()).await?;
//! println!("{}", report.output);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod extension;
pub mod hooks;
pub mod session;
pub mod stack;
pub mod tasks;

pub use environment::{RuntimeEnvironment, RuntimeScope, SelectedNetwork};
pub use error::{ConfigValidationError, Error, Result};
pub use extension::{ConfigHook, ConfigHookKind, Extension, FnRuntimeHook, RuntimeHook};
pub use hooks::HookManager;
pub use session::{Session, SessionOptions};
pub use stack::{ComposeStack, local_stack};

/// Extensions shipped with zkit, in catalog order
pub fn builtin_extensions() -> Vec<Extension> {
    vec![local_stack()]
}
