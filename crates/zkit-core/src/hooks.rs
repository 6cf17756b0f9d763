//! Hook execution across loaded extensions
//!
//! Hooks run strictly one after another, in extension load order. For the
//! configuration category each extension runs its hooks in the fixed order
//! extend, validate, resolve before the next extension starts. The first
//! failure stops the chain and nothing built so far is returned.

use crate::config::ResolvedConfig;
use crate::environment::RuntimeEnvironment;
use crate::extension::{ConfigHook, ConfigHookKind, Extension};
use crate::Result;

/// Runs extension hooks in resolved order
pub struct HookManager;

impl HookManager {
    /// Thread `config` through every extension's configuration hooks
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigValidation` from the first failing validate hook,
    /// attributed to its extension.
    pub fn run_config_hooks(order: &[Extension], seed: ResolvedConfig) -> Result<ResolvedConfig> {
        let mut config = seed;
        for extension in order {
            for kind in ConfigHookKind::ORDER {
                for hook in extension.config_hooks(kind) {
                    tracing::debug!(extension = %extension.id(), hook = %kind, "running config hook");
                    config = match hook {
                        ConfigHook::Extend(f) | ConfigHook::Resolve(f) => f(config),
                        ConfigHook::Validate(check) => {
                            check(&config).map_err(|e| {
                                tracing::debug!(extension = %extension.id(), error = %e, "config rejected");
                                e.reported_by(extension.id())
                            })?;
                            config
                        }
                    };
                }
            }
        }
        Ok(config)
    }

    /// Let every extension's `created` hooks populate `env`
    ///
    /// # Errors
    ///
    /// Returns the first hook error, such as
    /// `Error::RuntimeExtensionCollision` or `Error::HookFailed`.
    pub async fn run_runtime_hooks(
        order: &[Extension],
        mut env: RuntimeEnvironment,
    ) -> Result<RuntimeEnvironment> {
        for extension in order {
            for hook in extension.runtime_hooks() {
                tracing::debug!(extension = %extension.id(), hook = "created", "running runtime hook");
                let mut scope = env.scope(extension.id());
                hook.created(&mut scope).await?;
            }
        }
        Ok(env)
    }
}
