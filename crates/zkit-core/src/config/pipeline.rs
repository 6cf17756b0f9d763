//! From raw user configuration to the resolved configuration
//!
//! The pipeline is the only place configuration is validated, so values
//! contributed by extensions are checked exactly like values from files.

use zkit_extensions::PluginResolver;

use super::manifest::UserConfig;
use super::resolved::ResolvedConfig;
use crate::extension::Extension;
use crate::hooks::HookManager;
use crate::{Error, Result};

/// Produces the resolved configuration and the extension load order
pub struct ConfigPipeline;

impl ConfigPipeline {
    /// Resolve `raw` against the available extensions in `catalog`
    ///
    /// 1. Merge `raw` over the built-in defaults and check its structure.
    /// 2. Select the extensions named by `plugins` (all of `catalog` when
    ///    absent) and order them by dependency.
    /// 3. Run the configuration hooks in that order.
    /// 4. Validate the result, including the `default_network` reference.
    ///
    /// # Errors
    ///
    /// - `Error::ConfigValidation` for structural or cross-field failures,
    ///   and for failures reported by an extension's validate hook
    /// - `Error::UnknownExtension` if `plugins` names an id not in `catalog`
    /// - `Error::Extensions` for missing, duplicate or cyclic extensions
    pub fn resolve(raw: &UserConfig, catalog: &[Extension]) -> Result<(ResolvedConfig, Vec<Extension>)> {
        let mut seed = ResolvedConfig::from_user(UserConfig::defaults().merged(raw))?;
        seed.plugins = raw.plugins.clone().unwrap_or_default();
        seed.validate_structure()?;

        let selected = select(raw.plugins.as_deref(), catalog)?;
        let order = PluginResolver::resolve(selected)?;
        let ids: Vec<String> = order.iter().map(|e| e.id().to_string()).collect();
        tracing::debug!(order = ?ids, "extension load order resolved");

        seed.plugins = ids.clone();
        let mut config = HookManager::run_config_hooks(&order, seed)?;
        // Hooks do not get to change what is loaded.
        config.plugins = ids;
        config.validate()?;

        Ok((config, order))
    }
}

fn select(plugins: Option<&[String]>, catalog: &[Extension]) -> Result<Vec<Extension>> {
    let Some(ids) = plugins else {
        return Ok(catalog.to_vec());
    };
    ids.iter()
        .map(|id| {
            catalog
                .iter()
                .find(|e| e.id() == id)
                .cloned()
                .ok_or_else(|| Error::UnknownExtension { id: id.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let (config, order) = ConfigPipeline::resolve(&UserConfig::default(), &[]).unwrap();
        assert!(order.is_empty());
        assert_eq!(config.default_network.as_deref(), Some("local"));
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn plugins_select_and_order_extensions() {
        let catalog = vec![
            Extension::new("wallet").depends_on(["clients"]),
            Extension::new("clients"),
            Extension::new("unused"),
        ];
        let raw = UserConfig {
            plugins: Some(vec!["wallet".into(), "clients".into()]),
            ..UserConfig::default()
        };

        let (config, order) = ConfigPipeline::resolve(&raw, &catalog).unwrap();
        let ids: Vec<&str> = order.iter().map(Extension::id).collect();
        assert_eq!(ids, vec!["clients", "wallet"]);
        assert_eq!(config.plugins, vec!["clients", "wallet"]);
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let raw = UserConfig {
            plugins: Some(vec!["ghost".into()]),
            ..UserConfig::default()
        };
        let err = ConfigPipeline::resolve(&raw, &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownExtension { ref id } if id == "ghost"));
    }

    #[test]
    fn structure_checked_before_hooks_run() {
        let raw = UserConfig::parse("[networks.local]\nnode_url = \"nope\"\n").unwrap();
        let catalog = vec![Extension::new("panics").extend_config(|_| {
            panic!("hooks must not run on an invalid config")
        })];

        let err = ConfigPipeline::resolve(&raw, &catalog).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(ref e) if e.path == "networks.local.node_url"));
    }

    #[test]
    fn hook_result_is_validated() {
        let catalog = vec![Extension::new("breaks-default").resolve_config(|mut c| {
            c.default_network = Some("ghost".into());
            c
        })];
        let err = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(ref e) if e.path == "default_network"));
    }

    #[test]
    fn extension_networks_are_merged() {
        let catalog = vec![Extension::new("devnet").extend_config(|mut c| {
            c.networks
                .insert("devnet".into(), NetworkConfig::remote("https://rpc.example.org"));
            c
        })];
        let (config, _) = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap();
        assert_eq!(config.network_names(), vec!["devnet", "local"]);
    }
}
