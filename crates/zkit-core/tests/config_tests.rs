//! Tests for configuration resolution through the pipeline

use std::sync::{Arc, Mutex};

use zkit_core::config::{ConfigPipeline, NetworkConfig, ResolvedConfig, UserConfig};
use zkit_core::{ConfigValidationError, Error, Extension, builtin_extensions};

fn devnet_extension() -> Extension {
    Extension::new("devnet").extend_config(|mut config| {
        config
            .networks
            .entry("devnet".into())
            .or_insert_with(|| NetworkConfig::remote("https://rpc.devnet.example.org"));
        config
    })
}

mod scenario_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extension_network_merged_with_local() {
        let raw = UserConfig::parse(
            r#"
default_network = "local"

[networks.local]
node_url = "http://127.0.0.1:9944"
"#,
        )
        .expect("Should parse valid TOML");

        let (config, _) =
            ConfigPipeline::resolve(&raw, &[devnet_extension()]).expect("Should resolve");

        assert_eq!(config.network_names(), vec!["devnet", "local"]);
        assert_eq!(config.default_network.as_deref(), Some("local"));
        config.validate().expect("Resolved config should stay valid");
    }

    #[test]
    fn test_ghost_default_network_rejected() {
        let raw = UserConfig::parse(
            r#"
default_network = "ghost"

[networks.local]
node_url = "http://127.0.0.1:9944"
"#,
        )
        .unwrap();

        let err = ConfigPipeline::resolve(&raw, &[]).unwrap_err();
        let Error::ConfigValidation(err) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(err.path, "default_network");
        assert_eq!(err.value, "ghost");
        assert!(err.to_string().contains("default_network"));
    }

    #[test]
    fn test_default_network_may_name_extension_network() {
        let raw = UserConfig::parse("default_network = \"devnet\"\n").unwrap();
        let (config, _) = ConfigPipeline::resolve(&raw, &[devnet_extension()]).unwrap();
        assert_eq!(config.default_network.as_deref(), Some("devnet"));
    }

    #[test]
    fn test_extension_cycle_reported() {
        let catalog = vec![
            Extension::new("a").depends_on(["b"]),
            Extension::new("b").depends_on(["a"]),
        ];

        let err = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap_err();
        let Error::Extensions(zkit_extensions::Error::DependencyCycle { cycle }) = &err else {
            panic!("expected a dependency cycle, got {err:?}");
        };
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));
        assert!(err.to_string().contains("a -> b") || err.to_string().contains("b -> a"));
    }

    #[test]
    fn test_missing_extension_dependency_reported() {
        let catalog = vec![Extension::new("wallet").depends_on(["clients"])];
        let err = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("wallet") && message.contains("clients"), "{message}");
    }
}

mod hook_order_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn logging(id: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Extension {
        let log = log.clone();
        Extension::new(id).extend_config(move |config| {
            log.lock().unwrap().push(id.to_string());
            config
        })
    }

    #[test]
    fn test_hooks_follow_resolver_order_not_catalog_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = vec![
            logging("b", &log).depends_on(["a"]),
            logging("c", &log),
            logging("a", &log),
        ];

        for _ in 0..3 {
            log.lock().unwrap().clear();
            let (config, _) = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap();
            assert_eq!(*log.lock().unwrap(), vec!["c", "a", "b"]);
            assert_eq!(config.plugins, vec!["c", "a", "b"]);
        }
    }

    #[test]
    fn test_validation_failure_attributed_to_extension() {
        let catalog = vec![Extension::new("needs-devnet").validate_config(|config| {
            if config.networks.contains_key("devnet") {
                Ok(())
            } else {
                Err(ConfigValidationError::missing("networks.devnet"))
            }
        })];

        let err = ConfigPipeline::resolve(&UserConfig::default(), &catalog).unwrap_err();
        assert!(err.to_string().contains("needs-devnet"), "{err}");
    }
}

mod idempotence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve_twice(raw: &UserConfig, catalog: &[Extension]) -> (ResolvedConfig, ResolvedConfig) {
        let (first, _) = ConfigPipeline::resolve(raw, catalog).expect("first resolve");
        let text = toml::to_string(&first).expect("resolved config serializes");
        let fed_back = UserConfig::parse(&text).expect("resolved config parses as raw");
        let (second, _) = ConfigPipeline::resolve(&fed_back, catalog).expect("second resolve");
        (first, second)
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let (first, second) = resolve_twice(&UserConfig::default(), &builtin_extensions());
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_config_is_idempotent() {
        let raw = UserConfig::parse(
            r#"
default_network = "devnet"

[networks.devnet]
node_url = "https://rpc.devnet.example.org"
indexer_url = "https://indexer.devnet.example.org/api/v1/graphql"

[paths]
sources = "src/contracts"

[docker]
project_name = "counter"

[extensions.wallet]
seed_file = "wallet.seed"

[tasks.compile]
command = "compactc"
args = ["src/contracts/counter.compact", "artifacts/counter"]
"#,
        )
        .unwrap();

        let catalog = vec![devnet_extension(), zkit_core::local_stack()];
        let (first, second) = resolve_twice(&raw, &catalog);
        assert_eq!(first, second);
        assert_eq!(second.plugins, vec!["devnet", "local-stack"]);
    }
}
