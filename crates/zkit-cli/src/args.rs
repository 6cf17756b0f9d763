//! Task name and task option parsing
//!
//! Everything after the global flags is either part of the task name or an
//! option for the task:
//!
//! - `node start` selects `node.start` when that task exists
//! - `--name value` and `--name=value` set an option
//! - `--flag` with no value (or followed by another option) is `true`
//! - anything else is collected, in order, under `_`
//!
//! Values that parse as JSON numbers, booleans or `null` keep that type;
//! everything else is a string.

use serde_json::Value;
use zkit_core::tasks::{TaskArgs, TaskRegistry};

use crate::error::{CliError, Result};

/// Key holding positional values
pub const POSITIONAL_KEY: &str = "_";

/// Pick the longest registered dotted name spelled by `first` and the words
/// after it, returning it with the words that were not consumed
pub fn resolve_task_name<'a>(
    registry: &TaskRegistry,
    first: &str,
    rest: &'a [String],
) -> (String, &'a [String]) {
    let words = rest.iter().take_while(|w| !w.starts_with('-'));
    let mut name = first.to_string();
    let mut best = (first.to_string(), 0);

    for (i, word) in words.enumerate() {
        name.push('.');
        name.push_str(word);
        if registry.contains(&name) {
            best = (name.clone(), i + 1);
        }
    }

    let (resolved, consumed) = best;
    (resolved, &rest[consumed..])
}

/// Parse task options
pub fn parse_task_args(raw: &[String]) -> Result<TaskArgs> {
    let mut args = TaskArgs::new();
    let mut positional = Vec::new();
    let mut iter = raw.iter().peekable();

    while let Some(token) = iter.next() {
        let Some(option) = token.strip_prefix("--") else {
            positional.push(parse_value(token));
            continue;
        };

        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name, parse_value(value)),
            None => match iter.peek() {
                Some(next) if !next.starts_with("--") => {
                    let value = parse_value(next);
                    iter.next();
                    (option, value)
                }
                _ => (option, Value::Bool(true)),
            },
        };

        if name.is_empty() {
            return Err(CliError::usage(format!("option '{token}' has no name")));
        }
        if args.get(name).is_some() {
            return Err(CliError::usage(format!("option '--{name}' given more than once")));
        }
        args.insert(name, value);
    }

    if !positional.is_empty() {
        args.insert(POSITIONAL_KEY, Value::Array(positional));
    }
    Ok(args)
}

fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use zkit_core::tasks::{FnAction, TaskContribution};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn registry(names: &[&str]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for name in names {
            registry
                .define(
                    "test",
                    TaskContribution::new(
                        *name,
                        FnAction::new(|_ctx| Box::pin(async { Ok(Value::Null) })),
                    ),
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_options_and_flags() {
        let args =
            parse_task_args(&strings(&["--contract", "counter", "--dry-run", "--amount=5"])).unwrap();
        assert_eq!(args.get_str("contract"), Some("counter"));
        assert!(args.flag("dry-run"));
        assert_eq!(args.get("amount"), Some(&json!(5)));
    }

    #[test]
    fn test_positionals_collected() {
        let err = parse_task_args(&strings(&["first", "--verbose", "--", "2"])).unwrap_err();
        assert_eq!(err.to_string(), "option '--' has no name");

        let args = parse_task_args(&strings(&["first", "2", "--mode", "fast"])).unwrap();
        assert_eq!(args.get(POSITIONAL_KEY), Some(&json!(["first", 2])));
        assert_eq!(args.get_str("mode"), Some("fast"));
    }

    #[test]
    fn test_repeated_option_rejected() {
        let err = parse_task_args(&strings(&["--to", "a", "--to", "b"])).unwrap_err();
        assert_eq!(err.to_string(), "option '--to' given more than once");
    }

    #[test]
    fn test_value_types() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("1.5"), json!(1.5));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("[1]"), json!("[1]"));
        assert_eq!(parse_value("0x01"), json!("0x01"));
    }

    #[test]
    fn test_resolve_spaced_name() {
        let registry = registry(&["node", "node.start"]);
        let rest = strings(&["start", "--detach"]);

        let (name, remaining) = resolve_task_name(&registry, "node", &rest);
        assert_eq!(name, "node.start");
        assert_eq!(remaining, &strings(&["--detach"])[..]);
    }

    #[test]
    fn test_resolve_keeps_unmatched_words() {
        let registry = registry(&["deploy"]);
        let rest = strings(&["counter", "--network", "devnet"]);

        let (name, remaining) = resolve_task_name(&registry, "deploy", &rest);
        assert_eq!(name, "deploy");
        assert_eq!(remaining.len(), 3);
    }
}
