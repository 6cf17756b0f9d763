//! Command tasks declared in `zkit.toml`
//!
//! A `[tasks.<name>]` table runs an external command as a subprocess in the
//! project root. Arguments may reference `${VAR}` placeholders filled from
//! the selected network, the project root and the task's own options:
//!
//! ```toml
//! [tasks.compile]
//! command = "compactc"
//! args = ["${PROJECT_ROOT}/contracts/counter.compact", "artifacts/counter"]
//!
//! [tasks.deploy]
//! command = "./scripts/deploy.sh"
//! args = ["--node", "${NODE_URL}"]
//! depends_on = ["compile"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::action::{ActionResult, TaskAction, TaskArgs, TaskContext};
use super::TaskContribution;
use crate::config::check_project_path;
use crate::environment::RuntimeEnvironment;
use crate::error::ConfigValidationError;

/// One `[tasks.<name>]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandTaskConfig {
    /// The command to execute
    pub command: String,
    /// Arguments to pass to the command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replace an existing task of the same name
    #[serde(default, rename = "override", skip_serializing_if = "is_false")]
    pub is_override: bool,
    /// Working directory relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CommandTaskConfig {
    /// A command task with no arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            depends_on: Vec::new(),
            description: None,
            is_override: false,
            working_dir: None,
        }
    }

    /// Check the table found at `path` (`tasks.<name>`)
    pub fn validate(&self, path: &str) -> Result<(), ConfigValidationError> {
        if self.command.trim().is_empty() {
            return Err(ConfigValidationError::new(
                format!("{path}.command"),
                format!("{:?}", self.command),
                "command must not be empty",
            ));
        }
        for (i, dependency) in self.depends_on.iter().enumerate() {
            if dependency.trim().is_empty() {
                return Err(ConfigValidationError::new(
                    format!("{path}.depends_on[{i}]"),
                    format!("{dependency:?}"),
                    "task names must not be empty",
                ));
            }
        }
        if let Some(dir) = &self.working_dir {
            check_project_path(&format!("{path}.working_dir"), dir)?;
        }
        Ok(())
    }

    /// Turn the table into a task contribution named `name`
    pub fn contribution(&self, name: &str) -> TaskContribution {
        let mut contribution = TaskContribution::new(name, CommandAction::new(self.clone()))
            .depends_on(self.depends_on.iter().cloned());
        contribution.description = Some(
            self.description
                .clone()
                .unwrap_or_else(|| format!("Run `{}`", self.command)),
        );
        contribution.is_override = self.is_override;
        contribution
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// JSON form used as task output
    pub fn to_json(&self) -> Value {
        json!({
            "command": self.command,
            "exit_code": self.exit_code,
            "stdout": self.stdout,
        })
    }
}

/// Why a command task failed
#[derive(Debug, thiserror::Error)]
pub enum CommandFailed {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with non-zero status (exit code: {exit_code:?}){}", stderr_suffix(.stderr))]
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("working directory {working_dir:?} is outside the project root {root:?}")]
    OutsideRoot { working_dir: PathBuf, root: PathBuf },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl From<CommandOutput> for CommandFailed {
    fn from(output: CommandOutput) -> Self {
        Self::NonZeroExit {
            command: output.command,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        }
    }
}

/// Run `command` in `work_dir` with `vars` substituted into `args` and set
/// in the child's environment
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::success`]. The child is killed when `cancel` fires.
pub async fn run_command(
    command: &str,
    args: &[String],
    work_dir: &Path,
    vars: &BTreeMap<String, String>,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CommandFailed> {
    let args: Vec<String> = args.iter().map(|arg| substitute_vars(arg, vars)).collect();
    tracing::debug!(command, ?args, ?work_dir, "spawning command");

    let child = Command::new(command)
        .args(&args)
        .current_dir(work_dir)
        .envs(vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandFailed::Spawn {
            command: command.to_string(),
            source,
        })?;

    let output = tokio::select! {
        output = child.wait_with_output() => output.map_err(|source| CommandFailed::Spawn {
            command: command.to_string(),
            source,
        })?,
        () = cancel.cancelled() => {
            tracing::warn!(command, "command cancelled");
            return Err(CommandFailed::Cancelled {
                command: command.to_string(),
            });
        }
    };

    Ok(CommandOutput {
        command: command.to_string(),
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Substitute `${VAR_NAME}` patterns with values from `vars`
///
/// Unknown placeholders are left untouched. Substituted values are copied
/// as-is and never scanned for further placeholders.
pub(crate) fn substitute_vars(input: &str, vars: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}').and_then(|end| Some((end, vars.get(&after[..end])?))) {
            Some((end, value)) => {
                result.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                result.push_str("${");
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Variables visible to a command task
pub(crate) fn task_vars(env: &RuntimeEnvironment, args: &TaskArgs) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("PROJECT_ROOT".to_string(), env.root().display().to_string());

    if let Some(network) = env.network() {
        vars.insert("NETWORK".to_string(), network.name.clone());
        vars.insert("NODE_URL".to_string(), network.config.node_url.clone());
        if let Some(url) = &network.config.indexer_url {
            vars.insert("INDEXER_URL".to_string(), url.clone());
        }
        if let Some(url) = &network.config.proof_server_url {
            vars.insert("PROOF_SERVER_URL".to_string(), url.clone());
        }
    }

    for (name, value) in args.iter() {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        vars.insert(var_name(name), value);
    }
    vars
}

fn var_name(option: &str) -> String {
    option
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Task action backed by a [`CommandTaskConfig`]
#[derive(Debug, Clone)]
pub struct CommandAction {
    config: CommandTaskConfig,
}

impl CommandAction {
    pub fn new(config: CommandTaskConfig) -> Self {
        Self { config }
    }

    fn work_dir(&self, root: &Path) -> Result<PathBuf, CommandFailed> {
        let Some(relative) = &self.config.working_dir else {
            return Ok(root.to_path_buf());
        };
        let dir = root.join(relative);
        // Symlinks may still lead outside even when the configured path
        // is relative.
        if let (Ok(canon_dir), Ok(canon_root)) = (dir.canonicalize(), root.canonicalize())
            && !canon_dir.starts_with(&canon_root)
        {
            return Err(CommandFailed::OutsideRoot {
                working_dir: relative.clone(),
                root: root.to_path_buf(),
            });
        }
        Ok(dir)
    }
}

#[async_trait]
impl TaskAction for CommandAction {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        let env = ctx.env();
        let work_dir = self.work_dir(env.root())?;
        let vars = task_vars(env, ctx.args());

        let output = run_command(
            &self.config.command,
            &self.config.args,
            &work_dir,
            &vars,
            ctx.cancellation(),
        )
        .await?;

        if !output.success {
            return Err(Box::new(CommandFailed::from(output)));
        }
        Ok(output.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_vars() {
        let vars = vars(&[("NETWORK", "devnet"), ("NODE_URL", "https://rpc.example.org")]);
        assert_eq!(
            substitute_vars("--network=${NETWORK} ${NODE_URL}", &vars),
            "--network=devnet https://rpc.example.org"
        );
    }

    #[test]
    fn test_substitute_vars_leaves_unknown() {
        let vars = vars(&[("NETWORK", "devnet")]);
        assert_eq!(substitute_vars("${UNKNOWN}", &vars), "${UNKNOWN}");
        assert_eq!(substitute_vars("plain", &vars), "plain");
        assert_eq!(substitute_vars("${NETWORK", &vars), "${NETWORK");
        assert_eq!(substitute_vars("${OTHER${NETWORK}}", &vars), "${OTHERdevnet}");
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let vars = vars(&[("CONTRACT", "${PROJECT_ROOT}"), ("PROJECT_ROOT", "/work")]);
        assert_eq!(
            substitute_vars("${CONTRACT} in ${PROJECT_ROOT}", &vars),
            "${PROJECT_ROOT} in /work"
        );
    }

    #[test]
    fn test_var_name() {
        assert_eq!(var_name("dry-run"), "DRY_RUN");
        assert_eq!(var_name("contract.name"), "CONTRACT_NAME");
    }

    #[test]
    fn test_parse_command_task() {
        let config: CommandTaskConfig = toml::from_str(
            r#"
command = "./deploy.sh"
args = ["--node", "${NODE_URL}"]
depends_on = ["compile"]
override = true
"#,
        )
        .unwrap();

        assert_eq!(config.command, "./deploy.sh");
        assert_eq!(config.depends_on, vec!["compile"]);
        assert!(config.is_override);
        assert_eq!(config.description, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<CommandTaskConfig, _> = toml::from_str("command = \"ls\"\nretries = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let err = CommandTaskConfig::new("  ").validate("tasks.build").unwrap_err();
        assert_eq!(err.path, "tasks.build.command");
    }

    #[test]
    fn test_validate_rejects_escaping_working_dir() {
        let mut config = CommandTaskConfig::new("ls");
        config.working_dir = Some(PathBuf::from("../elsewhere"));
        let err = config.validate("tasks.list").unwrap_err();
        assert_eq!(err.path, "tasks.list.working_dir");
    }

    #[test]
    fn test_contribution_carries_flags() {
        let mut config = CommandTaskConfig::new("ls");
        config.depends_on = vec!["compile".into()];
        config.is_override = true;

        let contribution = config.contribution("list");
        assert_eq!(contribution.name, "list");
        assert_eq!(contribution.depends_on, vec!["compile"]);
        assert!(contribution.is_override);
        assert_eq!(contribution.description.as_deref(), Some("Run `ls`"));
    }

    #[test]
    fn test_non_zero_exit_message_includes_stderr() {
        let failed = CommandFailed::from(CommandOutput {
            command: "sh".into(),
            success: false,
            exit_code: Some(3),
            stdout: String::new(),
            stderr: "  boom\n".into(),
        });
        assert_eq!(
            failed.to_string(),
            "`sh` exited with non-zero status (exit code: Some(3)): boom"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = run_command(
            "sh",
            &["-c".into(), "echo ${GREETING}; echo oops >&2; exit 2".into()],
            temp.path(),
            &vars(&[("GREETING", "hello")]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(2));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_honors_cancellation() {
        let temp = tempfile::TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_command(
            "sleep",
            &["5".into()],
            temp.path(),
            &BTreeMap::new(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CommandFailed::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = run_command(
            "zkit-definitely-not-a-program",
            &[],
            temp.path(),
            &BTreeMap::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CommandFailed::Spawn { .. }));
    }
}
