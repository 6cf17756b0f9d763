//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;

/// zkit - run project tasks against local and remote networks
///
/// Every registered task is a subcommand. Dotted task names may be written
/// with spaces (`zkit node start` runs `node.start`). Options after the task
/// name are passed to the task (`--contract counter`, `--dry-run`).
///
/// Run without a task to list the available tasks.
#[derive(Parser, Debug)]
#[command(name = "zkit")]
#[command(author, version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Network to run against (defaults to `default_network`)
    #[arg(short, long, env = "ZKIT_NETWORK")]
    pub network: Option<String>,

    /// Project configuration file (defaults to the nearest zkit.toml)
    #[arg(short, long, env = "ZKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Task to run
    pub task: Option<String>,

    /// Task name words and options passed to the task
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
