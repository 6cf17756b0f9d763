//! zkit CLI
//!
//! Loads the project configuration, bootstraps a session with the built-in
//! extensions and runs the requested task.

mod args;
mod cli;
mod error;

use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zkit_core::config::{CONFIG_FILENAME, ConfigLoader};
use zkit_core::tasks::TaskRegistry;
use zkit_core::{Session, SessionOptions, builtin_extensions};

use cli::Cli;
use error::Result;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ZKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!("Verbose mode enabled");
    }
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => find_config(&std::env::current_dir()?),
    };
    let loader = ConfigLoader::new(&config_path);
    let raw = loader.load()?;

    let mut options = SessionOptions::new(loader.project_root());
    if let Some(network) = cli.network {
        options = options.network(network);
    }
    install_interrupt_handler(options.cancellation.clone());

    let session = Session::bootstrap(&raw, &builtin_extensions(), options).await?;

    let Some(first) = cli.task else {
        print_tasks(&session);
        return Ok(());
    };

    let (name, rest) = args::resolve_task_name(session.registry(), &first, &cli.args);
    let task_args = args::parse_task_args(rest)?;
    tracing::debug!(task = %name, args = task_args.len(), "dispatching task");

    let report = session.run(&name, &task_args).await?;
    print_output(&report.output)?;
    if report.executed.len() > 1 {
        eprintln!(
            "{} {} ({})",
            "done".green().bold(),
            report.task,
            report.executed.join(" -> ").dimmed()
        );
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C; the running step either finishes or watches
/// the token itself
fn install_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling remaining steps");
            token.cancel();
        }
    });
}

/// The nearest `zkit.toml`, or the one the working directory would hold
fn find_config(cwd: &Path) -> PathBuf {
    ConfigLoader::discover(cwd).unwrap_or_else(|| cwd.join(CONFIG_FILENAME))
}

fn print_tasks(session: &Session) {
    let network = session
        .env()
        .network()
        .map(|n| n.name.as_str())
        .unwrap_or("none");
    println!("{} tasks (network: {})", "zkit".green().bold(), network.cyan());
    println!();
    print_task_list(session.registry());
    println!();
    println!("Run {} to run a task.", "zkit <task> [--option value]".cyan());
}

fn print_task_list(registry: &TaskRegistry) {
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for task in registry.iter() {
        let description = task.description().unwrap_or("");
        println!("  {}  {}", format!("{:width$}", task.name()).bold(), description);
    }
}

fn print_output(output: &serde_json::Value) -> Result<()> {
    match output {
        serde_json::Value::Null => {}
        serde_json::Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}
