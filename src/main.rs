mod builder;
mod config;
mod runtime;

use anyhow::{Context, Result};
use builder::BuildAction;
use clap::{Parser, Subcommand};
use dockenv::EnvContext;
use dockenv::infra::ui;
use runtime::{ComposeAction, ShellAction};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dockenv",
    version,
    about = "Runs a project's docker or podman compose environment",
    arg_required_else_help = true
)]
struct Cli {
    /// Do not print the greeting line
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log what is being resolved and executed
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory holding .env and env.config.toml (default: current directory)
    #[arg(long, env = "PROJECT_DIR", global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Compose(ComposeAction),

    #[command(flatten)]
    Shell(ShellAction),

    #[command(flatten)]
    Build(BuildAction),

    /// Dumps the current config into env.config.toml
    #[command(name = "config:dump")]
    ConfigDump,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    ui::show_intro(cli.quiet);

    if let Err(e) = run(cli) {
        ui::show_error(&e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let project_dir = config::project_dir(cli.project_dir)?;
    let context = EnvContext::bootstrap(&project_dir)
        .with_context(|| format!("loading project in {}", project_dir.display()))?;

    match cli.command {
        Commands::Compose(cmd) => runtime::run_compose(cmd, &context),
        Commands::Shell(cmd) => runtime::run_shell(cmd, &context),
        Commands::Build(cmd) => builder::run(cmd, &context),
        Commands::ConfigDump => config::dump(&context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_prints_help() {
        let err = match Cli::try_parse_from(["dockenv"]) {
            Ok(_) => panic!("parsing without a command must fail"),
            Err(err) => err,
        };

        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn test_colon_commands_parse() {
        let cli = Cli::try_parse_from(["dockenv", "build:push", "tok"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Build(BuildAction::BuildPush { ref token }) if token == "tok"
        ));
    }
}
