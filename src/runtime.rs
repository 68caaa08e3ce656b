use anyhow::{Context, Result};
use clap::Subcommand;
use dockenv::{EnvContext, EnvError, LogsOptions, RestartOptions, UpOptions};
use tracing::debug;

#[derive(Subcommand)]
pub enum ComposeAction {
    /// Starts the compose stack, detached unless --follow is given
    Up {
        /// Stay attached to the container output
        #[arg(short, long)]
        follow: bool,
        /// Extra arguments for "compose up"
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Stops and removes the containers of the stack
    Down {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Stops the containers of the stack
    Stop {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Stops (or with --force removes) the stack and starts it again
    Restart {
        /// Use "down" instead of "stop"
        #[arg(short, long)]
        force: bool,
        /// Extra arguments for "compose up"
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Shows the logs of the default service, or of every service with --all
    Logs {
        #[arg(short, long)]
        all: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Lists the containers of the stack
    Ps {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Removes containers, volumes and (docker only) images of the stack
    Clean {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ShellAction {
    /// Opens a shell in a service container, starting it when needed
    Ssh {
        /// Service to enter (default: the configured default service)
        service: Option<String>,
        /// Run this command through the shell instead of opening it
        #[arg(short, long)]
        cmd: Option<String>,
    },
    /// Runs a command in a service container
    Exec {
        service: String,
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
    },
    /// Runs a npm command in the default service
    Npm {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

pub fn run_compose(action: ComposeAction, context: &EnvContext) -> Result<()> {
    let docker = context.docker();

    match action {
        ComposeAction::Up { follow, args } => docker
            .up(&UpOptions { follow, args })
            .context("starting the stack")?,
        ComposeAction::Down { args } => docker.down(&args).context("removing the stack")?,
        ComposeAction::Stop { args } => docker.stop(&args).context("stopping the stack")?,
        ComposeAction::Restart { force, args } => docker
            .restart(&RestartOptions {
                force,
                up: UpOptions {
                    follow: false,
                    args,
                },
            })
            .context("restarting the stack")?,
        ComposeAction::Logs { all, args } => docker.logs(&LogsOptions { all, args })?,
        ComposeAction::Ps { args } => docker.ps(&args)?,
        ComposeAction::Clean { yes } => {
            if !docker.clean(yes).context("cleaning the stack")? {
                println!("Nothing was removed");
            }
        }
    }

    Ok(())
}

pub fn run_shell(action: ShellAction, context: &EnvContext) -> Result<()> {
    let docker = context.docker();

    match action {
        ShellAction::Ssh { service, cmd } => {
            docker.ssh(service.as_deref(), cmd.as_deref())?;
        }
        ShellAction::Exec { service, command } => {
            docker.exec_in_service(Some(service.as_str()), &command, None, true)?;
        }
        ShellAction::Npm { args } => {
            let mut command = vec!["npm".to_string()];
            command.extend(args);

            // npm already printed its own failure
            match docker.exec_in_service(None, &command, None, true) {
                Err(EnvError::Execution { exit_code, .. }) => {
                    debug!("npm exited with {exit_code}");
                }
                other => {
                    other?;
                }
            }
        }
    }

    Ok(())
}
