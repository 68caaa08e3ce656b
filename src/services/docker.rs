use crate::domain::{CommandResult, Confirmer, ContainerProbe, HostProbe, ProcessSpawner, RuntimeType};
use crate::error::{EnvError, Result};
use crate::infra::DockerConfig;
use crate::services::events::{EnvEvent, EventBus};
use crate::services::executor::{ExecOptions, Executor};
use crate::services::recovery::NotRunningRecovery;
use crate::services::shell::ShellDiscovery;
use crate::services::RuntimeResolver;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const CLEAN_PROMPT: &str = "Are you sure you want to remove all containers and volumes?";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpOptions {
    /// Stay attached to the output instead of running detached
    pub follow: bool,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartOptions {
    /// `down` instead of `stop` before bringing the stack back up
    pub force: bool,
    pub up: UpOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsOptions {
    /// Show every service instead of only the default one
    pub all: bool,
    pub args: Vec<String>,
}

/// High-level compose and engine operations for one project.
#[derive(Debug)]
pub struct DockerContext {
    executor: Executor,
    resolver: Arc<RuntimeResolver>,
    confirmer: Arc<dyn Confirmer>,
    config: DockerConfig,
    events: EventBus,
}

impl DockerContext {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        host: Arc<dyn HostProbe>,
        confirmer: Arc<dyn Confirmer>,
        config: DockerConfig,
    ) -> Self {
        let resolver = Arc::new(RuntimeResolver::new(host));
        let executor = Executor::new(
            spawner,
            resolver.clone(),
            config.default_uid.clone(),
            config.default_gid.clone(),
        );

        Self {
            executor,
            resolver,
            confirmer,
            config,
            events: EventBus::new(),
        }
    }

    /// Compose and engine commands run from the project directory, where
    /// compose finds its files.
    pub fn in_project(mut self, project_dir: &Path) -> Self {
        self.executor = self.executor.with_working_dir(project_dir);
        self
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.executor.working_dir()
    }

    pub fn resolver(&self) -> &RuntimeResolver {
        &self.resolver
    }

    pub fn config(&self) -> &DockerConfig {
        &self.config
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn runtime_type(&self) -> Result<RuntimeType> {
        self.resolver.runtime_type()
    }

    pub fn execute_docker<I, S>(&self, args: I, foreground: bool) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = self.resolver.engine()?;
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.executor
            .execute(&engine, &args, ExecOptions::new(foreground))
    }

    pub fn execute_compose<I, S>(&self, args: I, foreground: bool) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let compose = self.resolver.compose()?;
        let full_args: Vec<String> = compose
            .prefix_args()
            .iter()
            .map(|arg| arg.to_string())
            .chain(args.into_iter().map(Into::into))
            .collect();

        self.executor
            .execute(compose.program(), &full_args, ExecOptions::new(foreground))
    }

    /// Listeners of [`EnvEvent::UpBefore`] see the caller's arguments before
    /// the detach and orphan flags are added.
    pub fn up(&self, options: &UpOptions) -> Result<()> {
        let event = self.events.trigger(EnvEvent::UpBefore {
            args: unique_args(&options.args),
        })?;
        let EnvEvent::UpBefore { args } = event;

        let mut args = unique_args(&args);
        if !options.follow {
            push_unique(&mut args, "-d");
        }
        push_unique(&mut args, "--remove-orphans");

        info!("Starting containers...");
        self.execute_compose(prepend("up", args), true)?;
        Ok(())
    }

    pub fn down(&self, args: &[String]) -> Result<()> {
        info!("Removing containers...");
        self.execute_compose(prepend("down", args.to_vec()), true)?;
        Ok(())
    }

    pub fn stop(&self, args: &[String]) -> Result<()> {
        info!("Stopping containers...");
        self.execute_compose(prepend("stop", args.to_vec()), true)?;
        Ok(())
    }

    pub fn restart(&self, options: &RestartOptions) -> Result<()> {
        if options.force {
            self.down(&[])?;
        } else {
            self.stop(&[])?;
        }
        self.up(&options.up)
    }

    /// Without `all` and without a service argument only the default
    /// service is shown.
    pub fn logs(&self, options: &LogsOptions) -> Result<()> {
        let mut args = unique_args(&options.args);
        let names_service = args.iter().any(|arg| !arg.starts_with('-'));
        if !options.all && !names_service {
            push_unique(&mut args, &self.config.default_service_name);
        }

        self.execute_compose(prepend("logs", args), true)?;
        Ok(())
    }

    pub fn ps(&self, args: &[String]) -> Result<()> {
        self.execute_compose(prepend("ps", args.to_vec()), true)?;
        Ok(())
    }

    /// Removes containers and volumes of the project. Returns `false` when
    /// the user backed out.
    pub fn clean(&self, confirmed: bool) -> Result<bool> {
        if !confirmed && !self.confirmer.confirm(CLEAN_PROMPT, true)? {
            return Ok(false);
        }

        match self.resolver.runtime_type()? {
            RuntimeType::Docker => {
                info!("Removing containers, images and volumes...");
                self.execute_compose(["down", "--rmi", "all", "--volumes"], true)?;
                self.execute_compose(["rm", "--force", "--stop", "--volumes"], true)?;
            }
            RuntimeType::Podman => {
                info!("Removing containers...");
                self.execute_compose(["down"], true)?;
            }
        }

        Ok(true)
    }

    /// A service is running when it has a container and that container runs.
    pub fn is_service_running(&self, service: Option<&str>) -> bool {
        match self.container_id_from_service(service) {
            Ok(id) => self.is_container_running(&id),
            Err(e) => {
                debug!("{e}");
                false
            }
        }
    }

    pub fn is_container_running(&self, container: &str) -> bool {
        match self.execute_docker(["inspect", "-f", "{{.State.Running}}", container], false) {
            Ok(result) => result.stdout.trim() == "true",
            Err(e) => {
                debug!("inspect of {container} failed: {e}");
                false
            }
        }
    }

    pub fn container_id_from_service(&self, service: Option<&str>) -> Result<String> {
        let service = self.service_or_default(service);

        let stdout = match self.execute_compose(["ps", "-a", "-q", service], false) {
            Ok(result) => result.stdout,
            Err(e) => {
                debug!("compose ps for {service} failed: {e}");
                String::new()
            }
        };

        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| EnvError::ContainerNotFound {
                service: service.to_string(),
            })
    }

    pub fn exec_in_service(
        &self,
        service: Option<&str>,
        command: &[String],
        exec_flags: Option<&[String]>,
        foreground: bool,
    ) -> Result<CommandResult> {
        let container = self.container_id_from_service(service)?;
        self.exec_in_container(&container, command, exec_flags, foreground)
    }

    /// `exec` with `-ti` unless other flags are given. A stopped container
    /// triggers the not-running recovery.
    pub fn exec_in_container(
        &self,
        container: &str,
        command: &[String],
        exec_flags: Option<&[String]>,
        foreground: bool,
    ) -> Result<CommandResult> {
        let engine = self.resolver.engine()?;
        let args = exec_args(container, command, exec_flags);

        let recovery = NotRunningRecovery::new(self.confirmer.as_ref(), container);
        let handler = |_: &EnvError, _: &str, stderr: &str| -> Result<bool> {
            recovery.handle(
                stderr,
                || self.up(&UpOptions::default()),
                || {
                    self.executor
                        .execute(&engine, &args, ExecOptions::new(foreground))
                },
            )
        };

        self.executor.execute(
            &engine,
            &args,
            ExecOptions::new(foreground).on_error(&handler),
        )
    }

    /// Opens a shell in the service, or runs `cmd` through that shell.
    pub fn ssh(&self, service: Option<&str>, cmd: Option<&str>) -> Result<CommandResult> {
        let service = self.service_or_default(service).to_string();

        if !self.is_service_running(Some(service.as_str())) {
            self.up(&UpOptions {
                follow: false,
                args: vec![service.clone()],
            })?;
        }

        let container = self.container_id_from_service(Some(service.as_str()))?;
        let shell = ShellDiscovery::new(self.config.shells_to_use.clone())
            .find_shell(self, &container)?;
        info!("Opening {shell} in {service}");

        let command = match cmd {
            Some(cmd) => vec![shell, "-c".to_string(), cmd.to_string()],
            None => vec![shell],
        };

        self.exec_in_container(&container, &command, None, true)
    }

    fn service_or_default<'a>(&'a self, service: Option<&'a str>) -> &'a str {
        service.unwrap_or(&self.config.default_service_name)
    }
}

impl ContainerProbe for DockerContext {
    fn docker(&self, args: &[String]) -> Result<CommandResult> {
        self.execute_docker(args.iter().cloned(), false)
    }
}

fn exec_args(container: &str, command: &[String], exec_flags: Option<&[String]>) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    match exec_flags {
        Some(flags) => args.extend(flags.iter().cloned()),
        None => args.push("-ti".to_string()),
    }
    args.push(container.to_string());
    args.extend(command.iter().cloned());
    args
}

/// Drops repeated arguments, keeping the first occurrence.
fn unique_args(args: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    args.iter()
        .filter(|arg| seen.insert(arg.as_str()))
        .cloned()
        .collect()
}

fn push_unique(args: &mut Vec<String>, arg: &str) {
    if !args.iter().any(|existing| existing == arg) {
        args.push(arg.to_string());
    }
}

fn prepend(command: &str, args: Vec<String>) -> Vec<String> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(command.to_string());
    full.extend(args);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unique_args_keeps_first_occurrence() {
        assert_eq!(
            unique_args(&strings(&["-d", "app", "-d", "db", "app"])),
            strings(&["-d", "app", "db"])
        );
    }

    #[test]
    fn test_push_unique() {
        let mut args = strings(&["-d"]);
        push_unique(&mut args, "-d");
        push_unique(&mut args, "--remove-orphans");
        assert_eq!(args, strings(&["-d", "--remove-orphans"]));
    }

    #[test]
    fn test_exec_args_default_to_interactive_tty() {
        assert_eq!(
            exec_args("abc", &strings(&["npm", "ci"]), None),
            strings(&["exec", "-ti", "abc", "npm", "ci"])
        );
        assert_eq!(
            exec_args("abc", &strings(&["ls"]), Some(strings(&["-u", "root"]).as_slice())),
            strings(&["exec", "-u", "root", "abc", "ls"])
        );
    }
}
