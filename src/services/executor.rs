use crate::domain::{CommandResult, Invocation, ProcessSpawner, RuntimeType};
use crate::error::{EnvError, Result};
use crate::services::RuntimeResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Exit codes of interactive container tooling that are not failures:
/// clean exit, SIGINT, SIGKILL and the SIGTERM family.
pub const NON_ERROR_EXIT_CODES: [i32; 5] = [0, 130, 137, 140, 143];

const COMPOSE_ENV: [(&str, &str); 4] = [
    ("FORCE_COLOR", "1"),
    ("BUILDKIT_PROGRESS", "plain"),
    ("COMPOSE_DOCKER_CLI_BUILD", "1"),
    ("DOCKER_BUILDKIT", "1"),
];

/// Called with the failure and the buffered output. `Ok(true)` means the
/// failure was dealt with; an `Err` replaces the original failure.
pub type ErrorHandler<'a> = dyn Fn(&EnvError, &str, &str) -> Result<bool> + 'a;

pub struct ExecOptions<'a> {
    pub foreground: bool,
    pub success_when: Option<&'a dyn Fn() -> bool>,
    pub on_error: Option<&'a ErrorHandler<'a>>,
}

impl Default for ExecOptions<'_> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<'a> ExecOptions<'a> {
    pub fn new(foreground: bool) -> Self {
        Self {
            foreground,
            success_when: None,
            on_error: None,
        }
    }

    pub fn background() -> Self {
        Self::new(false)
    }

    pub fn success_when(mut self, predicate: &'a dyn Fn() -> bool) -> Self {
        self.success_when = Some(predicate);
        self
    }

    pub fn on_error(mut self, handler: &'a ErrorHandler<'a>) -> Self {
        self.on_error = Some(handler);
        self
    }
}

/// Runs engine and compose commands with the compose environment and
/// decides what counts as success.
#[derive(Debug)]
pub struct Executor {
    spawner: Arc<dyn ProcessSpawner>,
    resolver: Arc<RuntimeResolver>,
    uid: String,
    gid: String,
    working_dir: Option<PathBuf>,
}

impl Executor {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        resolver: Arc<RuntimeResolver>,
        uid: impl Into<String>,
        gid: impl Into<String>,
    ) -> Self {
        Self {
            spawner,
            resolver,
            uid: uid.into(),
            gid: gid.into(),
            working_dir: None,
        }
    }

    /// Children start in `dir` instead of the caller's working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn execute<S: AsRef<str>>(
        &self,
        program: &Path,
        args: &[S],
        options: ExecOptions<'_>,
    ) -> Result<CommandResult> {
        let invocation = Invocation {
            program: program.to_path_buf(),
            args: args
                .iter()
                .map(|arg| arg.as_ref())
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect(),
            env: self.environment()?,
            cwd: self.working_dir.clone(),
            foreground: options.foreground,
        };

        debug!("executing {}", invocation.command_line());

        let outcome = match self.spawner.spawn(&invocation) {
            Ok(outcome) => outcome,
            Err(source) => {
                let error = EnvError::Spawn {
                    command: invocation.command_line(),
                    source,
                };
                return Self::handle_failure(error, CommandResult::default(), &options);
            }
        };

        if outcome.interrupted {
            debug!("{} was interrupted by us", invocation.command_line());
            return Ok(outcome.into_result());
        }

        if NON_ERROR_EXIT_CODES.contains(&outcome.code)
            || options.success_when.is_some_and(|accept| accept())
        {
            return Ok(outcome.into_result());
        }

        let error = EnvError::Execution {
            command: program.display().to_string(),
            args: invocation.args,
            exit_code: outcome.code,
            stdout: outcome.stdout.clone(),
            stderr: outcome.stderr.clone(),
        };

        Self::handle_failure(error, outcome.into_result(), &options)
    }

    /// Variables added on top of the parent environment for every child.
    pub fn environment(&self) -> Result<Vec<(String, String)>> {
        let runtime = self.resolver.runtime_type()?;

        let mut env: Vec<(String, String)> = COMPOSE_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.push(("DOCKER_RUNTIME".to_string(), runtime.to_string()));

        match runtime {
            RuntimeType::Podman => {
                env.push(("DOCKER_USER".to_string(), "root".to_string()));
            }
            RuntimeType::Docker => {
                env.push((
                    "DOCKER_USER".to_string(),
                    format!("{}:{}", self.uid, self.gid),
                ));
                env.push(("DOCKER_UID".to_string(), self.uid.clone()));
                env.push(("DOCKER_GID".to_string(), self.gid.clone()));
            }
        }

        Ok(env)
    }

    fn handle_failure(
        error: EnvError,
        output: CommandResult,
        options: &ExecOptions<'_>,
    ) -> Result<CommandResult> {
        let Some(handler) = options.on_error else {
            return Err(error);
        };

        if handler(&error, &output.stdout, &output.stderr)? {
            debug!("failure handled: {error}");
            return Ok(output);
        }

        Err(error)
    }
}
