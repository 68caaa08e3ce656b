use std::path::PathBuf;

/// Output collected from one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
}

/// A fully assembled child process request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables added on top of the inherited parent environment.
    pub env: Vec<(String, String)>,
    /// Working directory of the child; the caller's when unset.
    pub cwd: Option<PathBuf>,
    /// Stream output to the terminal while it is being collected.
    pub foreground: bool,
}

impl Invocation {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; signal deaths are reported as `128 + signo`.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The CLI itself forwarded an interrupt to the child.
    pub interrupted: bool,
}

impl ProcessOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn exit(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    pub fn into_result(self) -> CommandResult {
        CommandResult {
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// Output of a host-side probe (`systemctl`, `docker compose version`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    pub stdout: String,
}
