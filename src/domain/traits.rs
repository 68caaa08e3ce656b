use super::{CapturedOutput, CommandResult, Invocation, ProcessOutcome};
use crate::error::Result;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

/// Spawns child processes and waits for them
pub trait ProcessSpawner: Send + Sync + Debug {
    /// Run the invocation to completion, collecting its output
    fn spawn(&self, invocation: &Invocation) -> io::Result<ProcessOutcome>;
}

/// Read-only questions about the host machine
pub trait HostProbe: Send + Sync + Debug {
    /// Absolute path of an executable on `PATH`
    fn locate(&self, name: &str) -> Option<PathBuf>;

    /// Whether a system service is active; hosts without a service manager say no
    fn is_service_active(&self, service: &str) -> bool;

    /// Run a short probe command and capture its stdout
    fn capture(&self, program: &Path, args: &[&str]) -> io::Result<CapturedOutput>;
}

/// Yes/no questions to the user
pub trait Confirmer: Send + Sync + Debug {
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Runs engine commands against a container without echoing their output
pub trait ContainerProbe {
    fn docker(&self, args: &[String]) -> Result<CommandResult>;
}
