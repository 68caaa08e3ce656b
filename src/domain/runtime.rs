use std::fmt;
use std::path::{Path, PathBuf};

/// The container engine a compose stack runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    Podman,
    Docker,
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Podman => write!(f, "podman"),
            Self::Docker => write!(f, "docker"),
        }
    }
}

/// How compose is invoked on this host.
///
/// `docker compose` and `podman compose` are not executables of their own:
/// the engine binary is run with `compose` as its first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    pub program: PathBuf,
    pub subcommand: bool,
}

impl ComposeCommand {
    /// A standalone front-end such as `docker-compose` or `podman-compose`.
    pub fn binary(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            subcommand: false,
        }
    }

    /// The `compose` subcommand of an engine binary.
    pub fn subcommand_of(engine: impl Into<PathBuf>) -> Self {
        Self {
            program: engine.into(),
            subcommand: true,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments that must precede every compose invocation.
    pub fn prefix_args(&self) -> &'static [&'static str] {
        if self.subcommand { &["compose"] } else { &[] }
    }

    pub fn runtime_type(&self) -> RuntimeType {
        if self.program.to_string_lossy().contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        }
    }
}

impl fmt::Display for ComposeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        if self.subcommand {
            write!(f, " compose")?;
        }
        Ok(())
    }
}

/// What the resolver discovered about the host so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeIdentity {
    pub engine: Option<PathBuf>,
    pub compose: Option<ComposeCommand>,
    pub runtime_type: Option<RuntimeType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_prefix() {
        let compose = ComposeCommand::subcommand_of("/usr/bin/docker");
        assert_eq!(compose.prefix_args(), &["compose"]);
        assert_eq!(compose.to_string(), "/usr/bin/docker compose");

        let standalone = ComposeCommand::binary("/usr/local/bin/docker-compose");
        assert!(standalone.prefix_args().is_empty());
    }

    #[test]
    fn test_runtime_type_follows_compose_program() {
        assert_eq!(
            ComposeCommand::binary("/usr/bin/podman-compose").runtime_type(),
            RuntimeType::Podman
        );
        assert_eq!(
            ComposeCommand::subcommand_of("/usr/bin/podman").runtime_type(),
            RuntimeType::Podman
        );
        assert_eq!(
            ComposeCommand::subcommand_of("/usr/bin/docker").runtime_type(),
            RuntimeType::Docker
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(RuntimeType::Podman.to_string(), "podman");
        assert_eq!(RuntimeType::Docker.to_string(), "docker");
    }
}
