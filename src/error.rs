use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the runtime layer.
///
/// Probing failures (a missing `podman-compose`, a container without `which`)
/// never reach this type; they are logged and the next candidate is tried.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Sorry, but I did not find {what} on your system")]
    RuntimeNotFound { what: &'static str },

    #[error("No container found for service: {service}")]
    ContainerNotFound { service: String },

    #[error("command \"{command} {}\" exited with code {exit_code}", .args.join(" "))]
    Execution {
        command: String,
        args: Vec<String>,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("could not start \"{command}\"")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to determine shell for container {container}")]
    ShellNotFound { container: String },

    #[error("Please start the required docker container and try again (container {container} is not running)")]
    NotRunning { container: String },

    #[error("User force closed the prompt")]
    PromptCancelled,

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("invalid configuration in {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EnvError {
    /// Exit code of a failed child process, if this error came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Execution { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Errors the user caused by closing a prompt are not worth rendering.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::PromptCancelled)
    }
}

pub type Result<T> = std::result::Result<T, EnvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_renders_full_command() {
        let err = EnvError::Execution {
            command: "/usr/bin/docker".to_string(),
            args: vec!["compose".to_string(), "up".to_string()],
            exit_code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "command \"/usr/bin/docker compose up\" exited with code 1"
        );
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_only_prompt_cancellation_is_silent() {
        assert!(EnvError::PromptCancelled.is_silent());
        assert!(
            !EnvError::ContainerNotFound {
                service: "app".to_string()
            }
            .is_silent()
        );
    }
}
