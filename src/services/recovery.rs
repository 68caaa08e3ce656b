use crate::domain::{CommandResult, Confirmer};
use crate::error::{EnvError, Result};
use regex::Regex;
use std::cell::Cell;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const RETRY_PROMPT: &str =
    "One or more services are not running. Should I do a compose up and retry?";

static NOT_RUNNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)container .* is not running").expect("not-running pattern is valid")
});

/// Whether the engine refused an exec because the container is stopped.
pub fn is_not_running(stderr: &str) -> bool {
    NOT_RUNNING.is_match(stderr)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Normal,
    Recovering,
}

/// Offers to bring the stack up when an exec hits a stopped container,
/// then retries the exec exactly once.
#[derive(Debug)]
pub struct NotRunningRecovery<'a> {
    confirmer: &'a dyn Confirmer,
    container: &'a str,
    state: Cell<RecoveryState>,
}

impl<'a> NotRunningRecovery<'a> {
    pub fn new(confirmer: &'a dyn Confirmer, container: &'a str) -> Self {
        Self {
            confirmer,
            container,
            state: Cell::new(RecoveryState::Normal),
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state.get()
    }

    /// `Ok(true)` when the retry succeeded, `Ok(false)` when the failure was
    /// not ours to handle or the retry failed too.
    pub fn handle<U, R>(&self, stderr: &str, start_stack: U, retry: R) -> Result<bool>
    where
        U: FnOnce() -> Result<()>,
        R: FnOnce() -> Result<CommandResult>,
    {
        if self.state.get() != RecoveryState::Normal || !is_not_running(stderr) {
            return Ok(false);
        }

        self.state.set(RecoveryState::Recovering);
        warn!("container {} is not running", self.container);

        let confirmed = match self.confirmer.confirm(RETRY_PROMPT, true) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                self.state.set(RecoveryState::Normal);
                return Err(e);
            }
        };

        if !confirmed {
            self.state.set(RecoveryState::Normal);
            return Err(EnvError::NotRunning {
                container: self.container.to_string(),
            });
        }

        let started = start_stack();
        self.state.set(RecoveryState::Normal);
        started?;

        match retry() {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("retry after compose up failed: {e}");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedConfirmer;

    #[test]
    fn test_not_running_pattern() {
        assert!(is_not_running(
            "Error response from daemon: Container 4f2a is not running"
        ));
        assert!(is_not_running("container foo is not running"));
        assert!(!is_not_running("No such container: foo"));
        assert!(!is_not_running(""));
    }

    #[test]
    fn test_unrelated_failure_is_left_alone() {
        let confirmer = ScriptedConfirmer::answering(true);
        let recovery = NotRunningRecovery::new(&confirmer, "abc");

        let handled = recovery
            .handle("permission denied", || Ok(()), || Ok(CommandResult::default()))
            .unwrap();

        assert!(!handled);
        assert_eq!(confirmer.asked(), 0);
    }

    #[test]
    fn test_confirmed_recovery_starts_and_retries_once() {
        let confirmer = ScriptedConfirmer::answering(true);
        let recovery = NotRunningRecovery::new(&confirmer, "abc");
        let ups = Cell::new(0);
        let retries = Cell::new(0);

        let handled = recovery
            .handle(
                "container abc is not running",
                || {
                    assert_eq!(recovery.state(), RecoveryState::Recovering);
                    ups.set(ups.get() + 1);
                    Ok(())
                },
                || {
                    retries.set(retries.get() + 1);
                    Ok(CommandResult::default())
                },
            )
            .unwrap();

        assert!(handled);
        assert_eq!((ups.get(), retries.get()), (1, 1));
        assert_eq!(recovery.state(), RecoveryState::Normal);
    }

    #[test]
    fn test_failed_retry_reports_unhandled() {
        let confirmer = ScriptedConfirmer::answering(true);
        let recovery = NotRunningRecovery::new(&confirmer, "abc");

        let handled = recovery
            .handle(
                "container abc is not running",
                || Ok(()),
                || {
                    Err(EnvError::ContainerNotFound {
                        service: "app".to_string(),
                    })
                },
            )
            .unwrap();

        assert!(!handled);
    }

    #[test]
    fn test_declined_recovery_is_fatal() {
        let confirmer = ScriptedConfirmer::answering(false);
        let recovery = NotRunningRecovery::new(&confirmer, "abc");

        let result = recovery.handle(
            "container abc is not running",
            || panic!("stack must not be started"),
            || panic!("exec must not be retried"),
        );

        assert!(matches!(result, Err(EnvError::NotRunning { .. })));
        assert_eq!(recovery.state(), RecoveryState::Normal);
    }

    #[test]
    fn test_cancelled_prompt_propagates() {
        let confirmer = ScriptedConfirmer::cancelled();
        let recovery = NotRunningRecovery::new(&confirmer, "abc");

        let result = recovery.handle(
            "container abc is not running",
            || Ok(()),
            || Ok(CommandResult::default()),
        );

        assert!(matches!(result, Err(EnvError::PromptCancelled)));
    }
}
