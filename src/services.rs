pub mod docker;
pub mod events;
pub mod executor;
pub mod recovery;
pub mod resolver;
pub mod shell;

pub use docker::{DockerContext, LogsOptions, RestartOptions, UpOptions};
pub use events::{EnvEvent, EventBus, EventKind};
pub use executor::{ExecOptions, Executor, NON_ERROR_EXIT_CODES};
pub use recovery::{NotRunningRecovery, RecoveryState};
pub use resolver::{ComposeStrategy, RuntimeResolver};
pub use shell::{ShellDiscovery, ShellStrategy};
