pub mod context;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Public so that the integration tests under tests/ can drive the façade
// through fakes
pub mod test_support;

pub use context::EnvContext;
pub use domain::{CommandResult, ComposeCommand, RuntimeType};
pub use error::{EnvError, Result};
pub use services::{DockerContext, LogsOptions, RestartOptions, UpOptions};
