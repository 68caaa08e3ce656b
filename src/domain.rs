mod command;
mod runtime;
pub mod traits;

pub use command::{CapturedOutput, CommandResult, Invocation, ProcessOutcome};
pub use runtime::{ComposeCommand, RuntimeIdentity, RuntimeType};
pub use traits::{Confirmer, ContainerProbe, HostProbe, ProcessSpawner};
