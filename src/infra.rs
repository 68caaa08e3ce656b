pub mod config;
pub mod host;
pub mod process;
pub mod prompt;
pub mod ui;

pub use config::{ConfigStore, DockerConfig, Paths};
pub use host::SystemHost;
pub use process::TokioSpawner;
pub use prompt::DialoguerConfirmer;
