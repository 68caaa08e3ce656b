use crate::domain::{ComposeCommand, HostProbe, RuntimeIdentity, RuntimeType};
use crate::error::{EnvError, Result};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// docker-compose binaries under this prefix belong to a Windows host seen through WSL.
const WSL_MOUNT_PREFIX: &str = "/mnt";

/// One way of finding a compose front-end.
pub trait ComposeStrategy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// `None` means "not usable here, try the next one".
    fn attempt(&self, resolver: &RuntimeResolver) -> Option<ComposeCommand>;
}

/// `podman-compose`, when the podman service is active.
#[derive(Debug)]
pub struct PodmanComposeBinary;

impl ComposeStrategy for PodmanComposeBinary {
    fn name(&self) -> &'static str {
        "podman-compose"
    }

    fn attempt(&self, resolver: &RuntimeResolver) -> Option<ComposeCommand> {
        let path = resolver.host().locate("podman-compose")?;
        resolver
            .podman_active()
            .then(|| ComposeCommand::binary(path))
    }
}

/// `podman compose`, when the podman service is active.
#[derive(Debug)]
pub struct PodmanComposeSubcommand;

impl ComposeStrategy for PodmanComposeSubcommand {
    fn name(&self) -> &'static str {
        "podman compose"
    }

    fn attempt(&self, resolver: &RuntimeResolver) -> Option<ComposeCommand> {
        let path = resolver.host().locate("podman")?;
        resolver
            .podman_active()
            .then(|| ComposeCommand::subcommand_of(path))
    }
}

/// Standalone `docker-compose`, unless it lives on a WSL mount.
#[derive(Debug)]
pub struct DockerComposeBinary;

impl ComposeStrategy for DockerComposeBinary {
    fn name(&self) -> &'static str {
        "docker-compose"
    }

    fn attempt(&self, resolver: &RuntimeResolver) -> Option<ComposeCommand> {
        let path = resolver.host().locate("docker-compose")?;
        if is_wsl_mount(&path) {
            debug!("ignoring docker-compose on a WSL mount: {}", path.display());
            return None;
        }
        Some(ComposeCommand::binary(path))
    }
}

/// The engine's own `compose` subcommand, version 2 only.
#[derive(Debug)]
pub struct DockerComposeV2;

impl ComposeStrategy for DockerComposeV2 {
    fn name(&self) -> &'static str {
        "docker compose"
    }

    fn attempt(&self, resolver: &RuntimeResolver) -> Option<ComposeCommand> {
        let engine = resolver.engine().ok()?;
        let output = match resolver.host().capture(&engine, &["compose", "version"]) {
            Ok(output) if output.success => output,
            Ok(_) => return None,
            Err(e) => {
                debug!("{} compose version failed: {e}", engine.display());
                return None;
            }
        };

        match compose_major_version(&output.stdout) {
            Some(2) => Some(ComposeCommand::subcommand_of(engine)),
            other => {
                debug!("unsupported compose version {other:?}");
                None
            }
        }
    }
}

pub fn default_strategies() -> Vec<Box<dyn ComposeStrategy>> {
    vec![
        Box::new(PodmanComposeBinary),
        Box::new(PodmanComposeSubcommand),
        Box::new(DockerComposeBinary),
        Box::new(DockerComposeV2),
    ]
}

/// Major version from output such as `Docker Compose version v2.24.5`.
pub fn compose_major_version(output: &str) -> Option<u32> {
    output.split_whitespace().find_map(|token| {
        let token = token.trim_start_matches('v');
        let (major, rest) = token.split_once('.')?;
        if rest.is_empty() {
            return None;
        }
        major.parse().ok()
    })
}

fn is_wsl_mount(path: &Path) -> bool {
    path.starts_with(WSL_MOUNT_PREFIX)
}

/// Finds the container engine and compose front-end once per process.
#[derive(Debug)]
pub struct RuntimeResolver {
    host: Arc<dyn HostProbe>,
    strategies: Vec<Box<dyn ComposeStrategy>>,
    podman_active: OnceLock<bool>,
    engine: OnceLock<PathBuf>,
    compose: OnceLock<ComposeCommand>,
    runtime_type: OnceLock<RuntimeType>,
}

impl RuntimeResolver {
    pub fn new(host: Arc<dyn HostProbe>) -> Self {
        Self::with_strategies(host, default_strategies())
    }

    pub fn with_strategies(
        host: Arc<dyn HostProbe>,
        strategies: Vec<Box<dyn ComposeStrategy>>,
    ) -> Self {
        Self {
            host,
            strategies,
            podman_active: OnceLock::new(),
            engine: OnceLock::new(),
            compose: OnceLock::new(),
            runtime_type: OnceLock::new(),
        }
    }

    pub fn host(&self) -> &dyn HostProbe {
        self.host.as_ref()
    }

    pub fn podman_active(&self) -> bool {
        *self
            .podman_active
            .get_or_init(|| self.host.is_service_active("podman"))
    }

    /// Podman when installed and active, docker otherwise.
    pub fn engine(&self) -> Result<PathBuf> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine.clone());
        }

        let engine = self.discover_engine()?;
        debug!("container engine: {}", engine.display());
        Ok(self.engine.get_or_init(|| engine).clone())
    }

    pub fn compose(&self) -> Result<ComposeCommand> {
        if let Some(compose) = self.compose.get() {
            return Ok(compose.clone());
        }

        let compose = self.discover_compose()?;
        info!("Using {compose}");
        Ok(self.compose.get_or_init(|| compose).clone())
    }

    pub fn runtime_type(&self) -> Result<RuntimeType> {
        if let Some(runtime_type) = self.runtime_type.get() {
            return Ok(*runtime_type);
        }

        let runtime_type = self.compose()?.runtime_type();
        Ok(*self.runtime_type.get_or_init(|| runtime_type))
    }

    /// Snapshot of what has been resolved so far, without resolving anything.
    pub fn identity(&self) -> RuntimeIdentity {
        RuntimeIdentity {
            engine: self.engine.get().cloned(),
            compose: self.compose.get().cloned(),
            runtime_type: self.runtime_type.get().copied(),
        }
    }

    fn discover_engine(&self) -> Result<PathBuf> {
        if let Some(podman) = self.host.locate("podman") {
            if self.podman_active() {
                return Ok(podman);
            }
            debug!(
                "podman found at {} but its service is not active",
                podman.display()
            );
        }

        self.host.locate("docker").ok_or(EnvError::RuntimeNotFound {
            what: "docker or podman",
        })
    }

    fn discover_compose(&self) -> Result<ComposeCommand> {
        for strategy in &self.strategies {
            if let Some(compose) = strategy.attempt(self) {
                debug!("compose resolved by {}", strategy.name());
                return Ok(compose);
            }
            debug!("{} is not usable", strategy.name());
        }

        Err(EnvError::RuntimeNotFound {
            what: "docker-compose or 'docker compose'",
        })
    }
}
