use crate::error::Result;
use crate::infra::{
    ConfigStore, DialoguerConfirmer, DockerConfig, Paths, SystemHost, TokioSpawner,
};
use crate::services::DockerContext;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, built once per process.
#[derive(Debug)]
pub struct EnvContext {
    paths: Paths,
    config: ConfigStore,
    docker: DockerContext,
}

impl EnvContext {
    /// Reads the project configuration and wires the live adapters.
    pub fn bootstrap(project_dir: &Path) -> Result<Self> {
        let paths = Paths::discover(project_dir)?;
        let mut config = ConfigStore::load(&paths)?;
        let docker_config = DockerConfig::from_store(&mut config);
        debug!("docker config: {docker_config:?}");

        let docker = DockerContext::new(
            Arc::new(TokioSpawner::new()?),
            Arc::new(SystemHost::new()),
            Arc::new(DialoguerConfirmer::new()),
            docker_config,
        )
        .in_project(&paths.project_dir);

        Ok(Self::from_parts(paths, config, docker))
    }

    pub fn from_parts(paths: Paths, config: ConfigStore, docker: DockerContext) -> Self {
        Self {
            paths,
            config,
            docker,
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn docker(&self) -> &DockerContext {
        &self.docker
    }

    /// Writes the effective configuration to `env.config.toml`.
    pub fn dump_config(&self) -> Result<PathBuf> {
        self.config.dump()
    }
}
