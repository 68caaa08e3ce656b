use crate::error::{EnvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_FILE_NAME: &str = ".env";
pub const CONFIG_FILE_NAME: &str = "env.config.toml";
pub const DEFAULT_SERVICE_NAME: &str = "app";
pub const DEFAULT_UID: &str = "1000";
pub const DEFAULT_GID: &str = "1000";
pub const DEFAULT_SHELLS: &str = "bash,sh,zsh,dash,ksh";

/// Files the CLI reads from a project checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub project_dir: PathBuf,
    pub env_file: PathBuf,
    pub config_file: PathBuf,
}

impl Paths {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            env_file: project_dir.join(ENV_FILE_NAME),
            config_file: project_dir.join(CONFIG_FILE_NAME),
        }
    }

    /// Like [`Paths::new`], but the project directory has to exist.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        if !project_dir.is_dir() {
            return Err(EnvError::Config {
                path: project_dir.to_path_buf(),
                message: "project directory does not exist".to_string(),
            });
        }

        Ok(Self::new(project_dir))
    }
}

/// A single entry of `env.config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    Number(i64),
    Flag(bool),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Flag(flag) => flag.to_string(),
            Self::List(items) => items.join(","),
        }
    }
}

/// Layered lookup over `env.config.toml`, `.env` and the process environment.
///
/// Every file entry and every answer handed out is remembered so that
/// [`ConfigStore::dump`] can write the effective configuration back to disk.
#[derive(Debug, Default)]
pub struct ConfigStore {
    config_file: PathBuf,
    file_values: BTreeMap<String, ConfigValue>,
    env_values: HashMap<String, String>,
    resolved: BTreeMap<String, ConfigValue>,
}

impl ConfigStore {
    pub fn load(paths: &Paths) -> Result<Self> {
        let file_values = read_config_file(&paths.config_file)?;
        let env_values = read_env_file(&paths.env_file)?;

        debug!(
            "loaded {} config value(s) and {} env value(s)",
            file_values.len(),
            env_values.len()
        );

        Ok(Self {
            config_file: paths.config_file.clone(),
            resolved: file_values.clone(),
            file_values,
            env_values,
        })
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Config file first, then `env_key` in `.env`, then `env_key` in the
    /// process environment, then `fallback`.
    pub fn value(&mut self, key: &str, fallback: &str, env_key: Option<&str>) -> String {
        let value = if let Some(value) = self.file_values.get(key) {
            value.clone()
        } else if let Some(value) = env_key.and_then(|k| self.env_value(k)) {
            ConfigValue::Text(value)
        } else {
            ConfigValue::Text(fallback.to_string())
        };

        let text = value.as_text();
        self.resolved.insert(key.to_string(), value);
        text
    }

    /// Writes the file entries and every value handed out so far to
    /// `env.config.toml`.
    pub fn dump(&self) -> Result<PathBuf> {
        let content = toml::to_string_pretty(&self.resolved).map_err(|e| EnvError::Config {
            path: self.config_file.clone(),
            message: e.to_string(),
        })?;

        fs::write(&self.config_file, content)?;
        info!("Config written to {:?}", self.config_file);

        Ok(self.config_file.clone())
    }

    fn env_value(&self, key: &str) -> Option<String> {
        self.env_values
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|value| !value.is_empty())
    }
}

/// Settings the compose layer needs from the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    pub default_service_name: String,
    pub default_uid: String,
    pub default_gid: String,
    /// Shell basenames in order of preference
    pub shells_to_use: Vec<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            default_service_name: DEFAULT_SERVICE_NAME.to_string(),
            default_uid: DEFAULT_UID.to_string(),
            default_gid: DEFAULT_GID.to_string(),
            shells_to_use: parse_shell_list(DEFAULT_SHELLS),
        }
    }
}

impl DockerConfig {
    pub fn from_store(store: &mut ConfigStore) -> Self {
        Self {
            default_service_name: store.value(
                "defaultServiceName",
                DEFAULT_SERVICE_NAME,
                Some("SERVICE_NAME"),
            ),
            default_uid: store.value("dockerUId", DEFAULT_UID, Some("ENV_UID")),
            default_gid: store.value("dockerGid", DEFAULT_GID, Some("ENV_GID")),
            shells_to_use: parse_shell_list(&store.value(
                "shellList",
                DEFAULT_SHELLS,
                Some("SHELLS_TO_USE"),
            )),
        }
    }
}

pub fn parse_shell_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|shell| !shell.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_config_file(path: &Path) -> Result<BTreeMap<String, ConfigValue>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| EnvError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let invalid = |e: dotenvy::Error| EnvError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut values = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(invalid)? {
        let (key, value) = item.map_err(invalid)?;
        values.insert(key, value);
    }

    Ok(values)
}
