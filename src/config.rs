use anyhow::{Context, Result};
use dockenv::EnvContext;
use std::path::PathBuf;

/// `--project-dir` when given, the working directory otherwise.
pub fn project_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("reading the current directory"),
    }
}

pub fn dump(context: &EnvContext) -> Result<()> {
    let path = context
        .dump_config()
        .context("writing the effective configuration")?;

    println!("Config written to {}", path.display());
    Ok(())
}
