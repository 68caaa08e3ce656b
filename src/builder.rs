use anyhow::{Context, Result};
use clap::Subcommand;
use dockenv::EnvContext;

const PUBLISH_SCRIPT: &str = "npm config set //registry.npmjs.org/:_authToken=\"$NODE_AUTH_TOKEN\" && npm publish --access public";

#[derive(Subcommand)]
pub enum BuildAction {
    /// Builds the project into the "dist" folder
    Build,
    /// Builds the project and publishes it to npm
    #[command(name = "build:push")]
    BuildPush {
        /// The npm token to publish with
        token: String,
    },
}

pub fn run(action: BuildAction, context: &EnvContext) -> Result<()> {
    match action {
        BuildAction::Build => build(context),
        BuildAction::BuildPush { token } => {
            build(context)?;
            publish(context, &token)
        }
    }
}

fn build(context: &EnvContext) -> Result<()> {
    let command = ["npm", "run", "build"].map(String::from);
    context
        .docker()
        .exec_in_service(None, &command, None, true)
        .context("building the project")?;
    Ok(())
}

fn publish(context: &EnvContext, token: &str) -> Result<()> {
    let command = ["bash", "-c", PUBLISH_SCRIPT].map(String::from);
    context
        .docker()
        .exec_in_service(None, &command, Some(publish_flags(token).as_slice()), true)
        .context("publishing to npm")?;
    Ok(())
}

/// The token reaches the container as an exec environment variable.
fn publish_flags(token: &str) -> Vec<String> {
    vec![
        "-ti".to_string(),
        "-e".to_string(),
        format!("NODE_AUTH_TOKEN={token}"),
    ]
}
