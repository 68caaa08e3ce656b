use anyhow::Result;
use dockenv::domain::ProcessOutcome;
use dockenv::services::{NON_ERROR_EXIT_CODES, ShellDiscovery};
use dockenv::test_support::{FakeHost, ScriptedConfirmer, ScriptedSpawner, docker_context};
use dockenv::{DockerContext, EnvError, UpOptions};
use std::sync::Arc;

const NOT_RUNNING: &str = "Error response from daemon: container c1 is not running";

fn context_with(
    spawner: &Arc<ScriptedSpawner>,
    confirmer: ScriptedConfirmer,
) -> (DockerContext, Arc<ScriptedConfirmer>) {
    let confirmer = Arc::new(confirmer);
    let docker = docker_context(FakeHost::docker(), spawner.clone(), confirmer.clone());
    (docker, confirmer)
}

fn count(spawner: &ScriptedSpawner, needle: &str) -> usize {
    spawner
        .command_lines()
        .iter()
        .filter(|line| line.contains(needle))
        .count()
}

fn ls() -> Vec<String> {
    vec!["ls".to_string()]
}

#[test]
fn test_stopped_container_is_started_and_exec_retried() -> Result<()> {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond_once("exec -ti c1", ProcessOutcome::exit(1, NOT_RUNNING));
    let (docker, confirmer) = context_with(&spawner, ScriptedConfirmer::answering(true));

    docker.exec_in_container("c1", &ls(), None, true)?;

    assert_eq!(confirmer.asked(), 1);
    assert_eq!(
        confirmer.messages(),
        vec!["One or more services are not running. Should I do a compose up and retry?"]
    );
    assert_eq!(
        spawner.command_lines(),
        vec![
            "/usr/bin/docker exec -ti c1 ls",
            "/usr/bin/docker compose up -d --remove-orphans",
            "/usr/bin/docker exec -ti c1 ls",
        ]
    );
    Ok(())
}

#[test]
fn test_recovery_retries_only_once() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond("exec -ti c1", ProcessOutcome::exit(1, NOT_RUNNING));
    let (docker, confirmer) = context_with(&spawner, ScriptedConfirmer::answering(true));

    let result = docker.exec_in_container("c1", &ls(), None, true);

    assert!(matches!(
        result,
        Err(EnvError::Execution { exit_code: 1, .. })
    ));
    assert_eq!(confirmer.asked(), 1);
    assert_eq!(count(&spawner, "compose up"), 1);
    assert_eq!(count(&spawner, "exec -ti c1"), 2);
}

#[test]
fn test_declined_recovery_is_fatal() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond("exec -ti c1", ProcessOutcome::exit(1, NOT_RUNNING));
    let (docker, _) = context_with(&spawner, ScriptedConfirmer::answering(false));

    let result = docker.exec_in_container("c1", &ls(), None, true);

    assert!(matches!(
        result,
        Err(EnvError::NotRunning { container }) if container == "c1"
    ));
    assert_eq!(count(&spawner, "compose up"), 0);
}

#[test]
fn test_cancelled_prompt_is_silent() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond("exec -ti c1", ProcessOutcome::exit(1, NOT_RUNNING));
    let (docker, _) = context_with(&spawner, ScriptedConfirmer::cancelled());

    let error = docker.exec_in_container("c1", &ls(), None, true).unwrap_err();

    assert!(matches!(error, EnvError::PromptCancelled));
    assert!(error.is_silent());
}

#[test]
fn test_unrelated_exec_failure_skips_recovery() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond(
        "exec -ti c1",
        ProcessOutcome::exit(126, "OCI runtime exec failed: permission denied"),
    );
    let (docker, confirmer) = context_with(&spawner, ScriptedConfirmer::answering(true));

    let result = docker.exec_in_container("c1", &ls(), None, true);

    assert!(matches!(
        result,
        Err(EnvError::Execution { exit_code: 126, .. })
    ));
    assert_eq!(confirmer.asked(), 0);
}

#[test]
fn test_interrupt_exit_codes_are_not_failures() -> Result<()> {
    for code in NON_ERROR_EXIT_CODES {
        let spawner = Arc::new(ScriptedSpawner::new());
        spawner.respond("compose up", ProcessOutcome::exit(code, "Gracefully stopping..."));
        let (docker, _) = context_with(&spawner, ScriptedConfirmer::answering(true));

        docker.up(&UpOptions {
            follow: true,
            args: Vec::new(),
        })?;
    }
    Ok(())
}

#[test]
fn test_missing_binary_is_a_spawn_error() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.fail_spawn("compose ps");
    let (docker, _) = context_with(&spawner, ScriptedConfirmer::answering(true));

    let result = docker.ps(&[]);

    assert!(matches!(result, Err(EnvError::Spawn { .. })));
}

#[test]
fn test_shell_discovery_falls_back_to_passwd() -> Result<()> {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond("exec c1 which which", ProcessOutcome::exit(127, ""));
    spawner.respond("exec c1 command", ProcessOutcome::exit(127, ""));
    spawner.respond("inspect c1", ProcessOutcome::success(r#"[{"Config": {}}]"#));
    spawner.respond(
        "exec c1 cat /etc/passwd",
        ProcessOutcome::success(
            "root:x:0:0:root:/root:/sbin/nologin\nnode:x:1000:1000::/home/node:/bin/sh\n",
        ),
    );
    let (docker, _) = context_with(&spawner, ScriptedConfirmer::answering(true));

    let shell = ShellDiscovery::new(docker.config().shells_to_use.clone()).find_shell(&docker, "c1")?;

    assert_eq!(shell, "/bin/sh");
    Ok(())
}

#[test]
fn test_shell_discovery_without_any_shell() {
    let spawner = Arc::new(ScriptedSpawner::new());
    spawner.respond("exec c1", ProcessOutcome::exit(127, ""));
    spawner.respond("inspect c1", ProcessOutcome::exit(1, "no such container"));
    let (docker, _) = context_with(&spawner, ScriptedConfirmer::answering(true));

    let result = ShellDiscovery::new(docker.config().shells_to_use.clone()).find_shell(&docker, "c1");

    assert!(matches!(result, Err(EnvError::ShellNotFound { .. })));
}
