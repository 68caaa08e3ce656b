use crate::domain::{
    CapturedOutput, Confirmer, HostProbe, Invocation, ProcessOutcome, ProcessSpawner,
};
use crate::error::{EnvError, Result};
use crate::infra::DockerConfig;
use crate::services::DockerContext;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

pub const DOCKER_PATH: &str = "/usr/bin/docker";
pub const PODMAN_PATH: &str = "/usr/bin/podman";

/// A host whose `PATH`, services and probe output are set up by the test.
#[derive(Debug, Default)]
pub struct FakeHost {
    binaries: RwLock<HashMap<String, PathBuf>>,
    active: RwLock<HashSet<String>>,
    compose_versions: RwLock<HashMap<PathBuf, String>>,
    calls: RwLock<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker with the compose v2 plugin.
    pub fn docker() -> Self {
        let host = Self::new();
        host.add_binary("docker", DOCKER_PATH);
        host.set_compose_version(DOCKER_PATH, "Docker Compose version v2.24.5");
        host
    }

    /// Active podman using its own `compose` subcommand.
    pub fn podman() -> Self {
        let host = Self::new();
        host.add_binary("podman", PODMAN_PATH);
        host.set_active("podman");
        host
    }

    pub fn add_binary(&self, name: &str, path: impl Into<PathBuf>) {
        self.binaries
            .write()
            .unwrap()
            .insert(name.to_string(), path.into());
    }

    pub fn remove_binary(&self, name: &str) {
        self.binaries.write().unwrap().remove(name);
    }

    pub fn set_active(&self, service: &str) {
        self.active.write().unwrap().insert(service.to_string());
    }

    pub fn set_inactive(&self, service: &str) {
        self.active.write().unwrap().remove(service);
    }

    /// Output of `<engine> compose version`.
    pub fn set_compose_version(&self, engine: impl Into<PathBuf>, output: &str) {
        self.compose_versions
            .write()
            .unwrap()
            .insert(engine.into(), output.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.write().unwrap().push(call);
    }
}

impl HostProbe for FakeHost {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.record(format!("locate:{name}"));
        self.binaries.read().unwrap().get(name).cloned()
    }

    fn is_service_active(&self, service: &str) -> bool {
        self.record(format!("active:{service}"));
        self.active.read().unwrap().contains(service)
    }

    fn capture(&self, program: &Path, args: &[&str]) -> io::Result<CapturedOutput> {
        self.record(format!("capture:{} {}", program.display(), args.join(" ")));

        if args == ["compose", "version"] {
            if let Some(output) = self.compose_versions.read().unwrap().get(program) {
                return Ok(CapturedOutput {
                    success: true,
                    stdout: output.clone(),
                });
            }
        }

        Ok(CapturedOutput::default())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Outcome(ProcessOutcome),
    SpawnFailure,
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    reply: Reply,
    once: bool,
}

/// Answers spawns by the first rule whose needle occurs in the command line.
/// Later rules win over earlier ones; unmatched commands exit 0 silently.
#[derive(Debug, Default)]
pub struct ScriptedSpawner {
    rules: RwLock<Vec<Rule>>,
    invocations: RwLock<Vec<Invocation>>,
}

impl ScriptedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, needle: &str, outcome: ProcessOutcome) {
        self.push(needle, Reply::Outcome(outcome), false);
    }

    /// Like [`ScriptedSpawner::respond`], but only for the next match.
    pub fn respond_once(&self, needle: &str, outcome: ProcessOutcome) {
        self.push(needle, Reply::Outcome(outcome), true);
    }

    pub fn fail_spawn(&self, needle: &str) {
        self.push(needle, Reply::SpawnFailure, false);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.read().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .read()
            .unwrap()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    fn push(&self, needle: &str, reply: Reply, once: bool) {
        self.rules.write().unwrap().push(Rule {
            needle: needle.to_string(),
            reply,
            once,
        });
    }

    fn reply_for(&self, command_line: &str) -> Option<Reply> {
        let mut rules = self.rules.write().unwrap();
        let index = rules
            .iter()
            .rposition(|rule| command_line.contains(&rule.needle))?;

        if rules[index].once {
            Some(rules.remove(index).reply)
        } else {
            Some(rules[index].reply.clone())
        }
    }
}

impl ProcessSpawner for ScriptedSpawner {
    fn spawn(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        self.invocations.write().unwrap().push(invocation.clone());

        match self.reply_for(&invocation.command_line()) {
            Some(Reply::Outcome(outcome)) => Ok(outcome),
            Some(Reply::SpawnFailure) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", invocation.program.display()),
            )),
            None => Ok(ProcessOutcome::default()),
        }
    }
}

/// Gives the same answer to every question, or closes every prompt.
#[derive(Debug)]
pub struct ScriptedConfirmer {
    answer: Option<bool>,
    asked: AtomicUsize,
    messages: RwLock<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            asked: AtomicUsize::new(0),
            messages: RwLock::new(Vec::new()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            answer: None,
            asked: AtomicUsize::new(0),
            messages: RwLock::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.read().unwrap().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.messages.write().unwrap().push(message.to_string());
        self.answer.ok_or(EnvError::PromptCancelled)
    }
}

/// A compose façade wired to fakes, with default project settings.
pub fn docker_context(
    host: FakeHost,
    spawner: Arc<ScriptedSpawner>,
    confirmer: Arc<ScriptedConfirmer>,
) -> DockerContext {
    DockerContext::new(spawner, Arc::new(host), confirmer, DockerConfig::default())
}
