use crate::domain::ContainerProbe;
use crate::error::{EnvError, Result};
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

/// One way of finding a login shell inside a container.
pub trait ShellStrategy: Debug {
    fn name(&self) -> &'static str;

    /// `None` means "could not tell", never an error.
    fn attempt(
        &self,
        probe: &dyn ContainerProbe,
        container: &str,
        candidates: &[String],
    ) -> Option<String>;
}

/// Asks `which` (or `command -v`) for each candidate shell.
#[derive(Debug)]
pub struct WhichProbe;

impl WhichProbe {
    fn lookup_command(probe: &dyn ContainerProbe, container: &str) -> Option<Vec<String>> {
        if probe.docker(&exec_args(container, &["which", "which"])).is_ok() {
            return Some(vec!["which".to_string()]);
        }
        if probe.docker(&exec_args(container, &["command"])).is_ok() {
            return Some(vec!["command".to_string(), "-v".to_string()]);
        }
        None
    }
}

impl ShellStrategy for WhichProbe {
    fn name(&self) -> &'static str {
        "which"
    }

    fn attempt(
        &self,
        probe: &dyn ContainerProbe,
        container: &str,
        candidates: &[String],
    ) -> Option<String> {
        let lookup = Self::lookup_command(probe, container)?;

        candidates.iter().find_map(|shell| {
            let mut command: Vec<&str> = lookup.iter().map(String::as_str).collect();
            command.push(shell);

            let result = probe.docker(&exec_args(container, &command)).ok()?;
            let path = result.stdout.trim();
            (!path.is_empty()).then(|| path.to_string())
        })
    }
}

/// Uses `Config.Shell` from `inspect`, when the image declares one.
#[derive(Debug)]
pub struct ImageShell;

impl ShellStrategy for ImageShell {
    fn name(&self) -> &'static str {
        "image config"
    }

    fn attempt(
        &self,
        probe: &dyn ContainerProbe,
        container: &str,
        _candidates: &[String],
    ) -> Option<String> {
        let result = probe
            .docker(&["inspect".to_string(), container.to_string()])
            .ok()?;

        let inspected: Value = match serde_json::from_str(&result.stdout) {
            Ok(value) => value,
            Err(e) => {
                debug!("inspect output of {container} is not JSON: {e}");
                return None;
            }
        };

        inspected
            .get(0)?
            .get("Config")?
            .get("Shell")?
            .get(0)?
            .as_str()
            .map(str::to_string)
    }
}

/// Picks the first user shell in `/etc/passwd` that is one of the candidates.
#[derive(Debug)]
pub struct PasswdScan;

impl ShellStrategy for PasswdScan {
    fn name(&self) -> &'static str {
        "/etc/passwd"
    }

    fn attempt(
        &self,
        probe: &dyn ContainerProbe,
        container: &str,
        candidates: &[String],
    ) -> Option<String> {
        let result = probe
            .docker(&exec_args(container, &["cat", "/etc/passwd"]))
            .ok()?;

        passwd_shell(&result.stdout, candidates)
    }
}

pub fn passwd_shell(passwd: &str, candidates: &[String]) -> Option<String> {
    passwd
        .lines()
        .map(str::trim)
        .filter_map(|line| line.rsplit(':').next())
        .filter(|shell| shell.starts_with('/'))
        .find(|shell| candidates.iter().any(|c| shell.ends_with(c.as_str())))
        .map(str::to_string)
}

fn exec_args(container: &str, command: &[&str]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), container.to_string()];
    args.extend(command.iter().map(|part| part.to_string()));
    args
}

/// Tries each strategy in order; the first answer wins.
#[derive(Debug)]
pub struct ShellDiscovery {
    candidates: Vec<String>,
    strategies: Vec<Box<dyn ShellStrategy>>,
}

impl ShellDiscovery {
    pub fn new(candidates: Vec<String>) -> Self {
        Self::with_strategies(
            candidates,
            vec![
                Box::new(WhichProbe),
                Box::new(ImageShell),
                Box::new(PasswdScan),
            ],
        )
    }

    pub fn with_strategies(candidates: Vec<String>, strategies: Vec<Box<dyn ShellStrategy>>) -> Self {
        Self {
            candidates,
            strategies,
        }
    }

    pub fn find_shell(&self, probe: &dyn ContainerProbe, container: &str) -> Result<String> {
        for strategy in &self.strategies {
            if let Some(shell) = strategy.attempt(probe, container, &self.candidates) {
                debug!("shell of {container} found via {}: {shell}", strategy.name());
                return Ok(shell);
            }
            debug!("no shell of {container} found via {}", strategy.name());
        }

        Err(EnvError::ShellNotFound {
            container: container.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommandResult;
    use std::collections::HashMap;

    /// Answers `docker` calls from a table keyed by the joined arguments.
    #[derive(Default)]
    struct TableProbe {
        answers: HashMap<String, String>,
    }

    impl TableProbe {
        fn answer(mut self, args: &str, stdout: &str) -> Self {
            self.answers.insert(args.to_string(), stdout.to_string());
            self
        }
    }

    impl ContainerProbe for TableProbe {
        fn docker(&self, args: &[String]) -> Result<CommandResult> {
            let key = args.join(" ");
            match self.answers.get(&key) {
                Some(stdout) => Ok(CommandResult {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                }),
                None => Err(EnvError::Execution {
                    command: "docker".to_string(),
                    args: args.to_vec(),
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: String::new(),
                }),
            }
        }
    }

    fn candidates() -> Vec<String> {
        ["bash", "sh", "zsh"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_which_probe_respects_candidate_order() {
        let probe = TableProbe::default()
            .answer("exec c1 which which", "/usr/bin/which\n")
            .answer("exec c1 which sh", "/bin/sh\n")
            .answer("exec c1 which zsh", "/bin/zsh\n");

        let shell = WhichProbe.attempt(&probe, "c1", &candidates());

        assert_eq!(shell.as_deref(), Some("/bin/sh"));
    }

    #[test]
    fn test_which_probe_falls_back_to_command_v() {
        let probe = TableProbe::default()
            .answer("exec c1 command", "")
            .answer("exec c1 command -v bash", "/bin/bash\n");

        let shell = WhichProbe.attempt(&probe, "c1", &candidates());

        assert_eq!(shell.as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn test_which_probe_without_lookup_tool() {
        let probe = TableProbe::default().answer("exec c1 which bash", "/bin/bash");

        assert_eq!(WhichProbe.attempt(&probe, "c1", &candidates()), None);
    }

    #[test]
    fn test_image_shell_uses_first_entry() {
        let probe = TableProbe::default().answer(
            "inspect c1",
            r#"[{"Id": "c1", "Config": {"Shell": ["/bin/ash", "-c"]}}]"#,
        );

        assert_eq!(
            ImageShell.attempt(&probe, "c1", &candidates()).as_deref(),
            Some("/bin/ash")
        );
    }

    #[test]
    fn test_image_shell_without_declared_shell() {
        let probe = TableProbe::default().answer("inspect c1", r#"[{"Config": {"Cmd": ["node"]}}]"#);

        assert_eq!(ImageShell.attempt(&probe, "c1", &candidates()), None);
    }

    #[test]
    fn test_passwd_shell_skips_non_candidates() {
        let passwd = "root:x:0:0:root:/root:/sbin/nologin\n\
                      daemon:x:1:1::/usr/sbin:/usr/sbin/nologin\n\
                      node:x:1000:1000::/home/node:/bin/zsh\n";

        assert_eq!(
            passwd_shell(passwd, &candidates()).as_deref(),
            Some("/bin/zsh")
        );
        assert_eq!(passwd_shell("", &candidates()), None);
        assert_eq!(passwd_shell("broken line without shell", &candidates()), None);
    }

    #[test]
    fn test_discovery_reaches_passwd_when_which_and_inspect_fail() {
        let probe = TableProbe::default()
            .answer("exec c1 which which", "/usr/bin/which")
            .answer("inspect c1", "[{\"Config\": {}}]")
            .answer(
                "exec c1 cat /etc/passwd",
                "root:x:0:0:root:/root:/sbin/nologin\napp:x:1000:1000::/app:/bin/zsh\n",
            );

        let shell = ShellDiscovery::new(candidates()).find_shell(&probe, "c1").unwrap();

        assert_eq!(shell, "/bin/zsh");
    }

    #[test]
    fn test_exhausted_strategies() {
        let probe = TableProbe::default();

        let result = ShellDiscovery::new(candidates()).find_shell(&probe, "c1");

        assert!(matches!(
            result,
            Err(EnvError::ShellNotFound { container }) if container == "c1"
        ));
    }
}
