use crate::domain::{Invocation, ProcessOutcome, ProcessSpawner};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const CHUNK_SIZE: usize = 8 * 1024;

/// Runs children on a private current-thread runtime.
///
/// Both pipes are drained concurrently and, for foreground invocations,
/// echoed to our stderr chunk by chunk. SIGINT/SIGTERM received while a
/// child is alive are forwarded to it and mark the outcome as interrupted.
///
/// The signal listeners are installed once and stay installed. A signal
/// that arrived while no child was alive ends the process with the
/// shell's exit code before the next child is started.
#[derive(Debug)]
pub struct TokioSpawner {
    runtime: Runtime,
    interrupts: Mutex<Interrupts>,
}

impl TokioSpawner {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let interrupts = {
            let _guard = runtime.enter();
            Interrupts::listen()?
        };

        Ok(Self {
            runtime,
            interrupts: Mutex::new(interrupts),
        })
    }
}

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, invocation: &Invocation) -> io::Result<ProcessOutcome> {
        let mut interrupts = self
            .interrupts
            .lock()
            .map_err(|_| io::Error::other("signal listeners are poisoned"))?;

        if let Some(interrupt) = self.runtime.block_on(idle_interrupt(&mut interrupts)) {
            debug!("{interrupt:?} arrived between children, exiting");
            std::process::exit(interrupt.exit_code());
        }

        self.runtime.block_on(run(invocation, &mut interrupts))
    }
}

/// An interrupt that is already pending, without waiting for one.
async fn idle_interrupt(interrupts: &mut Interrupts) -> Option<Interrupt> {
    tokio::select! {
        biased;
        interrupt = interrupts.next() => Some(interrupt),
        _ = std::future::ready(()) => None,
    }
}

async fn run(invocation: &Invocation, interrupts: &mut Interrupts) -> io::Result<ProcessOutcome> {
    let mut command = Command::new(&invocation.program);
    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }

    let mut child = command
        .args(&invocation.args)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not piped"))?;

    let (stdout, stderr, waited) = tokio::join!(
        tee(stdout, invocation.foreground),
        tee(stderr, invocation.foreground),
        wait_forwarding(&mut child, interrupts),
    );
    let (status, interrupted) = waited?;

    Ok(ProcessOutcome {
        code: exit_code(status),
        stdout: stdout?,
        stderr: stderr?,
        interrupted,
    })
}

async fn tee<R>(mut reader: R, foreground: bool) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut console = tokio::io::stderr();

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }

        collected.extend_from_slice(&chunk[..read]);
        if foreground {
            console.write_all(&chunk[..read]).await?;
            console.flush().await?;
        }
    }

    Ok(String::from_utf8_lossy(&collected).into_owned())
}

async fn wait_forwarding(
    child: &mut Child,
    interrupts: &mut Interrupts,
) -> io::Result<(ExitStatus, bool)> {
    let pid = child.id();
    let mut interrupted = false;

    loop {
        tokio::select! {
            status = child.wait() => return Ok((status?, interrupted)),
            interrupt = interrupts.next() => {
                interrupted = true;
                forward(pid, interrupt);
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Int,
    Term,
}

impl Interrupt {
    /// What a shell reports for a process killed by this signal.
    fn exit_code(self) -> i32 {
        match self {
            Self::Int => 130,
            Self::Term => 143,
        }
    }
}

#[cfg(unix)]
#[derive(Debug)]
struct Interrupts {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Interrupts {
    fn listen() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Interrupt {
        tokio::select! {
            _ = self.interrupt.recv() => Interrupt::Int,
            _ = self.terminate.recv() => Interrupt::Term,
        }
    }
}

#[cfg(unix)]
fn forward(pid: Option<u32>, interrupt: Interrupt) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };

    let signal = match interrupt {
        Interrupt::Int => Signal::SIGINT,
        Interrupt::Term => Signal::SIGTERM,
    };

    debug!("forwarding {signal} to child {pid}");
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        debug!("could not forward {signal} to child {pid}: {e}");
    }
}

#[cfg(not(unix))]
#[derive(Debug)]
struct Interrupts;

#[cfg(not(unix))]
impl Interrupts {
    fn listen() -> io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Interrupt {
        // The console delivers Ctrl-C to the whole process group already.
        let _ = tokio::signal::ctrl_c().await;
        Interrupt::Int
    }
}

#[cfg(not(unix))]
fn forward(pid: Option<u32>, interrupt: Interrupt) {
    debug!("child {pid:?} received {interrupt:?} from the console");
}
