//! Server process supervision.
//!
//! `ProcessSupervisor` owns the single server handle and exposes idempotent
//! start/restart/stop over a `Launcher` collaborator. `ChildLauncher` is the
//! real launcher: it spawns the entry script as an OS process in its own
//! process group and terminates it with SIGTERM, escalating to SIGKILL.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What to run and how to stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub script: String,
    pub args: Vec<String>,
    /// Replaces the runtime; split with shell quoting rules.
    pub exec: Option<String>,
    /// Pass `--inspect` when the runtime is node.
    pub inspect: bool,
    pub cwd: PathBuf,
    pub kill_timeout: Duration,
}

impl LaunchSpec {
    /// Full argv for the server process.
    pub fn command_line(&self) -> Result<Vec<String>> {
        let mut argv = match self.exec.as_deref() {
            Some(exec) => shlex::split(exec)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("invalid exec override: {}", exec)))?,
            None if is_node_script(&self.script) => vec!["node".to_string()],
            None => Vec::new(),
        };
        if self.inspect && argv.first().is_some_and(|p| is_node(p)) {
            argv.insert(1, "--inspect".to_string());
        }
        argv.push(self.script.clone());
        argv.extend(self.args.iter().cloned());
        Ok(argv)
    }
}

fn is_node_script(script: &str) -> bool {
    matches!(
        Path::new(script).extension().and_then(|e| e.to_str()),
        Some("js" | "mjs" | "cjs")
    )
}

fn is_node(program: &str) -> bool {
    Path::new(program).file_name().and_then(|n| n.to_str()) == Some("node")
}

/// Process-supervision collaborator.
pub trait Launcher {
    type Handle;

    fn spawn(&mut self, spec: &LaunchSpec) -> Result<Self::Handle>;

    /// Restart in place; the caller keeps the same handle.
    fn restart(&mut self, handle: &mut Self::Handle) -> Result<()>;

    /// Stop the process. The handle is consumed and must not be reused.
    fn quit(&mut self, handle: Self::Handle) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of a start/restart request.
pub enum Launch {
    Started,
    Restarted,
    /// Nothing happened: lint-only mode, or already running on `start`.
    Skipped,
}

pub struct ProcessSupervisor<L: Launcher> {
    launcher: L,
    spec: LaunchSpec,
    lint_only: bool,
    handle: Option<L::Handle>,
}

impl<L: Launcher> ProcessSupervisor<L> {
    pub fn new(launcher: L, spec: LaunchSpec, lint_only: bool) -> Self {
        Self {
            launcher,
            spec,
            lint_only,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn lint_only(&self) -> bool {
        self.lint_only
    }

    pub fn start(&mut self) -> Result<Launch> {
        if self.lint_only || self.handle.is_some() {
            return Ok(Launch::Skipped);
        }
        self.handle = Some(self.launcher.spawn(&self.spec)?);
        Ok(Launch::Started)
    }

    /// Restart the running server, or start it if none is held.
    pub fn restart(&mut self) -> Result<Launch> {
        if self.lint_only {
            return Ok(Launch::Skipped);
        }
        match self.handle.as_mut() {
            Some(h) => {
                self.launcher.restart(h)?;
                Ok(Launch::Restarted)
            }
            None => self.start(),
        }
    }

    /// Stop the server if one is held. Returns whether anything was stopped.
    ///
    /// The handle is released before quitting, so it is gone even on error.
    pub fn stop(&mut self) -> Result<bool> {
        match self.handle.take() {
            Some(h) => {
                self.launcher.quit(h)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

/// Spawns real child processes.
#[derive(Debug, Default)]
pub struct ChildLauncher;

/// A running server process and the spec used to (re)spawn it.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    spec: LaunchSpec,
}

impl ServerProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Launcher for ChildLauncher {
    type Handle = ServerProcess;

    fn spawn(&mut self, spec: &LaunchSpec) -> Result<ServerProcess> {
        Ok(ServerProcess {
            child: spawn_child(spec)?,
            spec: spec.clone(),
        })
    }

    fn restart(&mut self, handle: &mut ServerProcess) -> Result<()> {
        terminate(&mut handle.child, handle.spec.kill_timeout)?;
        handle.child = spawn_child(&handle.spec)?;
        Ok(())
    }

    fn quit(&mut self, mut handle: ServerProcess) -> Result<()> {
        terminate(&mut handle.child, handle.spec.kill_timeout)
    }
}

fn spawn_child(spec: &LaunchSpec) -> Result<Child> {
    let argv = spec.command_line()?;
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Spawn("empty command line".into()))?;
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&spec.cwd).env("DEVLOOP", "1");
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let child = cmd
        .spawn()
        .map_err(|e| Error::Spawn(format!("`{}`: {}", argv.join(" "), e)))?;
    info!(pid = child.id(), command = %argv.join(" "), "spawned server");
    Ok(child)
}

/// Signal the child's process group and wait up to `grace` before SIGKILL.
#[cfg(unix)]
fn terminate(child: &mut Child, grace: Duration) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if child.try_wait()?.is_some() {
        debug!(pid = child.id(), "server already exited");
        return Ok(());
    }
    let pgid = Pid::from_raw(i32::try_from(child.id()).unwrap_or(i32::MAX));
    if let Err(e) = killpg(pgid, Signal::SIGTERM) {
        if e != Errno::ESRCH {
            warn!(pid = child.id(), "failed to send SIGTERM: {}", e);
        }
    }

    let start = Instant::now();
    loop {
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        if start.elapsed() > grace {
            warn!(pid = child.id(), "server did not exit, sending SIGKILL");
            if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                if e != Errno::ESRCH {
                    warn!(pid = child.id(), "failed to force kill server: {}", e);
                }
            }
            let _ = child.kill();
            child.wait()?;
            return Ok(());
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child, _grace: Duration) -> Result<()> {
    if child.try_wait()?.is_none() {
        let _ = child.kill();
    }
    child.wait()?;
    Ok(())
}
