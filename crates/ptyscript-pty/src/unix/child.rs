//! Child process spawning and lifecycle for Unix ptys.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::os::unix::io::OwnedFd;
use std::pin::Pin;
use std::process::Stdio;

use rustix::process::{Pid, Signal, kill_process};
use tokio::process::{Child, Command};

use crate::config::{PtyConfig, PtySignal};
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::{ExitStatus, PtyChild};

/// A child process attached to a pty slave.
pub struct UnixPtyChild {
    child: Child,
    pid: u32,
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

impl UnixPtyChild {
    fn new(child: Child) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::other("child exited before its pid was read"))
        })?;
        Ok(Self {
            child,
            pid,
            exit_status: None,
        })
    }

    /// Process ID of the child.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the child has not yet been reaped.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.exit_status.is_none()
    }

    /// Wait for the child to exit and reap it.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = ExitStatus::from(self.child.wait().await.map_err(PtyError::Wait)?);
        tracing::debug!(pid = self.pid, %status, "child exited");
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Poll for the exit status without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if self.exit_status.is_none() {
            self.exit_status = self
                .child
                .try_wait()
                .map_err(PtyError::Wait)?
                .map(ExitStatus::from);
        }
        Ok(self.exit_status)
    }

    /// Deliver a signal to the child.
    pub fn signal(&self, signal: PtySignal) -> Result<()> {
        if !self.is_running() {
            return Err(PtyError::ProcessExited);
        }

        let invalid = |what: &str| PtyError::Signal(io::Error::new(io::ErrorKind::InvalidInput, what.to_string()));
        let pid = Pid::from_raw(self.pid as i32).ok_or_else(|| invalid("invalid pid"))?;
        let sig = Signal::from_named_raw(signal.as_unix_signal())
            .ok_or_else(|| invalid("invalid signal"))?;

        tracing::debug!(pid = self.pid, ?signal, "signalling child");
        kill_process(pid, sig).map_err(|e| PtyError::Signal(errno_to_io(e)))
    }

    /// Send SIGKILL to the child.
    pub fn kill(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.child.start_kill().map_err(PtyError::Signal)
    }
}

impl PtyChild for UnixPtyChild {
    fn pid(&self) -> u32 {
        Self::pid(self)
    }

    fn is_running(&self) -> bool {
        Self::is_running(self)
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>> {
        Box::pin(Self::wait(self))
    }

    fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Self::try_wait(self)
    }

    fn signal(&self, signal: PtySignal) -> Result<()> {
        Self::signal(self, signal)
    }

    fn kill(&mut self) -> Result<()> {
        Self::kill(self)
    }
}

/// Spawn `program` with the pty slave as its standard streams.
///
/// The child starts a new session and acquires the slave (its stdin) as
/// controlling terminal, so `^C` and `^D` are interpreted by the line
/// discipline.
/// The slave descriptor is consumed; the parent keeps no copy, so the master
/// reads EOF once the child and its descendants close it.
pub fn spawn_child<I>(
    slave_fd: OwnedFd,
    program: &OsStr,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let stdin = slave_fd.try_clone().map_err(PtyError::Spawn)?;
    let stdout = slave_fd.try_clone().map_err(PtyError::Spawn)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(config.effective_env())
        .stdin(Stdio::from(stdin))
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(slave_fd));

    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    // SAFETY: setsid and ioctl are async-signal-safe; the closure touches
    // no memory shared with the parent.
    #[allow(unsafe_code)]
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY, 0) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    UnixPtyChild::new(child)
}
