//! Pty backend: a local child attached to the slave side of a
//! pseudo-terminal, driven through the master.

use std::ffi::OsStr;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use ptyscript_pty::{
    ExitStatus, NativePtySystem, PtyChild, PtyConfig, PtyError, PtyMaster, PtySignal,
    PtySystem, UnixPtyChild, UnixPtyMaster, WindowSize,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::Transport;
use crate::config::{DEFAULT_CLOSE_TIMEOUT, SessionConfig};
use crate::error::{ExpectError, Result, SpawnError};
use crate::types::ControlChar;

/// A pty master paired with the child running on its slave.
pub struct PtyTransport<M = UnixPtyMaster, C = UnixPtyChild>
where
    M: PtyMaster,
    C: PtyChild,
{
    master: M,
    child: C,
    close_grace: Duration,
}

impl<M: PtyMaster, C: PtyChild> std::fmt::Debug for PtyTransport<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTransport")
            .field("pid", &self.child.pid())
            .field("open", &self.master.is_open())
            .finish_non_exhaustive()
    }
}

impl From<&SessionConfig> for PtyConfig {
    fn from(config: &SessionConfig) -> Self {
        let (cols, rows) = config.dimensions;
        let mut builder = Self::builder().window_size(cols, rows).echo(config.echo);
        if !config.inherit_env {
            builder = builder.env_clear();
        }
        for (key, value) in &config.env {
            builder = builder.env(key, value);
        }
        if let Some(dir) = &config.working_dir {
            builder = builder.working_directory(dir);
        }
        builder.build()
    }
}

impl PtyTransport {
    /// Spawn `command` with `args` on a fresh pty.
    pub async fn spawn<S: AsRef<str>>(
        command: &str,
        args: &[S],
        config: &SessionConfig,
    ) -> Result<Self> {
        validate_command(command, args)?;

        let pty_config = PtyConfig::from(config);
        let args: Vec<&OsStr> = args.iter().map(|a| OsStr::new(a.as_ref())).collect();
        let (master, child) = NativePtySystem::spawn(command, args, &pty_config)
            .await
            .map_err(SpawnError::Pty)?;

        Ok(Self::new(master, child).close_grace(config.timeout.close))
    }
}

impl<M: PtyMaster, C: PtyChild> PtyTransport<M, C> {
    /// Wrap an already spawned master/child pair.
    pub const fn new(master: M, child: C) -> Self {
        Self {
            master,
            child,
            close_grace: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// How long `close` waits for the child before killing it.
    #[must_use]
    pub const fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Process ID of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// Whether the child is still running. Reaps it if it has exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for the child to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .await
            .map_err(|e| pty_error("waiting for child", e))
    }

    /// Send a signal to the child.
    pub fn signal(&self, signal: PtySignal) -> Result<()> {
        self.child
            .signal(signal)
            .map_err(|e| pty_error("signalling child", e))
    }

    /// Kill the child.
    pub fn kill(&mut self) -> Result<()> {
        self.child.kill().map_err(|e| pty_error("killing child", e))
    }

    /// Resize the terminal.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.master
            .resize(WindowSize::new(cols, rows))
            .map_err(|e| pty_error("resizing pty", e))
    }

    /// The master side of the pty.
    pub const fn master(&self) -> &M {
        &self.master
    }
}

impl<M: PtyMaster, C: PtyChild> Transport for PtyTransport<M, C> {
    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        self.master.set_echo(enabled).map_err(|e| {
            if e.is_unsupported() {
                ExpectError::echo_unsupported(e.to_string())
            } else {
                pty_error("changing terminal echo", e)
            }
        })
    }

    fn echo(&self) -> Option<bool> {
        self.master.echo().ok()
    }

    fn eof_char(&self) -> u8 {
        match self.master.eof_char() {
            // _POSIX_VDISABLE
            Ok(0) | Err(_) => ControlChar::CtrlD.as_byte(),
            Ok(c) => c,
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.master.is_open() {
            self.master
                .close()
                .map_err(|e| pty_error("closing pty master", e))?;
        }
        if !self.child.is_running() {
            return Ok(());
        }

        // The hangup usually ends the child; give it a moment before SIGKILL.
        let grace = self.close_grace;
        if let Ok(status) = tokio::time::timeout(grace, self.child.wait()).await {
            let status = status.map_err(|e| pty_error("waiting for child", e))?;
            tracing::debug!(pid = self.child.pid(), %status, "child exited after hangup");
            return Ok(());
        }

        tracing::debug!(pid = self.child.pid(), "killing child still running at close");
        match self.child.kill() {
            Ok(()) | Err(PtyError::ProcessExited) => {}
            Err(e) => return Err(pty_error("killing child", e)),
        }
        self.child
            .wait()
            .await
            .map(|_| ())
            .map_err(|e| pty_error("waiting for child", e))
    }
}

impl<M: PtyMaster, C: PtyChild> AsyncRead for PtyTransport<M, C> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.master).poll_read(cx, buf)
    }
}

impl<M: PtyMaster, C: PtyChild> AsyncWrite for PtyTransport<M, C> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.master).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.master).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.master).poll_shutdown(cx)
    }
}

fn validate_command<S: AsRef<str>>(command: &str, args: &[S]) -> Result<()> {
    if command.trim().is_empty() {
        return Err(SpawnError::EmptyCommand.into());
    }
    if command.contains('\0') {
        return Err(SpawnError::NulByte {
            kind: "command",
            value: command.to_string(),
        }
        .into());
    }
    if let Some(arg) = args.iter().map(AsRef::as_ref).find(|a| a.contains('\0')) {
        return Err(SpawnError::NulByte {
            kind: "argument",
            value: arg.to_string(),
        }
        .into());
    }
    Ok(())
}

fn pty_error(context: &str, err: PtyError) -> ExpectError {
    let source = match err {
        PtyError::Io(e) => e,
        other => io::Error::other(other),
    };
    ExpectError::io_context(context, source)
}
