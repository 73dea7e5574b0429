//! Core traits for the pty abstraction.
//!
//! - [`PtyMaster`]: the controller end of the pair, an async byte stream with
//!   terminal controls.
//! - [`PtyChild`]: handle for the process running on the slave end.
//! - [`PtySystem`]: factory that allocates a pair and spawns a child.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::{PtyConfig, PtySignal, WindowSize};
use crate::error::Result;

/// The master side of a pseudo-terminal.
///
/// Reading yields whatever the child wrote to the terminal (including the
/// terminal's own echo of input). A read of zero bytes means every slave
/// descriptor has been closed.
pub trait PtyMaster: AsyncRead + AsyncWrite + Send + Unpin {
    /// Resize the terminal, delivering SIGWINCH to the foreground group.
    fn resize(&self, size: WindowSize) -> Result<()>;

    /// Current window size.
    fn window_size(&self) -> Result<WindowSize>;

    /// Turn the terminal's `ECHO` local mode on or off.
    fn set_echo(&mut self, enabled: bool) -> Result<()>;

    /// Read the terminal's `ECHO` local mode.
    fn echo(&self) -> Result<bool>;

    /// The end-of-file control character (`VEOF`) configured on the terminal.
    fn eof_char(&self) -> Result<u8>;

    /// Close the master. The child sees a hangup; further reads return EOF.
    fn close(&mut self) -> Result<()>;

    /// Whether the master is still open.
    fn is_open(&self) -> bool;
}

/// Handle for a child process spawned on a pty.
pub trait PtyChild: Send + Unpin {
    /// Process ID of the child.
    fn pid(&self) -> u32;

    /// Whether the child has not yet been observed to exit.
    fn is_running(&self) -> bool;

    /// Wait for the child to exit.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>>;

    /// Poll for the exit status without blocking.
    fn try_wait(&mut self) -> Result<Option<ExitStatus>>;

    /// Deliver a signal to the child.
    fn signal(&self, signal: PtySignal) -> Result<()>;

    /// Forcefully terminate the child.
    fn kill(&mut self) -> Result<()>;
}

/// Exit status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process exited normally with the given code.
    Exited(i32),

    /// The process was terminated by a signal.
    Signaled(i32),
}

impl ExitStatus {
    /// Whether the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// The exit code, if the process exited normally.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

    /// The terminating signal, if any.
    #[must_use]
    pub const fn signal(&self) -> Option<i32> {
        match self {
            Self::Signaled(sig) => Some(*sig),
            Self::Exited(_) => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }
        Self::Exited(status.code().unwrap_or(-1))
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

/// Factory for pty-backed children.
pub trait PtySystem: Send + Sync {
    /// The master type for this platform.
    type Master: PtyMaster;
    /// The child type for this platform.
    type Child: PtyChild;

    /// Allocate a pty and spawn `program` with `args` on its slave side.
    fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> impl Future<Output = Result<(Self::Master, Self::Child)>> + Send
    where
        S: AsRef<std::ffi::OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<std::ffi::OsStr>;
}
