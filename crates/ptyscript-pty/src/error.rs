//! Error types for the ptyscript-pty crate.

use std::io;

/// The error type for pty operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Failed to allocate the pty pair.
    #[error("failed to create PTY: {0}")]
    Create(#[source] io::Error),

    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// An I/O error occurred on the master.
    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to read terminal attributes.
    #[error("failed to get terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    /// Failed to write terminal attributes.
    #[error("failed to set terminal attributes: {0}")]
    SetAttributes(#[source] io::Error),

    /// Failed to resize the pty.
    #[error("failed to resize PTY: {0}")]
    Resize(#[source] io::Error),

    /// The master has been closed.
    #[error("PTY has been closed")]
    Closed,

    /// The child already exited, so it cannot be signalled.
    #[error("child process has already exited")]
    ProcessExited,

    /// Failed to deliver a signal.
    #[error("failed to send signal: {0}")]
    Signal(#[source] io::Error),

    /// Failed to wait for the child.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),
}

impl PtyError {
    /// Whether this error reports an unsupported terminal operation.
    ///
    /// `ENOTTY` and `EINVAL` from attribute calls mean the descriptor
    /// does not behave like a terminal.
    #[cfg(unix)]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::GetAttributes(e) | Self::SetAttributes(e) => {
                matches!(e.raw_os_error(), Some(code) if code == libc::ENOTTY || code == libc::EINVAL)
            }
            Self::Closed => true,
            _ => false,
        }
    }
}

/// A specialized Result type for pty operations.
pub type Result<T> = std::result::Result<T, PtyError>;

#[cfg(unix)]
impl From<rustix::io::Errno> for PtyError {
    fn from(errno: rustix::io::Errno) -> Self {
        Self::Io(errno_to_io(errno))
    }
}

/// Convert a rustix errno into a standard I/O error.
#[cfg(unix)]
pub(crate) fn errno_to_io(errno: rustix::io::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno.raw_os_error())
}
