//! Unix pty master: allocation, terminal attributes and async I/O.

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use rustix::fs::{Mode, OFlags, fcntl_setfl, open};
use rustix::io::{Errno, FdFlags, fcntl_setfd};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{
    LocalModes, OptionalActions, SpecialCodeIndex, Winsize, tcgetattr, tcgetwinsize, tcsetattr,
    tcsetwinsize,
};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::WindowSize;
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::PtyMaster;

/// Master side of a Unix pseudo-terminal.
///
/// Closing drops the descriptor, which hangs up the slave side.
pub struct UnixPtyMaster {
    async_fd: Option<AsyncFd<OwnedFd>>,
}

impl std::fmt::Debug for UnixPtyMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyMaster")
            .field("fd", &self.async_fd.as_ref().map(AsRawFd::as_raw_fd))
            .finish()
    }
}

impl UnixPtyMaster {
    /// Allocate a new pty pair and return the master with the slave's path.
    pub fn open() -> Result<(Self, String)> {
        let create = |e: Errno| PtyError::Create(errno_to_io(e));

        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(create)?;
        fcntl_setfd(&master_fd, FdFlags::CLOEXEC).map_err(create)?;
        grantpt(&master_fd).map_err(create)?;
        unlockpt(&master_fd).map_err(create)?;

        let slave_name = ptsname(&master_fd, Vec::new()).map_err(create)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })?
            .to_string();

        fcntl_setfl(&master_fd, OFlags::NONBLOCK).map_err(create)?;
        let async_fd = AsyncFd::new(master_fd).map_err(PtyError::Create)?;

        Ok((
            Self {
                async_fd: Some(async_fd),
            },
            slave_path,
        ))
    }

    fn fd(&self) -> Result<&OwnedFd> {
        self.async_fd
            .as_ref()
            .map(AsyncFd::get_ref)
            .ok_or(PtyError::Closed)
    }

    /// Whether the master is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.async_fd.is_some()
    }

    /// Set the window size.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let winsize = Winsize {
            ws_col: size.cols,
            ws_row: size.rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        tcsetwinsize(self.fd()?, winsize).map_err(|e| PtyError::Resize(errno_to_io(e)))
    }

    /// Get the current window size.
    pub fn get_window_size(&self) -> Result<WindowSize> {
        let winsize =
            tcgetwinsize(self.fd()?).map_err(|e| PtyError::GetAttributes(errno_to_io(e)))?;
        Ok(WindowSize::new(winsize.ws_col, winsize.ws_row))
    }

    /// Turn the `ECHO` local mode on or off.
    ///
    /// The change applies immediately (`TCSANOW`); input already queued on
    /// the terminal is echoed or not according to the mode when the line
    /// discipline processes it.
    pub fn set_echo(&mut self, enabled: bool) -> Result<()> {
        let fd = self.fd()?;
        let mut termios = tcgetattr(fd).map_err(|e| PtyError::GetAttributes(errno_to_io(e)))?;
        termios.local_modes.set(LocalModes::ECHO, enabled);
        tcsetattr(fd, OptionalActions::Now, &termios)
            .map_err(|e| PtyError::SetAttributes(errno_to_io(e)))?;
        tracing::debug!(enabled, "pty echo mode changed");
        Ok(())
    }

    /// Read the `ECHO` local mode.
    pub fn echo(&self) -> Result<bool> {
        let termios =
            tcgetattr(self.fd()?).map_err(|e| PtyError::GetAttributes(errno_to_io(e)))?;
        Ok(termios.local_modes.contains(LocalModes::ECHO))
    }

    /// The terminal's `VEOF` character.
    pub fn eof_char(&self) -> Result<u8> {
        let termios =
            tcgetattr(self.fd()?).map_err(|e| PtyError::GetAttributes(errno_to_io(e)))?;
        Ok(termios.special_codes[SpecialCodeIndex::VEOF])
    }

    /// Close the master descriptor.
    pub fn close(&mut self) -> Result<()> {
        if self.async_fd.take().is_some() {
            tracing::debug!("pty master closed");
        }
        Ok(())
    }
}

impl AsRawFd for UnixPtyMaster {
    /// Returns -1 once closed.
    fn as_raw_fd(&self) -> RawFd {
        self.async_fd.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }
}

impl AsyncRead for UnixPtyMaster {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let Some(async_fd) = self.async_fd.as_ref() else {
            return Poll::Ready(Ok(()));
        };

        loop {
            let mut guard = match async_fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            let unfilled = buf.initialize_unfilled();
            match rustix::io::read(async_fd.get_ref(), unfilled) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(Errno::INTR) => {}
                // Linux reports EIO once every slave descriptor is closed.
                Err(Errno::IO) => return Poll::Ready(Ok(())),
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }
}

impl AsyncWrite for UnixPtyMaster {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let Some(async_fd) = self.async_fd.as_ref() else {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "PTY closed")));
        };

        loop {
            let mut guard = match async_fd.poll_write_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            match rustix::io::write(async_fd.get_ref(), buf) {
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(Errno::INTR) => {}
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.async_fd = None;
        Poll::Ready(Ok(()))
    }
}

impl PtyMaster for UnixPtyMaster {
    fn resize(&self, size: WindowSize) -> Result<()> {
        self.set_window_size(size)
    }

    fn window_size(&self) -> Result<WindowSize> {
        self.get_window_size()
    }

    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        Self::set_echo(self, enabled)
    }

    fn echo(&self) -> Result<bool> {
        Self::echo(self)
    }

    fn eof_char(&self) -> Result<u8> {
        Self::eof_char(self)
    }

    fn close(&mut self) -> Result<()> {
        Self::close(self)
    }

    fn is_open(&self) -> bool {
        Self::is_open(self)
    }
}

/// Open the slave side of a pty by path.
///
/// The descriptor is close-on-exec; the child receives duplicates as its
/// standard streams.
pub fn open_slave(path: &str) -> Result<OwnedFd> {
    open(
        Path::new(path),
        OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| PtyError::Create(errno_to_io(e)))
}
