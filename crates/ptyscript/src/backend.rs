//! Transports a session can drive.
//!
//! A [`Transport`] is a bidirectional byte stream with terminal echo
//! control. The pty backend ([`PtyTransport`]) attaches a local child on a
//! pseudo-terminal; the `mock` feature adds an in-memory transport for
//! tests.

#[cfg(unix)]
mod pty;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(unix)]
pub use pty::PtyTransport;

use crate::error::Result;
use crate::types::ControlChar;

/// The byte stream underneath a session.
///
/// Reads return whatever the child produced, with zero bytes meaning end
/// of stream. Writes go to the child's input.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Turn terminal echo on or off.
    ///
    /// Fails with [`ExpectError::EchoUnsupported`](crate::ExpectError::EchoUnsupported)
    /// when the transport has no terminal to configure.
    fn set_echo(&mut self, enabled: bool) -> Result<()>;

    /// Current echo state, if the transport can report it.
    fn echo(&self) -> Option<bool>;

    /// The byte that signals end of input to the child.
    fn eof_char(&self) -> u8 {
        ControlChar::CtrlD.as_byte()
    }

    /// Release the transport. Reads after this report end of stream.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
