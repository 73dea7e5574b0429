//! ptyscript-pty: async pseudo-terminal transport.
//!
//! Allocates a pty pair, starts a child on the slave side and exposes the
//! master as a tokio `AsyncRead + AsyncWrite` stream together with the few
//! terminal controls an expect engine needs: echo on/off, the `VEOF`
//! character, window size, and child lifecycle.
//!
//! # Quick Start
//!
//! ```no_run
//! use ptyscript_pty::{NativePtySystem, PtyConfig, PtyChild, PtySystem};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn run() -> ptyscript_pty::Result<()> {
//! let (mut master, mut child) =
//!     NativePtySystem::spawn("cat", std::iter::empty::<&str>(), &PtyConfig::default()).await?;
//!
//! master.write_all(b"hello\n").await?;
//! let mut buf = [0u8; 64];
//! let n = master.read(&mut buf).await?;
//! println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//! child.kill()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{PtyConfig, PtyConfigBuilder, PtySignal, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtyChild, PtyMaster, PtySystem};

#[cfg(unix)]
pub use unix::{NativePtySystem, UnixPtyChild, UnixPtyMaster, UnixPtySystem};
