//! ptyscript: script conversations with interactive programs over a
//! pseudo-terminal.
//!
//! A [`Session`] sends text to a child and waits until its output matches
//! one of several [`Pattern`]s, the stream ends, or a deadline passes.
//! Output is decoded incrementally by the session [`Codec`], mirrored to
//! optional logging taps, and accumulated in a bounded buffer that the
//! matcher searches.
//!
//! # Features
//!
//! - **mock** (default): [`mock::MockTransport`], an in-memory transport
//!   with scripted chunk delivery for testing scripts without a child.
//!
//! # Example
//!
//! ```no_run
//! use ptyscript::{Session, SharedLog};
//!
//! # async fn demo() -> ptyscript::Result<()> {
//! let mut session = Session::spawn("/bin/cat", &[] as &[&str]).await?;
//! let log = SharedLog::new();
//! session.set_log_read(Some(Box::new(log.clone())));
//!
//! session.send_line("1234").await?;
//! session.expect("1234").await?; // terminal echo
//! session.expect("1234").await?; // cat's copy
//!
//! session.set_echo(false)?;
//! session.send_line("5678").await?;
//! session.expect("5678").await?; // only cat's copy now
//!
//! session.send_eof().await?;
//! session.expect_eof().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod encoding;
pub mod error;
pub mod expect;
pub mod logging;
pub mod prelude;
pub mod session;
#[cfg(unix)]
pub mod sync;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(unix)]
pub use backend::PtyTransport;
pub use backend::Transport;
pub use config::{BufferConfig, LineEnding, SessionConfig, TimeoutConfig};
pub use encoding::{Codec, DecodeError, StreamDecoder};
pub use error::{ExpectError, Result, SpawnError};
pub use expect::{Pattern, PatternSet};
pub use logging::{Direction, LogSink, SharedLog};
pub use ptyscript_pty::{ExitStatus, PtySignal};
pub use session::{Session, SessionBuilder};
#[cfg(unix)]
pub use sync::SyncSession;
pub use types::{ControlChar, Match, SessionState};
