//! Common imports.
//!
//! ```no_run
//! use ptyscript::prelude::*;
//!
//! # async fn demo() -> Result<()> {
//! let mut session = Session::spawn("/bin/sh", &[] as &[&str]).await?;
//! session.expect("$").await?;
//! session.send_line("echo hello").await?;
//! session.expect("hello").await?;
//! # Ok(())
//! # }
//! ```

pub use crate::backend::Transport;
pub use crate::config::{LineEnding, SessionConfig};
pub use crate::encoding::Codec;
pub use crate::error::{ExpectError, Result, SpawnError};
pub use crate::expect::{Pattern, PatternSet};
pub use crate::logging::{LogSink, SharedLog};
pub use crate::session::{Session, SessionBuilder};
pub use crate::types::{ControlChar, Match, SessionState};

#[cfg(unix)]
pub use crate::backend::PtyTransport;
#[cfg(unix)]
pub use crate::sync::SyncSession;
