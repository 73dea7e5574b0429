//! Blocking wrapper around [`Session`] for callers without an async
//! runtime.

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::backend::PtyTransport;
use crate::config::SessionConfig;
use crate::error::{ExpectError, Result};
use crate::expect::{Pattern, PatternSet};
use crate::logging::LogSink;
use crate::session::Session;
use crate::types::{ControlChar, Match};
use ptyscript_pty::ExitStatus;

/// A pty session driven by its own current-thread runtime.
///
/// Must not be used from inside an async context: every method blocks on
/// the runtime.
pub struct SyncSession {
    runtime: Runtime,
    inner: Session<PtyTransport>,
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExpectError::io_context("creating tokio runtime", e))
}

impl SyncSession {
    /// Spawn `command` with the default configuration.
    ///
    /// # Errors
    ///
    /// Any spawn failure.
    pub fn spawn<S: AsRef<str>>(command: &str, args: &[S]) -> Result<Self> {
        Self::spawn_with_config(command, args, SessionConfig::default())
    }

    /// Spawn `command` with `config`.
    ///
    /// # Errors
    ///
    /// Any spawn failure.
    pub fn spawn_with_config<S: AsRef<str>>(
        command: &str,
        args: &[S],
        config: SessionConfig,
    ) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(Session::spawn_with_config(command, args, config))?;
        Ok(Self { runtime, inner })
    }

    /// The wrapped async session.
    #[must_use]
    pub const fn session(&self) -> &Session<PtyTransport> {
        &self.inner
    }

    /// Mutable access to the wrapped async session.
    pub const fn session_mut(&mut self) -> &mut Session<PtyTransport> {
        &mut self.inner
    }

    /// Process ID of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.pid()
    }

    /// See [`Session::set_log_send`].
    pub fn set_log_send(&mut self, sink: Option<Box<dyn LogSink>>) {
        self.inner.set_log_send(sink);
    }

    /// See [`Session::set_log_read`].
    pub fn set_log_read(&mut self, sink: Option<Box<dyn LogSink>>) {
        self.inner.set_log_read(sink);
    }

    /// See [`Session::set_echo`].
    ///
    /// # Errors
    ///
    /// [`ExpectError::EchoUnsupported`] if the terminal refuses.
    pub fn set_echo(&mut self, enabled: bool) -> Result<()> {
        self.inner.set_echo(enabled)
    }

    /// See [`Session::send`].
    ///
    /// # Errors
    ///
    /// Encoding, log sink or transport failures.
    pub fn send(&mut self, text: &str) -> Result<usize> {
        self.runtime.block_on(self.inner.send(text))
    }

    /// See [`Session::send_line`].
    ///
    /// # Errors
    ///
    /// Encoding, log sink or transport failures.
    pub fn send_line(&mut self, text: &str) -> Result<usize> {
        self.runtime.block_on(self.inner.send_line(text))
    }

    /// See [`Session::send_eof`].
    ///
    /// # Errors
    ///
    /// Log sink or transport failures.
    pub fn send_eof(&mut self) -> Result<usize> {
        self.runtime.block_on(self.inner.send_eof())
    }

    /// See [`Session::send_control`].
    ///
    /// # Errors
    ///
    /// Log sink or transport failures.
    pub fn send_control(&mut self, ctrl: ControlChar) -> Result<usize> {
        self.runtime.block_on(self.inner.send_control(ctrl))
    }

    /// See [`Session::expect`].
    ///
    /// # Errors
    ///
    /// As for [`Session::expect_any_timeout`].
    pub fn expect(&mut self, pattern: impl Into<Pattern>) -> Result<Match> {
        self.runtime.block_on(self.inner.expect(pattern))
    }

    /// See [`Session::expect_timeout`].
    ///
    /// # Errors
    ///
    /// As for [`Session::expect_any_timeout`].
    pub fn expect_timeout(&mut self, pattern: impl Into<Pattern>, timeout: Duration) -> Result<Match> {
        self.runtime.block_on(self.inner.expect_timeout(pattern, timeout))
    }

    /// See [`Session::expect_any`].
    ///
    /// # Errors
    ///
    /// As for [`Session::expect_any_timeout`].
    pub fn expect_any(&mut self, patterns: &PatternSet) -> Result<Match> {
        self.runtime.block_on(self.inner.expect_any(patterns))
    }

    /// See [`Session::expect_exact`].
    ///
    /// # Errors
    ///
    /// As for [`Session::expect_any_timeout`].
    pub fn expect_exact(&mut self, text: &str) -> Result<Match> {
        self.runtime.block_on(self.inner.expect_exact(text))
    }

    /// See [`Session::expect_eof`].
    ///
    /// # Errors
    ///
    /// As for [`Session::expect_any_timeout`].
    pub fn expect_eof(&mut self) -> Result<Match> {
        self.runtime.block_on(self.inner.expect_eof())
    }

    /// Text preceding the last match.
    #[must_use]
    pub fn before(&self) -> Option<&str> {
        self.inner.before()
    }

    /// Text following the last match.
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        self.inner.after()
    }

    /// Unconsumed text.
    #[must_use]
    pub fn buffer(&self) -> &str {
        self.inner.buffer()
    }

    /// Whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        self.inner.is_alive()
    }

    /// Wait for the child to exit.
    ///
    /// # Errors
    ///
    /// A failure of the underlying wait.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        self.runtime.block_on(self.inner.wait())
    }

    /// Close the session, killing the child if it is still running.
    ///
    /// # Errors
    ///
    /// Whatever the transport reports while shutting down.
    pub fn close(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.close())
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
