//! Session handle: sends input to the child and expects its output.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::backend::Transport;
use crate::config::SessionConfig;
use crate::encoding::{Codec, StreamDecoder};
use crate::error::{ExpectError, Result};
use crate::expect::{ExpectState, Matcher, Pattern, PatternSet};
use crate::logging::{Direction, LogSink, LogTaps};
use crate::types::{ControlChar, Match, SessionState};

#[cfg(unix)]
use crate::backend::PtyTransport;
#[cfg(unix)]
use ptyscript_pty::{ExitStatus, PtySignal};

/// A scripted conversation with one child over one transport.
///
/// Every operation takes `&mut self`: a session has a single reader, and
/// the accumulation buffer and decoder are only touched by the expect loop
/// and by match consumption.
///
/// `expect` is cancel-safe. Bytes are read into a local buffer and only
/// decoded, logged and appended once the read completes, so dropping an
/// expect future (for example through `tokio::time::timeout`) loses nothing
/// and a retried expect resumes from the unconsumed text.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    matcher: Matcher,
    decoder: StreamDecoder,
    taps: LogTaps,
    state: SessionState,
    echo: Option<bool>,
    last_match: Option<Match>,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let echo = transport.echo();
        Self {
            matcher: Matcher::new(config.buffer.search_window),
            decoder: config.codec.decoder(),
            taps: LogTaps::default(),
            state: SessionState::Running,
            last_match: None,
            echo,
            transport,
            config,
        }
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session codec.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.config.codec
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    ///
    /// Reading from it directly bypasses the decoder and the buffer.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Install or remove the tap receiving everything sent to the child.
    pub fn set_log_send(&mut self, sink: Option<Box<dyn LogSink>>) {
        self.taps.set(Direction::Send, sink);
    }

    /// Install or remove the tap receiving everything decoded from the
    /// child, echo included.
    pub fn set_log_read(&mut self, sink: Option<Box<dyn LogSink>>) {
        self.taps.set(Direction::Read, sink);
    }

    /// Turn terminal echo on or off.
    ///
    /// # Errors
    ///
    /// [`ExpectError::EchoUnsupported`] if the transport cannot do it. The
    /// echo flag is unchanged in that case.
    pub fn set_echo(&mut self, enabled: bool) -> Result<()> {
        self.ensure_open()?;
        self.transport.set_echo(enabled)?;
        self.echo = Some(enabled);
        debug!(enabled, "terminal echo changed");
        Ok(())
    }

    /// Echo state as of the last successful change, or as reported by the
    /// transport at creation.
    #[must_use]
    pub const fn echo(&self) -> Option<bool> {
        self.echo
    }

    /// Send text. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`ExpectError::Encoding`] if `text` is not representable in the
    /// session codec (nothing is written or logged), a log sink failure, or
    /// a transport error.
    pub async fn send(&mut self, text: &str) -> Result<usize> {
        self.ensure_open()?;
        let bytes = self.config.codec.encode(text)?;
        self.write_logged(&bytes, text).await
    }

    /// Send text followed by the configured line ending.
    ///
    /// # Errors
    ///
    /// As for [`send`](Self::send).
    pub async fn send_line(&mut self, text: &str) -> Result<usize> {
        let line = format!("{text}{}", self.config.line_ending.as_str());
        self.send(&line).await
    }

    /// Send the terminal's end-of-file character.
    ///
    /// With the terminal in canonical mode this makes the child's pending
    /// `read` return; on an empty line the child sees end of input.
    ///
    /// # Errors
    ///
    /// A log sink failure or a transport error.
    pub async fn send_eof(&mut self) -> Result<usize> {
        self.ensure_open()?;
        let eof = self.transport.eof_char();
        self.write_logged(&[eof], &char::from(eof).to_string()).await
    }

    /// Send a control character.
    ///
    /// # Errors
    ///
    /// A log sink failure or a transport error.
    pub async fn send_control(&mut self, ctrl: ControlChar) -> Result<usize> {
        self.ensure_open()?;
        let byte = ctrl.as_byte();
        self.write_logged(&[byte], &char::from(byte).to_string()).await
    }

    /// Send raw bytes, bypassing the codec. The send tap receives them as
    /// lossy UTF-8.
    ///
    /// # Errors
    ///
    /// A log sink failure or a transport error.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        self.write_logged(bytes, &String::from_utf8_lossy(bytes)).await
    }

    async fn write_logged(&mut self, bytes: &[u8], text: &str) -> Result<usize> {
        self.taps.record(Direction::Send, text)?;
        trace!(bytes = bytes.len(), "send");

        let written = async {
            self.transport.write_all(bytes).await?;
            self.transport.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!(error = %e, "write to child failed, session unusable");
            self.state = SessionState::Failed;
            return Err(ExpectError::io_context("writing to child", e));
        }
        Ok(bytes.len())
    }

    /// Wait for `pattern` using the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`expect_any_timeout`](Self::expect_any_timeout).
    pub async fn expect(&mut self, pattern: impl Into<Pattern>) -> Result<Match> {
        let patterns = PatternSet::from(pattern.into());
        self.expect_any(&patterns).await
    }

    /// Wait for `pattern` with an explicit timeout.
    ///
    /// # Errors
    ///
    /// See [`expect_any_timeout`](Self::expect_any_timeout).
    pub async fn expect_timeout(
        &mut self,
        pattern: impl Into<Pattern>,
        timeout: Duration,
    ) -> Result<Match> {
        let patterns = PatternSet::from(pattern.into());
        self.expect_any_timeout(&patterns, timeout).await
    }

    /// Wait for the exact text `text`, never interpreted as a regex.
    ///
    /// # Errors
    ///
    /// See [`expect_any_timeout`](Self::expect_any_timeout).
    pub async fn expect_exact(&mut self, text: &str) -> Result<Match> {
        self.expect(Pattern::literal(text)).await
    }

    /// Wait for the child to close its end of the stream. Everything still
    /// buffered becomes the match's `before`.
    ///
    /// # Errors
    ///
    /// See [`expect_any_timeout`](Self::expect_any_timeout).
    pub async fn expect_eof(&mut self) -> Result<Match> {
        self.expect(Pattern::eof()).await
    }

    /// Wait for any of `patterns` using the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`expect_any_timeout`](Self::expect_any_timeout).
    pub async fn expect_any(&mut self, patterns: &PatternSet) -> Result<Match> {
        let timeout = self.config.timeout.default;
        self.expect_any_timeout(patterns, timeout).await
    }

    /// Wait until one of `patterns` matches.
    ///
    /// Already-buffered text is searched before anything is read. The
    /// earliest match in the buffer wins; at equal positions the pattern
    /// declared first wins. The deadline is fixed when the call starts.
    ///
    /// A [`Pattern::Eof`] entry turns end of stream into a successful match
    /// and a [`Pattern::Timeout`] entry does the same for the deadline.
    ///
    /// # Errors
    ///
    /// - [`ExpectError::InvalidPattern`] for an empty set
    /// - [`ExpectError::Encoding`] for a pattern the codec cannot represent
    /// - [`ExpectError::Timeout`] / [`ExpectError::Eof`] without the
    ///   matching sentinel
    /// - [`ExpectError::Decode`] for output the codec rejects; text decoded
    ///   before the bad bytes is already buffered
    /// - [`ExpectError::SessionClosed`] after `close` or a transport failure
    pub async fn expect_any_timeout(
        &mut self,
        patterns: &PatternSet,
        timeout: Duration,
    ) -> Result<Match> {
        self.ensure_open()?;
        patterns.ensure_not_empty()?;
        patterns.check_codec(self.config.codec)?;

        let deadline = ExpectState::new(timeout);
        debug!(patterns = %patterns.describe(), ?timeout, "expect");

        loop {
            if let Some((index, m)) = self.matcher.try_match(patterns) {
                let result = self.matcher.consume_match(patterns, index, m);
                return Ok(self.resolve(result));
            }

            if self.decoder.has_held_input() {
                self.decode_chunk(&[], patterns)?;
                continue;
            }

            if self.state == SessionState::EndOfStream {
                self.finish_decoder(patterns)?;
                self.log_unmatched("end of stream");
                return match patterns.eof_index() {
                    Some(index) => {
                        let result = self.matcher.eof_match(index);
                        Ok(self.resolve(result))
                    }
                    None => Err(ExpectError::eof(
                        patterns.describe(),
                        self.matcher.buffer().as_str(),
                    )),
                };
            }

            if deadline.is_timed_out() {
                self.log_unmatched("deadline passed");
                return match patterns.timeout_index() {
                    Some(index) => {
                        let result = self.matcher.timeout_match(index);
                        Ok(self.resolve(result))
                    }
                    None => Err(ExpectError::timeout(
                        deadline.timeout(),
                        patterns.describe(),
                        self.matcher.buffer().as_str(),
                    )),
                };
            }

            self.read_chunk(deadline.remaining(), patterns).await?;
        }
    }

    async fn read_chunk(&mut self, remaining: Duration, patterns: &PatternSet) -> Result<()> {
        let mut buf = vec![0u8; self.config.buffer.read_size];

        match tokio::time::timeout(remaining, self.transport.read(&mut buf)).await {
            Err(_elapsed) => Ok(()),
            Ok(Ok(0)) => {
                debug!(buffered = self.matcher.buffer().len(), "end of stream");
                self.state = SessionState::EndOfStream;
                Ok(())
            }
            Ok(Ok(n)) => {
                trace!(bytes = n, "read");
                self.decode_chunk(&buf[..n], patterns)
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "read from child failed, session unusable");
                self.state = SessionState::Failed;
                Err(ExpectError::io_context("reading from child", e))
            }
        }
    }

    /// Decode, log, then buffer. On a decode error the valid prefix is
    /// still logged and buffered before the error is returned.
    fn decode_chunk(&mut self, bytes: &[u8], patterns: &PatternSet) -> Result<()> {
        let mut text = String::new();
        let decoded = self.decoder.feed(bytes, &mut text);
        self.log_and_buffer(&text, decoded, patterns)
    }

    fn finish_decoder(&mut self, patterns: &PatternSet) -> Result<()> {
        let mut text = String::new();
        let decoded = self.decoder.finish(&mut text);
        self.log_and_buffer(&text, decoded, patterns)
    }

    fn log_and_buffer(
        &mut self,
        text: &str,
        decoded: std::result::Result<(), crate::encoding::DecodeError>,
        patterns: &PatternSet,
    ) -> Result<()> {
        let logged = self.taps.record(Direction::Read, text);
        self.matcher.ingest(text, patterns);

        if let Err(source) = decoded {
            debug!(error = %source, "undecodable output");
            return Err(ExpectError::Decode {
                source,
                buffer: self.matcher.buffer().as_str().to_string(),
            });
        }
        logged
    }

    fn log_unmatched(&self, reason: &str) {
        let buffer = self.matcher.buffer();
        debug!(
            reason,
            buffered = buffer.len(),
            trimmed = buffer.discarded(),
            window = ?buffer.search_window(),
            "no pattern matched"
        );
    }

    fn resolve(&mut self, result: Match) -> Match {
        debug!(
            pattern_index = result.pattern_index,
            span = ?result.span,
            "expect matched"
        );
        self.last_match = Some(result.clone());
        result
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_closed() {
            return Err(ExpectError::SessionClosed);
        }
        Ok(())
    }

    /// The most recent successful match.
    #[must_use]
    pub const fn last_match(&self) -> Option<&Match> {
        self.last_match.as_ref()
    }

    /// Text that preceded the most recent match.
    #[must_use]
    pub fn before(&self) -> Option<&str> {
        self.last_match.as_ref().map(|m| m.before.as_str())
    }

    /// Text that followed the most recent match when it was made.
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        self.last_match.as_ref().map(|m| m.after.as_str())
    }

    /// Unconsumed text in the accumulation buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        self.matcher.buffer().as_str()
    }

    /// Discard all unconsumed text.
    pub fn clear_buffer(&mut self) {
        self.matcher.buffer_mut().clear();
    }

    /// Whether the child has closed its end of the stream.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.state == SessionState::EndOfStream
    }

    /// Close the transport. Later operations fail with
    /// [`ExpectError::SessionClosed`]. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Whatever the transport reports while shutting down.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.decoder.reset();
        debug!("closing session");
        self.transport.close().await
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("codec", &self.config.codec)
            .field("echo", &self.echo)
            .field("buffer", self.matcher.buffer())
            .field("taps", &self.taps)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
impl Session<PtyTransport> {
    /// Spawn `command` on a new pty with the default configuration.
    ///
    /// ```no_run
    /// # async fn demo() -> ptyscript::Result<()> {
    /// let mut session = ptyscript::Session::spawn("/bin/cat", &[] as &[&str]).await?;
    /// session.send_line("hello").await?;
    /// session.expect("hello").await?;
    /// session.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// [`ExpectError::Spawn`] for an empty command, a NUL byte or a pty
    /// failure.
    pub async fn spawn<S: AsRef<str>>(command: &str, args: &[S]) -> Result<Self> {
        Self::spawn_with_config(command, args, SessionConfig::default()).await
    }

    /// Spawn `command` with `config`.
    ///
    /// # Errors
    ///
    /// [`ExpectError::Config`] for an invalid configuration, otherwise as
    /// for [`spawn`](Self::spawn).
    pub async fn spawn_with_config<S: AsRef<str>>(
        command: &str,
        args: &[S],
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let transport = PtyTransport::spawn(command, args, &config).await?;
        debug!(command, pid = transport.pid(), "spawned session");
        Ok(Self::new(transport, config))
    }

    /// Process ID of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.transport.pid()
    }

    /// Whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        self.transport.is_alive()
    }

    /// Wait for the child to exit and reap it.
    ///
    /// # Errors
    ///
    /// A failure of the underlying wait.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.transport.wait().await
    }

    /// Deliver a signal to the child.
    ///
    /// # Errors
    ///
    /// If the child already exited or the signal cannot be sent.
    pub fn signal(&self, signal: PtySignal) -> Result<()> {
        self.transport.signal(signal)
    }

    /// Kill the child with SIGKILL.
    ///
    /// # Errors
    ///
    /// If the signal cannot be sent.
    pub fn kill(&mut self) -> Result<()> {
        self.transport.kill()
    }

    /// Resize the terminal.
    ///
    /// # Errors
    ///
    /// If the resize ioctl fails.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.transport.resize(cols, rows)
    }
}
