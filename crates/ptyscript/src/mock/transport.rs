//! In-memory transport for testing sessions without a child process.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

use super::event::MockEvent;
use crate::backend::Transport;
use crate::error::{ExpectError, Result};
use crate::types::ControlChar;

#[derive(Debug)]
struct MockState {
    events: VecDeque<MockEvent>,
    delay: Option<Pin<Box<Sleep>>>,
    input: Vec<u8>,
    waker: Option<Waker>,
    write_error: Option<io::ErrorKind>,
    closed: bool,
    echo: bool,
    echo_supported: bool,
    reflect: bool,
    eof_char: u8,
}

impl MockState {
    fn new() -> Self {
        Self {
            events: VecDeque::new(),
            delay: None,
            input: Vec::new(),
            waker: None,
            write_error: None,
            closed: false,
            echo: true,
            echo_supported: true,
            reflect: false,
            eof_char: ControlChar::CtrlD.as_byte(),
        }
    }

    fn push(&mut self, event: MockEvent) {
        self.events.push_back(event);
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn poll_next(&mut self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        loop {
            if self.closed {
                return Poll::Ready(Ok(()));
            }
            let Some(event) = self.events.front_mut() else {
                self.waker = Some(cx.waker().clone());
                return Poll::Pending;
            };
            match event {
                MockEvent::Output(data) if data.is_empty() => {
                    self.events.pop_front();
                }
                MockEvent::Output(data) => {
                    let n = buf.remaining().min(data.len());
                    buf.put_slice(&data[..n]);
                    if n == data.len() {
                        self.events.pop_front();
                    } else {
                        data.drain(..n);
                    }
                    return Poll::Ready(Ok(()));
                }
                // stays queued so every later read also sees it
                MockEvent::Eof => return Poll::Ready(Ok(())),
                MockEvent::Error(kind, msg) => {
                    let err = io::Error::new(*kind, msg.clone());
                    self.events.pop_front();
                    return Poll::Ready(Err(err));
                }
                MockEvent::Delay(duration) => {
                    let duration = *duration;
                    let sleep = self
                        .delay
                        .get_or_insert_with(|| Box::pin(tokio::time::sleep(duration)));
                    if sleep.as_mut().poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    self.delay = None;
                    self.events.pop_front();
                }
            }
        }
    }
}

/// A scripted transport.
///
/// Output is delivered one queued chunk per read, so tests control exactly
/// where chunk boundaries fall. Clones share state: keep one clone to feed
/// output or inspect input while a session owns the other.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// An empty transport. Reads stay pending until output is queued.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new())),
        }
    }

    /// A transport that replays `events`.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = MockEvent>) -> Self {
        let transport = Self::new();
        transport.lock().events.extend(events);
        transport
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one chunk of output.
    pub fn queue_output(&self, data: &[u8]) {
        self.lock().push(MockEvent::output(data));
    }

    /// Queue one chunk of output from a string.
    pub fn queue_output_str(&self, s: &str) {
        self.queue_output(s.as_bytes());
    }

    /// Queue any event.
    pub fn queue_event(&self, event: MockEvent) {
        self.lock().push(event);
    }

    /// Queue end of stream.
    pub fn queue_eof(&self) {
        self.lock().push(MockEvent::Eof);
    }

    /// Make the next write fail with `kind`.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    /// Everything written so far, without clearing it.
    #[must_use]
    pub fn input(&self) -> Vec<u8> {
        self.lock().input.clone()
    }

    /// Take everything written so far.
    #[must_use]
    pub fn take_input(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().input)
    }

    /// Take everything written so far as lossy UTF-8.
    #[must_use]
    pub fn take_input_str(&self) -> String {
        String::from_utf8_lossy(&self.take_input()).into_owned()
    }

    /// Whether `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// The simulated terminal echo flag.
    #[must_use]
    pub fn echo_enabled(&self) -> bool {
        self.lock().echo
    }

    /// Number of events not yet consumed by reads.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.lock().events.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for MockTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.lock().poll_next(cx, buf)
    }
}

impl AsyncWrite for MockTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.lock();
        if state.closed {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock transport closed",
            )));
        }
        if let Some(kind) = state.write_error.take() {
            return Poll::Ready(Err(io::Error::new(kind, "injected write failure")));
        }
        state.input.extend_from_slice(buf);
        if state.reflect && state.echo {
            state.push(MockEvent::output(buf));
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Transport for MockTransport {
    fn set_echo(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.lock();
        if !state.echo_supported {
            return Err(ExpectError::echo_unsupported("mock transport has no terminal"));
        }
        state.echo = enabled;
        Ok(())
    }

    fn echo(&self) -> Option<bool> {
        let state = self.lock();
        state.echo_supported.then_some(state.echo)
    }

    fn eof_char(&self) -> u8 {
        self.lock().eof_char
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.closed = true;
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        Ok(())
    }
}

/// Fluent construction of a [`MockTransport`].
#[derive(Debug)]
pub struct MockBuilder {
    events: Vec<MockEvent>,
    echo: bool,
    echo_supported: bool,
    reflect: bool,
    eof_char: u8,
}

impl MockBuilder {
    /// Start with no events, echo on and not reflected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            echo: true,
            echo_supported: true,
            reflect: false,
            eof_char: ControlChar::CtrlD.as_byte(),
        }
    }

    /// One read's worth of output.
    #[must_use]
    pub fn output(mut self, data: &str) -> Self {
        self.events.push(MockEvent::output_str(data));
        self
    }

    /// One read's worth of raw bytes.
    #[must_use]
    pub fn output_bytes(mut self, data: &[u8]) -> Self {
        self.events.push(MockEvent::output(data));
        self
    }

    /// Pause before the next event.
    #[must_use]
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.events.push(MockEvent::delay_ms(ms));
        self
    }

    /// End of stream.
    #[must_use]
    pub fn eof(mut self) -> Self {
        self.events.push(MockEvent::eof());
        self
    }

    /// A failing read.
    #[must_use]
    pub fn read_error(mut self, kind: io::ErrorKind, msg: &str) -> Self {
        self.events.push(MockEvent::error(kind, msg));
        self
    }

    /// Initial echo flag.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Behave like a transport without a terminal: echo cannot be changed.
    #[must_use]
    pub const fn without_terminal(mut self) -> Self {
        self.echo_supported = false;
        self
    }

    /// While echo is on, written bytes come back as output, the way a
    /// terminal echoes typed input.
    #[must_use]
    pub const fn reflect_input(mut self) -> Self {
        self.reflect = true;
        self
    }

    /// End-of-file character reported to `send_eof`.
    #[must_use]
    pub const fn eof_char(mut self, c: u8) -> Self {
        self.eof_char = c;
        self
    }

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        let transport = MockTransport::from_events(self.events);
        {
            let mut state = transport.lock();
            state.echo = self.echo;
            state.echo_supported = self.echo_supported;
            state.reflect = self.reflect;
            state.eof_char = self.eof_char;
        }
        transport
    }
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
